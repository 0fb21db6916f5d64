//! Config command handler.

use plume::{Platform, PlatformConfig, PlumeConfig, PlumeResult};
use std::collections::BTreeMap;
use std::path::Path;
use strum::IntoEnumIterator;

/// Load configuration from an explicit path, or from the default locations.
pub fn load_config(path: Option<&Path>) -> PlumeResult<PlumeConfig> {
    match path {
        Some(path) => PlumeConfig::from_file(path),
        None => PlumeConfig::load(),
    }
}

/// Print the effective configuration as TOML.
///
/// Known platforms are always listed, using presets where the
/// configuration is silent.
pub fn show_config(
    config: &PlumeConfig,
    platform: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let names: Vec<String> = match platform {
        Some(name) => vec![name.to_string()],
        None => {
            let mut names: Vec<String> = Platform::iter().map(|p| p.to_string()).collect();
            for name in config.platforms.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            names
        }
    };

    let mut platforms = BTreeMap::new();
    for name in names {
        let effective = config.dispatcher_config(&name)?;
        platforms.insert(name, PlatformConfig::from(&effective));
    }

    let effective = BTreeMap::from([("platforms", platforms)]);
    print!("{}", toml::to_string_pretty(&effective)?);

    Ok(())
}
