//! Status command handler.

use plume::{PlatformDispatchers, PlumeConfig, QuotaSnapshot};

/// Build dispatchers from configuration and print a snapshot of each.
pub async fn show_status(
    config: &PlumeConfig,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let dispatchers = PlatformDispatchers::from_config(config)?;
    let statuses = dispatchers.statuses().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    for snapshot in &statuses {
        print_snapshot(snapshot);
    }

    Ok(())
}

fn print_snapshot(snapshot: &QuotaSnapshot) {
    println!("{}", snapshot.platform);
    println!(
        "  window:     {}/{} used, rolls over in {}s",
        snapshot.window_count,
        snapshot.max_per_window,
        snapshot.window_remaining_ms.div_ceil(1000)
    );
    println!(
        "  queue:      {} waiting{}",
        snapshot.queue_length,
        if snapshot.processing { " (processing)" } else { "" }
    );
    match snapshot.reset_at {
        Some(reset_at) if snapshot.rate_limit_active => {
            println!("  cooldown:   active until {}", reset_at.to_rfc3339());
        }
        _ => println!("  cooldown:   none"),
    }
    if let Some(usage) = &snapshot.last_known_usage {
        if let Some(call_count) = usage.call_count {
            println!("  call_count: {}%", call_count);
        }
        if let (Some(remaining), Some(limit)) = (usage.remaining, usage.limit) {
            println!("  remaining:  {}/{}", remaining, limit);
        }
    }
}
