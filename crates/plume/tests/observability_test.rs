//! Tests for logging configuration.

use plume::{ObservabilityConfig, init_observability_with_config};

#[test]
fn test_config_builder() {
    let config = ObservabilityConfig::new("plume-test")
        .with_log_level("plume_rate_limit=debug")
        .with_json_logs(true);

    assert_eq!(config.service_name, "plume-test");
    assert_eq!(config.log_level, "plume_rate_limit=debug");
    assert!(config.json_logs);
}

#[test]
fn test_default_service_name() {
    let config = ObservabilityConfig::default();
    assert_eq!(config.service_name, "plume");
    assert!(!config.json_logs);
}

#[test]
fn test_second_init_fails() {
    let config = ObservabilityConfig::new("plume-test").with_log_level("warn");
    // Only one global subscriber may be installed per process
    init_observability_with_config(config.clone()).unwrap();
    assert!(init_observability_with_config(config).is_err());
}
