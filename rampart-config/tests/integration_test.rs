//! Integration tests for rampart-config

use rampart_config::*;
use std::env;
use std::io::Write;
use std::time::Duration;

#[test]
fn test_from_toml_str_partial() {
    let settings = ResilienceSettings::from_toml_str(
        r#"
        [store]
        host = "redis"
        connect_timeout = 5

        [circuit_breaker]
        failure_threshold = 2
        reset_timeout = 10
        "#,
    )
    .unwrap();

    assert_eq!(settings.store.host, "redis");
    assert_eq!(settings.store.port, 6379);
    assert_eq!(settings.store.connect_timeout, Duration::from_secs(5));
    assert_eq!(settings.circuit_breaker.failure_threshold, 2);
    assert_eq!(settings.circuit_breaker.half_open_timeout, 30);
    assert_eq!(settings.rate_limit, RateLimitSettings::default());
    assert!(settings.validate().is_ok());
}

#[test]
fn test_from_file() {
    let path = env::temp_dir().join(format!("rampart-config-{}.toml", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "[rate_limit]\nmax_requests = 3\nwindow_seconds = 60").unwrap();
    writeln!(file, "[cache]\nttl_seconds = 30\nkey_prefix = \"translate\"").unwrap();
    drop(file);

    let settings = ResilienceSettings::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let limits = settings.rate_limit_config();
    assert_eq!(limits.max_requests, 3);
    assert_eq!(limits.window, Duration::from_secs(60));
    assert_eq!(settings.cache_config().build_key("k"), "translate:k");
}

#[test]
fn test_unknown_value_type_is_parse_error() {
    let result = ResilienceSettings::from_toml_str("[rate_limit]\nmax_requests = \"many\"");
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn test_env_loader_with_prefix() {
    let loader = EnvLoader::new(Some("RAMPART_ITEST".to_string()));

    unsafe {
        env::set_var("RAMPART_ITEST_CACHE_TTL", "42");
    }

    assert_eq!(loader.parse_var::<u64>("cache_ttl").unwrap(), Some(42));

    // Cleanup
    unsafe {
        env::remove_var("RAMPART_ITEST_CACHE_TTL");
    }
}

#[test]
fn test_config_error_display() {
    let err = ConfigError::ValidationError("cache.ttl_seconds must be greater than 0".to_string());
    let display = format!("{}", err);
    assert!(display.contains("ttl_seconds"));
}
