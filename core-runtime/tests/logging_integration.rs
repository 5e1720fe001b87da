//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};

#[test]
fn test_credentials_are_redacted() {
    assert_eq!(redact_if_sensitive("access_token", "eyJ0eXAi"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("refreshToken", "d1f0c2"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("password", "hunter2"), "[REDACTED]");
    assert_eq!(
        redact_if_sensitive("Authorization", "Bearer eyJ0eXAi"),
        "[REDACTED]"
    );
}

#[test]
fn test_emails_are_masked() {
    let redacted = redact_if_sensitive("email", "user@example.com");

    assert!(redacted.starts_with('u'));
    assert!(redacted.contains("[REDACTED]"));
    assert!(!redacted.contains("example.com"));
}

#[test]
fn test_normal_values_pass_through() {
    assert_eq!(redact_if_sensitive("route", "/dashboard"), "/dashboard");
    assert_eq!(redact_if_sensitive("status", "401"), "401");
    assert_eq!(redact_if_sensitive("code", "token.expired"), "token.expired");
}

#[test]
fn test_format_selection() {
    let config = LoggingConfig::default();

    #[cfg(debug_assertions)]
    assert_eq!(config.format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(config.format, LogFormat::Json);
}

#[test]
fn test_init_logging_only_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Warn)
        .with_filter("core_auth=warn");

    init_logging(config.clone()).expect("first initialization succeeds");
    assert!(init_logging(config).is_err());
}
