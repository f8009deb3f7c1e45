//! Configuration loading across sources
use std::io::Write;

use recruit_auth::config::{LogFormat, Settings, StorageBackend};

fn file_with(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_json_file_is_accepted() {
    let file = file_with(
        ".json",
        r#"{
            "log_format": "json",
            "session": { "ttl_secs": 3600, "short_ttl_secs": 600 },
            "auth_lockout": { "max_attempts": 3 }
        }"#,
    );

    let settings = Settings::load_from(Some(file.path())).unwrap();
    assert_eq!(settings.log_format, LogFormat::Json);
    assert_eq!(settings.session.ttl_for(true), chrono::Duration::hours(1));
    assert_eq!(settings.session.ttl_for(false), chrono::Duration::minutes(10));
    assert_eq!(settings.auth_lockout.max_attempts, 3);
    // Unset keys keep their defaults
    assert_eq!(settings.auth_lockout.lockout_secs, 300);
    assert_eq!(settings.storage.backend, StorageBackend::Memory);
}

#[test]
fn test_invalid_values_fail_loading() {
    let file = file_with(
        ".toml",
        r#"
[password_requirements]
min_length = 4
"#,
    );
    assert!(Settings::load_from(Some(file.path())).is_err());

    let file = file_with(".toml", "app_url = \"/relative\"\n");
    assert!(Settings::load_from(Some(file.path())).is_err());
}

#[test]
fn test_environment_overrides_file() {
    let file = file_with(
        ".toml",
        r#"
[email]
from = "File <file@example.com>"
max_retries = 4
"#,
    );

    std::env::set_var("RECRUIT_AUTH_EMAIL__FROM", "Env <env@example.com>");
    let loaded = Settings::load_from(Some(file.path()));
    std::env::remove_var("RECRUIT_AUTH_EMAIL__FROM");

    let settings = loaded.unwrap();
    assert_eq!(settings.email.from, "Env <env@example.com>");
    assert_eq!(settings.email.max_retries, 4);
}
