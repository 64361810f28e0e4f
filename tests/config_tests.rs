use std::io::Write;

use webdispatch::auth::TicketMode;
use webdispatch::config::{AppConfig, ConfigError};
use webdispatch::TicketCodec;

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "log_level: trace\nticket:\n  key: 6cf8051b4aaec0a97f47948d11dfe00a\n  mode: key-derived-iv\n  bcrypt_cost: 6"
    )
    .unwrap();

    let config = AppConfig::from_file(file.path()).unwrap();
    assert_eq!(config.log_level.as_deref(), Some("trace"));
    assert_eq!(config.ticket.mode, TicketMode::KeyDerivedIv);
    assert_eq!(config.ticket.bcrypt_cost, 6);

    let codec = TicketCodec::new(config.ticket_config().unwrap()).unwrap();
    let token = codec.signin("u").unwrap();
    assert_eq!(codec.authenticate_token(&token).as_deref(), Some("u"));
}

#[test]
fn test_missing_file_names_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");
    let err = AppConfig::from_file(&path).unwrap_err();
    assert!(format!("{err:#}").contains("absent.yaml"));
}

#[test]
fn test_invalid_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "ticket:\n  expiry_minutes: soon").unwrap();
    assert!(AppConfig::from_file(file.path()).is_err());
}

#[test]
fn test_ticket_key_of_wrong_length() {
    let config = AppConfig::from_yaml_str("ticket:\n  key: 00112233445566778899aabbccddeeff0011\n").unwrap();
    assert!(matches!(config.ticket_config(), Err(ConfigError::InvalidKey(_))));
}

#[test]
fn test_random_iv_mode_from_overrides() {
    let mut config = AppConfig::default();
    config.apply_overrides(|name| match name {
        "WEBDISPATCH_TICKET_KEY" => Some("6cf8051b4aaec0a97f47948d11dfe00a6cf8051b4aaec0a9".into()),
        "WEBDISPATCH_TICKET_MODE" => Some("random-iv".into()),
        "WEBDISPATCH_TICKET_EXPIRY_MINUTES" => Some("-5".into()),
        _ => None,
    });
    assert_eq!(config.ticket.expiry_minutes, 20_160);

    let ticket = config.ticket_config().unwrap();
    assert_eq!(ticket.key.len(), 24);
    assert_eq!(ticket.mode, TicketMode::RandomIv);
}

#[test]
fn test_load_reads_file_then_environment() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "ticket:\n  mode: random-iv\n  expiry_minutes: 30").unwrap();

    let config = webdispatch::config::load(Some(file.path())).unwrap();
    assert_eq!(config.ticket.mode, TicketMode::RandomIv);
    assert_eq!(config.ticket.expiry_minutes, 30);

    assert!(webdispatch::config::load(None).is_ok());
}
