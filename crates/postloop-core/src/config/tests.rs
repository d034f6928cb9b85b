//! Integration-style tests for the three-layer config load.

use std::io::Write as _;

use tempfile::NamedTempFile;

use super::*;

#[test]
fn missing_file_falls_back_to_defaults() {
    let config = Config::load(std::path::Path::new("/nonexistent/path/config.toml")).unwrap();
    assert_eq!(config.llm.provider, "anthropic");
    assert_eq!(config.mix_planner.slots.len(), 10);
}

#[test]
fn malformed_file_is_a_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "this is not valid = = toml").unwrap();
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
}

#[test]
fn partial_file_overlays_onto_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[llm]
model = "custom-model"

[safety]
max_hashtags = 5
"#
    )
    .unwrap();
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.llm.model, "custom-model");
    assert_eq!(config.llm.provider, "anthropic");
    assert_eq!(config.safety.max_hashtags, 5);
    assert_eq!(config.safety.max_links, 1);
}

#[test]
fn load_and_validate_rejects_bad_cross_field_values() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[pdca]
promote_threshold = 0.2
demote_threshold = 0.8
"#
    )
    .unwrap();
    assert!(Config::load_and_validate(file.path()).is_err());
}

#[test]
fn storage_config_paths_are_namespaced_correctly() {
    let storage = StorageConfig::default();
    assert!(storage
        .pending_queue_path()
        .ends_with("queue/pending_tweets.json"));
    assert!(storage.preferences_path().ends_with("selection_preferences.json"));
    assert!(storage
        .persona_path(3)
        .ends_with("account_3_persona.json"));
}

#[test]
fn account_lookup_by_id() {
    let mut config = Config::default();
    config.accounts.push(AccountConfig {
        id: 7,
        username: "handle".to_string(),
        start_date: None,
        api_key: None,
        api_secret: None,
        access_token: None,
        access_token_secret: None,
        bearer_token: None,
    });
    assert_eq!(config.account(7).unwrap().username, "handle");
    assert!(config.account(8).is_err());
}

#[test]
fn debug_impl_redacts_llm_api_key() {
    let mut llm = LlmConfig::default();
    llm.api_key = Some("sk-ant-super-secret-value".to_string());
    let rendered = format!("{llm:?}");
    assert!(!rendered.contains("super-secret-value"));
}
