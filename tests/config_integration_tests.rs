//! Integration tests for config loading from fixture files.
//!
//! These tests verify that the sample config file parses into a valid migration config.

use std::fs;
use std::path::Path;

use pkg_migrate::migrate::{Identifier, MigrateConfig, MigrationConfig, PatchPolicy};

/// Read the sample config file content.
fn read_sample_config() -> String {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    fs::read_to_string(config_path).expect("Failed to read sample config file")
}

#[test]
fn sample_config_file_exists() {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    assert!(config_path.exists(), "Sample config file should exist");
}

#[test]
fn sample_config_is_valid_toml() {
    let config_content = read_sample_config();
    let result: Result<toml::Value, _> = toml::from_str(&config_content);
    assert!(result.is_ok(), "Sample config should be valid TOML: {:?}", result.err());
}

#[test]
fn migrate_section_has_expected_structure() {
    let config_content = read_sample_config();
    let value: toml::Value = toml::from_str(&config_content).expect("should parse");

    let migrate = value.get("migrate").expect("should have migrate section");

    assert!(migrate.get("old").is_some_and(toml::Value::is_str));
    assert!(migrate.get("new").is_some_and(toml::Value::is_str));
    assert!(migrate.get("source_roots").is_some_and(toml::Value::is_array));
    assert!(migrate.get("extensions").is_some_and(toml::Value::is_array));
    assert!(migrate.get("rewrite_root").is_some_and(toml::Value::is_str));
    assert!(migrate.get("descriptors").is_some_and(toml::Value::is_array));
    assert!(migrate.get("dryrun").is_some_and(toml::Value::is_bool));
    assert!(migrate.get("patch").is_some_and(toml::Value::is_array));
}

#[test]
fn sample_config_parses_into_migrate_config() {
    let config = MigrateConfig::from_toml_str(&read_sample_config()).expect("should parse");

    assert_eq!(config.old.as_deref(), Some("ohi.andre.consolelauncher"));
    assert_eq!(config.new.as_deref(), Some("com.hereliesaz.hg2gui"));
    assert_eq!(config.source_roots.len(), 4);
    assert_eq!(config.app_name, Some(("T-UI".to_string(), "HG2Gui".to_string())));
    assert_eq!(config.patch.len(), 3);

    assert!(matches!(config.patch[0].policy, PatchPolicy::ExactReplace { .. }));
    assert!(matches!(config.patch[1].policy, PatchPolicy::RewriteOrAppendLine { .. }));
    assert!(matches!(
        &config.patch[2].policy,
        PatchPolicy::CommentOutMatchingLines { comment, .. } if comment == "# "
    ));
}

#[test]
fn sample_config_patches_are_valid() {
    let user_config = MigrateConfig::from_toml_str(&read_sample_config()).expect("should parse");
    let old = Identifier::parse(user_config.old.as_deref().unwrap_or_default()).expect("valid old identifier");
    let new = Identifier::parse(user_config.new.as_deref().unwrap_or_default()).expect("valid new identifier");

    let mut config = MigrationConfig::new(old, new);
    config.patches = user_config.patch;

    assert!(config.validate().is_ok());
}
