//! Integration tests for the netform configuration system
//!
//! Covers loading TOML, YAML and JSON files, layering an explicit file over
//! the defaults, and environment variable overrides. Tests touching the
//! environment are serialized.

use netform::config::{Config, LogFormat};
use netform::synth::TemplateFormat;
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

const ENV_VARS: [&str; 5] = [
    "NETFORM_REGION",
    "NETFORM_OUTPUT_DIR",
    "NETFORM_FORMAT",
    "NETFORM_LOG_FORMAT",
    "NO_COLOR",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

// ============================================================================
// File Loading Tests
// ============================================================================

#[test]
fn test_load_toml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("netform.toml");
    fs::write(
        &path,
        r#"
[app]
region = "eu-central-1"

[synth]
output_dir = "build/assembly"
format = "yaml"

[logging]
level = "info"
format = "json"

[colors]
enabled = false
"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.app.region, "eu-central-1");
    assert_eq!(config.synth.output_dir, PathBuf::from("build/assembly"));
    assert_eq!(config.synth.format, TemplateFormat::Yaml);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert!(!config.colors.enabled);
}

#[test]
fn test_load_yaml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("netform.yaml");
    fs::write(&path, "app:\n  region: us-east-2\n").unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.app.region, "us-east-2");
    assert_eq!(config.synth.format, TemplateFormat::Json);
}

#[test]
fn test_load_json_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("netform.json");
    fs::write(&path, r#"{"synth": {"format": "yaml"}}"#).unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.synth.format, TemplateFormat::Yaml);
    assert_eq!(config.app.region, "ap-northeast-2");
}

#[test]
fn test_malformed_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("netform.toml");
    fs::write(&path, "[app\nregion = ").unwrap();

    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(err, netform::error::Error::Config(_)));
    assert!(err.to_string().contains("netform.toml"));
}

#[test]
fn test_unknown_format_value_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("netform.toml");
    fs::write(&path, "[synth]\nformat = \"xml\"\n").unwrap();
    assert!(Config::from_file(&path).is_err());
}

// ============================================================================
// Layering Tests
// ============================================================================

#[test]
#[serial]
fn test_explicit_file_layers_over_defaults() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "[synth]\noutput_dir = \"out\"\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.synth.output_dir, PathBuf::from("out"));
    assert_eq!(config.synth.format, TemplateFormat::Json);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    clear_env();
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.toml");
    assert!(Config::load(Some(&missing)).is_err());
}

// ============================================================================
// Environment Override Tests
// ============================================================================

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    std::env::set_var("NETFORM_REGION", "us-west-1");
    std::env::set_var("NETFORM_OUTPUT_DIR", "/tmp/netform-out");
    std::env::set_var("NETFORM_FORMAT", "yml");
    std::env::set_var("NETFORM_LOG_FORMAT", "json");
    std::env::set_var("NO_COLOR", "1");

    let dir = tempdir().unwrap();
    let path = dir.path().join("netform.toml");
    fs::write(&path, "[app]\nregion = \"eu-west-1\"\n").unwrap();

    let config = Config::load(Some(&path));
    clear_env();
    let config = config.unwrap();

    assert_eq!(config.app.region, "us-west-1");
    assert_eq!(config.synth.output_dir, PathBuf::from("/tmp/netform-out"));
    assert_eq!(config.synth.format, TemplateFormat::Yaml);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert!(!config.colors.enabled);
}

#[test]
#[serial]
fn test_invalid_env_format_rejected() {
    clear_env();
    std::env::set_var("NETFORM_FORMAT", "xml");
    let result = Config::load(None);
    clear_env();
    assert!(result.is_err());
}
