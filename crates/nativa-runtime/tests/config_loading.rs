#![forbid(unsafe_code)]

//! Loading `NativaConfig` from TOML and JSON, strings and files.
//!
//! Run:
//!   cargo test -p nativa-runtime --features config --test config_loading

use std::io::Write;

use nativa_runtime::config::MAX_REENTRANT_PASSES_LIMIT;
use nativa_runtime::{ConfigError, NativaConfig};

#[test]
fn empty_toml_yields_defaults() {
    let config = NativaConfig::from_toml_str("").unwrap();
    assert_eq!(config, NativaConfig::default());
}

#[test]
fn partial_toml_keeps_other_defaults() {
    let config = NativaConfig::from_toml_str(
        r#"
        [navigation]
        in_place_edits = true

        [logging]
        filter = "debug,nativa_runtime=trace"
        "#,
    )
    .unwrap();
    assert!(config.navigation.in_place_edits);
    assert!(config.navigation.verify_native_stack);
    assert_eq!(config.dispatch.max_reentrant_passes, 16);
    assert_eq!(config.logging.filter, "debug,nativa_runtime=trace");
    assert!(config.validate().is_empty());
}

#[test]
fn toml_round_trip_preserves_values() {
    let mut config = NativaConfig::default();
    config.dispatch.max_reentrant_passes = 4;
    config.dispatch.dedupe_reentrant = false;
    config.logging.json = true;
    let text = config.to_toml_string().unwrap();
    assert_eq!(NativaConfig::from_toml_str(&text).unwrap(), config);
}

#[test]
fn json_string_loads() {
    let config = NativaConfig::from_json_str(
        r#"{ "dispatch": { "max_reentrant_passes": 2 }, "navigation": { "verify_native_stack": false } }"#,
    )
    .unwrap();
    assert_eq!(config.dispatch.max_reentrant_passes, 2);
    assert!(config.dispatch.dedupe_reentrant);
    assert!(!config.navigation.verify_native_stack);
}

#[test]
fn files_load_by_format() {
    let dir = tempfile::tempdir().unwrap();

    let toml_path = dir.path().join("nativa.toml");
    let mut file = std::fs::File::create(&toml_path).unwrap();
    writeln!(file, "[dispatch]\nmax_reentrant_passes = 32").unwrap();
    let config = NativaConfig::from_toml_file(&toml_path).unwrap();
    assert_eq!(config.dispatch.max_reentrant_passes, 32);

    let json_path = dir.path().join("nativa.json");
    std::fs::write(&json_path, r#"{ "logging": { "with_target": false } }"#).unwrap();
    let config = NativaConfig::from_json_file(&json_path).unwrap();
    assert!(!config.logging.with_target);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = NativaConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn malformed_input_reports_parser() {
    assert!(matches!(
        NativaConfig::from_toml_str("[dispatch\nmax_reentrant_passes = 1"),
        Err(ConfigError::Toml(_))
    ));
    assert!(matches!(
        NativaConfig::from_json_str("{ \"dispatch\": 3 "),
        Err(ConfigError::Json(_))
    ));
    assert!(matches!(
        NativaConfig::from_toml_str("[dispatch]\nmax_reentrant_passes = \"many\""),
        Err(ConfigError::Toml(_))
    ));
}

#[test]
fn out_of_range_values_fail_validation() {
    let config = NativaConfig::from_toml_str(&format!(
        "[dispatch]\nmax_reentrant_passes = {}\n[logging]\nfilter = \"\"",
        MAX_REENTRANT_PASSES_LIMIT + 1
    ))
    .unwrap();
    let messages = config.validate();
    assert_eq!(messages.len(), 2);
    match config.validated() {
        Err(ConfigError::Invalid(errors)) => assert_eq!(errors, messages),
        other => panic!("expected validation failure, got {other:?}"),
    }
}
