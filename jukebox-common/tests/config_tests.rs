//! Tests for configuration file loading and path resolution
//!
//! Tests that manipulate JUKEBOX_CONFIG are marked with #[serial]
//! so they never run in parallel with each other.

use jukebox_common::config::{resolve_config_path, JukeboxConfig, CONFIG_ENV_VAR};
use jukebox_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const VALID: &str = r#"
intro_clips = ["lead_intro", "pad_intro", "perc_intro"]
loop_clips = ["lead_loop", "pad_loop", "perc_loop"]
victory_clip = "victory"
damaged_sfx = "damaged"
ko_sfx = "ko"

[clips]
lead_intro = 10000
lead_loop = 8000
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_valid_file() {
    let file = write_config(VALID);

    let config = JukeboxConfig::load(file.path()).unwrap();
    assert_eq!(config.layer_count(), 3);
    assert_eq!(config.intro_clips[0], "lead_intro");
    assert_eq!(config.loop_clips[2], "perc_loop");
    assert_eq!(config.clips.len(), 2);
}

#[test]
fn test_load_missing_file_is_io_error() {
    let result = JukeboxConfig::load(Path::new("/nonexistent/jukebox/config.toml"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_load_malformed_file_is_toml_error() {
    let file = write_config("intro_clips = [unterminated");
    assert!(matches!(JukeboxConfig::load(file.path()), Err(Error::Toml(_))));
}

#[test]
#[serial]
fn test_cli_argument_wins_over_environment() {
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");

    let resolved = resolve_config_path(Some(Path::new("/from/cli.toml")), CONFIG_ENV_VAR).unwrap();
    assert_eq!(resolved, PathBuf::from("/from/cli.toml"));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_environment_used_without_cli_argument() {
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");

    let resolved = resolve_config_path(None, CONFIG_ENV_VAR).unwrap();
    assert_eq!(resolved, PathBuf::from("/from/env.toml"));

    env::remove_var(CONFIG_ENV_VAR);
}
