//! Operator config – reads/writes `~/.fetchbot/config.toml`.
//!
//! ```toml
//! [behavior]
//! poll_interval_ms = 200
//! proximity_threshold_cm = 55.0
//! return_margin_s = 0.5
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use fetchbot_runtime::BehaviorConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub behavior: BehaviorConfig,
}

/// `~/.fetchbot/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".fetchbot").join("config.toml")
}

/// Load the config, or `None` if there is no file yet.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load from `path`, apply environment overrides and validate the result.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {e}", path.display()))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {e}"))?;
    apply_env_overrides(&mut cfg);
    cfg.behavior
        .validate()
        .map_err(|e| format!("Invalid config at {}: {e}", path.display()))?;
    Ok(Some(cfg))
}

/// Apply `FETCHBOT_*` environment overrides.  Unparseable values are ignored.
///
/// | Variable | Field |
/// |---|---|
/// | `FETCHBOT_POLL_INTERVAL_MS` | `behavior.poll_interval_ms` |
/// | `FETCHBOT_PROXIMITY_CM` | `behavior.proximity_threshold_cm` |
/// | `FETCHBOT_RETURN_MARGIN_S` | `behavior.return_margin_s` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(ms) = env_parse::<u64>("FETCHBOT_POLL_INTERVAL_MS") {
        cfg.behavior.poll_interval_ms = ms;
    }
    if let Some(cm) = env_parse::<f32>("FETCHBOT_PROXIMITY_CM") {
        cfg.behavior.proximity_threshold_cm = cm;
    }
    if let Some(s) = env_parse::<f32>("FETCHBOT_RETURN_MARGIN_S") {
        cfg.behavior.return_margin_s = s;
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Write `cfg` to `path`, owner-only on Unix.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {e}"))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {e}"))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {e}", path.display()))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {e}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        (dir, path)
    }

    #[test]
    fn config_path_points_to_fetchbot_dir() {
        let p = config_path_for_home("/home/operator");
        assert_eq!(p, PathBuf::from("/home/operator/.fetchbot/config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let (_dir, path) = temp_path();
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn roundtrip_default_config() {
        let (_dir, path) = temp_path();
        save_to(&Config::default(), &path).expect("save");
        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.behavior.carry_duration_s, 20.0);
        assert_eq!(loaded.behavior.cruise_speed_pct, 50);
    }

    #[test]
    fn partial_behavior_table_is_filled_with_defaults() {
        let (_dir, path) = temp_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[behavior]\napproach_duration_s = 6.0\n").unwrap();
        let loaded = load_from(&path).unwrap().unwrap();
        assert_eq!(loaded.behavior.approach_duration_s, 6.0);
        assert_eq!(loaded.behavior.turn_complete_deg, 179.0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let (_dir, path) = temp_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[behavior\n").unwrap();
        assert!(load_from(&path).unwrap_err().contains("parse"));
    }

    #[test]
    fn out_of_range_tunable_is_an_error() {
        let (_dir, path) = temp_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[behavior]\ncruise_speed_pct = 150\n").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(err.contains("cruise_speed_pct"), "{err}");
    }

    #[cfg(unix)]
    #[test]
    fn config_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, path) = temp_path();
        save_to(&Config::default(), &path).expect("save");
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn env_overrides_poll_interval() {
        // SAFETY: each override test uses its own variable.
        unsafe { std::env::set_var("FETCHBOT_POLL_INTERVAL_MS", "50") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.behavior.poll_interval_ms, 50);
        unsafe { std::env::remove_var("FETCHBOT_POLL_INTERVAL_MS") };
    }

    #[test]
    fn env_overrides_ignore_garbage() {
        // SAFETY: each override test uses its own variable.
        unsafe { std::env::set_var("FETCHBOT_PROXIMITY_CM", "close") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.behavior.proximity_threshold_cm, 55.0);
        unsafe { std::env::remove_var("FETCHBOT_PROXIMITY_CM") };
    }

    #[test]
    fn env_overrides_return_margin() {
        // SAFETY: each override test uses its own variable.
        unsafe { std::env::set_var("FETCHBOT_RETURN_MARGIN_S", " 0.25 ") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.behavior.return_margin_s, 0.25);
        unsafe { std::env::remove_var("FETCHBOT_RETURN_MARGIN_S") };
    }
}
