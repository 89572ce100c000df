use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub retention_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let data_root = env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(home).join(".local/share"));

        Self {
            db_path: data_root.join("tally/tally.duckdb"),
            retention_ttl: Duration::from_secs(60 * 60 * 24 * 90),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides();
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    db_path: Option<PathBuf>,
    retention_ttl: Option<String>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("TALLY_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("tally/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| TallyError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| TallyError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> ConfigOverrides {
    ConfigOverrides {
        db_path: env::var("TALLY_DB_PATH").ok().map(PathBuf::from),
        retention_ttl: env::var("TALLY_RETENTION_TTL").ok(),
    }
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.db_path {
        cfg.db_path = v;
    }
    if let Some(v) = overrides.retention_ttl {
        cfg.retention_ttl = humantime::parse_duration(&v).map_err(|e| {
            TallyError::Config(format!("bad retention_ttl in {source}: {e} (value={v})"))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_data_home() {
        let cfg = Config::default();
        assert!(cfg.db_path.ends_with("tally/tally.duckdb"));
    }

    #[test]
    fn default_has_retention() {
        let cfg = Config::default();
        assert_eq!(cfg.retention_ttl, Duration::from_secs(7_776_000));
    }

    #[test]
    fn apply_file_overrides_updates_fields() {
        let mut cfg = Config::default();
        let file = ConfigOverrides {
            db_path: Some(PathBuf::from("/tmp/tally-test.duckdb")),
            retention_ttl: Some("7d".to_string()),
        };

        apply_overrides(&mut cfg, file, "config file").unwrap();

        assert_eq!(cfg.db_path, PathBuf::from("/tmp/tally-test.duckdb"));
        assert_eq!(cfg.retention_ttl, Duration::from_secs(604_800));
    }

    #[test]
    fn rejects_bad_retention() {
        let mut cfg = Config::default();
        let file = ConfigOverrides {
            db_path: None,
            retention_ttl: Some("soon".to_string()),
        };
        assert!(apply_overrides(&mut cfg, file, "config file").is_err());
    }
}
