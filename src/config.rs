use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::format::Format;
use crate::lines::DEFAULT_CAPACITY;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub collect: CollectConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tinder.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct CollectConfig {
    /// Log file to ingest. Nothing is collected when unset.
    #[serde(default)]
    pub log: Option<PathBuf>,
    /// Log name override; defaults to the log path as given.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_date_layout")]
    pub date_layout: String,
    #[serde(default)]
    pub compact: bool,
    #[serde(default)]
    pub relax: bool,
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            log: None,
            name: None,
            format: default_format(),
            date_layout: default_date_layout(),
            compact: false,
            relax: false,
            buffer: default_buffer(),
        }
    }
}

fn default_format() -> String {
    "[${datetime}] ${msg}".to_string()
}
fn default_date_layout() -> String {
    "%Y-%m-%d %H:%M".to_string()
}
fn default_buffer() -> usize {
    DEFAULT_CAPACITY
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl CollectConfig {
    /// Name the log row is resolved under.
    pub fn log_name(&self) -> Option<String> {
        self.name.clone().or_else(|| {
            self.log
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
        })
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.collect.format.is_empty() {
            anyhow::bail!("collect.format must not be empty");
        }
        Format::compile(&self.collect.format)
            .with_context(|| format!("Invalid collect.format: {}", self.collect.format))?;

        if self.collect.date_layout.is_empty() {
            anyhow::bail!("collect.date_layout must not be empty");
        }

        if self.collect.buffer == 0 {
            anyhow::bail!("collect.buffer must be > 0");
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    // Validated by the caller once command-line overrides are applied.
    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("tinder.toml");
        std::fs::write(&path, body).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let (_tmp, path) = write_config("");
        let config = load_config(&path).unwrap();
        assert_eq!(config.db.path, PathBuf::from("tinder.db"));
        assert_eq!(config.collect.format, "[${datetime}] ${msg}");
        assert_eq!(config.collect.date_layout, "%Y-%m-%d %H:%M");
        assert_eq!(config.collect.buffer, DEFAULT_CAPACITY);
        assert!(!config.collect.compact);
        assert!(!config.collect.relax);
        assert!(config.collect.log.is_none());
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn test_full_config() {
        let (_tmp, path) = write_config(
            r#"
[db]
path = "/tmp/logs.db"

[collect]
log = "/var/log/app.log"
format = "${level} ${msg}"
date_layout = "%d/%m/%Y"
compact = true
relax = true
buffer = 16

[server]
bind = "127.0.0.1:9000"
"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.db.path, PathBuf::from("/tmp/logs.db"));
        assert_eq!(config.collect.log_name().as_deref(), Some("/var/log/app.log"));
        assert!(config.collect.compact);
        assert!(config.collect.relax);
        assert_eq!(config.collect.buffer, 16);
        assert_eq!(config.server.bind, "127.0.0.1:9000");
    }

    #[test]
    fn test_name_overrides_log_path() {
        let collect = CollectConfig {
            log: Some(PathBuf::from("a.log")),
            name: Some("frontend".to_string()),
            ..Default::default()
        };
        assert_eq!(collect.log_name().as_deref(), Some("frontend"));
    }

    #[test]
    fn test_rejects_zero_buffer() {
        let (_tmp, path) = write_config("[collect]\nbuffer = 0\n");
        let config = load_config(&path).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("buffer"));
    }

    #[test]
    fn test_rejects_bad_template() {
        let (_tmp, path) = write_config("[collect]\nformat = \"${oops\"\n");
        let config = load_config(&path).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_override_replaces_bad_template() {
        let (_tmp, path) = write_config("[collect]\nformat = \"${oops\"\n");
        let mut config = load_config(&path).unwrap();
        config.collect.format = "${a}".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert!(load_config(&tmp.path().join("absent.toml")).is_err());
    }
}
