use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PainelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Sqlite,
    Snapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_warehouse")]
    pub warehouse: String,
    #[serde(default = "default_source")]
    pub source: SourceKind,
    #[serde(default = "default_credentials")]
    pub credentials: String,
    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: u64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_source() -> SourceKind {
    SourceKind::Sqlite
}

fn default_cache_ttl_minutes() -> u64 {
    10
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_warehouse() -> String {
    default_data_dir().join("warehouse.db").to_string_lossy().to_string()
}

fn default_credentials() -> String {
    default_data_dir().join("credentials.json").to_string_lossy().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            warehouse: default_warehouse(),
            source: default_source(),
            credentials: default_credentials(),
            cache_ttl_minutes: default_cache_ttl_minutes(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl Settings {
    /// Settings rooted at `data_dir`, with the warehouse and credentials inside it.
    pub fn for_data_dir(data_dir: &str) -> Self {
        let dir = PathBuf::from(data_dir);
        Self {
            data_dir: data_dir.to_string(),
            warehouse: dir.join("warehouse.db").to_string_lossy().to_string(),
            credentials: dir.join("credentials.json").to_string_lossy().to_string(),
            ..Self::default()
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache_ttl_minutes as i64)
    }

    pub fn exports_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("exports")
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("painel")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("painel")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "invalid settings, using defaults"
                );
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| PainelError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            source: SourceKind::Snapshot,
            cache_ttl_minutes: 5,
            ..Settings::for_data_dir("/tmp/painel")
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/painel");
        assert_eq!(loaded.source, SourceKind::Snapshot);
        assert_eq!(loaded.cache_ttl_minutes, 5);
        assert!(loaded.warehouse.ends_with("warehouse.db"));
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.cache_ttl_minutes, 10);
        assert_eq!(s.fetch_timeout_secs, 30);
        assert_eq!(s.source, SourceKind::Sqlite);
        assert!(!s.data_dir.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test", "source": "snapshot"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.source, SourceKind::Snapshot);
        assert_eq!(s.cache_ttl_minutes, 10);
        assert!(s.credentials.ends_with("credentials.json"));
    }

    #[test]
    fn test_for_data_dir_places_files_inside() {
        let s = Settings::for_data_dir("/srv/painel");
        assert_eq!(s.warehouse, "/srv/painel/warehouse.db");
        assert_eq!(s.credentials, "/srv/painel/credentials.json");
        assert_eq!(s.exports_dir(), PathBuf::from("/srv/painel/exports"));
    }
}
