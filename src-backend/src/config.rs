//! Configuration
//!
//! Store and board settings, read from a JSON file with environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::{DomainError, DomainResult, Stage};

/// Which record store backs the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Local SQLite file
    Sqlite { path: PathBuf },
    /// Supabase project (PostgREST)
    Supabase {
        url: String,
        anon_key: String,
        #[serde(default = "default_table")]
        table: String,
    },
    /// Process-local store, lost on exit
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite {
            path: PathBuf::from("pipeline.db"),
        }
    }
}

fn default_table() -> String {
    "deals".to_string()
}

/// Board behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Columns, left to right
    pub stages: Vec<Stage>,
    /// Deadline for one move's write sequence
    pub write_timeout_ms: u64,
    /// Toasts kept for display
    pub toast_capacity: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            stages: Stage::defaults(),
            write_timeout_ms: 10_000,
            toast_capacity: 20,
        }
    }
}

impl BoardConfig {
    pub fn write_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.write_timeout_ms)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub board: BoardConfig,
}

impl AppConfig {
    /// Read the config file; a missing file yields the defaults
    pub fn load(path: &Path) -> DomainResult<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| {
                DomainError::Internal(format!("Failed to read {}: {}", path.display(), e))
            })?;
        serde_json::from_str(&content)
            .map_err(|e| {
                DomainError::InvalidInput(format!("Invalid config {}: {}", path.display(), e))
            })
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: &Path) -> DomainResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| {
                DomainError::Internal(format!("Failed to write {}: {}", path.display(), e))
            })
    }

    /// Apply `SUPABASE_URL`/`SUPABASE_ANON_KEY` and `PIPELINE_DB` from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let supabase = (non_empty("SUPABASE_URL"), non_empty("SUPABASE_ANON_KEY"));
        if let (Some(url), Some(anon_key)) = supabase {
            let table = match &self.store {
                StoreConfig::Supabase { table, .. } => table.clone(),
                _ => default_table(),
            };
            self.store = StoreConfig::Supabase { url, anon_key, table };
        } else if let Some(path) = non_empty("PIPELINE_DB") {
            self.store = StoreConfig::Sqlite { path: PathBuf::from(path) };
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.board.write_timeout_ms, 10_000);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"store": {"kind": "supabase", "url": "https://x.supabase.co", "anon_key": "k"},
                "board": {"write_timeout_ms": 500}}"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(
            config.store,
            StoreConfig::Supabase {
                url: "https://x.supabase.co".to_string(),
                anon_key: "k".to_string(),
                table: "deals".to_string(),
            }
        );
        assert_eq!(config.board.write_timeout_ms, 500);
        assert_eq!(config.board.stages, Stage::defaults());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.store = StoreConfig::Memory;
        config.board.stages = vec![Stage::from("todo"), Stage::from("done")];

        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            HashMap::from([
                ("SUPABASE_URL", "https://y.supabase.co"),
                ("SUPABASE_ANON_KEY", "anon"),
            ]);
        let config = AppConfig::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert!(matches!(
            config.store,
            StoreConfig::Supabase { ref url, .. } if url == "https://y.supabase.co"
        ));

        let env: HashMap<&str, &str> = HashMap::from([("PIPELINE_DB", "/tmp/board.db")]);
        let config = AppConfig::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.store, StoreConfig::Sqlite { path: PathBuf::from("/tmp/board.db") });
    }
}
