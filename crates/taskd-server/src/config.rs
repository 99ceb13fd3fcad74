use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use taskd_store::DEFAULT_COLLECTION;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Snapshot file the store persists to.
    pub data_path: PathBuf,
    /// CSV file read by `POST /tasks/csv`.
    pub csv_path: PathBuf,
    /// Collections created empty when no snapshot exists.
    pub collections: Vec<String>,
    /// Collection the task endpoints operate on.
    pub task_collection: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3333)),
            data_path: PathBuf::from("data/db.json"),
            csv_path: PathBuf::from("file.csv"),
            collections: vec![DEFAULT_COLLECTION.to_owned()],
            task_collection: DEFAULT_COLLECTION.to_owned(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(raw: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.task_collection.trim().is_empty() {
            return Err(ServerError::Config("task_collection must not be empty".into()));
        }
        if let Some(blank) = self.collections.iter().find(|name| name.trim().is_empty()) {
            return Err(ServerError::Config(format!("invalid collection name {blank:?}")));
        }
        Ok(())
    }

    /// Configured collections plus the task collection, without duplicates.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names = self.collections.clone();
        if !names.contains(&self.task_collection) {
            names.push(self.task_collection.clone());
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:3333".parse::<SocketAddr>().unwrap());
        assert_eq!(c.data_path, PathBuf::from("data/db.json"));
        assert_eq!(c.csv_path, PathBuf::from("file.csv"));
        assert_eq!(c.collection_names(), ["tasks"]);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:8080"
            collections = ["notes"]
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(c.task_collection, "tasks");
        assert_eq!(c.collection_names(), ["notes", "tasks"]);
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = ServerConfig::from_toml_str("max_connections = 3").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn blank_task_collection_rejected() {
        let err = ServerConfig::from_toml_str(r#"task_collection = " ""#).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn toml_roundtrip() {
        let c = ServerConfig::default();
        let raw = c.to_toml_string().unwrap();
        assert_eq!(ServerConfig::from_toml_str(&raw).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskd.toml");
        fs::write(&path, "csv_path = \"import/tasks.csv\"\n").unwrap();
        let c = ServerConfig::load(&path).unwrap();
        assert_eq!(c.csv_path, PathBuf::from("import/tasks.csv"));
        assert!(ServerConfig::load(&dir.path().join("absent.toml")).is_err());
    }
}
