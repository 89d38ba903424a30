use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::storage::PREVIEW_NAMESPACE;

/// Where previews are stored and how they are addressed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PreviewConfig {
    /// Root directory for the filesystem blob store.
    pub store_root: PathBuf,
    /// Prefix of the public URLs returned to callers.
    pub public_base_url: String,
    pub namespace: String,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("blob-store"),
            public_base_url: "http://localhost:8080/static".to_string(),
            namespace: PREVIEW_NAMESPACE.to_string(),
        }
    }
}

impl PreviewConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("invalid preview config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let cfg = PreviewConfig::from_toml_str("public_base_url = \"https://cdn.example.com\"")
            .unwrap();
        assert_eq!(cfg.public_base_url, "https://cdn.example.com");
        assert_eq!(cfg.namespace, "previews");
        assert_eq!(cfg.store_root, PathBuf::from("blob-store"));
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(PreviewConfig::from_toml_str("").unwrap(), PreviewConfig::default());
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(PreviewConfig::from_toml_str("namespace = 3").is_err());
    }
}
