//! Settings for the viewer CLI.
//!
//! Values come from an optional YAML file and are overridden by flags and
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use band_client::ClientConfig;
use serde::Deserialize;
use tracing::{debug, info};

/// Contents of the YAML config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub upload_chunk_kib: Option<usize>,
    pub output_dir: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: FileConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        info!(path = ?path, "Loaded viewer config");
        Ok(config)
    }
}

/// Values given on the command line (or through their env fallbacks).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub output_dir: Option<PathBuf>,
}

/// Effective settings after merging.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    pub output_dir: PathBuf,
}

impl Settings {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Self {
        let mut client = ClientConfig::default();

        if let Some(url) = overrides.api_url.or(file.api_url) {
            client = client.with_base_url(url);
        }
        if let Some(secs) = overrides.request_timeout_secs.or(file.request_timeout_secs) {
            client = client.with_request_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = file.connect_timeout_secs {
            client.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(kib) = file.upload_chunk_kib.filter(|kib| *kib > 0) {
            client = client.with_upload_chunk_size(kib * 1024);
        }

        let output_dir = overrides
            .output_dir
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        debug!(base_url = %client.base_url, output_dir = ?output_dir, "Resolved settings");
        Self { client, output_dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::resolve(FileConfig::default(), Overrides::default());
        assert_eq!(settings.client.base_url, "http://127.0.0.1:8000");
        assert_eq!(settings.client.request_timeout, Duration::from_secs(600));
        assert_eq!(settings.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_file_values_applied() {
        let file: FileConfig = serde_yaml::from_str(
            r#"
api_url: "http://raster-backend:8000"
request_timeout_secs: 120
connect_timeout_secs: 5
upload_chunk_kib: 256
output_dir: "/tmp/bands"
"#,
        )
        .unwrap();

        let settings = Settings::resolve(file, Overrides::default());
        assert_eq!(settings.client.base_url, "http://raster-backend:8000");
        assert_eq!(settings.client.request_timeout, Duration::from_secs(120));
        assert_eq!(settings.client.connect_timeout, Duration::from_secs(5));
        assert_eq!(settings.client.upload_chunk_size, 256 * 1024);
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/bands"));
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig {
            api_url: Some("http://from-file:8000".to_string()),
            request_timeout_secs: Some(10),
            output_dir: Some(PathBuf::from("file-dir")),
            ..Default::default()
        };
        let overrides = Overrides {
            api_url: Some("http://from-flag:8000".to_string()),
            request_timeout_secs: None,
            output_dir: Some(PathBuf::from("flag-dir")),
        };

        let settings = Settings::resolve(file, overrides);
        assert_eq!(settings.client.base_url, "http://from-flag:8000");
        assert_eq!(settings.client.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.output_dir, PathBuf::from("flag-dir"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let parsed: std::result::Result<FileConfig, _> = serde_yaml::from_str("api_ulr: x\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.yaml");
        std::fs::write(&path, "api_url: \"http://disk:1\"\n").unwrap();

        let config = FileConfig::load(&path).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://disk:1"));
        assert!(FileConfig::load(&dir.path().join("missing.yaml")).is_err());
    }
}
