//! Client configuration loaded from environment variables.
//!
//! All settings have defaults suitable for local development.

use std::path::PathBuf;

use wave_shared::constants::MAX_FILE_SIZE;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root directory of the filesystem blob store.
    /// Env: `WAVE_BLOB_ROOT`
    /// Default: `./wave-blobs`
    pub blob_root: PathBuf,

    /// Prefix of file download URLs.
    /// Env: `WAVE_BLOB_BASE_URL`
    /// Default: `file://` followed by the blob root.
    pub blob_base_url: String,

    /// Largest accepted attachment in bytes.
    /// Env: `WAVE_MAX_FILE_SIZE`
    /// Default: 50 MiB
    pub max_file_size: usize,

    /// Tracing filter used when `RUST_LOG` is unset.
    /// Env: `WAVE_LOG_FILTER`
    pub log_filter: Option<String>,
}

fn file_url(root: &std::path::Path) -> String {
    format!("file://{}", root.display())
}

impl Default for ClientConfig {
    fn default() -> Self {
        let blob_root = PathBuf::from("./wave-blobs");
        Self {
            blob_base_url: file_url(&blob_root),
            blob_root,
            max_file_size: MAX_FILE_SIZE,
            log_filter: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(root) = lookup("WAVE_BLOB_ROOT") {
            config.blob_root = PathBuf::from(root);
            config.blob_base_url = file_url(&config.blob_root);
        }

        if let Some(url) = lookup("WAVE_BLOB_BASE_URL") {
            config.blob_base_url = url;
        }

        if let Some(size) = lookup("WAVE_MAX_FILE_SIZE") {
            match size.parse::<usize>() {
                Ok(parsed) if parsed > 0 => config.max_file_size = parsed,
                _ => {
                    tracing::warn!(
                        value = %size,
                        "Invalid WAVE_MAX_FILE_SIZE, using default"
                    );
                }
            }
        }

        if let Some(filter) = lookup("WAVE_LOG_FILTER") {
            config.log_filter = Some(filter).filter(|f| !f.trim().is_empty());
        }

        config
    }
}
