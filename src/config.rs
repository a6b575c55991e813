use std::env;
use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://blogs.db";
pub const DEFAULT_IMAGE_DIR: &str = "static/images";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024; // 10 MB

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub image_dir: PathBuf,
    pub bind_addr: String,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.into(),
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            bind_addr: DEFAULT_BIND_ADDR.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Settings {
    /// Reads configuration from the environment, falling back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(v) => v
                .trim()
                .parse::<usize>()
                .map_err(|e| anyhow::anyhow!("MAX_UPLOAD_BYTES must be a byte count, got '{v}': {e}"))?,
            Err(_) => defaults.max_upload_bytes,
        };
        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            image_dir: env::var("IMAGE_DIR").map(PathBuf::from).unwrap_or(defaults.image_dir),
            bind_addr: env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_upload_bytes,
        })
    }
}
