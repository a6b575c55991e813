use async_trait::async_trait;
use log::{error, info};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("unsupported file type")]
    UnsupportedFileType,
    #[error("file too large")]
    TooLarge,
    #[error("not found")]
    NotFound,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// A file part pulled out of a multipart submission.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Writes `bytes` under `filename`, replacing any file of the same name.
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<(), ImageError>;
    async fn load(&self, filename: &str) -> Result<Vec<u8>, ImageError>;
}

/// Reduces an uploaded name to something safe to join onto the image
/// directory: ASCII only, separators become `_`, no leading dots.
pub fn secure_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

pub fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Image intake: no upload (or an empty filename) means the post has no image.
/// Otherwise the name is sanitized, its extension checked and the bytes stored.
/// Returns the stored filename, not a path.
pub async fn accept(
    store: &dyn ImageStore,
    upload: Option<Upload>,
    max_bytes: usize,
) -> Result<Option<String>, ImageError> {
    let Some(upload) = upload.filter(|u| !u.filename.is_empty()) else {
        return Ok(None);
    };
    let filename = secure_filename(&upload.filename);
    if !allowed_file(&filename) {
        return Err(ImageError::UnsupportedFileType);
    }
    if upload.bytes.len() > max_bytes {
        return Err(ImageError::TooLarge);
    }
    store.save(&filename, &upload.bytes).await?;
    info!("stored image {filename} ({} bytes)", upload.bytes.len());
    Ok(Some(filename))
}

// ---------------- Filesystem implementation ----------------
#[derive(Clone)]
pub struct FsImageStore {
    dir: PathBuf,
}

impl FsImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates the image directory if it is missing.
    pub async fn ensure_dir(&self) -> Result<(), ImageError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }
}

#[async_trait]
impl ImageStore for FsImageStore {
    async fn save(&self, filename: &str, bytes: &[u8]) -> Result<(), ImageError> {
        let target = self.path_for(filename);
        // write beside the target, then rename so readers never see a partial file
        let tmp = self.dir.join(format!(".{filename}.{}.part", hex::encode(rand::random::<[u8; 8]>())));
        if let Err(e) = tokio::fs::write(&tmp, bytes).await {
            error!("image write failed path={} err={e}", tmp.display());
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            error!("image rename failed target={} err={e}", target.display());
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn load(&self, filename: &str) -> Result<Vec<u8>, ImageError> {
        match tokio::fs::read(self.path_for(filename)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ImageError::NotFound),
            Err(e) => Err(e.into()),
        }
    }
}
