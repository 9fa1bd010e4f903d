//! Durable storage for generated try-on images.
//!
//! Files land in a directory served statically under [`UPLOADS_URL_PREFIX`]
//! (see `main.rs`). Writes go to a hidden temp file first and are renamed into
//! place, so a returned URL never points at a partial file.
//!
//! [`UPLOADS_URL_PREFIX`]: crate::config::UPLOADS_URL_PREFIX

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Errors from the artifact store.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to create upload directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write artifact {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Filesystem-backed artifact store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    url_prefix: String,
}

impl ArtifactStore {
    /// Create a store writing into `root` and publishing under `url_prefix`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_owned(),
        }
    }

    /// Directory files are written to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist `bytes` under a fresh unique name and return its public URL.
    ///
    /// The extension is `jpg` for any JPEG mime type and `png` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactError` if the directory cannot be created or the file
    /// cannot be written. No file is left behind on failure.
    #[instrument(skip(self, bytes), fields(bytes = bytes.len()))]
    pub async fn save(&self, bytes: &[u8], mime_type: &str) -> Result<String, ArtifactError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| ArtifactError::CreateDir {
                path: self.root.clone(),
                source,
            })?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension_for(mime_type));
        let final_path = self.root.join(&file_name);
        let temp_path = self.root.join(format!(".{file_name}.tmp"));

        if let Err(source) = write_then_rename(&temp_path, &final_path, bytes).await {
            match fs::remove_file(&temp_path).await {
                Err(cleanup) if cleanup.kind() != io::ErrorKind::NotFound => {
                    warn!(path = %temp_path.display(), error = %cleanup, "Failed to remove temp file");
                }
                _ => {}
            }
            return Err(ArtifactError::Write {
                path: final_path,
                source,
            });
        }

        debug!(path = %final_path.display(), "Stored artifact");
        Ok(format!("{}/{file_name}", self.url_prefix))
    }
}

async fn write_then_rename(temp: &Path, target: &Path, bytes: &[u8]) -> io::Result<()> {
    fs::write(temp, bytes).await?;
    fs::rename(temp, target).await
}

/// File extension for a generated image's mime type.
#[must_use]
pub fn extension_for(mime_type: &str) -> &'static str {
    let lower = mime_type.to_ascii_lowercase();
    if lower.contains("jpeg") || lower.contains("jpg") {
        "jpg"
    } else {
        "png"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/JPG"), "jpg");
        assert_eq!(extension_for("image/pjpeg"), "jpg");
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("image/webp"), "png");
    }

    #[tokio::test]
    async fn test_save_writes_file_and_returns_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("public/uploads");
        let store = ArtifactStore::new(&root, "/uploads/");

        let url = store.save(b"jpeg bytes", "image/jpeg").await.expect("save");

        let name = url.strip_prefix("/uploads/").expect("prefix");
        assert!(name.ends_with(".jpg"));
        assert!(Uuid::parse_str(name.trim_end_matches(".jpg")).is_ok());
        assert_eq!(std::fs::read(root.join(name)).expect("read"), b"jpeg bytes");
    }

    #[tokio::test]
    async fn test_save_generates_unique_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path(), "/uploads");

        let a = store.save(b"a", "image/png").await.expect("save");
        let b = store.save(b"a", "image/png").await.expect("save");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ArtifactStore::new(dir.path(), "/uploads");
        store.save(b"png", "image/png").await.expect("save");

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(!names[0].starts_with('.'));
    }

    #[tokio::test]
    async fn test_unwritable_root_fails_without_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").expect("write");

        let store = ArtifactStore::new(blocker.join("uploads"), "/uploads");
        let err = store.save(b"png", "image/png").await.unwrap_err();
        assert!(matches!(err, ArtifactError::CreateDir { .. }));
    }
}
