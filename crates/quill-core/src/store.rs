//! # Artifact Storage
//!
//! The gate persists payloads through the [`ArtifactStore`] trait.
//! [`DiskStore`] is the filesystem implementation: artifacts land at
//! `{public_root}/uploads/{stored_name}`.
//!
//! ## Write Discipline
//!
//! Payloads are written to a hidden temporary sibling first, flushed, then
//! renamed onto the final name. Temporary names have a short fixed shape
//! (`.quill-{pid}-{seq}.partial`) so any stored name the filesystem
//! accepts can be written. A reader listing the uploads directory sees
//! either nothing or the complete file. A failed write removes its
//! temporary file so no partial artifact is ever left behind.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::naming::StoredName;
use crate::reference::UPLOADS_DIR;

/// Destination for accepted upload payloads.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist `bytes` under `name`. Must not leave a partial artifact on error.
    async fn put(&self, name: &StoredName, bytes: &[u8]) -> io::Result<()>;
}

/// Filesystem-backed artifact store rooted at the public directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    uploads_dir: PathBuf,
    // Shared by clones; distinguishes concurrent temp files.
    temp_seq: Arc<AtomicU64>,
}

impl DiskStore {
    /// Store uploads under `{public_root}/uploads`.
    pub fn new(public_root: impl AsRef<Path>) -> Self {
        Self {
            uploads_dir: public_root.as_ref().join(UPLOADS_DIR),
            temp_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The directory artifacts are written into.
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Final path of an artifact with the given name.
    pub fn path_of(&self, name: &StoredName) -> PathBuf {
        self.uploads_dir.join(name.as_str())
    }

    /// Create the uploads directory (and parents). No-op when present.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.uploads_dir).await
    }

    fn temp_path(&self) -> PathBuf {
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        self.uploads_dir
            .join(format!(".quill-{}-{seq}.partial", std::process::id()))
    }

    async fn write_then_rename(&self, tmp: &Path, dest: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(tmp)
            .await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(tmp, dest).await
    }
}

#[async_trait]
impl ArtifactStore for DiskStore {
    async fn put(&self, name: &StoredName, bytes: &[u8]) -> io::Result<()> {
        self.ensure_dir().await?;

        let dest = self.path_of(name);
        let tmp = self.temp_path();

        match self.write_then_rename(&tmp, &dest, bytes).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                    if cleanup.kind() != io::ErrorKind::NotFound {
                        tracing::warn!(
                            path = %tmp.display(),
                            error = %cleanup,
                            "failed to remove partial upload"
                        );
                    }
                }
                Err(e)
            }
        }
    }
}
