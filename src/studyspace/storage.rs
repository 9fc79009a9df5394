//! Local blob storage for uploaded documents.
//!
//! Blobs live under `<data_dir>/documents`, keyed by a generated stored name
//! so two uploads of `notes.pdf` never collide. Metadata lives in the
//! database; this module only moves bytes.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::studyspace::error::{Result, StudyspaceError};

pub(crate) struct Storage {
    root: PathBuf,
}

impl Storage {
    pub(crate) async fn new(data_dir: &Path) -> Result<Self> {
        let root = data_dir.join("documents");
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Derives a collision-free stored name from the original file name.
    pub(crate) fn stored_name(file_name: &str) -> String {
        // Keep the extension so downstream consumers can sniff the type.
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();
        format!("{}{}", Uuid::new_v4(), extension)
    }

    /// Writes a blob under the given stored name.
    pub(crate) async fn store(&self, stored_name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(stored_name)?;
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    /// Reads a blob back.
    pub(crate) async fn load(&self, stored_name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(stored_name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StudyspaceError::DocumentNotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes a blob. Idempotent: a missing blob is not an error, so a
    /// metadata delete can always be retried.
    pub(crate) async fn remove(&self, stored_name: &str) -> Result<()> {
        let path = self.path_for(stored_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Filesystem path of a stored blob.
    pub(crate) fn blob_path(&self, stored_name: &str) -> Result<PathBuf> {
        self.path_for(stored_name)
    }

    fn path_for(&self, stored_name: &str) -> Result<PathBuf> {
        // Stored names are generated by us, but refuse traversal anyway.
        if stored_name.is_empty()
            || stored_name.contains('/')
            || stored_name.contains('\\')
            || stored_name.contains("..")
        {
            return Err(StudyspaceError::Validation(format!(
                "invalid stored name: {stored_name}"
            )));
        }
        Ok(self.root.join(stored_name))
    }
}
