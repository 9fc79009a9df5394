//! Uploaded study documents: metadata in the database, bytes in
//! [`crate::studyspace::storage`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::studyspace::Studyspace;
use crate::studyspace::error::{Result, StudyspaceError};
use crate::studyspace::storage::Storage;

/// Metadata for one uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub subject: Option<String>,
    /// Name the user uploaded the file under.
    pub file_name: String,
    /// Collision-free name the blob is stored under.
    pub stored_name: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

impl Studyspace {
    /// Stores a document's bytes and records its metadata. If the metadata
    /// insert fails, the already-written blob is removed again.
    pub async fn upload_document(
        &self,
        owner_id: &Uuid,
        subject: Option<&str>,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Document> {
        let file_name = file_name.trim();
        if file_name.is_empty() {
            return Err(StudyspaceError::Validation(
                "file name cannot be empty".to_string(),
            ));
        }
        if bytes.is_empty() {
            return Err(StudyspaceError::Validation(
                "cannot upload an empty file".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let stored_name = Storage::stored_name(file_name);
        self.storage.store(&stored_name, bytes).await?;

        match Document::create(
            &id,
            owner_id,
            subject,
            file_name,
            &stored_name,
            bytes.len() as u64,
            &self.database,
        )
        .await
        {
            Ok(document) => {
                tracing::info!(
                    target: "studyspace::documents",
                    "Stored document {} ({}, {} bytes)",
                    document.id,
                    document.file_name,
                    document.size_bytes,
                );
                Ok(document)
            }
            Err(e) => {
                if let Err(cleanup_err) = self.storage.remove(&stored_name).await {
                    tracing::warn!(
                        target: "studyspace::documents",
                        "Orphaned blob {} after metadata insert failed: {}",
                        stored_name,
                        cleanup_err,
                    );
                }
                Err(e)
            }
        }
    }

    /// The user's documents, newest first.
    pub async fn documents_for_user(&self, owner_id: &Uuid) -> Result<Vec<Document>> {
        Document::for_owner(owner_id, &self.database).await
    }

    /// Reads a document's bytes back.
    pub async fn document_bytes(&self, id: &Uuid) -> Result<Vec<u8>> {
        let document = Document::find_by_id(id, &self.database)
            .await?
            .ok_or(StudyspaceError::DocumentNotFound)?;
        self.storage.load(&document.stored_name).await
    }

    /// Filesystem path of a document's blob, for handing to viewers.
    pub async fn document_path(&self, id: &Uuid) -> Result<PathBuf> {
        let document = Document::find_by_id(id, &self.database)
            .await?
            .ok_or(StudyspaceError::DocumentNotFound)?;
        self.storage.blob_path(&document.stored_name)
    }

    /// Deletes a document's metadata and blob. The blob removal is
    /// idempotent, so a retry after a partial failure converges.
    pub async fn delete_document(&self, id: &Uuid) -> Result<()> {
        let document = Document::find_by_id(id, &self.database)
            .await?
            .ok_or(StudyspaceError::DocumentNotFound)?;

        Document::delete(id, &self.database).await?;
        self.storage.remove(&document.stored_name).await?;

        tracing::info!(
            target: "studyspace::documents",
            "Deleted document {} ({})",
            id,
            document.file_name,
        );
        Ok(())
    }
}
