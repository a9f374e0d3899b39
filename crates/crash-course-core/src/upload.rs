use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Largest syllabus or question-paper PDF accepted.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("'{0}' is not a PDF file")]
    NotPdf(String),
    #[error("upload requires a non-empty file reference")]
    MissingReference,
    #[error("file is empty")]
    Empty,
    #[error("file is {size} bytes, above the {max} byte limit")]
    TooLarge { size: u64, max: u64 },
    #[error("cannot move upload from {from} to {to}")]
    IllegalTransition {
        from: UploadStatus,
        to: UploadStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Processing => "processing",
            UploadStatus::Completed => "completed",
            UploadStatus::Failed => "failed",
        }
    }

    pub fn can_transition_to(&self, next: UploadStatus) -> bool {
        matches!(
            (self, next),
            (UploadStatus::Pending, UploadStatus::Processing)
                | (UploadStatus::Pending, UploadStatus::Failed)
                | (UploadStatus::Processing, UploadStatus::Completed)
                | (UploadStatus::Processing, UploadStatus::Failed)
                | (UploadStatus::Failed, UploadStatus::Pending)
        )
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked syllabus/PYQ document. The bytes live in external storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upload {
    pub id: Uuid,
    pub file_name: String,
    /// Storage key of the stored object.
    pub file_reference: String,
    pub size_bytes: u64,
    pub status: UploadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Upload {
    pub fn new(
        file_name: impl Into<String>,
        file_reference: impl Into<String>,
        size_bytes: u64,
    ) -> Result<Self, UploadError> {
        let file_name = file_name.into();
        let file_reference = file_reference.into();
        if !file_name.to_ascii_lowercase().ends_with(".pdf") {
            return Err(UploadError::NotPdf(file_name));
        }
        if file_reference.trim().is_empty() {
            return Err(UploadError::MissingReference);
        }
        if size_bytes == 0 {
            return Err(UploadError::Empty);
        }
        if size_bytes > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge {
                size: size_bytes,
                max: MAX_UPLOAD_BYTES,
            });
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            file_name,
            file_reference,
            size_bytes,
            status: UploadStatus::Pending,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the upload through its lifecycle. `reason` is kept only for `failed`.
    pub fn transition(
        &mut self,
        next: UploadStatus,
        reason: Option<String>,
    ) -> Result<(), UploadError> {
        if !self.status.can_transition_to(next) {
            return Err(UploadError::IllegalTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.failure_reason = match next {
            UploadStatus::Failed => reason,
            _ => None,
        };
        self.updated_at = Utc::now();
        Ok(())
    }
}
