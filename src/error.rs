//! Error types for annotation operations.

use thiserror::Error;

use crate::annotator::LabelIndex;

/// Errors that can occur while editing, exporting or importing annotations.
///
/// Every write-path error is raised before any pixel is touched, so a rejected
/// batch leaves the annotation state exactly as it was.
#[derive(Error, Debug)]
pub enum AnnotationError {
    /// Parallel inputs (offsets and object numbers) have different lengths
    #[error("Length mismatch: {offsets} offsets but {values} object numbers")]
    LengthMismatch {
        /// Number of pixel offsets supplied
        offsets: usize,
        /// Number of object numbers supplied
        values: usize,
    },

    /// Identifier does not fit the encoding or exceeds the open object number
    #[error("Invalid identifier {identifier} (limit {limit})")]
    InvalidIdentifier {
        /// The rejected identifier
        identifier: u32,
        /// Largest identifier accepted in this context
        limit: u32,
    },

    /// Pixel offset is misaligned or outside the surface
    #[error("Pixel offset {offset} out of bounds (buffer length {len})")]
    OutOfBounds {
        /// The rejected byte offset
        offset: usize,
        /// Length of the RGBA buffer in bytes
        len: usize,
    },

    /// Label index was never registered
    #[error("Unknown label index {0}")]
    UnknownLabel(LabelIndex),

    /// Artifact or snapshot could not be read. Callers usually treat this as
    /// "no prior annotation".
    #[error("Import failed: {reason}")]
    ImportFailed {
        /// Description of what was missing or corrupt
        reason: String,
    },

    /// Artifact could not be assembled
    #[error("Export failed: {reason}")]
    ExportFailed {
        /// Description of the problem
        reason: String,
    },

    /// Configuration is structurally valid JSON but unusable
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem
        message: String,
    },

    /// Image encoding error while producing an artifact
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnnotationError {
    /// Create an import failure with a message.
    pub fn import_failed(reason: impl Into<String>) -> Self {
        Self::ImportFailed {
            reason: reason.into(),
        }
    }

    /// Create an export failure with a message.
    pub fn export_failed(reason: impl Into<String>) -> Self {
        Self::ExportFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Whether the caller may treat this error as "nothing was imported".
    pub fn is_recoverable_import(&self) -> bool {
        matches!(self, Self::ImportFailed { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AnnotationError>;
