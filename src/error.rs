//! Error types for the WGAN steganography library

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, StegoGanError>;

/// Coarse classification of failures, used by callers to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Request rejected before any work began
    Validation,
    /// A tenant checkpoint the request depends on does not exist
    NotFound,
    /// An image does not carry a well-formed embedded payload
    Format,
    /// Numeric, I/O or backend failure while doing the work
    Runtime,
}

/// Main error type for the library
#[derive(Error, Debug)]
pub enum StegoGanError {
    /// A tenant identity field was not supplied
    #[error("{0} is required")]
    MissingIdentity(&'static str),

    /// A tenant identity field cannot be used as a directory name
    #[error("Invalid tenant identity: {0}")]
    InvalidIdentity(String),

    /// The upload set was empty
    #[error("No images provided")]
    NoImages,

    /// The upload directory holds no decodable image
    #[error("No usable images found in {0}")]
    EmptyDataset(PathBuf),

    /// A hyperparameter is outside its domain
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Payload does not fit in the carrier image
    #[error("Payload needs {required_bits} bits but the image holds only {capacity_bits}")]
    CapacityExceeded {
        required_bits: usize,
        capacity_bits: usize,
    },

    /// No trained generator for the requested tenant
    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(PathBuf),

    /// The image does not start with the embedding marker
    #[error("No embedded payload found in image")]
    NoEmbeddedPayload,

    /// The marker was found but the frame that follows is damaged
    #[error("Embedded payload is corrupt: {0}")]
    CorruptPayload(String),

    /// Training produced a non-finite loss or otherwise could not continue
    #[error("Training failed: {0}")]
    Training(String),

    /// Tensor backend error
    #[error("Torch error: {0}")]
    Torch(#[from] tch::TchError),

    /// Image decode or encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML write error
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl StegoGanError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StegoGanError::MissingIdentity(_)
            | StegoGanError::InvalidIdentity(_)
            | StegoGanError::NoImages
            | StegoGanError::EmptyDataset(_)
            | StegoGanError::InvalidConfig(_)
            | StegoGanError::CapacityExceeded { .. } => ErrorKind::Validation,
            StegoGanError::CheckpointNotFound(_) => ErrorKind::NotFound,
            StegoGanError::NoEmbeddedPayload | StegoGanError::CorruptPayload(_) => {
                ErrorKind::Format
            }
            StegoGanError::Image(
                image::ImageError::Decoding(_) | image::ImageError::Unsupported(_),
            ) => ErrorKind::Format,
            _ => ErrorKind::Runtime,
        }
    }

    /// Whether the request was rejected before any work began
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(StegoGanError::NoImages.kind(), ErrorKind::Validation);
        assert_eq!(
            StegoGanError::CheckpointNotFound(PathBuf::from("x")).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(StegoGanError::NoEmbeddedPayload.kind(), ErrorKind::Format);

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert_eq!(StegoGanError::from(io).kind(), ErrorKind::Runtime);
    }

    #[test]
    fn test_error_messages() {
        let err = StegoGanError::MissingIdentity("username");
        assert_eq!(err.to_string(), "username is required");

        let err = StegoGanError::CapacityExceeded {
            required_bits: 200,
            capacity_bits: 12,
        };
        assert!(err.to_string().contains("200"));
        assert!(err.is_validation());
    }
}
