use thiserror::Error;

/// Library error type for kiosk admin operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The request carried an unusable file name or a disallowed file type.
    /// Storage is never touched when this is returned.
    #[error("{0}")]
    Validation(String),

    /// The named photo does not exist in storage.
    #[error("no photo named \"{0}\"")]
    NotFound(String),

    /// Underlying IO error while saving or removing a photo.
    #[error(transparent)]
    Storage(#[from] std::io::Error),
}
