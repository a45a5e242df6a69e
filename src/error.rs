use thiserror::Error;

/// Result type alias for DSK operations
pub type Result<T> = std::result::Result<T, DskError>;

/// Errors that can occur when working with CPC disk images
#[derive(Debug, Error)]
pub enum DskError {
    /// I/O error occurred while reading or writing the backing store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or corrupt magic, unknown disk variant, bad skew table
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// CP/M filename does not fit the 8.3 form
    #[error("Invalid filename: {0}")]
    InvalidName(String),

    /// No free directory entry for a new file
    #[error("Directory full: no free directory entry")]
    DirectoryFull,

    /// No free allocation block
    #[error("Disk full: no free allocation block")]
    DiskFull,

    /// Requested file not present on the disk
    #[error("File not found: {0}")]
    NotFound(String),
}

impl DskError {
    /// Create an invalid image error
    pub fn invalid_image<S: Into<String>>(message: S) -> Self {
        DskError::InvalidImage(message.into())
    }

    /// Create an invalid filename error
    pub fn invalid_name<S: Into<String>>(message: S) -> Self {
        DskError::InvalidName(message.into())
    }
}
