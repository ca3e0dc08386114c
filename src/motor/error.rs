// Error types for the drive core

/// Coarse classification of a [`DriveError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    RequestShape,
    Range,
    Hardware,
}

/// Error types for track control
#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    /// A caller-supplied value is outside its allowed domain
    #[error("Invalid parameter: {0}")]
    Validation(String),

    /// Mutually exclusive request fields were both given, or neither was
    #[error("Malformed request: {0}")]
    RequestShape(String),

    /// A duration derived from distance or angle is out of bounds
    #[error("Out of range: {0}")]
    Range(String),

    /// Failure raised by the PWM backend, passed through untouched
    #[error("PWM hardware error: {0}")]
    Hardware(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl DriveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriveError::Validation(_) => ErrorKind::Validation,
            DriveError::RequestShape(_) => ErrorKind::RequestShape,
            DriveError::Range(_) => ErrorKind::Range,
            DriveError::Hardware(_) => ErrorKind::Hardware,
        }
    }

    pub(crate) fn hardware<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DriveError::Hardware(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, DriveError>;
