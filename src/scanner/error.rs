// Scanner error types and camera failure classification

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::LiveStream;

/// Result type for scanner operations
pub type ScanResult<T> = Result<T, ScanError>;

/// Classification of a failed camera attempt.
///
/// The classification decides whether the UI offers a retry action or
/// steers the user toward manual entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// The user or browser refused camera access
    PermissionDenied,
    /// No camera is present on the device
    NoCamera,
    /// The camera is held by another process
    DeviceBusy,
    /// The execution context is not secure enough for camera access
    InsecureContext,
    /// Capture API missing or streaming mode unsupported
    Unsupported,
    /// Anything else
    Unknown,
}

impl ErrorClass {
    /// Whether a manual retry is worth offering for this class.
    ///
    /// `NoCamera` and `InsecureContext` are terminal for the camera path;
    /// retrying cannot change either.
    pub fn retryable(self) -> bool {
        match self {
            ErrorClass::PermissionDenied
            | ErrorClass::DeviceBusy
            | ErrorClass::Unsupported
            | ErrorClass::Unknown => true,
            ErrorClass::NoCamera | ErrorClass::InsecureContext => false,
        }
    }

    /// Ranking used when all candidates fail: the negotiator reports the
    /// most informative captured failure, and a specific condition beats
    /// the generic no-camera or unknown fallbacks.
    pub(crate) fn specificity(self) -> u8 {
        match self {
            ErrorClass::PermissionDenied => 4,
            ErrorClass::DeviceBusy | ErrorClass::InsecureContext => 3,
            ErrorClass::Unsupported => 2,
            ErrorClass::NoCamera => 1,
            ErrorClass::Unknown => 0,
        }
    }
}

/// Error types for the scanning core
#[derive(Debug, Error)]
pub enum ScanError {
    /// Classified camera-layer failure
    #[error("camera error ({class:?}): {message}")]
    Camera { class: ErrorClass, message: String },

    /// Malformed manual barcode entry; purely local, never alters session
    /// state
    #[error("invalid manual entry: {0}")]
    ManualValidation(String),

    /// Operation not valid in the current session state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    /// Create a classified camera error
    pub fn camera(class: ErrorClass, message: impl Into<String>) -> Self {
        Self::Camera {
            class,
            message: message.into(),
        }
    }

    /// Create a manual validation error
    pub fn manual(msg: impl Into<String>) -> Self {
        Self::ManualValidation(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

/// Outcome of a failed attempt to open one camera candidate.
///
/// A failed attempt may still have acquired resources (a half-opened
/// stream); the negotiator releases `partial` before trying the next
/// candidate, so no stream leaks across retries.
pub struct CameraFailure {
    pub class: ErrorClass,
    pub message: String,
    pub partial: Option<Box<dyn LiveStream>>,
}

impl CameraFailure {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            partial: None,
        }
    }

    /// Attach a half-opened stream that must be released before the next
    /// attempt
    pub fn with_partial(mut self, stream: Box<dyn LiveStream>) -> Self {
        self.partial = Some(stream);
        self
    }
}

impl fmt::Debug for CameraFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraFailure")
            .field("class", &self.class)
            .field("message", &self.message)
            .field("partial", &self.partial.is_some())
            .finish()
    }
}

impl fmt::Display for CameraFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.class, self.message)
    }
}

impl From<CameraFailure> for ScanError {
    fn from(failure: CameraFailure) -> Self {
        ScanError::Camera {
            class: failure.class,
            message: failure.message,
        }
    }
}

/// Browser-specific hint for re-enabling a denied camera permission.
///
/// Chrome must be matched before Safari: Chrome user agents also contain
/// the token "safari".
pub fn permission_guidance(user_agent: &str) -> &'static str {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("chrome") {
        "Chrome: Settings > Privacy and security > Site settings > Camera"
    } else if ua.contains("safari") {
        "Safari: Settings > Safari > Camera"
    } else if ua.contains("firefox") {
        "Firefox: Settings > Privacy & Security > Permissions > Camera"
    } else {
        "Browser settings > Permissions > Camera"
    }
}
