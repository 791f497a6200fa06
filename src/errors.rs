use thiserror::Error;

/// Error taxonomy for driver operations.
///
/// Reads whose contract is "`None` on absence" (`get_text`, `get_attribute`)
/// do not surface through this type; everything else does.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("no session for the calling thread; call connect() first")]
    NotInitialized,

    #[error("calling thread already owns a live session")]
    AlreadyInitialized,

    #[error("automation endpoint unreachable: {0}")]
    ConnectionFailed(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("element went stale: {0}")]
    StaleElement(String),

    #[error("operation not supported on this platform: {0}")]
    UnsupportedOperation(&'static str),

    #[error("script execution failed: {0}")]
    Script(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("backend failure: {0}")]
    Backend(String),

    #[error("HTTP client error: {0}")]
    Http(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DriverError>;

impl From<anyhow::Error> for DriverError {
    fn from(err: anyhow::Error) -> Self {
        DriverError::Backend(err.to_string())
    }
}

impl DriverError {
    /// Stable short code, used for listener notifications.
    pub fn code(&self) -> &'static str {
        match self {
            DriverError::NotInitialized => "NOT_INITIALIZED",
            DriverError::AlreadyInitialized => "ALREADY_INITIALIZED",
            DriverError::ConnectionFailed(_) => "CONNECTION_FAILED",
            DriverError::ElementNotFound(_) => "ELEMENT_NOT_FOUND",
            DriverError::StaleElement(_) => "STALE_ELEMENT",
            DriverError::UnsupportedOperation(_) => "UNSUPPORTED_OPERATION",
            DriverError::Script(_) => "SCRIPT_FAILED",
            DriverError::Timeout(_) => "TIMEOUT",
            DriverError::Backend(_) => "BACKEND_FAILURE",
            DriverError::Http(_) => "HTTP",
            DriverError::Serialization(_) => "SERIALIZATION",
            DriverError::Io(_) => "IO",
        }
    }
}
