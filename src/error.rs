//! Error types for the assistant

use thiserror::Error;

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, Error>;

/// Faults that escape the per-cycle contracts
///
/// Capture failures and lookup failures have their own typed enums
/// ([`crate::transcript::CaptureFailure`], [`crate::services::LookupError`]);
/// anything surfacing as this type is handled by the session's recovery policy.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// External service error
    #[error("service error: {0}")]
    Service(String),

    /// A cycle panicked
    #[error("cycle panicked: {0}")]
    Panic(String),

    /// Restart budget exhausted
    #[error("giving up after {0} consecutive restarts")]
    RestartsExhausted(u32),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
