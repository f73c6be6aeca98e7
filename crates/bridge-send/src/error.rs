use thiserror::Error;

/// Result type for send deduplication operations
pub type Result<T> = std::result::Result<T, SendError>;

/// Errors that can occur while recording or querying outgoing sends
#[derive(Error, Debug)]
pub enum SendError {
    /// The message literal could not be parsed for fingerprinting
    #[error("failed to hash message: {message}")]
    Hash { message: String },

    /// The deadline elapsed while waiting for a duplicate send to settle
    #[error("timed out waiting for message to be sent")]
    WaitTimeout,
}

impl SendError {
    /// Create a new hashing error
    pub fn hash(message: impl Into<String>) -> Self {
        Self::Hash {
            message: message.into(),
        }
    }

    /// Check if the error is a wait timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::WaitTimeout)
    }
}
