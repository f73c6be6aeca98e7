use thiserror::Error;
use tokio::time::error::Elapsed;

/// Result type for publish operations
pub type Result<T> = std::result::Result<T, PublishError>;

/// Errors that can occur while publishing an event to a subscriber list
#[derive(Error, Debug)]
pub enum PublishError {
    /// A subscriber rejected the event
    #[error("event publish failed on ({subscriber}): {source}")]
    Subscriber {
        /// Name of the failing subscriber
        subscriber: String,
        /// The underlying cause
        #[source]
        source: anyhow::Error,
    },

    /// The publish deadline elapsed before the subscriber settled
    #[error("event publish timed out on ({subscriber})")]
    Timeout {
        /// Name of the subscriber being attempted when the deadline passed
        subscriber: String,
    },
}

impl PublishError {
    /// Create a new subscriber error
    pub fn subscriber(name: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Subscriber {
            subscriber: name.into(),
            source,
        }
    }

    /// Create a new timeout error
    pub fn timeout(name: impl Into<String>) -> Self {
        Self::Timeout {
            subscriber: name.into(),
        }
    }

    /// Name of the subscriber the publish failed on
    pub fn subscriber_name(&self) -> &str {
        match self {
            Self::Subscriber { subscriber, .. } => subscriber,
            Self::Timeout { subscriber } => subscriber,
        }
    }

    /// Check if the publish failed because the deadline elapsed
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    // Deadline exhaustion inside a handler is normalized to the timeout
    // variant so callers can match on one sentinel.
    pub(crate) fn from_handle(name: &str, source: anyhow::Error) -> Self {
        if source.is::<Elapsed>() {
            Self::timeout(name)
        } else {
            Self::subscriber(name, source)
        }
    }
}
