//! # Bridge Send
//!
//! Send deduplication for the mail bridge. Mail clients retry and sometimes
//! duplicate outgoing submissions; this crate fingerprints each outgoing
//! message body and coordinates at-most-once transmission, letting a late
//! duplicate discover the identifier assigned to the first successful send.
//!
//! ## Key Components
//!
//! - **Hasher**: Content-addressed fingerprinting of structured mail bodies
//! - **Recorder**: Concurrent wait/notify coordination of in-flight sends
//!   with TTL-based eviction
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bridge_send::{SendRecorder, SendRecorderConfig};
//! use tokio::time::{Duration, Instant};
//!
//! let recorder = SendRecorder::new(SendRecorderConfig::default());
//! let deadline = Instant::now() + Duration::from_secs(30);
//!
//! let (fingerprint, inserted) = recorder.try_insert_wait(literal, deadline).await?;
//! if inserted {
//!     // We own this send: transmit, then record the outcome.
//!     match smtp_send(literal).await {
//!         Ok(id) => recorder.add_message_id(&fingerprint, id).await,
//!         Err(_) => recorder.remove_on_fail(&fingerprint).await,
//!     }
//! }
//! ```

pub mod error;
pub mod hasher;
pub mod recorder;

// Re-export public API
pub use error::{Result, SendError};
pub use hasher::{message_fingerprint, MessageFingerprint};
pub use recorder::{SendRecorder, SendRecorderConfig, DEFAULT_ENTRY_TTL};
