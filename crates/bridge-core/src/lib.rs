//! # Bridge Core
//!
//! This crate provides the foundational types shared by the mail bridge
//! crates. It defines the identifiers assigned by the upstream API and the
//! typed event payloads that flow through the bridge.
//!
//! ## Key Components
//!
//! - **Identifiers**: Opaque upstream-assigned IDs for users, addresses,
//!   labels and messages
//! - **Events**: Typed payloads for address, label, message, refresh and
//!   user changes
//! - **Errors**: Common error types and handling

pub mod error;
pub mod event;
pub mod id;

// Re-export commonly used types
pub use error::{Error, Result};
pub use event::{
    Address, AddressEvent, EventAction, Label, LabelEvent, MessageEvent, MessageSummary,
    RefreshFlag, User,
};
pub use id::{AddressId, LabelId, MessageId, UserId};

/// Common type alias for convenience
pub type Duration = std::time::Duration;
