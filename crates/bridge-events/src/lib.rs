//! # Bridge Events
//!
//! Typed event fan-out for the mail bridge. Upstream user/account event
//! streams (messages, labels, addresses, refresh flags, account snapshots)
//! are distributed to a dynamic set of subscribers, sequentially or in
//! bounded parallelism, under a per-publish deadline.
//!
//! ## Key Components
//!
//! - **Subscriber**: The contract every event consumer implements
//! - **ChanneledSubscriber**: Adapter turning a pull-style consumer loop
//!   into the push-style subscriber contract
//! - **SubscriberList**: Insertion-ordered registry with sequential and
//!   parallel publish
//! - **PublishError**: Structured failure naming the offending subscriber,
//!   with a distinguished timeout variant
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bridge_events::{new_message_subscriber, MessageSubscriberList};
//! use tokio::time::Duration;
//!
//! let mut list = MessageSubscriberList::new();
//! let subscriber = new_message_subscriber("imap-cache");
//! list.add(subscriber.clone());
//!
//! // Consumer loop.
//! let receiver = subscriber.event_receiver();
//! tokio::spawn(async move {
//!     while let Ok(handoff) = receiver.recv_async().await {
//!         handoff.consume(|events| apply(events));
//!     }
//! });
//!
//! list.publish(events, Duration::from_secs(5)).await?;
//! ```

pub mod error;
pub mod list;
pub mod subscriber;
pub mod types;

// Re-export public API
pub use error::{PublishError, Result};
pub use list::{PanicHandler, SubscriberList};
pub use subscriber::{ChanneledSubscriber, EventHandoff, Subscriber};
pub use types::{
    new_address_subscriber, new_label_subscriber, new_message_subscriber, new_refresh_subscriber,
    new_used_space_subscriber, new_user_subscriber, AddressChanneledSubscriber,
    AddressSubscriberList, LabelChanneledSubscriber, LabelSubscriberList,
    MessageChanneledSubscriber, MessageSubscriberList, RefreshChanneledSubscriber,
    RefreshSubscriberList, UsedSpaceChanneledSubscriber, UsedSpaceSubscriberList,
    UserChanneledSubscriber, UserSubscriberList,
};
