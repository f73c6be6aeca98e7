use std::sync::Arc;

use bridge_core::{AddressEvent, LabelEvent, MessageEvent, RefreshFlag, User};

use crate::list::SubscriberList;
use crate::subscriber::ChanneledSubscriber;

// One concrete list per event kind; callers rely on the event's static type
// rather than boxing every kind into one untyped stream.

/// Subscriber list for address change events
pub type AddressSubscriberList = SubscriberList<Vec<AddressEvent>>;
/// Subscriber list for label change events
pub type LabelSubscriberList = SubscriberList<Vec<LabelEvent>>;
/// Subscriber list for message change events
pub type MessageSubscriberList = SubscriberList<Vec<MessageEvent>>;
/// Subscriber list for full-resync requests
pub type RefreshSubscriberList = SubscriberList<RefreshFlag>;
/// Subscriber list for account snapshots
pub type UserSubscriberList = SubscriberList<User>;
/// Subscriber list for used-space updates
pub type UsedSpaceSubscriberList = SubscriberList<u64>;

/// Channel-backed subscriber for address change events
pub type AddressChanneledSubscriber = ChanneledSubscriber<Vec<AddressEvent>>;
/// Channel-backed subscriber for label change events
pub type LabelChanneledSubscriber = ChanneledSubscriber<Vec<LabelEvent>>;
/// Channel-backed subscriber for message change events
pub type MessageChanneledSubscriber = ChanneledSubscriber<Vec<MessageEvent>>;
/// Channel-backed subscriber for full-resync requests
pub type RefreshChanneledSubscriber = ChanneledSubscriber<RefreshFlag>;
/// Channel-backed subscriber for account snapshots
pub type UserChanneledSubscriber = ChanneledSubscriber<User>;
/// Channel-backed subscriber for used-space updates
pub type UsedSpaceChanneledSubscriber = ChanneledSubscriber<u64>;

/// Create a channel-backed subscriber for address change events
pub fn new_address_subscriber(name: impl Into<String>) -> Arc<AddressChanneledSubscriber> {
    Arc::new(ChanneledSubscriber::new(name))
}

/// Create a channel-backed subscriber for label change events
pub fn new_label_subscriber(name: impl Into<String>) -> Arc<LabelChanneledSubscriber> {
    Arc::new(ChanneledSubscriber::new(name))
}

/// Create a channel-backed subscriber for message change events
pub fn new_message_subscriber(name: impl Into<String>) -> Arc<MessageChanneledSubscriber> {
    Arc::new(ChanneledSubscriber::new(name))
}

/// Create a channel-backed subscriber for full-resync requests
pub fn new_refresh_subscriber(name: impl Into<String>) -> Arc<RefreshChanneledSubscriber> {
    Arc::new(ChanneledSubscriber::new(name))
}

/// Create a channel-backed subscriber for account snapshots
pub fn new_user_subscriber(name: impl Into<String>) -> Arc<UserChanneledSubscriber> {
    Arc::new(ChanneledSubscriber::new(name))
}

/// Create a channel-backed subscriber for used-space updates
pub fn new_used_space_subscriber(name: impl Into<String>) -> Arc<UsedSpaceChanneledSubscriber> {
    Arc::new(ChanneledSubscriber::new(name))
}
