use crate::id::{AddressId, LabelId, MessageId, UserId};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// The kind of change an upstream event describes.
///
/// The upstream API encodes the action as a small integer; the numeric
/// mapping is part of its wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum EventAction {
    /// The object was removed
    Delete,
    /// The object was created
    Create,
    /// The object was modified
    Update,
    /// Only the object's flags were modified
    UpdateFlags,
}

impl EventAction {
    /// Decode an upstream action code
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::Delete),
            1 => Ok(Self::Create),
            2 => Ok(Self::Update),
            3 => Ok(Self::UpdateFlags),
            _ => Err(Error::event(format!("unknown action code {code}"))),
        }
    }

    /// Encode as the upstream action code
    pub fn as_code(self) -> i64 {
        match self {
            Self::Delete => 0,
            Self::Create => 1,
            Self::Update => 2,
            Self::UpdateFlags => 3,
        }
    }

    /// Check whether the action removes the object
    pub fn is_delete(self) -> bool {
        matches!(self, Self::Delete)
    }
}

impl TryFrom<i64> for EventAction {
    type Error = Error;

    fn try_from(code: i64) -> Result<Self> {
        Self::from_code(code)
    }
}

impl From<EventAction> for i64 {
    fn from(action: EventAction) -> Self {
        action.as_code()
    }
}

/// An email address attached to a user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Address {
    /// Upstream address identifier
    #[serde(rename = "ID")]
    pub id: AddressId,
    /// The address itself
    pub email: String,
    /// Name shown alongside the address
    pub display_name: String,
}

/// A change to one of the account's addresses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressEvent {
    /// Identifier of the affected address
    #[serde(rename = "ID")]
    pub id: AddressId,
    /// What happened to the address
    pub action: EventAction,
    /// The address payload; absent when the action is a deletion
    pub address: Option<Address>,
}

impl AddressEvent {
    /// Create a new address event
    pub fn new(id: AddressId, action: EventAction, address: Option<Address>) -> Self {
        Self {
            id,
            action,
            address,
        }
    }
}

/// A label or folder in the account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Label {
    /// Upstream label identifier
    #[serde(rename = "ID")]
    pub id: LabelId,
    /// Display name of the label
    pub name: String,
}

/// A change to one of the account's labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelEvent {
    /// Identifier of the affected label
    #[serde(rename = "ID")]
    pub id: LabelId,
    /// What happened to the label
    pub action: EventAction,
    /// The label payload; absent when the action is a deletion
    pub label: Option<Label>,
}

impl LabelEvent {
    /// Create a new label event
    pub fn new(id: LabelId, action: EventAction, label: Option<Label>) -> Self {
        Self { id, action, label }
    }
}

/// Compact metadata describing a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageSummary {
    /// Upstream message identifier
    #[serde(rename = "ID")]
    pub id: MessageId,
    /// Decoded subject line
    pub subject: String,
    /// Sender address
    pub sender: String,
    /// Whether the message is unread
    pub unread: bool,
}

/// A change to one of the account's messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageEvent {
    /// Identifier of the affected message
    #[serde(rename = "ID")]
    pub id: MessageId,
    /// What happened to the message
    pub action: EventAction,
    /// The message payload; absent when the action is a deletion
    pub message: Option<MessageSummary>,
}

impl MessageEvent {
    /// Create a new message event
    pub fn new(id: MessageId, action: EventAction, message: Option<MessageSummary>) -> Self {
        Self {
            id,
            action,
            message,
        }
    }
}

/// A request from the upstream to resynchronize local state from scratch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshFlag {
    /// Resynchronize mail data only
    Mail,
    /// Resynchronize everything
    All,
}

/// A snapshot of the user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    /// Upstream user identifier
    #[serde(rename = "ID")]
    pub id: UserId,
    /// Name shown in clients
    pub display_name: String,
    /// Primary email address
    pub email: String,
    /// Storage currently in use, in bytes
    pub used_space: u64,
    /// Storage quota, in bytes
    pub max_space: u64,
}

impl User {
    /// Fraction of the storage quota currently in use
    pub fn space_ratio(&self) -> f64 {
        if self.max_space == 0 {
            return 0.0;
        }
        self.used_space as f64 / self.max_space as f64
    }
}
