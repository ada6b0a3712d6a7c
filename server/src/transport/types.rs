//! Transport API Types
//!
//! Request and response bodies of the messaging transport, plus the webhook
//! envelope it posts back to the bridge. Identifiers are carried as strings;
//! the transport may send them as JSON numbers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Events every bridged channel subscribes to.
pub const CHANNEL_EVENTS: [&str; 4] = [
    "message_sent",
    "message_updated",
    "message_deleted",
    "message_read",
];

/// Channel registration sent on activation.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSpec {
    /// Existing channel id when re-activating.
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_opt_id"
    )]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub events: Vec<String>,
}

impl ChannelSpec {
    /// Spec for a channel of `kind` subscribed to [`CHANNEL_EVENTS`].
    pub fn new(kind: &str, existing_id: Option<&str>) -> Self {
        Self {
            id: existing_id.filter(|id| !id.is_empty()).map(str::to_string),
            kind: kind.to_string(),
            events: CHANNEL_EVENTS.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

/// Response to a channel activation.
#[derive(Debug, Deserialize)]
pub struct ActivateResponse {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub activated_at: Option<String>,
}

/// Message body shared by send and update requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportMessage {
    pub external_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

/// Sender identity attached to an inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransportUser {
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// `POST /messages` body.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub message: TransportMessage,
    pub user: TransportUser,
    #[serde(serialize_with = "serialize_id")]
    pub channel: String,
    pub external_chat_id: String,
}

/// `PUT /messages` body.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateMessageRequest {
    pub message: TransportMessage,
    #[serde(serialize_with = "serialize_id")]
    pub channel: String,
}

/// Webhook envelope posted by the transport.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookData,
}

/// Payload of a transport webhook.
#[derive(Debug, Deserialize)]
pub struct WebhookData {
    #[serde(deserialize_with = "string_or_number")]
    pub channel_id: String,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub external_chat_id: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub external_message_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Str(String),
    Int(i64),
    Uint(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Str(s) => s,
            RawId::Int(n) => n.to_string(),
            RawId::Uint(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

/// Numeric ids go out as JSON numbers, anything else as a string.
/// Numeric ids go out as JSON numbers, unless that would change their text (`"007"`).
fn serialize_id<S: Serializer>(id: &str, serializer: S) -> Result<S::Ok, S::Error> {
    match id.parse::<u64>() {
        Ok(n) if n.to_string() == id => serializer.serialize_u64(n),
        _ => serializer.serialize_str(id),
    }
}

#[allow(clippy::ref_option)]
fn serialize_opt_id<S: Serializer>(id: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match id {
        Some(id) => serialize_id(id, serializer),
        None => serializer.serialize_none(),
    }
}
