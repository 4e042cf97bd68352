// JSON wire messages exchanged with the radar server.
use bytes::Bytes;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("frame too large ({len} bytes, limit {limit})")]
    FrameTooLarge { len: usize, limit: usize },
    #[error("failed to serialize message")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to deserialize message")]
    Deserialize(#[source] serde_json::Error),
    #[error("sync value is not an array")]
    SyncValueNotArray,
    #[error("sync entry {index} is not a serialized message")]
    SyncEntryNotText { index: usize },
    #[error("sync entry {index} failed to parse")]
    SyncEntry {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("sync entry {index} has a missing or invalid timestamp")]
    SyncTimestamp { index: usize },
}

/// Operation carried by every frame.
///
/// Operations this client acts on have their own variant. Anything else the
/// server pushes is kept as `Other` and delivered to the channel it names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Op {
    Set,
    Publish,
    Subscribe,
    Unsubscribe,
    Get,
    Sync,
    Ack,
    // Presence notifications pushed by the server to subscribers.
    Online,
    Offline,
    Other(String),
}

impl Op {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Set => "set",
            Self::Publish => "publish",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
            Self::Get => "get",
            Self::Sync => "sync",
            Self::Ack => "ack",
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for Op {
    fn from(name: String) -> Self {
        match name.as_str() {
            "set" => Self::Set,
            "publish" => Self::Publish,
            "subscribe" => Self::Subscribe,
            "unsubscribe" => Self::Unsubscribe,
            "get" => Self::Get,
            "sync" => Self::Sync,
            "ack" => Self::Ack,
            "online" => Self::Online,
            "offline" => Self::Offline,
            _ => Self::Other(name),
        }
    }
}

impl From<Op> for String {
    fn from(op: Op) -> Self {
        match op {
            Op::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Some server builds stringify integers (ack ids, sorted-set scores).
fn unsigned(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

fn lenient_time<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => unsigned(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid time: {value}"))),
    }
}

/// A single protocol message.
///
/// ```
/// use radar_wire::{Message, Op};
///
/// let message = Message::new(Op::Publish, "message:/acct/chat").with_value("hi");
/// let bytes = message.encode().expect("encode");
/// assert_eq!(&bytes[..], br#"{"op":"publish","to":"message:/acct/chat","value":"hi"}"#);
/// let decoded = Message::decode(&bytes).expect("decode");
/// assert_eq!(decoded, message);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub op: Op,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Value>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<u64>,
    // Server-specific fields we do not interpret but must not drop.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn new(op: Op, to: impl Into<String>) -> Self {
        Self {
            to: Some(to.into()),
            ..Self::bare(op)
        }
    }

    // Acks are not addressed to a channel; they only echo the request id.
    pub fn ack(id: u64) -> Self {
        Self {
            value: Some(Value::from(id)),
            ..Self::bare(Op::Ack)
        }
    }

    fn bare(op: Op) -> Self {
        Self {
            op,
            to: None,
            value: None,
            key: None,
            user_type: None,
            ack: None,
            time: None,
            extra: Map::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_key(mut self, key: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_user_type(mut self, user_type: u32) -> Self {
        self.user_type = Some(user_type);
        self
    }

    pub fn with_time(mut self, time: u64) -> Self {
        self.time = Some(time);
        self
    }

    /// Id echoed by an inbound ack, if its value carries one.
    ///
    /// Numeric strings are accepted as well as numbers.
    pub fn acked_id(&self) -> Option<u64> {
        self.value.as_ref().and_then(unsigned)
    }

    pub fn encode(&self) -> Result<Bytes> {
        let payload = serde_json::to_vec(self).map_err(Error::Serialize)?;
        Ok(Bytes::from(payload))
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(Error::Deserialize)
    }

    // Reject oversized payloads before handing them to the JSON parser.
    pub fn decode_with_limit(payload: &[u8], limit: usize) -> Result<Self> {
        if payload.len() > limit {
            return Err(Error::FrameTooLarge {
                len: payload.len(),
                limit,
            });
        }
        Self::decode(payload)
    }
}

/// One historical update carried by a sync frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncEntry {
    pub message: Message,
    pub time: u64,
}

/// Decoded form of a `sync` frame: `value` holds alternating serialized
/// messages and timestamps, `[msg0, t0, msg1, t1, ...]`.
///
/// ```
/// use radar_wire::{Message, Op, SyncBatch};
/// use serde_json::json;
///
/// let frame = Message::new(Op::Sync, "message:/acct/chat")
///     .with_value(json!([r#"{"op":"publish","to":"message:/acct/chat","value":1}"#, 10]))
///     .with_time(10);
/// let batch = SyncBatch::from_message(&frame).expect("decode").expect("batch");
/// assert_eq!(batch.entries.len(), 1);
/// assert_eq!(batch.entries[0].time, 10);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SyncBatch {
    pub channel: String,
    pub time: u64,
    pub entries: Vec<SyncEntry>,
}

impl SyncBatch {
    /// Returns `Ok(None)` when the frame has no channel, history, or time.
    ///
    /// Every entry is decoded before returning, so a single bad entry fails the
    /// whole frame.
    pub fn from_message(frame: &Message) -> Result<Option<Self>> {
        let (Some(channel), Some(value), Some(time)) =
            (frame.to.as_ref(), frame.value.as_ref(), frame.time)
        else {
            return Ok(None);
        };
        let items = value.as_array().ok_or(Error::SyncValueNotArray)?;
        let mut entries = Vec::with_capacity(items.len() / 2);
        for (index, pair) in items.chunks(2).enumerate() {
            let text = pair[0]
                .as_str()
                .ok_or(Error::SyncEntryNotText { index })?;
            let message = serde_json::from_str::<Message>(text)
                .map_err(|source| Error::SyncEntry { index, source })?;
            let time = pair
                .get(1)
                .and_then(unsigned)
                .ok_or(Error::SyncTimestamp { index })?;
            entries.push(SyncEntry { message, time });
        }
        Ok(Some(Self {
            channel: channel.clone(),
            time,
            entries,
        }))
    }

    // Inverse of `from_message`; used by peers and fixtures that produce history.
    pub fn to_message(&self) -> Result<Message> {
        let mut value = Vec::with_capacity(self.entries.len() * 2);
        for entry in &self.entries {
            let text = serde_json::to_string(&entry.message).map_err(Error::Serialize)?;
            value.push(Value::from(text));
            value.push(Value::from(entry.time));
        }
        Ok(Message::new(Op::Sync, self.channel.clone())
            .with_value(Value::Array(value))
            .with_time(self.time))
    }
}
