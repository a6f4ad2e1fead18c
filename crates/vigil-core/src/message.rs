use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identity of one watched conversation: a (visitor, chat) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId {
    pub visitor_id: String,
    pub chat_id: String,
}

impl ConversationId {
    pub fn new(visitor_id: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            visitor_id: visitor_id.into(),
            chat_id: chat_id.into(),
        }
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.visitor_id, self.chat_id)
    }
}

/// Opaque upstream event identifier with a total order.
///
/// Purely numeric ids compare numerically and sort before any non-numeric
/// id; everything else compares lexicographically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum EventKey<'a> {
    Numeric(u64),
    Text(&'a str),
}

impl EventId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn key(&self) -> EventKey<'_> {
        match self.0.parse::<u64>() {
            Ok(n) => EventKey::Numeric(n),
            Err(_) => EventKey::Text(&self.0),
        }
    }
}

impl PartialEq for EventId {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EventId {}

impl PartialOrd for EventId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Intent label derived from message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntentTag {
    Deposit,
    Register,
    Reset,
}

impl IntentTag {
    /// Tags that raise an out-of-band alert.
    pub fn is_sensitive(&self) -> bool {
        matches!(self, Self::Register | Self::Reset)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Register => "REGISTER",
            Self::Reset => "RESET",
        }
    }
}

impl fmt::Display for IntentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who wrote a normalized event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    #[default]
    Visitor,
    /// A human agent; seeing one counts as a reply.
    Operator,
}

/// A reconciled inbound message, independent of how it arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub conversation: ConversationId,
    pub text: String,
    pub event_id: Option<EventId>,
    pub source_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub author: Author,
}

impl NormalizedEvent {
    /// A visitor message with no upstream id or timestamp.
    pub fn visitor(conversation: ConversationId, text: impl Into<String>) -> Self {
        Self {
            conversation,
            text: text.into(),
            event_id: None,
            source_timestamp: None,
            author: Author::Visitor,
        }
    }
}
