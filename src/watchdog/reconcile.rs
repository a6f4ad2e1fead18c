//! Event reconciliation: raw webhook bodies and fetched chat resources in,
//! deduplicated [`NormalizedEvent`]s out.
//!
//! Two inbound shapes are understood. A *push* payload carries the visitor,
//! chat, and text directly. An *indirection* payload only carries a resource
//! path (`.../visitors/{visitorId}/chats/...`) that has to be fetched through
//! the [`ChatClient`] before anything is known about the message.

use super::ledger::ConversationLedger;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use vigil_core::{
    config::ExtractionConfig,
    error::VigilError,
    message::{Author, ConversationId, EventId, NormalizedEvent},
    payload::{event_list, first_string, is_relative_path, segment_after},
    traits::ChatClient,
};

/// How an inbound payload should be ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundShape {
    Push,
    /// Resource path to resolve.
    Indirection(String),
    Unrecognized,
}

/// Result of reconciling a push payload.
#[derive(Debug, Clone, PartialEq)]
pub enum PushResult {
    Event(NormalizedEvent),
    /// The event id is at or behind the conversation cursor.
    Stale(ConversationId),
    MissingIdentity,
}

/// Result of resolving one indirection reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// `None` when visitor or chat id could not be resolved.
    pub conversation: Option<ConversationId>,
    pub events: Vec<NormalizedEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Visitor,
    Operator,
    Other,
}

pub struct EventReconciler {
    extraction: ExtractionConfig,
    chat: Arc<dyn ChatClient>,
    ledger: Arc<ConversationLedger>,
}

impl EventReconciler {
    pub fn new(
        extraction: ExtractionConfig,
        chat: Arc<dyn ChatClient>,
        ledger: Arc<ConversationLedger>,
    ) -> Self {
        Self {
            extraction,
            chat,
            ledger,
        }
    }

    /// Decide which ingestion path a payload takes.
    ///
    /// Payloads with direct identity are push-shaped even if they also carry
    /// a reference. Anything else with a relative visitor reference is an
    /// indirection; a reference naming its own scheme or host is rejected.
    pub fn shape(&self, payload: &Value) -> InboundShape {
        if !payload.is_object() {
            return InboundShape::Unrecognized;
        }
        if self.push_identity(payload).is_some() {
            return InboundShape::Push;
        }
        match first_string(payload, &self.extraction.reference) {
            Some(reference) if !is_relative_path(&reference) => {
                debug!("reconcile: non-relative reference {reference} rejected");
                InboundShape::Unrecognized
            }
            Some(reference) if segment_after(&reference, "visitors").is_some() => {
                InboundShape::Indirection(reference)
            }
            _ => InboundShape::Push,
        }
    }

    /// Conversation named by the `visitors/{id}` and `chats/{id}` segments of
    /// a reference, without fetching anything.
    pub fn identity_from_reference(&self, reference: &str) -> Option<ConversationId> {
        if !is_relative_path(reference) {
            return None;
        }
        let visitor_id = segment_after(reference, "visitors")?;
        let chat_id = segment_after(reference, "chats")?;
        Some(ConversationId::new(visitor_id, chat_id))
    }

    fn push_identity(&self, payload: &Value) -> Option<ConversationId> {
        let visitor_id = first_string(payload, &self.extraction.visitor_id)?;
        let chat_id = first_string(payload, &self.extraction.chat_id)?;
        Some(ConversationId::new(visitor_id, chat_id))
    }

    /// Normalize a payload that carries its message inline.
    pub fn reconcile_push(&self, payload: &Value) -> PushResult {
        let ex = &self.extraction;
        let Some(conversation) = self.push_identity(payload) else {
            return PushResult::MissingIdentity;
        };

        let event_id = first_string(payload, &ex.event_id).map(EventId::new);
        if let Some(id) = &event_id {
            if !self.ledger.advance_cursor(&conversation, id) {
                debug!("reconcile: {conversation} event {id} already seen");
                return PushResult::Stale(conversation);
            }
        }

        let author = first_string(payload, &ex.author)
            .map(|t| author_from_type(&t))
            .unwrap_or_default();

        PushResult::Event(NormalizedEvent {
            text: first_string(payload, &ex.text).unwrap_or_default(),
            event_id,
            source_timestamp: timestamp_at(payload, &ex.timestamp),
            author,
            conversation,
        })
    }

    /// Fetch a referenced resource and normalize whatever is new in it.
    ///
    /// Fetch failures are returned untouched; the cursor only moves after a
    /// successful scan.
    pub async fn reconcile_reference(&self, reference: &str) -> Result<Resolution, VigilError> {
        if !is_relative_path(reference) {
            return Ok(Resolution::default());
        }
        let Some(visitor_id) = segment_after(reference, "visitors") else {
            return Ok(Resolution::default());
        };

        let resource = self.chat.fetch_resource(reference).await?;
        let ex = &self.extraction;

        let from_resource = first_string(&resource, &ex.resource_chat_id);
        let from_path = segment_after(reference, "chats");
        let chat_id = from_resource.clone().or_else(|| from_path.clone());

        if let Some(events) = event_list(&resource) {
            let Some(chat_id) = chat_id else {
                return Ok(Resolution::default());
            };
            let conversation = ConversationId::new(visitor_id, chat_id);
            let events = self.scan(&conversation, events);
            return Ok(Resolution {
                conversation: Some(conversation),
                events,
            });
        }

        if first_string(&resource, &ex.event_text).is_some() {
            let Some(chat_id) = chat_id else {
                return Ok(Resolution::default());
            };
            let conversation = ConversationId::new(visitor_id, chat_id);
            let events = self.single_message(&conversation, &resource);
            return Ok(Resolution {
                conversation: Some(conversation),
                events,
            });
        }

        // A chat object: its own id is the chat id, the events need listing.
        let Some(chat_id) = from_resource
            .or_else(|| first_string(&resource, &["id"]))
            .or(from_path)
        else {
            return Ok(Resolution::default());
        };
        let conversation = ConversationId::new(visitor_id, chat_id);
        let raw = self.chat.list_events(&conversation).await?;
        let events = self.scan(&conversation, &raw);
        Ok(Resolution {
            conversation: Some(conversation),
            events,
        })
    }

    fn single_message(&self, conversation: &ConversationId, raw: &Value) -> Vec<NormalizedEvent> {
        let ex = &self.extraction;
        let event_id = first_string(raw, &ex.event_key).map(EventId::new);
        if let Some(id) = &event_id {
            if !self.ledger.advance_cursor(conversation, id) {
                return Vec::new();
            }
        }
        let author = match self.event_kind(raw) {
            EventKind::Operator => Author::Operator,
            _ => Author::Visitor,
        };
        vec![NormalizedEvent {
            conversation: conversation.clone(),
            text: first_string(raw, &ex.event_text).unwrap_or_default(),
            event_id,
            source_timestamp: timestamp_at(raw, &ex.event_timestamp),
            author,
        }]
    }

    /// Scan an oldest-first event list newest-first, past the cursor.
    ///
    /// Yields at most one visitor message (the newest) and at most one
    /// operator event, oldest first. If a concurrent scan already moved the
    /// cursor past these events, yields nothing.
    fn scan(&self, conversation: &ConversationId, events: &[Value]) -> Vec<NormalizedEvent> {
        let ex = &self.extraction;
        let cursor = self.ledger.cursor(conversation);

        let mut newest: Option<EventId> = None;
        let mut visitor: Option<(usize, &Value, Option<EventId>)> = None;
        let mut operator: Option<(usize, &Value, Option<EventId>)> = None;

        for (idx, raw) in events.iter().enumerate().rev() {
            let id = first_string(raw, &ex.event_key).map(EventId::new);
            if let (Some(id), Some(seen)) = (&id, &cursor) {
                if id <= seen {
                    continue;
                }
            }
            if let Some(id) = &id {
                if newest.as_ref().is_none_or(|n| id > n) {
                    newest = Some(id.clone());
                }
            }
            let slot = match self.event_kind(raw) {
                EventKind::Visitor => &mut visitor,
                EventKind::Operator => &mut operator,
                EventKind::Other => continue,
            };
            if slot.is_none() {
                *slot = Some((idx, raw, id));
            }
        }

        if let Some(newest) = &newest {
            if !self.ledger.advance_cursor(conversation, newest) {
                debug!("reconcile: {conversation} cursor already at or past {newest}");
                return Vec::new();
            }
        }

        let mut picked: Vec<_> = [(operator, Author::Operator), (visitor, Author::Visitor)]
            .into_iter()
            .filter_map(|(slot, author)| slot.map(|(idx, raw, id)| (idx, raw, id, author)))
            .collect();
        picked.sort_by_key(|(idx, ..)| *idx);

        picked
            .into_iter()
            .map(|(_, raw, event_id, author)| NormalizedEvent {
                conversation: conversation.clone(),
                text: first_string(raw, &ex.event_text).unwrap_or_default(),
                event_id,
                source_timestamp: timestamp_at(raw, &ex.event_timestamp),
                author,
            })
            .collect()
    }

    /// Heuristic: text present, and a type naming an operator or a visitor
    /// message.
    fn event_kind(&self, raw: &Value) -> EventKind {
        if first_string(raw, &self.extraction.event_text).is_none() {
            return EventKind::Other;
        }
        let kind = first_string(raw, &self.extraction.event_type)
            .unwrap_or_default()
            .to_lowercase();
        if kind.contains("operator") || kind.contains("agent") {
            EventKind::Operator
        } else if kind.contains("visitor") || kind.contains("message") {
            EventKind::Visitor
        } else {
            EventKind::Other
        }
    }
}

fn author_from_type(kind: &str) -> Author {
    let kind = kind.to_lowercase();
    if kind.contains("operator") || kind.contains("agent") {
        Author::Operator
    } else {
        Author::Visitor
    }
}

/// RFC 3339 strings, or unix epoch numbers in seconds or milliseconds.
fn timestamp_at<S: AsRef<str>>(value: &Value, paths: &[S]) -> Option<DateTime<Utc>> {
    let raw = first_string(value, paths)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let n: i64 = raw.parse().ok()?;
    if n > 1_000_000_000_000 {
        Utc.timestamp_millis_opt(n).single()
    } else {
        Utc.timestamp_opt(n, 0).single()
    }
}
