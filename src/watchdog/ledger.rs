//! In-memory registry of per-conversation reply state.
//!
//! Every transition is monotonic and serialized per conversation: the map
//! lock is held only to find or insert an entry, and the flags themselves are
//! atomics, so conversations never contend with each other.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use vigil_core::message::{ConversationId, EventId};

#[derive(Debug, Default)]
struct Entry {
    replied: AtomicBool,
    armed: AtomicBool,
    cursor: Mutex<Option<EventId>>,
}

impl Entry {
    fn snapshot(&self) -> ConversationState {
        ConversationState {
            replied: self.replied.load(Ordering::Acquire),
            actions_armed: self.armed.load(Ordering::Acquire),
            last_seen_event: self
                .cursor
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

/// Snapshot of one conversation's state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversationState {
    pub replied: bool,
    pub actions_armed: bool,
    pub last_seen_event: Option<EventId>,
}

/// Sole owner and mutator of conversation state.
#[derive(Debug, Default)]
pub struct ConversationLedger {
    entries: RwLock<HashMap<ConversationId, Arc<Entry>>>,
}

impl ConversationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: &ConversationId) -> Arc<Entry> {
        if let Some(entry) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
        {
            return entry.clone();
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.clone())
            .or_default()
            .clone()
    }

    /// Current state, creating a fresh entry on first use.
    pub fn get_or_create(&self, id: &ConversationId) -> ConversationState {
        self.entry(id).snapshot()
    }

    /// Current state of a known conversation. Never inserts.
    pub fn peek(&self, id: &ConversationId) -> Option<ConversationState> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|entry| entry.snapshot())
    }

    /// Claim the conversation's single reply. True only for the first caller.
    pub fn mark_replied(&self, id: &ConversationId) -> bool {
        self.entry(id)
            .replied
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Claim the right to schedule timers. True only for the first caller.
    pub fn try_arm_actions(&self, id: &ConversationId) -> bool {
        self.entry(id)
            .armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Move the cursor forward to `event_id` if it is strictly newer.
    pub fn advance_cursor(&self, id: &ConversationId, event_id: &EventId) -> bool {
        let entry = self.entry(id);
        let mut cursor = entry.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        match cursor.as_ref() {
            Some(seen) if event_id <= seen => false,
            _ => {
                *cursor = Some(event_id.clone());
                true
            }
        }
    }

    pub fn cursor(&self, id: &ConversationId) -> Option<EventId> {
        self.peek(id).and_then(|state| state.last_seen_event)
    }

    pub fn is_replied(&self, id: &ConversationId) -> bool {
        self.peek(id).is_some_and(|state| state.replied)
    }

    /// Number of conversations seen since startup.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
