//! Bounded polling of an indirection reference.
//!
//! A webhook that only names a resource path gives no message yet. The poller
//! fetches that path a fixed number of times and feeds whatever is new through
//! the watchdog, then stops on its own.

use super::{EventOutcome, Watchdog};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};
use vigil_core::message::ConversationId;

/// What one polling loop observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub attempts: u32,
    /// Last conversation the reference resolved to, else the one its path
    /// names. `None` if neither gives an identity.
    pub conversation: Option<ConversationId>,
    pub visitor_messages: usize,
    /// Whether the loop armed the fallback itself after finding nothing.
    pub fallback_armed: bool,
}

/// References currently being polled.
#[derive(Debug, Default)]
pub(super) struct PollRegistry {
    active: Mutex<HashSet<String>>,
}

impl PollRegistry {
    /// Register a reference. `None` if it is already being polled.
    pub(super) fn claim(self: &Arc<Self>, reference: &str) -> Option<PollGuard> {
        let inserted = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference.to_string());
        inserted.then(|| PollGuard {
            registry: self.clone(),
            reference: reference.to_string(),
        })
    }

    pub(super) fn len(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Removes its reference from the registry when the loop ends.
pub(super) struct PollGuard {
    registry: Arc<PollRegistry>,
    reference: String,
}

impl Drop for PollGuard {
    fn drop(&mut self) {
        self.registry
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.reference);
    }
}

/// Poll `reference` `poll_attempts` times, the first immediately.
pub(super) async fn run(
    watchdog: Arc<Watchdog>,
    reference: String,
    guard: PollGuard,
) -> PollSummary {
    let attempts = watchdog.config.poll_attempts.max(1);
    let interval = watchdog.config.poll_interval();
    let mut summary = PollSummary::default();

    for attempt in 1..=attempts {
        if attempt > 1 {
            tokio::time::sleep(interval).await;
        }
        summary.attempts = attempt;

        let resolution = match watchdog.reconciler.reconcile_reference(&reference).await {
            Ok(r) => r,
            Err(e) => {
                warn!("poller: {reference} attempt {attempt}/{attempts} failed: {e}");
                continue;
            }
        };
        if resolution.conversation.is_some() {
            summary.conversation = resolution.conversation;
        }
        if resolution.events.is_empty() {
            debug!("poller: {reference} attempt {attempt}/{attempts}: nothing new");
            continue;
        }
        for event in resolution.events {
            if let EventOutcome::Visitor { .. } = watchdog.handle_event(event) {
                summary.visitor_messages += 1;
            }
        }
    }

    if summary.conversation.is_none() {
        // Every fetch failed or came back empty: fall back to the ids in the path.
        summary.conversation = watchdog.reconciler.identity_from_reference(&reference);
        if let Some(conversation) = &summary.conversation {
            warn!("poller: {reference} unresolved, using {conversation} from its path");
        }
    }

    if summary.visitor_messages == 0 {
        match &summary.conversation {
            Some(conversation) => {
                let armed = watchdog.scheduler.arm(conversation, &Default::default());
                summary.fallback_armed = !armed.is_empty();
                info!(
                    "poller: no visitor message for {reference} after {attempts} attempts, fallback {}",
                    if summary.fallback_armed { "armed" } else { "already armed" }
                );
            }
            None => warn!("poller: {reference} never resolved to a conversation"),
        }
    }

    drop(guard);
    summary
}
