//! Engagement watchdog: makes sure every visitor message gets a reply.
//!
//! Inbound events are reconciled against the conversation ledger, classified,
//! reported when sensitive, and arm a pair of deferred replies the first time a
//! conversation is seen. A human reply recorded before a timer fires wins the
//! conversation's reply permit and silences it.

mod alerts;
mod keywords;
mod ledger;
mod poller;
mod reconcile;
mod scheduler;
#[cfg(test)]
pub(crate) mod testing;
#[cfg(test)]
mod tests;

pub use keywords::KeywordClassifier;
pub use ledger::ConversationState;
pub use poller::PollSummary;

use alerts::AlertDispatcher;
use ledger::ConversationLedger;
use poller::PollRegistry;
use reconcile::{EventReconciler, InboundShape, PushResult};
use scheduler::DeferredActionScheduler;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use vigil_core::{
    config::{Config, WatchdogConfig},
    message::{Author, ConversationId, IntentTag, NormalizedEvent},
    traits::{AlertClient, ChatClient},
};

/// What became of one inbound webhook payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Processed {
        conversation: ConversationId,
        tags: BTreeSet<IntentTag>,
        /// Timers armed by this payload (zero if already armed).
        armed: usize,
    },
    /// The event id was already seen for this conversation.
    Duplicate,
    /// Not a recognizable chat event, or no conversation identity.
    Ignored,
    Polling { reference: String },
    AlreadyPolling { reference: String },
}

impl IngestOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Processed { .. } => "processed",
            Self::Duplicate => "duplicate",
            Self::Ignored => "ignored",
            Self::Polling { .. } => "polling",
            Self::AlreadyPolling { .. } => "already_polling",
        }
    }
}

/// Result of handling one normalized event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// An operator message. `recorded` is false if a reply already existed.
    HumanReply { recorded: bool },
    Visitor {
        tags: BTreeSet<IntentTag>,
        armed: usize,
    },
}

/// Wires the ledger, reconciler, classifier, alerts and scheduler together.
pub struct Watchdog {
    pub(super) config: WatchdogConfig,
    pub(super) ledger: Arc<ConversationLedger>,
    pub(super) classifier: KeywordClassifier,
    pub(super) reconciler: EventReconciler,
    pub(super) scheduler: DeferredActionScheduler,
    pub(super) alerts: AlertDispatcher,
    pub(super) polls: Arc<PollRegistry>,
    pub(super) uptime: Instant,
}

impl Watchdog {
    pub fn new(config: &Config, chat: Arc<dyn ChatClient>, alert: Arc<dyn AlertClient>) -> Self {
        let ledger = Arc::new(ConversationLedger::new());
        Self {
            config: config.watchdog.clone(),
            classifier: KeywordClassifier::new(&config.keywords),
            reconciler: EventReconciler::new(
                config.extraction.clone(),
                chat.clone(),
                ledger.clone(),
            ),
            scheduler: DeferredActionScheduler::new(
                ledger.clone(),
                chat,
                config.watchdog.clone(),
            ),
            alerts: AlertDispatcher::new(alert),
            polls: Arc::new(PollRegistry::default()),
            uptime: Instant::now(),
            ledger,
        }
    }

    /// Entry point for a raw webhook body.
    pub fn ingest(self: &Arc<Self>, payload: &Value) -> IngestOutcome {
        match self.reconciler.shape(payload) {
            InboundShape::Unrecognized => IngestOutcome::Ignored,
            InboundShape::Indirection(reference) => match self.poll_reference(&reference) {
                Some(_) => IngestOutcome::Polling { reference },
                None => IngestOutcome::AlreadyPolling { reference },
            },
            InboundShape::Push => match self.reconciler.reconcile_push(payload) {
                PushResult::MissingIdentity => {
                    debug!("watchdog: payload without visitor/chat identity ignored");
                    IngestOutcome::Ignored
                }
                PushResult::Stale(_) => IngestOutcome::Duplicate,
                PushResult::Event(event) => {
                    let conversation = event.conversation.clone();
                    let (tags, armed) = match self.handle_event(event) {
                        EventOutcome::Visitor { tags, armed } => (tags, armed),
                        EventOutcome::HumanReply { .. } => (BTreeSet::new(), 0),
                    };
                    IngestOutcome::Processed {
                        conversation,
                        tags,
                        armed,
                    }
                }
            },
        }
    }

    /// Start a bounded polling loop for `reference` unless one is running.
    pub fn poll_reference(self: &Arc<Self>, reference: &str) -> Option<JoinHandle<PollSummary>> {
        let Some(guard) = self.polls.claim(reference) else {
            debug!("watchdog: {reference} already being polled");
            return None;
        };
        info!(
            "watchdog: polling {reference} ({} attempts every {}s)",
            self.config.poll_attempts, self.config.poll_interval_secs
        );
        Some(tokio::spawn(poller::run(
            self.clone(),
            reference.to_string(),
            guard,
        )))
    }

    /// Route one normalized event: operator messages count as a human reply,
    /// visitor messages are classified, reported and arm the timers.
    pub fn handle_event(&self, event: NormalizedEvent) -> EventOutcome {
        match event.author {
            Author::Operator => EventOutcome::HumanReply {
                recorded: self.record_human_reply(&event.conversation),
            },
            Author::Visitor => {
                let tags = self.classifier.classify(&event.text);
                debug!(
                    "watchdog: {} visitor message tagged {tags:?}",
                    event.conversation
                );
                // Alert task is detached.
                let _ = self.alerts.maybe_alert(&event.conversation, &event.text, &tags);
                let armed = self.scheduler.arm(&event.conversation, &tags).len();
                EventOutcome::Visitor { tags, armed }
            }
        }
    }

    /// Mark a conversation as answered by a human. False if it already had a
    /// reply.
    pub fn record_human_reply(&self, conversation: &ConversationId) -> bool {
        let recorded = self.ledger.mark_replied(conversation);
        if recorded {
            info!("watchdog: human reply recorded for {conversation}");
        } else {
            debug!("watchdog: {conversation} already replied");
        }
        recorded
    }

    /// Snapshot of one conversation's state. `None` if it was never seen.
    pub fn state(&self, conversation: &ConversationId) -> Option<ConversationState> {
        self.ledger.peek(conversation)
    }

    /// Number of conversations seen since startup.
    pub fn conversations(&self) -> usize {
        self.ledger.len()
    }

    pub fn active_polls(&self) -> usize {
        self.polls.len()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.uptime.elapsed().as_secs()
    }
}
