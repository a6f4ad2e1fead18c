//! Deferred auto-replies.
//!
//! The first visitor message of a conversation arms up to two timers: an
//! intent-specific reply (deposit questions) and an unconditional fallback.
//! Whichever fires first claims the conversation's single reply through
//! [`ConversationLedger::mark_replied`]; every later timer is a no-op. A human
//! reply recorded in between also wins that claim, so nothing is sent.

use super::ledger::ConversationLedger;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use vigil_core::{
    config::WatchdogConfig,
    message::{ConversationId, IntentTag},
    traits::{ChatClient, Delivery},
};

/// Why a timer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Intent(IntentTag),
    Fallback,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Intent(tag) => write!(f, "intent:{tag}"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// One scheduled reply. Refers to its conversation by id only.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredAction {
    pub id: Uuid,
    pub conversation: ConversationId,
    pub kind: ActionKind,
    pub delay: Duration,
    pub payload: String,
    pub armed_at: DateTime<Utc>,
}

/// What a timer did when it expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Sent,
    /// The reply was claimed but the client only logged it.
    DryRun,
    /// The conversation already had its reply.
    Suppressed,
    /// The reply was claimed but delivery failed. Not retried.
    SendFailed,
}

/// An armed timer and its task. Dropping the handle detaches the task.
pub struct ArmedAction {
    pub action: DeferredAction,
    pub handle: JoinHandle<FireOutcome>,
}

pub struct DeferredActionScheduler {
    ledger: Arc<ConversationLedger>,
    chat: Arc<dyn ChatClient>,
    config: WatchdogConfig,
}

impl DeferredActionScheduler {
    pub fn new(
        ledger: Arc<ConversationLedger>,
        chat: Arc<dyn ChatClient>,
        config: WatchdogConfig,
    ) -> Self {
        Self {
            ledger,
            chat,
            config,
        }
    }

    /// Timers a message with these tags calls for, without arming anything.
    pub fn plan(
        &self,
        conversation: &ConversationId,
        tags: &BTreeSet<IntentTag>,
    ) -> Vec<DeferredAction> {
        let armed_at = Utc::now();
        let action = |kind, delay, payload: &str| DeferredAction {
            id: Uuid::new_v4(),
            conversation: conversation.clone(),
            kind,
            delay,
            payload: payload.to_string(),
            armed_at,
        };

        let mut actions = Vec::with_capacity(2);
        if tags.contains(&IntentTag::Deposit) {
            actions.push(action(
                ActionKind::Intent(IntentTag::Deposit),
                self.config.intent_delay(),
                &self.config.deposit_reply,
            ));
        }
        actions.push(action(
            ActionKind::Fallback,
            self.config.fallback_delay(),
            &self.config.fallback_reply,
        ));
        actions
    }

    /// Arm the conversation's timers if nobody has yet.
    ///
    /// Returns an empty list when the conversation was already armed.
    pub fn arm(
        &self,
        conversation: &ConversationId,
        tags: &BTreeSet<IntentTag>,
    ) -> Vec<ArmedAction> {
        if !self.ledger.try_arm_actions(conversation) {
            debug!("scheduler: {conversation} already armed");
            return Vec::new();
        }

        let armed: Vec<ArmedAction> = self
            .plan(conversation, tags)
            .into_iter()
            .map(|action| {
                let handle = tokio::spawn(fire(
                    self.ledger.clone(),
                    self.chat.clone(),
                    action.clone(),
                ));
                ArmedAction { action, handle }
            })
            .collect();

        info!(
            "scheduler: armed {} for {conversation}",
            armed
                .iter()
                .map(|a| format!("{} in {}s", a.action.kind, a.action.delay.as_secs()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        armed
    }
}

/// Timer body: wait, claim the reply, then send. The claim happens before the
/// send so a failed delivery is never retried into a duplicate.
async fn fire(
    ledger: Arc<ConversationLedger>,
    chat: Arc<dyn ChatClient>,
    action: DeferredAction,
) -> FireOutcome {
    tokio::time::sleep(action.delay).await;

    if !ledger.mark_replied(&action.conversation) {
        debug!(
            "scheduler: {} timer for {} suppressed (already replied)",
            action.kind, action.conversation
        );
        return FireOutcome::Suppressed;
    }

    match chat
        .send_message(&action.conversation, &action.payload)
        .await
    {
        Ok(Delivery::Sent) => {
            info!(
                "scheduler: {} reply {} sent to {} via {} (armed {})",
                action.kind,
                action.id,
                action.conversation,
                chat.name(),
                action.armed_at.format("%H:%M:%S")
            );
            FireOutcome::Sent
        }
        Ok(Delivery::DryRun) => {
            warn!(
                "scheduler: {} reply {} to {} not delivered, {} is in dry-run mode",
                action.kind,
                action.id,
                action.conversation,
                chat.name()
            );
            FireOutcome::DryRun
        }
        Err(e) => {
            error!(
                "scheduler: {} reply to {} failed, not retrying: {e}",
                action.kind, action.conversation
            );
            FireOutcome::SendFailed
        }
    }
}
