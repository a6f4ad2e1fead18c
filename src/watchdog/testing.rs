//! Recording test doubles for the outbound clients.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use vigil_core::{
    error::VigilError,
    message::ConversationId,
    traits::{AlertClient, ChatClient, Delivery},
};

/// A chat platform that serves canned resources and records every send.
#[derive(Default)]
pub(crate) struct MockChat {
    sent: Mutex<Vec<(ConversationId, String)>>,
    resources: Mutex<HashMap<String, Value>>,
    events: Mutex<HashMap<ConversationId, Vec<Value>>>,
    fail_fetch: AtomicBool,
    fail_send: AtomicBool,
    dry_run: AtomicBool,
    fetch_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl MockChat {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_resource(&self, path: &str, body: Value) {
        self.resources
            .lock()
            .unwrap()
            .insert(path.to_string(), body);
    }

    pub(crate) fn set_events(&self, conversation: &ConversationId, events: Vec<Value>) {
        self.events
            .lock()
            .unwrap()
            .insert(conversation.clone(), events);
    }

    pub(crate) fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    /// Accept sends without delivering them, like an unconfigured client.
    pub(crate) fn dry_run(&self, dry: bool) {
        self.dry_run.store(dry, Ordering::SeqCst);
    }

    /// Every send attempt, successful or not. Dry runs are not recorded.
    pub(crate) fn sent(&self) -> Vec<(ConversationId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatClient for MockChat {
    fn name(&self) -> &str {
        "mock-chat"
    }

    async fn send_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<Delivery, VigilError> {
        if self.dry_run.load(Ordering::SeqCst) {
            return Ok(Delivery::DryRun);
        }
        self.sent
            .lock()
            .unwrap()
            .push((conversation.clone(), text.to_string()));
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(VigilError::Send("connection reset".into()));
        }
        Ok(Delivery::Sent)
    }

    async fn fetch_resource(&self, path: &str) -> Result<Value, VigilError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(VigilError::Upstream("503 service unavailable".into()));
        }
        self.resources
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| VigilError::Upstream(format!("404 {path}")))
    }

    async fn list_events(&self, conversation: &ConversationId) -> Result<Vec<Value>, VigilError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(VigilError::Upstream("503 service unavailable".into()));
        }
        Ok(self
            .events
            .lock()
            .unwrap()
            .get(conversation)
            .cloned()
            .unwrap_or_default())
    }
}

/// An alert channel that records every notification.
#[derive(Default)]
pub(crate) struct MockAlert {
    notified: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl MockAlert {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        let alert = Self::default();
        alert.fail.store(true, Ordering::SeqCst);
        alert
    }

    pub(crate) fn notified(&self) -> Vec<String> {
        self.notified.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertClient for MockAlert {
    fn name(&self) -> &str {
        "mock-alert"
    }

    async fn notify(&self, text: &str) -> Result<(), VigilError> {
        self.notified.lock().unwrap().push(text.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(VigilError::Send("telegram unreachable".into()));
        }
        Ok(())
    }
}
