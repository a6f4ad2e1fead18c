use super::testing::{MockAlert, MockChat};
use super::*;
use serde_json::json;
use std::time::Duration;
use vigil_core::config::Config;

fn watchdog_with(config: Config) -> (Arc<Watchdog>, Arc<MockChat>, Arc<MockAlert>) {
    let chat = Arc::new(MockChat::new());
    let alert = Arc::new(MockAlert::new());
    let wd = Arc::new(Watchdog::new(&config, chat.clone(), alert.clone()));
    (wd, chat, alert)
}

fn watchdog() -> (Arc<Watchdog>, Arc<MockChat>, Arc<MockAlert>) {
    watchdog_with(Config::default())
}

fn polling_config(attempts: u32) -> Config {
    let mut config = Config::default();
    config.watchdog.poll_attempts = attempts;
    config.watchdog.poll_interval_secs = 15;
    config
}

fn conv() -> ConversationId {
    ConversationId::new("v1", "c1")
}

fn push(text: &str) -> Value {
    json!({"visitor": {"id": "v1"}, "chat": {"id": "c1"}, "message": {"text": text}})
}

async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

// --- push ingestion ---

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_deposit_push_sends_intent_reply_once() {
    let (wd, chat, alert) = watchdog();
    let outcome = wd.ingest(&push("mau depo"));
    assert_eq!(
        outcome,
        IngestOutcome::Processed {
            conversation: conv(),
            tags: BTreeSet::from([IntentTag::Deposit]),
            armed: 2,
        }
    );

    advance(119).await;
    assert!(chat.sent().is_empty());

    advance(2).await;
    let sent = chat.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, conv());
    assert_eq!(sent[0].1, Config::default().watchdog.deposit_reply);

    advance(300).await;
    assert_eq!(chat.sent().len(), 1);
    assert!(alert.notified().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_plain_message_gets_fallback() {
    let (wd, chat, _) = watchdog();
    wd.ingest(&push("Halo"));

    advance(299).await;
    assert!(chat.sent().is_empty());
    advance(2).await;
    let sent = chat.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, Config::default().watchdog.fallback_reply);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_human_reply_between_deliveries_suppresses_all_sends() {
    let (wd, chat, _) = watchdog();
    let first = wd.ingest(&push("mau top up"));
    let second = wd.ingest(&push("halo?"));
    assert!(matches!(first, IngestOutcome::Processed { armed: 2, .. }));
    assert!(matches!(second, IngestOutcome::Processed { armed: 0, .. }));

    advance(60).await;
    assert!(wd.record_human_reply(&conv()));
    assert!(!wd.record_human_reply(&conv()));

    advance(600).await;
    assert!(chat.sent().is_empty());
    assert!(wd.state(&conv()).unwrap().replied);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_redelivered_event_is_duplicate() {
    let (wd, chat, alert) = watchdog();
    let payload = json!({
        "visitor": {"id": "v1"},
        "chat": {"id": "c1"},
        "message": {"id": "42", "text": "mau daftar"}
    });
    assert!(matches!(wd.ingest(&payload), IngestOutcome::Processed { .. }));
    assert_eq!(wd.ingest(&payload), IngestOutcome::Duplicate);

    advance(1).await;
    assert_eq!(alert.notified().len(), 1);
    advance(300).await;
    assert_eq!(chat.sent().len(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_out_of_order_ids_do_not_realert() {
    let (wd, _, alert) = watchdog();
    let msg = |id: u64| {
        json!({"visitor": {"id": "v1"}, "chat": {"id": "c1"}, "message": {"id": id, "text": "reset akun"}})
    };
    let statuses: Vec<&str> = [3, 1, 5, 2, 3]
        .into_iter()
        .map(|id| wd.ingest(&msg(id)).status())
        .collect();
    assert_eq!(
        statuses,
        vec!["processed", "duplicate", "processed", "duplicate", "duplicate"]
    );
    advance(1).await;
    assert_eq!(alert.notified().len(), 2);
    assert_eq!(
        wd.state(&conv()).unwrap().last_seen_event,
        Some(vigil_core::message::EventId::from("5"))
    );
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_sensitive_message_alerts_and_arms() {
    let (wd, chat, alert) = watchdog();
    let outcome = wd.ingest(&push("Mau daftar, tapi lupa password"));
    assert_eq!(
        outcome,
        IngestOutcome::Processed {
            conversation: conv(),
            tags: BTreeSet::from([IntentTag::Register, IntentTag::Reset]),
            armed: 1,
        }
    );
    advance(1).await;
    let notified = alert.notified();
    assert_eq!(notified.len(), 1);
    assert!(notified[0].contains("[REGISTER, RESET]"));
    assert!(notified[0].contains("visitorId: v1"));

    advance(300).await;
    assert_eq!(chat.sent().len(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_operator_push_records_human_reply() {
    let (wd, chat, _) = watchdog();
    wd.ingest(&push("isi saldo"));
    let operator = json!({
        "visitor": {"id": "v1"},
        "chat": {"id": "c1"},
        "message": {"text": "Siap kak, dibantu", "author": {"type": "operator"}}
    });
    assert_eq!(
        wd.ingest(&operator),
        IngestOutcome::Processed {
            conversation: conv(),
            tags: BTreeSet::new(),
            armed: 0,
        }
    );
    advance(400).await;
    assert!(chat.sent().is_empty());
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_failed_send_is_not_retried() {
    let (wd, chat, _) = watchdog();
    chat.fail_send(true);
    wd.ingest(&push("deposit"));
    advance(1000).await;
    assert_eq!(chat.sent().len(), 1);
    assert!(wd.state(&conv()).unwrap().replied);
}

#[tokio::test]
async fn test_unrecognized_payloads_ignored() {
    let (wd, _, _) = watchdog();
    assert_eq!(wd.ingest(&json!([1, 2, 3])), IngestOutcome::Ignored);
    assert_eq!(wd.ingest(&json!("hello")), IngestOutcome::Ignored);
    assert_eq!(
        wd.ingest(&json!({"visitor": {"id": "v1"}, "message": {"text": "depo"}})),
        IngestOutcome::Ignored
    );
    assert_eq!(wd.conversations(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deliveries_arm_once() {
    let (wd, _, _) = watchdog();
    let handles: Vec<_> = (0..32)
        .map(|_| {
            let wd = wd.clone();
            tokio::spawn(async move {
                match wd.ingest(&push("topup dong")) {
                    IngestOutcome::Processed { armed, .. } => armed,
                    other => panic!("unexpected outcome {other:?}"),
                }
            })
        })
        .collect();
    let mut total = 0;
    for h in handles {
        total += h.await.unwrap();
    }
    assert_eq!(total, 2);
    assert!(wd.state(&conv()).unwrap().actions_armed);
}

// --- indirection polling ---

const EVENTS_PATH: &str = "/api/v1/visitors/v1/chats/c1/events";

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_polling_same_list_alerts_and_arms_once() {
    let (wd, chat, alert) = watchdog_with(polling_config(5));
    chat.set_resource(
        EVENTS_PATH,
        json!([
            {"id": "1", "type": "chat_started"},
            {"id": "2", "type": "visitor_message", "text": "mau register"}
        ]),
    );

    let handle = wd.poll_reference(EVENTS_PATH).expect("poller started");
    assert_eq!(wd.active_polls(), 1);
    let summary = handle.await.unwrap();

    assert_eq!(summary.attempts, 5);
    assert_eq!(summary.visitor_messages, 1);
    assert_eq!(summary.conversation, Some(conv()));
    assert!(!summary.fallback_armed);
    assert_eq!(chat.fetch_calls(), 5);
    assert_eq!(alert.notified().len(), 1);
    assert_eq!(wd.active_polls(), 0);

    advance(300).await;
    assert_eq!(chat.sent().len(), 1);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_webhook_reference_starts_single_poller() {
    let (wd, chat, _) = watchdog_with(polling_config(3));
    chat.set_resource(EVENTS_PATH, json!([]));
    let payload = json!({"resource": EVENTS_PATH});

    assert_eq!(
        wd.ingest(&payload),
        IngestOutcome::Polling {
            reference: EVENTS_PATH.into()
        }
    );
    assert_eq!(
        wd.ingest(&payload),
        IngestOutcome::AlreadyPolling {
            reference: EVENTS_PATH.into()
        }
    );

    advance(31).await;
    assert_eq!(chat.fetch_calls(), 3);
    assert_eq!(wd.active_polls(), 0);
    assert!(matches!(wd.ingest(&payload), IngestOutcome::Polling { .. }));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_silent_conversation_arms_fallback_after_polling() {
    let (wd, chat, _) = watchdog_with(polling_config(4));
    let path = "/api/v1/visitors/v1/chats/current";
    chat.set_resource(path, json!({"id": "c1", "status": "open"}));
    chat.set_events(&conv(), vec![json!({"id": "1", "type": "chat_started"})]);

    let summary = wd.poll_reference(path).unwrap().await.unwrap();
    assert_eq!(summary.visitor_messages, 0);
    assert!(summary.fallback_armed);
    assert_eq!(chat.list_calls(), 4);

    advance(299).await;
    assert!(chat.sent().is_empty());
    advance(2).await;
    let sent = chat.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, Config::default().watchdog.fallback_reply);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_poller_survives_fetch_failures() {
    let (wd, chat, _) = watchdog_with(polling_config(3));
    chat.fail_fetch(true);
    let summary = wd.poll_reference(EVENTS_PATH).unwrap().await.unwrap();
    assert_eq!(summary.attempts, 3);
    assert_eq!(summary.conversation, Some(conv()));
    assert!(summary.fallback_armed);
    assert_eq!(chat.fetch_calls(), 3);

    // Chaport comes back; the visitor still gets exactly one reply.
    chat.fail_fetch(false);
    advance(1000).await;
    let sent = chat.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0], (conv(), Config::default().watchdog.fallback_reply));
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_poller_without_chat_segment_arms_nothing() {
    let (wd, chat, _) = watchdog_with(polling_config(2));
    chat.fail_fetch(true);
    let summary = wd.poll_reference("/api/v1/visitors/v1").unwrap().await.unwrap();
    assert_eq!(summary.conversation, None);
    assert!(!summary.fallback_armed);
    advance(1000).await;
    assert!(chat.sent().is_empty());
    assert_eq!(wd.conversations(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_absolute_reference_is_ignored() {
    let (wd, chat, _) = watchdog_with(polling_config(2));
    let payload = json!({"resource": "http://127.0.0.1:9/api/v1/visitors/v1/chats/c1"});
    assert_eq!(wd.ingest(&payload), IngestOutcome::Ignored);
    advance(100).await;
    assert_eq!(chat.fetch_calls(), 0);
    assert_eq!(wd.active_polls(), 0);
    assert_eq!(wd.conversations(), 0);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_poller_picks_up_late_message() {
    let (wd, chat, _) = watchdog_with(polling_config(4));
    chat.set_resource(EVENTS_PATH, json!([{"id": "1", "type": "chat_started"}]));
    let handle = wd.poll_reference(EVENTS_PATH).unwrap();

    advance(20).await;
    chat.set_resource(
        EVENTS_PATH,
        json!([
            {"id": "1", "type": "chat_started"},
            {"id": "2", "type": "message", "text": "depo 50rb"}
        ]),
    );
    let summary = handle.await.unwrap();
    assert_eq!(summary.visitor_messages, 1);
    assert!(!summary.fallback_armed);

    // Armed at t=30s, deposit reply due at t=150s.
    advance(119).await;
    let sent = chat.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, Config::default().watchdog.deposit_reply);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_poller_operator_reply_silences_timers() {
    let (wd, chat, _) = watchdog_with(polling_config(2));
    chat.set_resource(
        EVENTS_PATH,
        json!([
            {"id": "1", "type": "visitor_message", "text": "halo"},
            {"id": "2", "type": "operator_message", "text": "Halo kak"}
        ]),
    );
    let summary = wd.poll_reference(EVENTS_PATH).unwrap().await.unwrap();
    assert_eq!(summary.visitor_messages, 1);
    advance(600).await;
    assert!(chat.sent().is_empty());
}
