//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "Vigil".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_api_port() -> u16 {
    3000
}

pub fn default_chaport_base_url() -> String {
    "https://app.chaport.com".to_string()
}

pub fn default_telegram_base_url() -> String {
    "https://api.telegram.org".to_string()
}

pub fn default_intent_delay() -> u64 {
    2 * 60
}

pub fn default_fallback_delay() -> u64 {
    5 * 60
}

pub fn default_poll_interval() -> u64 {
    15
}

pub fn default_poll_attempts() -> u32 {
    8
}

pub fn default_deposit_reply() -> String {
    "Siap, untuk deposit silakan kirim nominal dan metode pembayaran ya \u{1f64f}".to_string()
}

pub fn default_fallback_reply() -> String {
    "Maaf ya, chat kamu baru kebaca \u{1f64f} Aku bantu cek sekarang.".to_string()
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn default_deposit_keywords() -> Vec<String> {
    owned(&["deposit", "depo", "top up", "topup", "isi saldo"])
}

pub fn default_register_keywords() -> Vec<String> {
    owned(&["daftar", "register", "buat akun"])
}

pub fn default_reset_keywords() -> Vec<String> {
    owned(&["reset", "lupa password", "forgot password"])
}

pub fn default_visitor_id_paths() -> Vec<String> {
    owned(&[
        "visitor.id",
        "visitorId",
        "data.visitor.id",
        "payload.visitor.id",
    ])
}

pub fn default_chat_id_paths() -> Vec<String> {
    owned(&["chat.id", "chatId", "data.chat.id", "payload.chat.id"])
}

pub fn default_text_paths() -> Vec<String> {
    owned(&[
        "message.text",
        "text",
        "data.message.text",
        "payload.message.text",
        "messages.0.text",
    ])
}

pub fn default_event_id_paths() -> Vec<String> {
    owned(&["message.id", "messageId", "event.id", "data.message.id"])
}

pub fn default_timestamp_paths() -> Vec<String> {
    owned(&[
        "message.createdAt",
        "createdAt",
        "timestamp",
        "data.message.createdAt",
    ])
}

pub fn default_author_paths() -> Vec<String> {
    owned(&[
        "message.author.type",
        "message.senderType",
        "sender.type",
        "author.type",
    ])
}

pub fn default_reference_paths() -> Vec<String> {
    owned(&[
        "resource",
        "path",
        "url",
        "href",
        "data.resource",
        "event.resource",
    ])
}

pub fn default_resource_chat_id_paths() -> Vec<String> {
    owned(&["chat.id", "chatId", "chat_id"])
}

pub fn default_event_type_paths() -> Vec<String> {
    owned(&["type", "event", "kind"])
}

pub fn default_event_text_paths() -> Vec<String> {
    owned(&["text", "message.text", "params.text", "data.text"])
}

pub fn default_event_key_paths() -> Vec<String> {
    owned(&["id", "_id", "eventId"])
}

pub fn default_event_timestamp_paths() -> Vec<String> {
    owned(&["createdAt", "timestamp", "ts"])
}
