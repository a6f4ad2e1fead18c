//! Keyword matching that tags visitor messages with intents.

use std::collections::BTreeSet;
use vigil_core::{config::KeywordConfig, message::IntentTag};

/// Maps message text to the set of intents whose keywords it contains.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<(IntentTag, Vec<String>)>,
}

impl KeywordClassifier {
    pub fn new(config: &KeywordConfig) -> Self {
        let lowered = |kws: &[String]| -> Vec<String> {
            kws.iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        };
        Self {
            rules: vec![
                (IntentTag::Deposit, lowered(&config.deposit)),
                (IntentTag::Register, lowered(&config.register)),
                (IntentTag::Reset, lowered(&config.reset)),
            ],
        }
    }

    /// Every tag with at least one keyword contained in `text`.
    pub fn classify(&self, text: &str) -> BTreeSet<IntentTag> {
        if text.trim().is_empty() {
            return BTreeSet::new();
        }
        let msg_lower = text.to_lowercase();
        self.rules
            .iter()
            .filter(|(_, keywords)| kw_match(&msg_lower, keywords))
            .map(|(tag, _)| *tag)
            .collect()
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(&KeywordConfig::default())
    }
}

/// Check if any keyword in the list is contained in the lowercased message.
fn kw_match(msg_lower: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|kw| msg_lower.contains(kw.as_str()))
}
