//! Viewer chat preferences persisted under `chatSettings`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{common::errors::ReplayError, storage::KeyValueStore};

const SETTINGS_KEY: &str = "chatSettings";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatSettings {
    /// Signed seconds added to the stream time chat follows.
    pub user_chat_delay: f64,
    pub show_timestamp: bool,
    pub filter_words: Vec<String>,
}

impl ChatSettings {
    /// True when any whitespace-delimited word of `text` matches a filter
    /// word, ignoring case.
    pub fn is_filtered(&self, text: &str) -> bool {
        if self.filter_words.is_empty() {
            return false;
        }
        text.split_whitespace().any(|word| {
            self.filter_words
                .iter()
                .any(|filter| !filter.is_empty() && word.eq_ignore_ascii_case(filter.trim()))
        })
    }

    /// Adds a filter word unless it is blank or already present.
    pub fn add_filter_word(&mut self, word: &str) -> bool {
        let word = word.trim();
        if word.is_empty() || self.filter_words.iter().any(|w| w == word) {
            return false;
        }
        self.filter_words.push(word.to_string());
        true
    }

    pub fn remove_filter_word(&mut self, word: &str) {
        self.filter_words.retain(|w| w != word);
    }
}

#[derive(Clone)]
pub struct ChatSettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl ChatSettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Stored settings, or defaults when absent, unreadable or corrupt.
    pub fn load(&self) -> ChatSettings {
        match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Failed to parse chat settings: {}", e);
                ChatSettings::default()
            }),
            Ok(None) => ChatSettings::default(),
            Err(e) => {
                warn!("Failed to read chat settings: {}", e);
                ChatSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &ChatSettings) {
        let result = serde_json::to_string(settings)
            .map_err(ReplayError::from)
            .and_then(|raw| self.store.set(SETTINGS_KEY, &raw));
        if let Err(e) = result {
            warn!("Failed to save chat settings: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, tests::BrokenStore};

    #[test]
    fn test_round_trip_and_partial_blobs() {
        let backing = Arc::new(MemoryStore::new());
        let store = ChatSettingsStore::new(backing.clone());
        assert_eq!(store.load(), ChatSettings::default());

        let mut settings = ChatSettings {
            user_chat_delay: -2.5,
            show_timestamp: true,
            ..Default::default()
        };
        assert!(settings.add_filter_word(" spoiler "));
        assert!(!settings.add_filter_word("spoiler"));
        store.save(&settings);
        assert_eq!(store.load(), settings);

        backing
            .set(SETTINGS_KEY, r#"{"filterWords":["x"],"showTimestamp":true}"#)
            .unwrap();
        let loaded = store.load();
        assert_eq!(loaded.filter_words, vec!["x".to_string()]);
        assert_eq!(loaded.user_chat_delay, 0.0);
    }

    #[test]
    fn test_filter_matches_whole_words() {
        let settings = ChatSettings {
            filter_words: vec!["Spoiler".into()],
            ..Default::default()
        };
        assert!(settings.is_filtered("big SPOILER ahead"));
        assert!(!settings.is_filtered("spoilers ahead"));
    }

    #[test]
    fn test_broken_storage_yields_defaults() {
        let store = ChatSettingsStore::new(Arc::new(BrokenStore));
        store.save(&ChatSettings::default());
        assert_eq!(store.load(), ChatSettings::default());
    }
}
