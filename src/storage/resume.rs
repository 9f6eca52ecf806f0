//! Per-VOD last-watched positions.

use std::{collections::BTreeMap, sync::Arc};

use tracing::{debug, warn};

use crate::{common::types::VodId, storage::KeyValueStore};

/// Key holding the consolidated `{vod_id: seconds}` map.
const POSITIONS_KEY: &str = "vodPositions";

fn legacy_key(vod_id: &VodId) -> String {
    format!("lastPlayed_{vod_id}")
}

/// Saves, reads and clears resume positions. Never fails: storage errors and
/// corrupt blobs are logged and read as absence.
#[derive(Clone)]
pub struct ResumeStore {
    store: Arc<dyn KeyValueStore>,
}

impl ResumeStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn load(&self) -> BTreeMap<String, f64> {
        let raw = match self.store.get(POSITIONS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return BTreeMap::new(),
            Err(e) => {
                warn!("Failed to read resume positions: {}", e);
                return BTreeMap::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Discarding corrupt resume positions: {}", e);
            BTreeMap::new()
        })
    }

    fn persist(&self, positions: &BTreeMap<String, f64>) {
        let raw = match serde_json::to_string(positions) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to encode resume positions: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(POSITIONS_KEY, &raw) {
            warn!("Failed to write resume positions: {}", e);
        }
    }

    pub fn save(&self, vod_id: &VodId, seconds: f64) {
        if !seconds.is_finite() || seconds < 0.0 {
            return;
        }
        let mut positions = self.load();
        positions.insert(vod_id.to_string(), seconds);
        self.persist(&positions);
        debug!("saved resume position {}s for {}", seconds, vod_id);
    }

    pub fn get(&self, vod_id: &VodId) -> Option<f64> {
        if let Some(seconds) = self.load().get(vod_id.as_str()).copied() {
            return Some(seconds);
        }

        match self.store.get(&legacy_key(vod_id)) {
            Ok(raw) => raw.and_then(|v| v.trim().parse::<f64>().ok()),
            Err(e) => {
                warn!("Failed to read legacy resume position: {}", e);
                None
            }
        }
    }

    pub fn clear(&self, vod_id: &VodId) {
        let mut positions = self.load();
        if positions.remove(vod_id.as_str()).is_some() {
            self.persist(&positions);
        }
        if let Err(e) = self.store.remove(&legacy_key(vod_id)) {
            warn!("Failed to clear legacy resume position: {}", e);
        }
    }
}
