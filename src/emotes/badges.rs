//! Memoized badge image resolution.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::api::models::{BadgeSets, BadgeVersion};

#[derive(Debug, Clone, PartialEq)]
pub struct BadgeImageSet {
    pub set_id: String,
    pub version: String,
    pub title: Option<String>,
    pub url_1x: String,
    pub url_2x: String,
    pub url_4x: String,
}

impl BadgeImageSet {
    fn new(set_id: &str, version: &BadgeVersion) -> Self {
        Self {
            set_id: set_id.to_string(),
            version: version.id.clone(),
            title: version.title.clone(),
            url_1x: version.image_url_1x.clone(),
            url_2x: version.image_url_2x.clone(),
            url_4x: version.image_url_4x.clone(),
        }
    }

    pub fn srcset(&self) -> String {
        format!("{} 1x, {} 2x, {} 4x", self.url_1x, self.url_2x, self.url_4x)
    }
}

/// `(set id, version)` to resolved images. Create one per application and
/// share it; entries are never evicted since badge definitions barely change.
/// Two racing resolutions of the same key compute the same value, so the
/// last write winning is harmless.
#[derive(Debug, Default)]
pub struct BadgeCache {
    entries: DashMap<(String, String), Arc<BadgeImageSet>>,
}

impl BadgeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry, else the channel list, then the global list. `None` when
    /// the badge or its version is unknown; nothing is cached in that case.
    pub fn resolve(
        &self,
        set_id: &str,
        version: &str,
        badges: &BadgeSets,
    ) -> Option<Arc<BadgeImageSet>> {
        let key = (set_id.to_string(), version.to_string());
        if let Some(hit) = self.entries.get(&key) {
            return Some(hit.value().clone());
        }

        let badge = badges
            .channel
            .iter()
            .find(|b| b.set_id == set_id)
            .or_else(|| badges.global.iter().find(|b| b.set_id == set_id))?;
        let found = badge.versions.iter().find(|v| v.id == version)?;

        let resolved = Arc::new(BadgeImageSet::new(set_id, found));
        self.entries.insert(key, resolved.clone());
        trace!("cached badge {}/{}", set_id, version);
        Some(resolved)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Badge;

    fn version(id: &str, url: &str) -> BadgeVersion {
        BadgeVersion {
            id: id.to_string(),
            title: None,
            image_url_1x: format!("{url}/1"),
            image_url_2x: format!("{url}/2"),
            image_url_4x: format!("{url}/4"),
        }
    }

    fn sets() -> BadgeSets {
        BadgeSets {
            channel: vec![Badge {
                set_id: "subscriber".into(),
                versions: vec![version("12", "https://cdn/channel-sub")],
            }],
            global: vec![
                Badge {
                    set_id: "subscriber".into(),
                    versions: vec![version("12", "https://cdn/global-sub")],
                },
                Badge {
                    set_id: "moderator".into(),
                    versions: vec![version("1", "https://cdn/mod")],
                },
            ],
        }
    }

    #[test]
    fn test_second_resolution_is_memoized() {
        let cache = BadgeCache::new();
        let first = cache.resolve("subscriber", "12", &sets()).unwrap();
        assert_eq!(first.url_1x, "https://cdn/channel-sub/1");

        let second = cache.resolve("subscriber", "12", &BadgeSets::default()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_falls_back_to_global_and_skips_unknown() {
        let cache = BadgeCache::new();
        let moderator = cache.resolve("moderator", "1", &sets()).unwrap();
        assert_eq!(moderator.srcset(), "https://cdn/mod/1 1x, https://cdn/mod/2 2x, https://cdn/mod/4 4x");

        assert!(cache.resolve("moderator", "2", &sets()).is_none());
        assert!(cache.resolve("vip", "1", &sets()).is_none());
        assert_eq!(cache.len(), 1);
    }
}
