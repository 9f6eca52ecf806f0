//! Bounded list of rendered messages and the auto-scroll latch.

use std::collections::VecDeque;

/// Keeps at most `capacity` entries, dropping the oldest first.
#[derive(Debug, Clone)]
pub struct MessageWindow<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> MessageWindow<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends and evicts. Returns how many old entries were dropped.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) -> usize {
        self.entries.extend(items);
        let overflow = self.entries.len().saturating_sub(self.capacity);
        self.entries.drain(..overflow);
        overflow
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T: Clone> MessageWindow<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

/// Follows new messages while the viewer sits near the bottom.
#[derive(Debug, Clone)]
pub struct AutoScroll {
    threshold: f64,
    following: bool,
}

impl AutoScroll {
    pub fn new(threshold_px: f64) -> Self {
        Self {
            threshold: threshold_px.max(0.0),
            following: true,
        }
    }

    /// Viewport geometry after a scroll event.
    pub fn on_scroll(&mut self, scroll_top: f64, scroll_height: f64, client_height: f64) {
        let distance = (scroll_top + client_height - scroll_height).abs();
        self.following = distance < self.threshold;
    }

    pub fn jump_to_bottom(&mut self) {
        self.following = true;
    }

    /// Whether a window update should scroll to the bottom.
    pub fn is_following(&self) -> bool {
        self.following
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_evicts_oldest_first() {
        let mut window = MessageWindow::new(200);
        assert_eq!(window.extend(0..150), 0);
        assert_eq!(window.extend(150..260), 60);
        assert_eq!(window.len(), 200);
        assert_eq!(window.iter().next(), Some(&60));
        assert_eq!(window.iter().last(), Some(&259));

        assert_eq!(window.extend(260..700), 440);
        assert_eq!(window.len(), 200);
        assert_eq!(window.iter().next(), Some(&500));
    }

    #[test]
    fn test_auto_scroll_latch() {
        let mut scroll = AutoScroll::new(350.0);
        assert!(scroll.is_following());

        scroll.on_scroll(0.0, 2000.0, 500.0);
        assert!(!scroll.is_following());

        scroll.on_scroll(1200.0, 2000.0, 500.0);
        assert!(scroll.is_following());

        scroll.on_scroll(100.0, 2000.0, 500.0);
        scroll.jump_to_bottom();
        assert!(scroll.is_following());
    }
}
