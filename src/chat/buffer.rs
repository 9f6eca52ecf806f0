//! One page of chat plus the reveal cursor into it.

use std::ops::Range;

use crate::api::models::{Comment, CommentPage};

/// Comments are ordered by `content_offset_seconds`. The reveal index only
/// moves forward until the buffer is replaced.
#[derive(Debug, Clone, Default)]
pub struct CommentBuffer {
    comments: Vec<Comment>,
    cursor: Option<String>,
    reveal: usize,
}

impl CommentBuffer {
    pub fn from_page(page: CommentPage) -> Self {
        Self {
            comments: page.comments,
            cursor: page.cursor.filter(|c| !c.is_empty()),
            reveal: 0,
        }
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Token for the page after this one.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn reveal_index(&self) -> usize {
        self.reveal
    }

    pub fn first_offset(&self) -> Option<f64> {
        self.comments.first().map(|c| c.content_offset_seconds)
    }

    pub fn last_offset(&self) -> Option<f64> {
        self.comments.last().map(|c| c.content_offset_seconds)
    }

    /// Whether `t` falls inside `[first, last]`. An empty buffer covers nothing.
    pub fn covers(&self, t: f64) -> bool {
        match (self.first_offset(), self.last_offset()) {
            (Some(first), Some(last)) => first <= t && t <= last,
            _ => false,
        }
    }

    /// Index of the first comment past `t`, scanning from the reveal index;
    /// `len()` when every remaining comment is due.
    pub fn boundary(&self, t: f64) -> usize {
        self.comments[self.reveal..]
            .iter()
            .position(|c| c.content_offset_seconds > t)
            .map(|i| self.reveal + i)
            .unwrap_or(self.comments.len())
    }

    /// Moves the reveal index to the boundary for `t` and returns the range
    /// that just became visible (possibly empty).
    pub fn reveal_until(&mut self, t: f64) -> Range<usize> {
        let start = self.reveal;
        let end = self.boundary(t);
        self.reveal = end;
        start..end
    }

    /// Every buffered comment has been revealed.
    pub fn is_exhausted(&self) -> bool {
        self.reveal >= self.comments.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn comment(id: &str, offset: f64) -> Comment {
        Comment {
            id: id.to_string(),
            content_offset_seconds: offset,
            display_name: format!("user-{id}"),
            user_color: None,
            message: Some(vec![crate::api::models::Fragment {
                text: format!("message {id}"),
                emote: None,
                emoticon: None,
            }]),
            user_badges: None,
        }
    }

    pub(crate) fn page(offsets: &[f64], cursor: Option<&str>) -> CommentPage {
        CommentPage {
            comments: offsets
                .iter()
                .enumerate()
                .map(|(i, o)| comment(&format!("c{o}-{i}"), *o))
                .collect(),
            cursor: cursor.map(str::to_string),
        }
    }

    #[test]
    fn test_reveal_scan() {
        let mut buffer = CommentBuffer::from_page(page(&[5.0, 12.0, 20.0], None));
        assert_eq!(buffer.reveal_until(15.0), 0..2);
        assert_eq!(buffer.reveal_index(), 2);

        assert_eq!(buffer.reveal_until(15.0), 2..2);
        assert_eq!(buffer.reveal_until(20.0), 2..3);
        assert!(buffer.is_exhausted());
    }

    #[test]
    fn test_covers_inclusive_window() {
        let buffer = CommentBuffer::from_page(page(&[5.0, 12.0, 20.0], Some("next")));
        assert!(buffer.covers(5.0));
        assert!(buffer.covers(20.0));
        assert!(!buffer.covers(4.9));
        assert!(!buffer.covers(20.1));
        assert!(!CommentBuffer::default().covers(0.0));
        assert_eq!(buffer.cursor(), Some("next"));
    }
}
