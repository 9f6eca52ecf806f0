//! Chat replay state machine. Synchronous and clock-free: the replayer feeds
//! it stream times and fetch results, it answers with what to fetch next.

use tracing::{debug, trace};

use crate::{
    api::{CommentRequest, models::CommentPage},
    chat::{
        buffer::CommentBuffer,
        render::{MessageRenderer, RenderedMessage},
        window::{AutoScroll, MessageWindow},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    FetchingInitial,
    Streaming,
    Paused,
    Closed,
}

/// Identity of one issued fetch. A result is applied only while its tag is
/// still the one the engine waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTag {
    /// Bumped whenever the buffer is discarded.
    pub epoch: u64,
    pub seq: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub tag: FetchTag,
    pub request: CommentRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Applied,
    /// Issued for an abandoned position or after close; dropped untouched.
    Stale,
    /// The fetch failed; retried on the next natural cycle.
    Failed,
}

#[derive(Debug, Default, PartialEq)]
pub struct Advance {
    /// Comments passed by the reveal cursor, rendered or not.
    pub revealed: usize,
    /// Messages appended to the window.
    pub rendered: usize,
    pub fetch: Option<FetchTicket>,
}

/// Snapshot handed to the view.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatView {
    pub state: ChatState,
    pub messages: Vec<RenderedMessage>,
    /// Increments whenever `messages` changes.
    pub revision: u64,
    /// Whether the view should scroll to the bottom after this update.
    pub follow: bool,
}

pub struct ChatEngine {
    state: ChatState,
    buffer: CommentBuffer,
    window: MessageWindow<RenderedMessage>,
    scroll: AutoScroll,
    epoch: u64,
    seq: u64,
    in_flight: Option<FetchTag>,
    /// Set when a fetch failed; cleared by the next seek check.
    stalled: bool,
    revision: u64,
}

impl ChatEngine {
    pub fn new(max_messages: usize, scroll_threshold_px: f64) -> Self {
        Self {
            state: ChatState::Idle,
            buffer: CommentBuffer::default(),
            window: MessageWindow::new(max_messages),
            scroll: AutoScroll::new(scroll_threshold_px),
            epoch: 0,
            seq: 0,
            in_flight: None,
            stalled: false,
            revision: 0,
        }
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn buffer(&self) -> &CommentBuffer {
        &self.buffer
    }

    pub fn reveal_index(&self) -> usize {
        self.buffer.reveal_index()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn in_flight(&self) -> Option<FetchTag> {
        self.in_flight
    }

    pub fn messages(&self) -> impl Iterator<Item = &RenderedMessage> {
        self.window.iter()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether `t` needs no refetch.
    pub fn covers(&self, t: f64) -> bool {
        self.buffer.covers(t)
    }

    fn issue(&mut self, request: CommentRequest) -> FetchTicket {
        self.seq += 1;
        let tag = FetchTag {
            epoch: self.epoch,
            seq: self.seq,
        };
        self.in_flight = Some(tag);
        debug!("issuing comment fetch {:?} ({:?})", request, tag);
        FetchTicket { tag, request }
    }

    fn anchor(t: f64) -> CommentRequest {
        let offset = if t.is_finite() { t.max(0.0).floor() as u64 } else { 0 };
        CommentRequest::AtOffset(offset)
    }

    /// Drops the buffer and window. Any fetch still in flight becomes stale.
    pub fn abandon(&mut self) {
        if self.state == ChatState::Closed {
            return;
        }
        self.epoch += 1;
        self.in_flight = None;
        self.stalled = false;
        self.buffer = CommentBuffer::default();
        if !self.window.is_empty() {
            self.window.clear();
            self.revision += 1;
        }
        self.state = ChatState::FetchingInitial;
    }

    /// Seek detection. Inside the buffered window the engine just streams;
    /// outside it the buffer and window are discarded and a fetch anchored at
    /// `t` is returned.
    pub fn seek_check(&mut self, t: f64) -> Option<FetchTicket> {
        if self.state == ChatState::Closed {
            return None;
        }

        if self.buffer.covers(t) {
            self.state = ChatState::Streaming;
            self.stalled = false;
            return None;
        }

        self.abandon();
        debug!("seek to {}s left the buffered window, refetching", t);
        Some(self.issue(Self::anchor(t)))
    }

    /// Reveals every comment due at `t`. A no-op outside `Streaming` and on
    /// an empty buffer, which only the next seek check refills.
    pub fn advance(&mut self, t: f64, renderer: &MessageRenderer) -> Advance {
        let mut out = Advance::default();
        if self.state != ChatState::Streaming || self.buffer.is_empty() {
            return out;
        }

        let range = self.buffer.reveal_until(t);
        out.revealed = range.len();
        if !range.is_empty() {
            let rendered: Vec<RenderedMessage> = self.buffer.comments()[range]
                .iter()
                .filter_map(|c| renderer.render(c))
                .collect();
            out.rendered = rendered.len();
            if !rendered.is_empty() {
                let evicted = self.window.extend(rendered);
                self.revision += 1;
                trace!("revealed {} messages, evicted {}", out.rendered, evicted);
            }
        }

        if self.buffer.is_exhausted() && self.in_flight.is_none() && !self.stalled {
            if let Some(cursor) = self.buffer.cursor().map(str::to_string) {
                out.fetch = Some(self.issue(CommentRequest::AfterCursor(cursor)));
            }
        }

        out
    }

    /// Applies a fetch result. A successful page replaces the buffer and
    /// restarts its reveal sequence at 0.
    pub fn apply_page(&mut self, tag: FetchTag, page: Option<CommentPage>) -> PageOutcome {
        if self.state == ChatState::Closed || self.in_flight != Some(tag) {
            debug!("discarding stale comment page {:?}", tag);
            return PageOutcome::Stale;
        }
        self.in_flight = None;

        let Some(page) = page else {
            self.stalled = true;
            if self.state == ChatState::FetchingInitial {
                self.state = ChatState::Streaming;
            }
            return PageOutcome::Failed;
        };

        self.buffer = CommentBuffer::from_page(page);
        debug!(
            "comment buffer replaced with {} entries ({:?}..{:?})",
            self.buffer.len(),
            self.buffer.first_offset(),
            self.buffer.last_offset()
        );
        if self.state == ChatState::FetchingInitial {
            self.state = ChatState::Streaming;
        }
        PageOutcome::Applied
    }

    /// Suspends streaming; the buffer is retained.
    pub fn pause(&mut self) {
        if self.state == ChatState::Streaming {
            self.state = ChatState::Paused;
        }
    }

    /// Terminal. Later results are ignored.
    pub fn close(&mut self) {
        self.state = ChatState::Closed;
        self.in_flight = None;
        self.epoch += 1;
    }

    pub fn on_scroll(&mut self, scroll_top: f64, scroll_height: f64, client_height: f64) {
        self.scroll.on_scroll(scroll_top, scroll_height, client_height);
    }

    pub fn jump_to_bottom(&mut self) {
        self.scroll.jump_to_bottom();
    }

    pub fn view(&self) -> ChatView {
        ChatView {
            state: self.state,
            messages: self.window.to_vec(),
            revision: self.revision,
            follow: self.scroll.is_following(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chat::buffer::tests::page,
        configs::EmotesConfig,
        emotes::{BadgeCache, EmoteCdn},
        storage::ChatSettings,
    };
    use std::sync::Arc;

    fn renderer() -> MessageRenderer {
        let config = EmotesConfig::default();
        MessageRenderer::new(EmoteCdn::new(&config), &config.twemoji_base, Arc::new(BadgeCache::new()))
    }

    fn streaming(offsets: &[f64], cursor: Option<&str>) -> ChatEngine {
        let mut engine = ChatEngine::new(200, 350.0);
        let ticket = engine.seek_check(offsets.first().copied().unwrap_or(0.0)).unwrap();
        assert_eq!(
            engine.apply_page(ticket.tag, Some(page(offsets, cursor))),
            PageOutcome::Applied
        );
        engine
    }

    #[test]
    fn test_advance_reveals_up_to_boundary() {
        let r = renderer();
        let mut engine = streaming(&[5.0, 12.0, 20.0], Some("next"));
        assert_eq!(engine.state(), ChatState::Streaming);

        let step = engine.advance(15.0, &r);
        assert_eq!(step.revealed, 2);
        assert_eq!(engine.reveal_index(), 2);
        let offsets: Vec<f64> = engine.messages().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![5.0, 12.0]);
        assert!(step.fetch.is_none());
    }

    #[test]
    fn test_advance_is_idempotent() {
        let r = renderer();
        let mut engine = streaming(&[5.0, 12.0, 20.0], None);
        engine.advance(15.0, &r);
        let before = engine.view();

        let again = engine.advance(15.0, &r);
        assert_eq!(again, Advance::default());
        assert_eq!(engine.reveal_index(), 2);
        assert_eq!(engine.view(), before);
    }

    #[test]
    fn test_exhausted_buffer_paginates_and_replaces() {
        let r = renderer();
        let mut engine = streaming(&[5.0, 12.0], Some("cur"));

        let step = engine.advance(30.0, &r);
        let ticket = step.fetch.expect("cursor fetch");
        assert_eq!(ticket.request, CommentRequest::AfterCursor("cur".into()));
        assert!(engine.advance(31.0, &r).fetch.is_none());

        assert_eq!(
            engine.apply_page(ticket.tag, Some(page(&[32.0, 40.0], None))),
            PageOutcome::Applied
        );
        assert_eq!(engine.reveal_index(), 0);
        assert_eq!(engine.buffer().first_offset(), Some(32.0));

        engine.advance(35.0, &r);
        assert_eq!(engine.messages().count(), 3);
    }

    #[test]
    fn test_seek_outside_window_resets_once() {
        let r = renderer();
        let mut engine = streaming(&[5.0, 12.0, 20.0], None);
        engine.advance(15.0, &r);
        let epoch = engine.epoch();

        assert!(engine.seek_check(10.0).is_none());
        assert_eq!(engine.reveal_index(), 2);

        let ticket = engine.seek_check(500.9).expect("refetch");
        assert_eq!(ticket.request, CommentRequest::AtOffset(500));
        assert_eq!(engine.epoch(), epoch + 1);
        assert_eq!(engine.reveal_index(), 0);
        assert!(engine.buffer().is_empty());
        assert_eq!(engine.messages().count(), 0);
        assert_eq!(engine.state(), ChatState::FetchingInitial);

        assert_eq!(engine.advance(501.0, &r), Advance::default());

        engine.apply_page(ticket.tag, Some(page(&[500.0, 502.0], None)));
        assert_eq!(engine.reveal_index(), 0);
        assert_eq!(engine.advance(501.0, &r).revealed, 1);
    }

    #[test]
    fn test_stale_results_are_discarded() {
        let mut engine = ChatEngine::new(200, 350.0);
        let first = engine.seek_check(100.0).unwrap();
        let second = engine.seek_check(900.0).unwrap();
        assert_ne!(first.tag, second.tag);

        assert_eq!(
            engine.apply_page(first.tag, Some(page(&[100.0], None))),
            PageOutcome::Stale
        );
        assert!(engine.buffer().is_empty());
        assert_eq!(engine.in_flight(), Some(second.tag));

        engine.close();
        assert_eq!(
            engine.apply_page(second.tag, Some(page(&[900.0], None))),
            PageOutcome::Stale
        );
        assert!(engine.seek_check(5.0).is_none());
    }

    #[test]
    fn test_failed_fetch_waits_for_next_seek_check() {
        let r = renderer();
        let mut engine = ChatEngine::new(200, 350.0);
        let ticket = engine.seek_check(42.0).unwrap();
        assert_eq!(engine.apply_page(ticket.tag, None), PageOutcome::Failed);
        assert_eq!(engine.state(), ChatState::Streaming);

        for t in 43..60 {
            assert!(engine.advance(t as f64, &r).fetch.is_none());
        }
        let retry = engine.seek_check(60.0).expect("refetch");
        assert_eq!(retry.request, CommentRequest::AtOffset(60));
    }

    #[test]
    fn test_empty_page_does_not_poll() {
        let r = renderer();
        let mut engine = streaming(&[], None);
        assert_eq!(engine.state(), ChatState::Streaming);
        for t in 0..30 {
            assert_eq!(engine.advance(t as f64, &r), Advance::default());
        }
        assert_eq!(engine.in_flight(), None);
    }

    #[test]
    fn test_failed_pagination_is_not_repeated() {
        let r = renderer();
        let mut engine = streaming(&[5.0, 12.0], Some("cur"));
        let ticket = engine.advance(30.0, &r).fetch.expect("cursor fetch");
        assert_eq!(engine.apply_page(ticket.tag, None), PageOutcome::Failed);

        assert!(engine.advance(31.0, &r).fetch.is_none());
        assert!(engine.advance(32.0, &r).fetch.is_none());
        assert!(engine.seek_check(33.0).is_some());
    }

    #[test]
    fn test_abandon_invalidates_in_flight_fetch() {
        let r = renderer();
        let mut engine = streaming(&[100.0, 101.0], Some("cur"));
        engine.advance(100.5, &r);
        let ticket = engine.seek_check(500.0).expect("refetch");

        engine.abandon();
        assert_eq!(engine.state(), ChatState::FetchingInitial);
        assert_eq!(engine.in_flight(), None);
        assert_eq!(
            engine.apply_page(ticket.tag, Some(page(&[500.5], None))),
            PageOutcome::Stale
        );
        assert!(engine.buffer().is_empty());
        assert_eq!(engine.advance(501.0, &r), Advance::default());
    }

    #[test]
    fn test_window_cap_and_filtered_messages() {
        let mut r = renderer();
        let offsets: Vec<f64> = (0..450).map(|i| i as f64).collect();
        let mut engine = streaming(&offsets, None);

        engine.advance(449.0, &r);
        assert_eq!(engine.messages().count(), 200);
        assert_eq!(engine.messages().next().map(|m| m.offset), Some(250.0));

        r.set_settings(ChatSettings {
            filter_words: vec!["message".into()],
            ..Default::default()
        });
        let mut engine = streaming(&[1.0, 2.0], None);
        let step = engine.advance(5.0, &r);
        assert_eq!(step.revealed, 2);
        assert_eq!(step.rendered, 0);
        assert_eq!(engine.reveal_index(), 2);
        assert_eq!(engine.revision(), 0);
    }

    #[test]
    fn test_pause_retains_buffer() {
        let r = renderer();
        let mut engine = streaming(&[5.0, 12.0, 20.0], None);
        engine.advance(6.0, &r);
        engine.pause();
        assert_eq!(engine.state(), ChatState::Paused);
        assert_eq!(engine.advance(30.0, &r).revealed, 0);

        assert!(engine.seek_check(13.0).is_none());
        assert_eq!(engine.state(), ChatState::Streaming);
        assert_eq!(engine.advance(13.0, &r).revealed, 1);
    }
}
