pub mod buffer;
pub mod engine;
pub mod render;
pub mod replayer;
pub mod window;

pub use buffer::CommentBuffer;
pub use engine::{ChatEngine, ChatState, ChatView, FetchTag, FetchTicket, PageOutcome};
pub use render::{EmoteImage, MessageRenderer, RenderedMessage, Token};
pub use replayer::ChatReplayer;
pub use window::{AutoScroll, MessageWindow};
