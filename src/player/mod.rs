pub mod backend;
pub mod context;
pub mod navigation;
pub mod task;
pub mod timeline;
pub mod tracker;

pub use backend::{BackendKind, ClockPlayer, PlayerBackend, PlayerStatus};
pub use context::PlaybackContext;
pub use navigation::NavigationQuery;
pub use task::PeriodicTask;
pub use timeline::{PlaybackCursor, Timeline};
pub use tracker::{PositionSample, PositionTracker};
