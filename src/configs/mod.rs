pub mod archive;
pub mod base;
pub mod chat;
pub mod emotes;
pub mod logging;
pub mod player;
pub mod storage;

pub use archive::*;
pub use base::*;
pub use chat::*;
pub use emotes::*;
pub use logging::*;
pub use player::*;
pub use storage::*;
