pub mod api;
pub mod chat;
pub mod common;
pub mod configs;
pub mod emotes;
pub mod player;
pub mod storage;
pub mod viewer;
