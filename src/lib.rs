//! ChatLand - a small multi-client IRC chat server.
//!
//! The crate is split along the data flow: per-connection reader/writer
//! tasks ([`network`]) feed and drain each session's queues ([`state`]),
//! while a single [`dispatch::Dispatcher`] task interprets every inbound
//! line against the shared [`state::Registry`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod network;
pub mod proto;
pub mod state;
