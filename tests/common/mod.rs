//! Integration test common infrastructure.
//!
//! Spawns an in-process server and provides a raw-line IRC client for
//! asserting on wire traffic.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;
