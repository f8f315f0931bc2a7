//! State management module.
//!
//! Contains the [`Registry`] (shared server state) and the entities it
//! owns: live [`Session`]s and named [`Channel`]s.

mod channel;
mod registry;
mod session;

pub use channel::Channel;
pub use registry::Registry;
pub use session::Session;
