//! Network layer: accept loop, registration handshake, and the
//! per-session line transport tasks.

mod gateway;
mod handshake;
mod transport;

pub use gateway::Gateway;

/// Classic IRC line limit; longer input is treated as a transport error.
pub(crate) const MAX_LINE_LEN: usize = 512;
