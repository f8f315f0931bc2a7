//! The unit of work moving through the queues.

use crate::state::Session;
use std::fmt;
use std::sync::Arc;

/// An immutable protocol line plus the session it belongs to.
///
/// Inbound, the session is the sender; outbound, it is the recipient.
/// System-synthesized lines (keepalive pings) carry no session. A message
/// is created once and handed to exactly one queue.
#[derive(Debug, Clone)]
pub struct Message {
    session: Option<Arc<Session>>,
    line: String,
}

impl Message {
    /// A message tied to a session.
    pub fn new(session: Arc<Session>, line: impl Into<String>) -> Self {
        Self {
            session: Some(session),
            line: line.into(),
        }
    }

    /// A server-synthesized message with no owning session.
    pub fn server(line: impl Into<String>) -> Self {
        Self {
            session: None,
            line: line.into(),
        }
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}
