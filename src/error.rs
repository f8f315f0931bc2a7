//! Error types for command parsing.
//!
//! A parse failure never escapes the dispatch loop; it is logged and the
//! offending line is dropped. The variants exist so the diagnostic can say
//! what was missing.

use thiserror::Error;

/// Errors raised while interpreting an inbound protocol line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{0} is missing a channel argument")]
    MissingChannel(&'static str),

    #[error("PRIVMSG is missing a target")]
    MissingTarget,

    #[error("PRIVMSG is missing a message body")]
    MissingBody,

    #[error("NICK is missing a nickname")]
    MissingNick,

    #[error("PING is missing a token")]
    MissingToken,
}
