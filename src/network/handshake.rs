//! Pre-registration handshake: collect a nickname, username, and realname
//! before a session exists.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

/// Why a handshake did not produce a session.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("connection closed during registration")]
    Closed,
    #[error("transport error: {0}")]
    Transport(#[from] LinesCodecError),
}

/// The three names IRC wants for a user.
#[derive(Debug)]
pub struct HandshakeOutcome {
    pub handle: String,
    pub username: String,
    pub realname: String,
}

/// Greet the client, then read lines until both a `NICK` and a `USER`
/// have been seen. Lines that are neither (or are malformed) are ignored
/// and the wait continues; the caller bounds the whole exchange with the
/// configured registration timeout.
pub async fn perform(
    reader: &mut FramedRead<OwnedReadHalf, LinesCodec>,
    writer: &mut FramedWrite<OwnedWriteHalf, LinesCodec>,
    peer: std::net::SocketAddr,
) -> Result<HandshakeOutcome, HandshakeError> {
    writer
        .send("NOTICE AUTH :*** Connected, your socket info:".to_string())
        .await?;
    writer.send(format!("NOTICE AUTH :*** {peer}")).await?;

    let mut handle: Option<String> = None;
    let mut username: Option<String> = None;
    let mut realname: Option<String> = None;

    loop {
        if let (Some(handle), Some(username), Some(realname)) =
            (handle.clone(), username.clone(), realname.clone())
        {
            return Ok(HandshakeOutcome {
                handle,
                username,
                realname,
            });
        }

        let line = match reader.next().await {
            Some(Ok(line)) => line,
            Some(Err(e)) => return Err(e.into()),
            None => return Err(HandshakeError::Closed),
        };
        let line = line.trim_end_matches('\r');

        if let Some(rest) = line.strip_prefix("NICK ") {
            handle = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("USER ") {
            // USER <username> <mode> <unused> :<realname>
            let user = rest.split_whitespace().next().unwrap_or_default();
            let real = line.find(':').map(|at| line[at + 1..].to_string());
            if !user.is_empty() && real.is_some() {
                username = Some(user.to_string());
                realname = real;
            }
        }
    }
}
