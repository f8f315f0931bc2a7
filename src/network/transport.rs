//! Per-session reader and writer tasks.
//!
//! The reader is the sole producer into a session's inbound queue; the
//! writer is the sole consumer of its outbound queue. Any transport
//! failure is folded into a synthetic QUIT so the dispatcher tears the
//! session down the same way it would for an explicit one.

use crate::message::Message;
use crate::state::Session;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, trace};

/// Read lines off the wire into the session's inbound queue until the
/// peer disappears or the session is disconnected.
pub fn spawn_reader(session: Arc<Session>, mut reader: FramedRead<OwnedReadHalf, LinesCodec>) {
    tokio::spawn(async move {
        let cancel = session.cancel_token();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = reader.next() => match next {
                    Some(Ok(line)) => {
                        let line = line.trim_end_matches('\r');
                        trace!(handle = %session.handle(), line = %line, "==>");
                        session.push_inbound(Message::new(session.clone(), line));
                    }
                    Some(Err(e)) => {
                        debug!(handle = %session.handle(), error = %e, "read failed");
                        session.push_inbound(Message::new(session.clone(), "QUIT"));
                        break;
                    }
                    None => {
                        debug!(handle = %session.handle(), "peer closed the connection");
                        session.push_inbound(Message::new(session.clone(), "QUIT"));
                        break;
                    }
                }
            }
        }
        trace!(handle = %session.handle(), "reader finished");
    });
}

/// Drain the session's outbound queue onto the wire. A multi-segment
/// message is written as separate terminated lines. Exits once the pop
/// reports cancellation.
pub fn spawn_writer(session: Arc<Session>, mut writer: FramedWrite<OwnedWriteHalf, LinesCodec>) {
    tokio::spawn(async move {
        while let Some(msg) = session.pop_outbound().await {
            trace!(handle = %session.handle(), line = %msg, "<==");
            for segment in msg.line().split('\n') {
                if let Err(e) = writer.send(segment.to_string()).await {
                    debug!(handle = %session.handle(), error = %e, "write failed");
                    session.push_inbound(Message::new(session.clone(), "QUIT"));
                    return;
                }
            }
        }
        trace!(handle = %session.handle(), "writer finished");
    });
}
