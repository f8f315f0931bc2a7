//! TCP accept loop and connection bring-up.

use super::handshake;
use super::transport;
use crate::config::Config;
use crate::message::Message;
use crate::state::{Registry, Session};
use futures_util::SinkExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, info, warn};

/// Accepts connections and hands registered sessions to the transport
/// tasks. One Gateway per process.
pub struct Gateway {
    listener: TcpListener,
    registry: Arc<Registry>,
    registration_timeout: Duration,
}

impl Gateway {
    /// Bind the listening socket.
    pub async fn bind(config: &Config, registry: Arc<Registry>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.listen.address).await?;
        Ok(Self {
            listener,
            registry,
            registration_timeout: Duration::from_secs(config.timeouts.registration),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept forever. A failed accept or handshake never stops the loop.
    pub async fn run(self) -> std::io::Result<()> {
        info!(address = %self.local_addr()?, "listening for clients");
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(peer = %addr, "client connected");
                    let registry = Arc::clone(&self.registry);
                    let timeout = self.registration_timeout;
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, registry, timeout).await {
                            debug!(peer = %addr, error = %e, "connection abandoned");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "accept failed"),
            }
        }
    }
}

/// Handshake, register, and start the session's transport tasks.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<Registry>,
    registration_timeout: Duration,
) -> anyhow::Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedRead::new(
        read_half,
        LinesCodec::new_with_max_length(super::MAX_LINE_LEN),
    );
    let mut writer = FramedWrite::new(write_half, LinesCodec::new());

    let outcome = tokio::time::timeout(
        registration_timeout,
        handshake::perform(&mut reader, &mut writer, addr),
    )
    .await
    .map_err(|_| anyhow::anyhow!("registration timed out"))??;

    let session = Session::new(
        outcome.handle,
        outcome.username,
        outcome.realname,
        addr.ip().to_string(),
        registry.work_ready().clone(),
    );

    if !registry.register(session.clone()) {
        info!(handle = %session.handle(), peer = %addr, "duplicate handle rejected");
        writer
            .send("Handle already in use, reconnect with a new handle".to_string())
            .await?;
        return Ok(());
    }
    info!(handle = %session.handle(), host = %session.host(), "registered");

    // Kick off the welcome burst before any client line is read.
    session.push_inbound(Message::new(session.clone(), "WELCOMEMSG"));
    session.push_inbound(Message::new(session.clone(), "MOTD"));

    transport::spawn_reader(session.clone(), reader);
    transport::spawn_writer(session, writer);
    Ok(())
}
