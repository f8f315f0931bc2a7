//! Test IRC client.
//!
//! Talks raw lines so the tests assert on exactly what goes over the
//! wire.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A raw-line test client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    nick: String,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(address: &str, nick: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            nick: nick.to_string(),
        })
    }

    /// Send one terminated line.
    pub async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single line from the server.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a line with a timeout. Errors on timeout or EOF.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("connection closed");
        }
        Ok(line.trim_end().to_string())
    }

    /// Receive lines until the predicate matches; returns everything read.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<String>>
    where
        F: FnMut(&str) -> bool,
    {
        let mut lines = Vec::new();
        loop {
            let line = self.recv().await?;
            let done = predicate(&line);
            lines.push(line);
            if done {
                break;
            }
        }
        Ok(lines)
    }

    /// True if nothing arrives within the window. Used to assert that a
    /// message was *not* delivered.
    pub async fn is_quiet(&mut self, dur: Duration) -> bool {
        self.recv_timeout(dur).await.is_err()
    }

    /// Register with the server (NICK + USER) and drain the welcome
    /// burst, which ends with the 376 end-of-MOTD line.
    pub async fn register(&mut self) -> anyhow::Result<()> {
        let nick = self.nick.clone();
        self.send(&format!("NICK {nick}")).await?;
        self.send(&format!("USER {nick} 0 * :Test User {nick}"))
            .await?;
        let lines = self.recv_until(|line| line.contains(" 376 ")).await?;
        anyhow::ensure!(
            lines.iter().any(|line| line.contains(" 001 ")),
            "no RPL_WELCOME received"
        );
        Ok(())
    }

    /// Join a channel and wait for the auto-triggered reply burst to
    /// finish (the 332 topic reply is its last line).
    #[allow(dead_code)]
    pub async fn join(&mut self, channel: &str) -> anyhow::Result<()> {
        self.send(&format!("JOIN {channel}")).await?;
        self.recv_until(|line| line.contains(" 332 ")).await?;
        Ok(())
    }

    #[allow(dead_code)]
    pub async fn privmsg(&mut self, target: &str, text: &str) -> anyhow::Result<()> {
        self.send(&format!("PRIVMSG {target} :{text}")).await
    }

    #[allow(dead_code)]
    pub async fn quit(&mut self, reason: Option<&str>) -> anyhow::Result<()> {
        match reason {
            Some(reason) => self.send(&format!("QUIT :{reason}")).await,
            None => self.send("QUIT").await,
        }
    }
}
