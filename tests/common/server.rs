//! Test server management.

use chatland::config::{Config, ListenConfig, ServerConfig, TimeoutConfig};
use chatland::dispatch::Dispatcher;
use chatland::network::Gateway;
use chatland::state::Registry;
use std::net::SocketAddr;
use std::sync::Arc;

/// An in-process server instance on an ephemeral port.
pub struct TestServer {
    addr: SocketAddr,
}

impl TestServer {
    pub async fn spawn() -> anyhow::Result<Self> {
        let config = Config {
            server: ServerConfig {
                name: "test.server".to_string(),
                motd: "Test Server".to_string(),
            },
            listen: ListenConfig {
                address: "127.0.0.1:0".parse()?,
            },
            timeouts: TimeoutConfig::default(),
        };

        let registry = Arc::new(Registry::new(
            &config.server.name,
            &config.server.motd,
        ));
        tokio::spawn(Dispatcher::new(Arc::clone(&registry)).run());

        let gateway = Gateway::bind(&config, registry).await?;
        let addr = gateway.local_addr()?;
        tokio::spawn(async move {
            let _ = gateway.run().await;
        });

        Ok(Self { addr })
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }
}
