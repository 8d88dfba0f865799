//! TCP transport implementation

use super::{TransportError, TransportStats, TransportTrait};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Default SCP port
pub const SCP_PORT: u16 = 49280;

/// TCP connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Connection timeout in seconds
    pub timeout_secs: u64,
}

impl TcpConfig {
    /// Create a new TCP configuration
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout_secs: 10,
        }
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self::new("localhost", SCP_PORT)
    }
}

/// TCP transport
pub struct TcpTransport {
    config: TcpConfig,
    stream: Option<TcpStream>,
    stats: Arc<RwLock<TransportStats>>,
    connected_at: Option<Instant>,
}

impl TcpTransport {
    /// Create a new TCP transport
    pub fn new(config: TcpConfig) -> Self {
        Self {
            config,
            stream: None,
            stats: Arc::new(RwLock::new(TransportStats::default())),
            connected_at: None,
        }
    }
}

#[async_trait]
impl TransportTrait for TcpTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.config.host.is_empty() {
            return Err(TransportError::InvalidConfiguration(
                "console host is empty".to_string(),
            ));
        }
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let stream = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            TcpStream::connect(&addr),
        )
        .await
        .map_err(|_| TransportError::Timeout(self.config.timeout_secs))?
        .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        // Commands are single short lines
        stream.set_nodelay(true).map_err(TransportError::IoError)?;

        self.stream = Some(stream);
        self.connected_at = Some(Instant::now());
        *self.stats.write() = TransportStats::default();

        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await.ok();
        }
        self.connected_at = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        stream.write_all(data).await.map_err(TransportError::IoError)?;
        stream.flush().await.map_err(TransportError::IoError)?;

        let mut stats = self.stats.write();
        stats.bytes_sent += data.len() as u64;
        stats.packets_sent += 1;

        Ok(data.len())
    }

    async fn receive(&mut self) -> Result<Bytes, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;

        let mut buffer = vec![0u8; 4096];

        match stream.try_read(&mut buffer) {
            Ok(0) => {
                self.stream = None;
                self.connected_at = None;
                Err(TransportError::Disconnected)
            }
            Ok(n) => {
                buffer.truncate(n);

                let mut stats = self.stats.write();
                stats.bytes_received += n as u64;
                stats.packets_received += 1;

                Ok(Bytes::from(buffer))
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(Bytes::new()),
            Err(e) => Err(TransportError::IoError(e)),
        }
    }

    fn connection_info(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    fn stats(&self) -> TransportStats {
        let mut stats = self.stats.read().clone();
        if let Some(connected_at) = self.connected_at {
            stats.uptime_secs = connected_at.elapsed().as_secs();
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_default_port() {
        let config = TcpConfig::default();
        assert_eq!(config.port, 49280);
        assert_eq!(TcpConfig::new("10.0.0.5", SCP_PORT).timeout(3).timeout_secs, 3);
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(b"OK devinfo productname TF5\n").await.unwrap();
            buf[..n].to_vec()
        });

        let mut transport = TcpTransport::new(TcpConfig::new("127.0.0.1", port));
        transport.connect().await.unwrap();
        assert!(transport.is_connected());
        transport.send(b"devinfo productname\n").await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received, b"devinfo productname\n");

        let mut data = Bytes::new();
        for _ in 0..100 {
            data = transport.receive().await.unwrap();
            if !data.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(&data[..], b"OK devinfo productname TF5\n");
        assert_eq!(transport.stats().packets_sent, 1);
    }

    #[tokio::test]
    async fn test_not_connected() {
        let mut transport = TcpTransport::new(TcpConfig::default());
        assert!(matches!(
            transport.send(b"x").await,
            Err(TransportError::NotConnected)
        ));
    }
}
