//! Printer adapters for sending ESC/POS data
//!
//! Every `print` call opens its own connection and closes it when done, so
//! a device that dropped off the network never leaves a stale socket behind
//! for the next job.

use crate::error::{PrintError, PrintResult};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

/// Raw printing port used by most thermal printers
pub const DEFAULT_PORT: u16 = 9100;

/// Trait for printer adapters
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Send raw ESC/POS data to the printer
    async fn print(&self, data: &[u8]) -> PrintResult<()>;

    /// Check if the printer is online/reachable
    async fn is_online(&self) -> bool;
}

/// Network printer (raw TCP)
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    host: String,
    port: u16,
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl NetworkPrinter {
    /// Create a new network printer
    ///
    /// `host` may be an IP address or a resolvable hostname.
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(PrintError::InvalidConfig("Empty printer host".to_string()));
        }
        if port == 0 {
            return Err(PrintError::InvalidConfig(format!(
                "Invalid port for {}: 0",
                host
            )));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            connect_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(10),
        })
    }

    /// Create from an address string (e.g., "192.168.1.100:9100")
    ///
    /// The port defaults to [`DEFAULT_PORT`] when omitted.
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        match addr.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| PrintError::InvalidConfig(format!("Invalid address: {}", addr)))?;
                Self::new(host, port)
            }
            None => Self::new(addr, DEFAULT_PORT),
        }
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the timeout for writing the whole job
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect(&self, timeout: Duration) -> PrintResult<TcpStream> {
        tokio::time::timeout(timeout, TcpStream::connect((self.host.as_str(), self.port)))
            .await
            .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr())))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr(), e)))
    }
}

impl Printer for NetworkPrinter {
    #[instrument(skip(self, data), fields(addr = %self.addr(), data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let mut stream = self.connect(self.connect_timeout).await?;

        let write = async {
            stream.write_all(data).await?;
            stream.flush().await?;
            stream.shutdown().await
        };
        tokio::time::timeout(self.write_timeout, write)
            .await
            .map_err(|_| PrintError::Timeout(format!("Write timeout: {}", self.addr())))??;

        info!("Print job sent");
        Ok(())
    }

    #[instrument(skip(self), fields(addr = %self.addr()))]
    async fn is_online(&self) -> bool {
        match self.connect(Duration::from_millis(500)).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Printer offline");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_network_printer_new() {
        let printer = NetworkPrinter::new("192.168.1.100", 9100).unwrap();
        assert_eq!(printer.port(), 9100);
        assert_eq!(printer.host(), "192.168.1.100");
    }

    #[test]
    fn test_network_printer_from_addr() {
        let printer = NetworkPrinter::from_addr("192.168.1.100:9101").unwrap();
        assert_eq!(printer.port(), 9101);

        let printer = NetworkPrinter::from_addr("kitchen.local").unwrap();
        assert_eq!(printer.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_addr() {
        assert!(NetworkPrinter::from_addr("host:notaport").is_err());
        assert!(NetworkPrinter::new("", 9100).is_err());
        assert!(NetworkPrinter::new("10.0.0.1", 0).is_err());
    }

    #[tokio::test]
    async fn test_print_delivers_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let printer = NetworkPrinter::new("127.0.0.1", port).unwrap();
        printer.print(b"hello printer").await.unwrap();

        assert_eq!(server.await.unwrap(), b"hello printer");
    }

    #[tokio::test]
    async fn test_print_to_closed_port_fails() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let printer = NetworkPrinter::new("127.0.0.1", port)
            .unwrap()
            .with_timeout(Duration::from_millis(500));
        let err = printer.print(b"x").await.unwrap_err();
        assert!(matches!(err, PrintError::Connection(_) | PrintError::Timeout(_)));
        assert!(!err.is_permanent());
    }
}
