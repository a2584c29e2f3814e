//! Byte-level duplex link to the MCU.

pub mod serial;
pub mod stream;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use serial::SerialTransport;
pub use stream::StreamTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to open serial port '{port}': {source}")]
    Open {
        port: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serial read error: {0}")]
    Read(#[source] std::io::Error),
    #[error("Serial write error: {0}")]
    Write(#[source] std::io::Error),
    #[error("Connection closed by remote")]
    Closed,
}

/// Duplex channel carrying single command bytes in and sample frames out.
#[async_trait]
pub trait Transport: Send {
    /// Wait up to `timeout` for one inbound byte. A timeout is `Ok(None)`, not an error.
    async fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, TransportError>;

    /// Write all of `bytes`, in order.
    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}
