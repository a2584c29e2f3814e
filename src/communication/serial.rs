use async_trait::async_trait;
use serial2_tokio::SerialPort;
use std::io::ErrorKind;
use std::time::Duration;

use super::{Transport, TransportError};
use crate::config::SerialConfig;

/// Physical serial link opened with `serial2-tokio`.
pub struct SerialTransport {
    port: SerialPort,
    name: String,
}

impl SerialTransport {
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let port = SerialPort::open(&config.port, config.baud).map_err(|source| TransportError::Open {
            port: config.port.clone(),
            source,
        })?;
        tracing::info!("Serial opened on {} @ {} baud", config.port, config.baud);
        Ok(Self {
            port,
            name: config.port.clone(),
        })
    }

    /// Serial ports reported by the operating system.
    pub fn available_ports() -> Vec<String> {
        match SerialPort::available_ports() {
            Ok(paths) => paths.iter().map(|p| p.display().to_string()).collect(),
            Err(e) => {
                tracing::warn!("Failed to enumerate serial ports: {}", e);
                vec![]
            }
        }
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, TransportError> {
        let mut buf = [0u8; 1];
        match tokio::time::timeout(timeout, self.port.read(&mut buf)).await {
            Err(_) => Ok(None),
            Ok(Ok(0)) => Ok(None),
            Ok(Ok(_)) => Ok(Some(buf[0])),
            Ok(Err(e)) if e.kind() == ErrorKind::TimedOut => Ok(None),
            Ok(Err(e)) => Err(TransportError::Read(e)),
        }
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(bytes).await.map_err(TransportError::Write)
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .finish()
    }
}
