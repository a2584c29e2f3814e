use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{Transport, TransportError};

/// Transport over any tokio byte stream: pseudo-terminals, sockets, in-memory pipes.
///
/// Unlike a serial port, end-of-stream here means the peer is gone and is
/// reported as [`TransportError::Closed`].
#[derive(Debug)]
pub struct StreamTransport<S> {
    stream: S,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, TransportError> {
        let mut buf = [0u8; 1];
        match tokio::time::timeout(timeout, self.stream.read(&mut buf)).await {
            Err(_) => Ok(None),
            Ok(Ok(0)) => Err(TransportError::Closed),
            Ok(Ok(_)) => Ok(Some(buf[0])),
            Ok(Err(e)) => Err(TransportError::Read(e)),
        }
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(bytes).await.map_err(TransportError::Write)?;
        self.stream.flush().await.map_err(TransportError::Write)
    }
}
