use async_trait::async_trait;

use crate::error::TransportError;

/// Write half of a broker connection
#[async_trait]
pub trait FrameSink: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Send a close frame and shut the write half
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a broker connection
#[async_trait]
pub trait FrameSource: Send {
    /// Next frame payload. `None` once the peer closed the connection.
    async fn next_frame(&mut self) -> Option<Result<Vec<u8>, TransportError>>;
}

/// Headers the broker expects on the WebSocket handshake
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandshakeHeaders {
    pub user_agent: String,
    pub origin: String,
    pub cookies: String,
}

/// Opens a connection and hands back its two halves
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(
        &self,
        url: &str,
        headers: &HandshakeHeaders,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>), TransportError>;
}
