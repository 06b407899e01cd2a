//! In-process transport over tokio channels
//!
//! Each `open` creates a fresh pair of channels and hands the broker side to
//! whoever holds the peer receiver. Useful for driving the client without a
//! socket.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::{Connector, FrameSink, FrameSource, HandshakeHeaders};
use crate::error::TransportError;

/// Broker side of one in-process connection
pub struct ChannelPeer {
    pub url: String,
    pub headers: HandshakeHeaders,
    /// Frames the client wrote
    pub outbound: mpsc::UnboundedReceiver<String>,
    /// Frames to deliver to the client; drop to simulate a remote close
    pub inbound: mpsc::UnboundedSender<Vec<u8>>,
}

impl ChannelPeer {
    /// Push a text frame to the client
    pub fn push_text(&self, text: &str) -> bool {
        self.inbound.send(text.as_bytes().to_vec()).is_ok()
    }

    /// Push a binary JSON attachment (`0x04` marker + JSON)
    pub fn push_binary(&self, json: &serde_json::Value) -> bool {
        let mut raw = vec![0x04];
        raw.extend_from_slice(json.to_string().as_bytes());
        self.inbound.send(raw).is_ok()
    }

    /// Next frame the client sent, if one is already queued or arrives
    pub async fn next_outbound(&mut self) -> Option<String> {
        self.outbound.recv().await
    }
}

/// Connector that hands each new connection's broker side to a channel
pub struct ChannelConnector {
    peers: mpsc::UnboundedSender<ChannelPeer>,
    fail_with: Option<TransportError>,
}

impl ChannelConnector {
    /// Create a connector and the receiver of its broker-side peers
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<ChannelPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        (
            Self {
                peers,
                fail_with: None,
            },
            rx,
        )
    }

    /// Connector whose every `open` fails with `error`
    pub fn failing(error: TransportError) -> Self {
        let (peers, _) = mpsc::unbounded_channel();
        Self {
            peers,
            fail_with: Some(error),
        }
    }
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn open(
        &self,
        url: &str,
        headers: &HandshakeHeaders,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>), TransportError> {
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        self.peers
            .send(ChannelPeer {
                url: url.to_string(),
                headers: headers.clone(),
                outbound: out_rx,
                inbound: in_tx,
            })
            .map_err(|_| TransportError::Connection("no peer listening".to_string()))?;

        Ok((
            Box::new(ChannelFrameSink { tx: Some(out_tx) }),
            Box::new(ChannelFrameSource { rx: in_rx }),
        ))
    }
}

pub struct ChannelFrameSink {
    tx: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl FrameSink for ChannelFrameSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(text).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx = None;
        Ok(())
    }
}

pub struct ChannelFrameSource {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

#[async_trait]
impl FrameSource for ChannelFrameSource {
    async fn next_frame(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}
