use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use crate::domain::{Connector, FrameSink, FrameSource, HandshakeHeaders};
use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens broker connections over tokio-tungstenite
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(
        &self,
        url: &str,
        headers: &HandshakeHeaders,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameSource>), TransportError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))?;

        let request_headers = request.headers_mut();
        for (name, value) in [
            ("user-agent", &headers.user_agent),
            ("origin", &headers.origin),
            ("cookie", &headers.cookies),
        ] {
            if value.is_empty() {
                continue;
            }
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Connection(format!("invalid {} header: {}", name, e)))?;
            request_headers.insert(name, value);
        }

        let (ws_stream, response) = connect_async(request)
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        debug!(status = %response.status(), url = %url, "WebSocket handshake complete");

        let (write, read) = ws_stream.split();
        Ok((
            Box::new(WsFrameSink { write }),
            Box::new(WsFrameSource { read }),
        ))
    }
}

/// Write half of a tungstenite connection
pub struct WsFrameSink {
    write: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WsFrameSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.write
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.write
            .close()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

/// Read half of a tungstenite connection
pub struct WsFrameSource {
    read: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSource for WsFrameSource {
    async fn next_frame(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        while let Some(msg) = self.read.next().await {
            match msg {
                Ok(Message::Text(text)) => return Some(Ok(text.as_bytes().to_vec())),
                Ok(Message::Binary(data)) => return Some(Ok(data.to_vec())),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "Broker closed the connection");
                    return None;
                }
                Ok(Message::Ping(data)) => {
                    trace!("Received ping: {:?}", data);
                }
                Ok(_) => {}
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            }
        }
        None
    }
}
