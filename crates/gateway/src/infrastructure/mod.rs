pub mod channel_transport;
pub mod clock;
pub mod codec;
pub mod file_store;
pub mod rest_client;
pub mod ws_transport;

pub use channel_transport::{ChannelConnector, ChannelPeer};
pub use clock::SystemClock;
pub use file_store::JsonFileSessionStore;
pub use rest_client::{RestError, RestSettingsClient};
pub use ws_transport::{WsConnector, WsFrameSink, WsFrameSource};
