pub mod connection;
pub mod frame;
pub mod message;
pub mod traits;

pub use connection::ConnectionState;
pub use frame::{CorrelationTag, Frame, FrameKind, TagTracker};
pub use message::{InboundMessage, RouteSignal};
pub use traits::{Connector, FrameSink, FrameSource, HandshakeHeaders};
