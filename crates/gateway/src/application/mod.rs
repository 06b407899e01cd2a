pub mod client;
pub mod connection;
pub mod gateway;
pub mod ledger;
pub mod router;
pub mod state;

pub use client::{BrokerClient, BrokerClientBuilder};
pub use connection::ConnectionManager;
pub use gateway::{BuyRequest, PendingRequest, RequestGateway};
pub use ledger::OrderLedger;
pub use router::EventRouter;
pub use state::{SessionState, SharedState, StateCapacity};
