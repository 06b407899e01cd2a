//! qxlink Core Domain
//!
//! Pure domain types for the qxlink broker client.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod expiration;
pub mod market;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    // Account
    Balance,
    // Settlements
    Deal,
    // Orders
    Direction,
    OrderKind,
    OrderStatus,
    PendingOrder,
    Profile,
    // Session
    Session,
};
pub use expiration::{expiration_time, is_otc};
pub use market::{Candle, CandleHistory, CandleSeries, Instrument, Sentiment, SignalRecord, Tick};
pub use values::{Amount, Asset, BrokerOrderId, Price, RequestId, Timestamp, json_decimal, json_id};
