use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle of an order placed through the socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Sent, no acknowledgement yet
    Pending,
    /// Acknowledged by the broker, waiting for settlement
    Open,
    /// Settled with positive profit
    Won,
    /// Settled with zero or negative profit
    Lost,
}

impl OrderStatus {
    /// Outcome for a settled deal: a win only when profit is strictly positive
    pub fn from_profit(profit: Decimal) -> Self {
        if profit > Decimal::ZERO {
            OrderStatus::Won
        } else {
            OrderStatus::Lost
        }
    }

    /// Returns true if the order has a final outcome
    pub fn is_settled(&self) -> bool {
        matches!(self, OrderStatus::Won | OrderStatus::Lost)
    }
}
