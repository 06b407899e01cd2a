use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::OrderStatus;
use crate::values::{BrokerOrderId, RequestId, Timestamp, json_decimal};

/// Option direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Call,
    Put,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Call => "call",
            Direction::Put => "put",
        }
    }
}

/// What kind of command created the order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Immediate option purchase (`orders/open`)
    Option,
    /// Deferred order opened at a time or price (`pending/create`)
    Pending,
}

/// Order tracked from the outbound command until settlement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub request_id: RequestId,
    pub kind: OrderKind,
    /// Outbound payload exactly as sent
    pub request: Value,
    pub broker_order_id: Option<BrokerOrderId>,
    /// Purchase acknowledgement
    pub response: Option<Value>,
    /// Settlement record
    pub result: Option<Value>,
    pub status: OrderStatus,
    pub created_at: Timestamp,
}

impl PendingOrder {
    pub fn new(request_id: RequestId, kind: OrderKind, request: Value, created_at: Timestamp) -> Self {
        Self {
            request_id,
            kind,
            request,
            broker_order_id: None,
            response: None,
            result: None,
            status: OrderStatus::Pending,
            created_at,
        }
    }

    /// Record the broker's purchase acknowledgement
    pub fn acknowledge(&mut self, broker_order_id: BrokerOrderId, response: Value) {
        self.broker_order_id = Some(broker_order_id);
        self.response = Some(response);
        if !self.status.is_settled() {
            self.status = OrderStatus::Open;
        }
    }

    /// Record the settlement and derive the outcome from its profit
    pub fn settle(&mut self, profit: Decimal, deal: Value) -> OrderStatus {
        self.status = OrderStatus::from_profit(profit);
        self.result = Some(deal);
        self.status
    }

    /// Profit from the settlement record, if settled
    pub fn profit(&self) -> Option<Decimal> {
        self.result
            .as_ref()
            .and_then(|r| r.get("profit"))
            .and_then(json_decimal)
    }
}
