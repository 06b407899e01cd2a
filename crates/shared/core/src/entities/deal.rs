use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::values::{BrokerOrderId, json_decimal, json_id};

/// Settlement of one option as pushed in a `deals` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: BrokerOrderId,
    pub profit: Decimal,
    pub win: bool,
    pub raw: Value,
}

impl Deal {
    /// Parse a deal entry. Returns None when id or profit is missing.
    pub fn from_json(value: &Value) -> Option<Self> {
        let id = json_id(value.get("id")?)?;
        let profit = json_decimal(value.get("profit")?)?;
        Some(Self {
            id,
            profit,
            win: profit > Decimal::ZERO,
            raw: value.clone(),
        })
    }
}
