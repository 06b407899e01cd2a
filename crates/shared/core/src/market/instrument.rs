use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::values::{Asset, json_decimal};

/// Tradeable asset from the `instruments/list` payload
///
/// The broker sends each instrument as a long positional tuple. Only the
/// fields the client uses are decoded; the tuple is kept in `raw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: Asset,
    pub name: String,
    pub category: Option<String>,
    pub payout: Option<Decimal>,
    pub is_open: bool,
    pub raw: Value,
}

impl Instrument {
    const SYMBOL: usize = 1;
    const NAME: usize = 2;
    const CATEGORY: usize = 3;
    const PAYOUT: usize = 5;
    const IS_OPEN: usize = 14;

    pub fn from_tuple(value: &Value) -> Option<Self> {
        let t = value.as_array()?;
        Some(Self {
            symbol: t.get(Self::SYMBOL)?.as_str()?.to_string(),
            name: t.get(Self::NAME)?.as_str()?.to_string(),
            category: t
                .get(Self::CATEGORY)
                .and_then(Value::as_str)
                .map(str::to_string),
            payout: t.get(Self::PAYOUT).and_then(json_decimal),
            is_open: t.get(Self::IS_OPEN).is_some_and(|v| match v {
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_i64().is_some_and(|i| i != 0),
                _ => false,
            }),
            raw: value.clone(),
        })
    }
}
