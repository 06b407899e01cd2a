use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::values::{Asset, Price, Timestamp, json_decimal};

/// Realtime price sample for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub time: Timestamp,
    pub price: Price,
}

impl Tick {
    /// Parse a `[asset, time, price, volume]` tuple. Time is in fractional seconds.
    pub fn from_tuple(value: &Value) -> Option<(Asset, Tick)> {
        let tuple = value.as_array()?;
        if tuple.len() != 4 {
            return None;
        }

        let asset = tuple[0].as_str()?.to_string();
        let seconds = tuple[1].as_f64()?;
        let time = DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)?;
        let price = json_decimal(&tuple[2])?;

        Some((asset, Tick { time, price }))
    }
}

/// Share of traders buying vs selling an asset, in percent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentiment {
    pub buy: u8,
    pub sell: u8,
}

impl Sentiment {
    /// Build from the buy share; sell is the complement to 100
    pub fn from_buy(buy: f64) -> Self {
        let buy = buy.trunc().clamp(0.0, 100.0) as u8;
        Self {
            buy,
            sell: 100 - buy,
        }
    }

    /// Parse an `[asset, buyPercent]` pair
    pub fn from_pair(value: &Value) -> Option<(Asset, Sentiment)> {
        let pair = value.as_array()?;
        if pair.len() != 2 {
            return None;
        }

        let asset = pair[0].as_str()?.to_string();
        let buy = match &pair[1] {
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            other => other.as_f64()?,
        };

        Some((asset, Sentiment::from_buy(buy)))
    }
}
