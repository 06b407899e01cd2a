use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::values::{Asset, Price, json_decimal};

/// One OHLC candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time in unix seconds
    pub time: i64,
    pub open: Price,
    pub close: Price,
    pub high: Price,
    pub low: Price,
    pub ticks: Option<u64>,
}

impl Candle {
    /// Parse the broker's tuple layout `[time, open, close, high, low, ticks]`.
    ///
    /// Note the order: close comes before high and low.
    pub fn from_tuple(value: &Value) -> Option<Self> {
        let t = value.as_array()?;
        if t.len() < 5 {
            return None;
        }

        Some(Self {
            time: t[0].as_f64()? as i64,
            open: json_decimal(&t[1])?,
            close: json_decimal(&t[2])?,
            high: json_decimal(&t[3])?,
            low: json_decimal(&t[4])?,
            ticks: t.get(5).and_then(Value::as_u64),
        })
    }

    /// Parse an object with named fields
    pub fn from_object(value: &Value) -> Option<Self> {
        Some(Self {
            time: value.get("time")?.as_f64()? as i64,
            open: json_decimal(value.get("open")?)?,
            close: json_decimal(value.get("close")?)?,
            high: json_decimal(value.get("high")?)?,
            low: json_decimal(value.get("low")?)?,
            ticks: value.get("ticks").and_then(Value::as_u64),
        })
    }

    /// Accepts either layout
    pub fn from_json(value: &Value) -> Option<Self> {
        if value.is_array() {
            Self::from_tuple(value)
        } else {
            Self::from_object(value)
        }
    }
}

fn parse_candles(values: Option<&Value>) -> Vec<Candle> {
    values
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Candle::from_json).collect())
        .unwrap_or_default()
}

/// Candle series answering a `history/load` request (payload carries `index`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    pub asset: Asset,
    pub index: Option<i64>,
    pub candles: Vec<Candle>,
    pub raw: Value,
}

impl CandleSeries {
    /// The payload does not name its asset, so the caller supplies the current one
    pub fn from_json(asset: impl Into<Asset>, value: &Value) -> Self {
        let candles = parse_candles(value.get("data").or_else(|| value.get("candles")));
        Self {
            asset: asset.into(),
            index: value.get("index").and_then(Value::as_i64),
            candles,
            raw: value.clone(),
        }
    }
}

/// Candle history delivered after a `history/list/v2` correlation tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleHistory {
    pub asset: Asset,
    pub period: Option<i64>,
    pub candles: Vec<Candle>,
    /// Raw `[time, price]` history points
    pub history: Vec<Value>,
    pub raw: Value,
}

impl CandleHistory {
    pub fn from_json(value: &Value) -> Option<Self> {
        let asset = value.get("asset")?.as_str()?.to_string();
        Some(Self {
            asset,
            period: value.get("period").and_then(Value::as_i64),
            candles: parse_candles(value.get("candles")),
            history: value
                .get("history")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            raw: value.clone(),
        })
    }
}
