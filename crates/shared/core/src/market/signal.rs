use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::values::Asset;

/// Trading signal for one asset and expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub asset: Asset,
    /// Expiry key the signal applies to
    pub expiry: i64,
    /// `call` or `put`
    pub direction: String,
    /// Timeframe in seconds
    pub duration: i64,
}

impl SignalRecord {
    /// Parse one entry of a `signals` push.
    ///
    /// Two layouts exist:
    /// - `[asset, [{"signal": dir, "timeFrame": secs}], expiry]`
    /// - `[asset, [[secs, dir]]]`, keyed by the message `time`
    pub fn from_entry(entry: &Value, message_time: Option<i64>) -> Option<Self> {
        let tuple = entry.as_array()?;
        let asset = tuple.first()?.as_str()?.to_string();
        let first = tuple.get(1)?.as_array()?.first()?;

        if let (Some(direction), Some(duration), Some(expiry)) = (
            first.get("signal").and_then(Value::as_str),
            first.get("timeFrame").and_then(Value::as_i64),
            tuple.get(2).and_then(Value::as_i64),
        ) {
            return Some(Self {
                asset,
                expiry,
                direction: direction.to_string(),
                duration,
            });
        }

        let pair = first.as_array()?;
        Some(Self {
            asset,
            expiry: message_time?,
            direction: pair.get(1)?.as_str()?.to_string(),
            duration: pair.first()?.as_i64()?,
        })
    }
}
