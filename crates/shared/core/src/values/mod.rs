use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Deal amount or balance in account currency
pub type Amount = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Asset symbol as the broker names it (e.g. `EURUSD_otc`)
pub type Asset = String;

/// Caller-generated correlation id sent with every order
pub type RequestId = i64;

/// Order id assigned by the broker once a purchase is acknowledged
pub type BrokerOrderId = String;

/// Read a JSON number (or numeric string) as a Decimal.
///
/// The broker sends prices and balances as floats, integers or strings
/// depending on the message, so all three are accepted.
pub fn json_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Decimal::from(i))
            } else {
                n.as_f64().and_then(Decimal::from_f64)
            }
        }
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a JSON id that may be sent either as a string or a number.
pub fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
