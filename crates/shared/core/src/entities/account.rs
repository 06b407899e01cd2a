use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::values::{Amount, json_decimal, json_id};

/// Minimum deal amount enforced for accounts denominated in BRL
const BRL_MINIMUM_AMOUNT: u32 = 5;

fn is_brl(code: &str) -> bool {
    code.eq_ignore_ascii_case("BRL")
}

/// Balance snapshot, replaced wholesale on every balance push
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub live: Option<Amount>,
    pub demo: Option<Amount>,
    pub is_demo: Option<bool>,
    pub currency_code: Option<String>,
}

impl Balance {
    pub fn from_json(value: &Value) -> Self {
        Self {
            live: value.get("liveBalance").and_then(json_decimal),
            demo: value.get("demoBalance").and_then(json_decimal),
            is_demo: value.get("isDemo").and_then(json_flag),
            currency_code: value
                .get("currencyCode")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }

    /// Snapshot left after a `not_money` error: live balance known to be empty
    pub fn zeroed_live() -> Self {
        Self {
            live: Some(Decimal::ZERO),
            ..Self::default()
        }
    }
}

/// Account profile as returned by the settings endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub nick_name: Option<String>,
    pub profile_id: Option<String>,
    pub avatar: Option<String>,
    pub country: Option<String>,
    pub country_name: Option<String>,
    pub country_ip: Option<String>,
    pub lang: Option<String>,
    pub time_offset: Option<i64>,
    pub live_balance: Option<Amount>,
    pub demo_balance: Option<Amount>,
    pub currency_symbol: Option<String>,
    pub profile_level: Option<String>,
    currency_code: Option<String>,
    minimum_amount: Option<Amount>,
}

impl Profile {
    pub fn currency_code(&self) -> Option<&str> {
        self.currency_code.as_deref()
    }

    pub fn minimum_amount(&self) -> Option<Amount> {
        self.minimum_amount
    }

    /// Set the account currency. BRL accounts always trade with a minimum of 5.
    pub fn set_currency_code(&mut self, code: impl Into<String>) {
        let code = code.into();
        if is_brl(&code) {
            self.minimum_amount = Some(Decimal::from(BRL_MINIMUM_AMOUNT));
        }
        self.currency_code = Some(code);
    }

    /// Set the minimum deal amount. Ignored in favor of 5 for BRL accounts.
    pub fn set_minimum_amount(&mut self, amount: Amount) {
        let brl = self.currency_code.as_deref().is_some_and(is_brl);
        self.minimum_amount = Some(if brl {
            Decimal::from(BRL_MINIMUM_AMOUNT)
        } else {
            amount
        });
    }

    /// Build a profile from a settings response (`{"data": {...}}` or the bare object)
    pub fn from_settings(value: &Value) -> Option<Self> {
        let data = value.get("data").unwrap_or(value);
        if !data.is_object() {
            return None;
        }

        let text = |key: &str| data.get(key).and_then(json_id);
        let mut profile = Profile {
            nick_name: text("nickname"),
            profile_id: text("id"),
            avatar: text("avatar"),
            country: text("country"),
            country_name: text("countryName"),
            country_ip: text("countryIp"),
            lang: text("lang"),
            time_offset: data.get("timeOffset").and_then(Value::as_i64),
            live_balance: data.get("liveBalance").and_then(json_decimal),
            demo_balance: data.get("demoBalance").and_then(json_decimal),
            currency_symbol: text("currencySymbol"),
            profile_level: text("profileLevel"),
            currency_code: None,
            minimum_amount: None,
        };

        if let Some(amount) = data.get("minDealAmount").and_then(json_decimal) {
            profile.set_minimum_amount(amount);
        }
        if let Some(code) = data.get("currencyCode").and_then(Value::as_str) {
            profile.set_currency_code(code);
        }

        Some(profile)
    }
}

fn json_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}
