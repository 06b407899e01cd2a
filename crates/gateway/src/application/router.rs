//! Inbound frame classification and application
//!
//! Classification is a fixed priority chain over the decoded frame:
//!
//! ```text
//! ping / 41 → auth reject → auth accept → 451 tag → signals → balance
//!   → index → purchaseTime → ticket → deals → isDemo+balance → error
//!   → tagged payload → tick / sentiment shape → unknown
//! ```
//!
//! Each frame is applied under a single write lock of the session state.
//! Nothing here returns an error: malformed frames and correlation misses are
//! logged and dropped.

use qxlink_core::{
    Balance, CandleHistory, CandleSeries, Deal, Instrument, Sentiment, SignalRecord, Tick, json_id,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::state::SharedState;
use crate::domain::{CorrelationTag, Frame, FrameKind, InboundMessage, RouteSignal, TagTracker};
use crate::error::RouteError;
use crate::infrastructure::codec;

const NOT_MONEY: &str = "not_money";

/// Turns raw frames into state updates and reader-loop signals
pub struct EventRouter {
    state: SharedState,
    tags: TagTracker,
}

impl EventRouter {
    pub fn new(state: SharedState) -> Self {
        Self {
            state,
            tags: TagTracker::new(),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Tag waiting for its payload, if any
    pub fn awaiting_tag(&self) -> Option<&CorrelationTag> {
        self.tags.awaiting.as_ref()
    }

    /// Decode, classify and apply one frame
    pub fn route(&mut self, raw: &[u8]) -> Option<RouteSignal> {
        let frame = codec::decode(raw);
        debug!(frame = %frame.raw, "Inbound frame");
        let message = self.classify(&frame);
        self.apply(message)
    }

    /// Map a frame to exactly one message. Consumes a pending tag when the
    /// frame carries a JSON body.
    pub fn classify(&mut self, frame: &Frame) -> InboundMessage {
        match &frame.kind {
            FrameKind::Ping => return InboundMessage::Ping,
            FrameKind::Disconnect => return InboundMessage::Disconnect,
            _ => {}
        }

        if frame.raw.contains("authorization/reject") {
            return InboundMessage::AuthRejected;
        }
        if frame.raw.contains("s_authorization") {
            return InboundMessage::Authorized;
        }

        match &frame.kind {
            FrameKind::Tag(tag) => InboundMessage::Tag(CorrelationTag::parse(tag)),
            FrameKind::Json(value) => self.classify_json(value),
            FrameKind::Raw => {
                let err = RouteError::MalformedFrame(truncate(&frame.raw));
                debug!(error = %err, "Dropping frame");
                InboundMessage::Unknown
            }
            _ => InboundMessage::Ignored,
        }
    }

    fn classify_json(&mut self, value: &Value) -> InboundMessage {
        let tag = self.tags.take();

        if let Some(message) = classify_keys(value) {
            if let Some(tag) = tag {
                debug!(tag = tag.as_str(), "Tag consumed by keyed payload");
            }
            return message;
        }

        match tag {
            Some(CorrelationTag::Other(name)) => {
                debug!(tag = %name, "Unhandled correlation tag consumed");
            }
            Some(tag) => {
                return InboundMessage::Tagged {
                    tag,
                    payload: value.clone(),
                };
            }
            None => {}
        }

        classify_shape(value)
    }

    /// Apply a classified message to the session state
    pub fn apply(&mut self, message: InboundMessage) -> Option<RouteSignal> {
        match message {
            InboundMessage::Ping => Some(RouteSignal::ReplyPong),
            InboundMessage::Disconnect => {
                info!("Broker requested disconnect");
                Some(RouteSignal::Disconnected)
            }
            InboundMessage::AuthRejected => {
                warn!("Session token rejected by broker");
                Some(RouteSignal::Rejected)
            }
            InboundMessage::Authorized => {
                info!("Session authorized");
                Some(RouteSignal::Authorized)
            }
            InboundMessage::Tag(tag) => {
                debug!(tag = tag.as_str(), "Awaiting tagged payload");
                self.tags.remember(tag);
                None
            }
            InboundMessage::Signals { entries, time } => {
                self.apply_signals(&entries, time);
                None
            }
            InboundMessage::Balance(value) => {
                let balance = Balance::from_json(&value);
                debug!(live = ?balance.live, demo = ?balance.demo, "Balance update");
                self.state.write().balance = Some(balance);
                None
            }
            InboundMessage::Candles(value) => {
                self.apply_candles(&value);
                None
            }
            InboundMessage::OrderOpened(value) => {
                self.apply_order_opened(value);
                None
            }
            InboundMessage::OptionSold(value) => {
                self.state.write().sell_ack = Some(value);
                None
            }
            InboundMessage::Deals(deals) => {
                self.apply_deals(&deals);
                None
            }
            InboundMessage::DemoRefilled(value) => {
                self.state.write().demo_refill_ack = Some(value);
                None
            }
            InboundMessage::Error(reason) => {
                warn!(reason = %reason, "Broker reported error");
                let mut state = self.state.write();
                if reason == NOT_MONEY {
                    state.balance = Some(Balance::zeroed_live());
                }
                state.last_error = Some(reason.clone());
                Some(RouteSignal::Errored(reason))
            }
            InboundMessage::Tagged { tag, payload } => {
                self.apply_tagged(tag, payload);
                None
            }
            InboundMessage::Ticks(items) => {
                let mut state = self.state.write();
                for item in &items {
                    match Tick::from_tuple(item) {
                        Some((asset, tick)) => state.push_tick(asset, tick),
                        None => debug!(item = %item, "Skipping malformed tick"),
                    }
                }
                None
            }
            InboundMessage::Sentiment(items) => {
                let mut state = self.state.write();
                for item in &items {
                    match Sentiment::from_pair(item) {
                        Some((asset, sentiment)) => {
                            state.sentiment.insert(asset, sentiment);
                        }
                        None => debug!(item = %item, "Skipping malformed sentiment"),
                    }
                }
                None
            }
            InboundMessage::Ignored => None,
            InboundMessage::Unknown => {
                debug!("Unrecognised payload dropped");
                None
            }
        }
    }

    fn apply_signals(&self, entries: &[Value], time: Option<i64>) {
        let mut state = self.state.write();
        for entry in entries {
            match SignalRecord::from_entry(entry, time) {
                Some(record) => state.set_signal(record),
                None => debug!(entry = %entry, "Skipping malformed signal"),
            }
        }
    }

    fn apply_candles(&self, value: &Value) {
        let mut state = self.state.write();
        let Some(asset) = state.current_asset.clone() else {
            debug!("Candle series with no current asset");
            return;
        };
        let series = CandleSeries::from_json(asset.clone(), value);
        state.candles.insert(asset, series);
    }

    fn apply_order_opened(&self, value: Value) {
        let request_id = value
            .get("requestId")
            .and_then(json_id)
            .and_then(|id| id.parse::<i64>().ok());
        let broker_id = value.get("id").and_then(json_id);
        let close_time = value
            .get("closeTimestamp")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)));

        {
            let mut state = self.state.write();
            if let Some(close_time) = close_time {
                state.server_time = Some(close_time);
            }
            let outcome = match (request_id, broker_id) {
                (Some(request_id), Some(broker_id)) => {
                    info!(request_id, broker_id = %broker_id, "Order opened");
                    state.orders.acknowledge(request_id, broker_id, value)
                }
                _ => Err(RouteError::MalformedFrame(
                    "purchase ack without requestId or id".to_string(),
                )),
            };
            if let Err(err) = outcome {
                warn!(error = %err, "Purchase acknowledgement not applied");
            }
        }
        self.state.notify_order_update();
    }

    fn apply_deals(&self, deals: &[Value]) {
        {
            let mut state = self.state.write();
            for value in deals {
                let Some(deal) = Deal::from_json(value) else {
                    debug!(deal = %value, "Skipping malformed deal");
                    continue;
                };
                match state.orders.settle(&deal.id, deal.profit, value.clone()) {
                    Ok((request_id, status)) => {
                        info!(request_id, broker_id = %deal.id, ?status, profit = %deal.profit, "Order settled");
                    }
                    Err(err) => warn!(error = %err, "Settlement not correlated"),
                }
                state.push_deal(deal);
            }
        }
        self.state.notify_order_update();
    }

    fn apply_tagged(&self, tag: CorrelationTag, payload: Value) {
        let mut state = self.state.write();
        match tag {
            CorrelationTag::SettingsList => {
                state.settings = Some(payload);
            }
            CorrelationTag::HistoryListV2 => {
                let Some(history) = CandleHistory::from_json(&payload) else {
                    debug!("Candle history without asset");
                    return;
                };
                if state.current_asset.as_deref() == Some(history.asset.as_str()) {
                    state.candles_v2.insert(history.asset.clone(), history);
                } else {
                    debug!(asset = %history.asset, "Candle history for another asset ignored");
                }
            }
            CorrelationTag::InstrumentsList => {
                let instruments: Vec<Instrument> = payload
                    .as_array()
                    .map(|items| items.iter().filter_map(Instrument::from_tuple).collect())
                    .unwrap_or_default();
                debug!(count = instruments.len(), "Instrument list");
                state.instruments = instruments;
            }
            CorrelationTag::Other(_) => {}
        }
    }
}

fn has_key(value: &Value, key: &str) -> bool {
    value.get(key).is_some_and(|v| !v.is_null())
}

/// Keyed object payloads, in priority order
fn classify_keys(value: &Value) -> Option<InboundMessage> {
    if !value.is_object() {
        return None;
    }

    if has_key(value, "signals") {
        return Some(InboundMessage::Signals {
            entries: value["signals"].as_array().cloned().unwrap_or_default(),
            time: value
                .get("time")
                .and_then(|t| t.as_i64().or_else(|| t.as_f64().map(|f| f as i64))),
        });
    }
    if has_key(value, "liveBalance") || has_key(value, "demoBalance") {
        return Some(InboundMessage::Balance(value.clone()));
    }
    if has_key(value, "index") {
        return Some(InboundMessage::Candles(value.clone()));
    }
    if has_key(value, "purchaseTime") {
        return Some(InboundMessage::OrderOpened(value.clone()));
    }
    if has_key(value, "ticket") {
        return Some(InboundMessage::OptionSold(value.clone()));
    }
    if let Some(deals) = value.get("deals").and_then(Value::as_array) {
        return Some(InboundMessage::Deals(deals.clone()));
    }
    if has_key(value, "isDemo") && has_key(value, "balance") {
        return Some(InboundMessage::DemoRefilled(value.clone()));
    }
    if has_key(value, "error") {
        let reason = match &value["error"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Some(InboundMessage::Error(reason));
    }
    None
}

/// Untagged arrays: `[[asset, time, price, vol], ...]` or `[[asset, buy], ...]`
fn classify_shape(value: &Value) -> InboundMessage {
    let Some(items) = value.as_array() else {
        return InboundMessage::Unknown;
    };
    match items.first().and_then(Value::as_array).map(Vec::len) {
        Some(4) => InboundMessage::Ticks(items.clone()),
        Some(2) => InboundMessage::Sentiment(items.clone()),
        _ => InboundMessage::Unknown,
    }
}

fn truncate(raw: &str) -> String {
    raw.chars().take(120).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use qxlink_core::{OrderKind, OrderStatus, PendingOrder};
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn binary(value: Value) -> Vec<u8> {
        let mut raw = vec![0x04];
        raw.extend_from_slice(value.to_string().as_bytes());
        raw
    }

    fn router() -> EventRouter {
        let state = SharedState::default();
        state.set_current_asset("EURUSD_otc");
        EventRouter::new(state)
    }

    fn track_order(router: &EventRouter, request_id: i64) {
        router.state().write().orders.insert(PendingOrder::new(
            request_id,
            OrderKind::Option,
            json!({"requestId": request_id}),
            Utc::now(),
        ));
    }

    #[test]
    fn test_ping_and_disconnect() {
        let mut router = router();
        assert_eq!(router.route(b"2"), Some(RouteSignal::ReplyPong));
        assert_eq!(router.route(b"41"), Some(RouteSignal::Disconnected));
        assert_eq!(router.route(b"3"), None);
        assert_eq!(router.route(b"40"), None);
    }

    #[test]
    fn test_authorization_reject_and_accept() {
        let mut router = router();
        assert_eq!(
            router.route(br#"451-["authorization/reject",{"_placeholder":true,"num":0}]"#),
            Some(RouteSignal::Rejected)
        );
        assert_eq!(router.route(br#"42["s_authorization"]"#), Some(RouteSignal::Authorized));
        // Substring checks run before tag handling
        assert!(router.awaiting_tag().is_none());
    }

    #[test]
    fn test_history_v2_tag_maps_candle_tuples() {
        let mut router = router();
        assert_eq!(
            router.route(br#"451-["history/list/v2",{"_placeholder":true,"num":0}]"#),
            None
        );
        assert_eq!(router.awaiting_tag(), Some(&CorrelationTag::HistoryListV2));

        router.route(&binary(json!({
            "asset": "EURUSD_otc",
            "period": 60,
            "history": [[1700000000.1, 1.08]],
            "candles": [[1700000040, 1.1, 1.3, 1.4, 1.0, 17]]
        })));

        assert!(router.awaiting_tag().is_none());
        let history = router.state().candles_v2("EURUSD_otc").unwrap();
        assert_eq!(history.period, Some(60));
        assert_eq!(history.history.len(), 1);
        let candle = &history.candles[0];
        assert_eq!(candle.time, 1_700_000_040);
        assert_eq!(candle.open, dec!(1.1));
        assert_eq!(candle.close, dec!(1.3));
        assert_eq!(candle.high, dec!(1.4));
        assert_eq!(candle.low, dec!(1.0));
        assert_eq!(candle.ticks, Some(17));
    }

    #[test]
    fn test_history_v2_for_other_asset_is_ignored() {
        let mut router = router();
        router.route(br#"451-["history/list/v2",{"_placeholder":true,"num":0}]"#);
        router.route(&binary(json!({"asset": "GBPUSD", "candles": [[1, 1, 1, 1, 1, 1]]})));

        assert!(router.state().candles_v2("GBPUSD").is_none());
        assert!(router.awaiting_tag().is_none());
    }

    #[test]
    fn test_settings_and_instrument_tags() {
        let mut router = router();
        router.route(br#"451-["settings/list",{"_placeholder":true,"num":0}]"#);
        router.route(&binary(json!({"chartId": "graph", "chartType": 2})));
        assert_eq!(router.state().settings().unwrap()["chartType"], 2);

        router.route(br#"451-["instruments/list",{"_placeholder":true,"num":0}]"#);
        router.route(&binary(json!([
            [66, "EURUSD_otc", "EUR/USD (OTC)", "currency", 2, 85, 60, 30, 3, 1, 170, 0, "", [], true],
            [67, "GBPUSD", "GBP/USD", "currency", 2, 80, 60, 30, 3, 1, 170, 0, "", [], false]
        ])));
        let instruments = router.state().instruments();
        assert_eq!(instruments.len(), 2);
        assert_eq!(instruments[0].symbol, "EURUSD_otc");
        assert!(instruments[0].is_open);
        assert!(!instruments[1].is_open);
    }

    #[test]
    fn test_unknown_tag_falls_through_to_shape() {
        let mut router = router();
        router.route(br#"451-["indicator/list",{"_placeholder":true,"num":0}]"#);
        router.route(&binary(json!([["EURUSD_otc", 1700000000.5, 1.0801, 0]])));

        assert!(router.awaiting_tag().is_none());
        assert_eq!(router.state().ticks("EURUSD_otc").len(), 1);
    }

    #[test]
    fn test_keyed_payload_consumes_tag() {
        let mut router = router();
        router.route(br#"451-["settings/list",{"_placeholder":true,"num":0}]"#);
        router.route(&binary(json!({"liveBalance": 10, "demoBalance": 9000})));

        assert!(router.awaiting_tag().is_none());
        assert!(router.state().settings().is_none());
        assert_eq!(router.state().balance().unwrap().demo, Some(dec!(9000)));
    }

    #[test]
    fn test_signals_both_layouts() {
        let mut router = router();
        router.route(&binary(json!({
            "signals": [
                ["EURUSD_otc", [{"signal": "call", "timeFrame": 60}], 1700000060],
                ["GBPUSD", [[300, "put"]]]
            ],
            "time": 1700000000
        })));

        let eur = router.state().signals("EURUSD_otc");
        assert_eq!(eur.len(), 1);
        assert_eq!(eur[0].direction, "call");
        assert_eq!(eur[0].expiry, 1_700_000_060);

        let gbp = router.state().signals("GBPUSD");
        assert_eq!(gbp[0].direction, "put");
        assert_eq!(gbp[0].duration, 300);
        assert_eq!(gbp[0].expiry, 1_700_000_000);
    }

    #[test]
    fn test_balance_overwrite() {
        let mut router = router();
        router.route(&binary(json!({"liveBalance": 10.5, "demoBalance": 10000, "isDemo": 1})));
        router.route(&binary(json!({"liveBalance": 11, "demoBalance": 9990, "isDemo": 1})));

        let balance = router.state().balance().unwrap();
        assert_eq!(balance.live, Some(dec!(11)));
        assert_eq!(balance.demo, Some(dec!(9990)));
    }

    #[test]
    fn test_index_sets_candles_for_current_asset() {
        let mut router = router();
        router.route(&binary(json!({
            "index": 1700000000123i64,
            "data": [{"time": 1700000040, "open": 1.1, "close": 1.3, "high": 1.4, "low": 1.0, "ticks": 3}]
        })));

        let series = router.state().candles("EURUSD_otc").unwrap();
        assert_eq!(series.index, Some(1_700_000_000_123));
        assert_eq!(series.candles.len(), 1);
    }

    #[test]
    fn test_purchase_then_deals_settle_orders() {
        let mut router = router();
        track_order(&router, 101);
        track_order(&router, 102);

        router.route(&binary(json!({
            "id": "b-101", "requestId": 101, "purchaseTime": 1700000000, "closeTimestamp": 1700000060
        })));
        router.route(&binary(json!({
            "id": "b-102", "requestId": "102", "purchaseTime": 1700000001, "closeTimestamp": 1700000061
        })));

        let state = router.state().clone();
        assert_eq!(state.order(101).unwrap().status, OrderStatus::Open);
        assert_eq!(state.order(101).unwrap().broker_order_id.as_deref(), Some("b-101"));
        assert_eq!(state.server_time(), Some(1_700_000_061));

        router.route(&binary(json!({
            "deals": [
                {"id": "b-101", "profit": 1.7},
                {"id": "b-102", "profit": 0},
                {"id": "b-999", "profit": 5}
            ],
            "profit": 1.7
        })));

        assert_eq!(state.order(101).unwrap().status, OrderStatus::Won);
        assert_eq!(state.order(102).unwrap().status, OrderStatus::Lost);
        assert_eq!(state.order(101).unwrap().profit(), Some(dec!(1.7)));
        assert_eq!(state.trade_history().len(), 3);
        assert_eq!(state.last_profit(), Some(dec!(5)));
    }

    #[test]
    fn test_purchase_for_unknown_request_updates_time_only() {
        let mut router = router();
        router.route(&binary(json!({
            "id": "b-1", "requestId": 55, "purchaseTime": 1, "closeTimestamp": 1700000060
        })));

        assert!(router.state().orders().is_empty());
        assert_eq!(router.state().server_time(), Some(1_700_000_060));
    }

    #[test]
    fn test_purchase_time_wins_over_error() {
        let mut router = router();
        let frame = codec::decode(&binary(json!({
            "id": "b-1", "requestId": 1, "purchaseTime": 1, "error": "late"
        })));
        assert!(matches!(router.classify(&frame), InboundMessage::OrderOpened(_)));
    }

    #[test]
    fn test_ambiguous_payloads_follow_key_priority() {
        let mut router = router();

        let frame = codec::decode(&binary(json!({
            "signals": [], "time": 1, "liveBalance": 10
        })));
        assert!(matches!(router.classify(&frame), InboundMessage::Signals { .. }));

        let frame = codec::decode(&binary(json!({
            "deals": [{"id": "b-1", "profit": 1}], "error": "late"
        })));
        assert!(matches!(router.classify(&frame), InboundMessage::Deals(ref d) if d.len() == 1));

        let frame = codec::decode(&binary(json!({
            "isDemo": 1, "balance": 10000, "error": "limit"
        })));
        assert!(matches!(router.classify(&frame), InboundMessage::DemoRefilled(_)));

        // A null key does not count as present
        let frame = codec::decode(&binary(json!({"liveBalance": null, "error": "late"})));
        assert_eq!(router.classify(&frame), InboundMessage::Error("late".to_string()));
    }

    #[test]
    fn test_ticket_and_demo_refill_acks() {
        let mut router = router();
        router.route(&binary(json!({"ticket": "b-1", "profit": 0.4})));
        router.route(&binary(json!({"isDemo": 1, "balance": 10000})));

        assert_eq!(router.state().sell_ack().unwrap()["ticket"], "b-1");
        assert_eq!(router.state().demo_refill_ack().unwrap()["balance"], 10000);
    }

    #[test]
    fn test_not_money_zeroes_live_balance() {
        let mut router = router();
        router.route(&binary(json!({"liveBalance": 10, "demoBalance": 10000})));

        let signal = router.route(&binary(json!({"error": "not_money"})));

        assert_eq!(signal, Some(RouteSignal::Errored("not_money".to_string())));
        assert_eq!(router.state().balance().unwrap().live, Some(dec!(0)));
        assert_eq!(router.state().last_error().as_deref(), Some("not_money"));
    }

    #[test]
    fn test_ticks_and_sentiment_shapes() {
        let mut router = router();
        router.route(&binary(json!([
            ["EURUSD_otc", 1700000000.5, 1.0801, 0],
            ["GBPUSD", 1700000000.7, 1.2501, 0]
        ])));
        router.route(&binary(json!([["EURUSD_otc", 63], ["GBPUSD", "40"]])));

        let ticks = router.state().ticks("EURUSD_otc");
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].price, dec!(1.0801));
        assert_eq!(router.state().ticks("GBPUSD").len(), 1);

        let sentiment = router.state().sentiment("EURUSD_otc").unwrap();
        assert_eq!((sentiment.buy, sentiment.sell), (63, 37));
        assert_eq!(router.state().sentiment("GBPUSD").unwrap().sell, 60);
    }

    #[test]
    fn test_malformed_frame_leaves_state_untouched() {
        let mut router = router();
        router.route(br#"451-["settings/list",{"_placeholder":true,"num":0}]"#);

        assert_eq!(router.route(b"4x{not json"), None);
        assert_eq!(router.route(&[0x04, b'{', b'"']), None);

        let state = router.state();
        assert!(state.balance().is_none());
        assert!(state.orders().is_empty());
        assert!(state.settings().is_none());
        assert!(state.last_error().is_none());
        // Raw frames do not consume the tag
        assert_eq!(router.awaiting_tag(), Some(&CorrelationTag::SettingsList));
    }
}
