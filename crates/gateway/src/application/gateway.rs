//! Outbound commands over the single-writer sink

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use qxlink_core::{
    Amount, Asset, Direction, OrderKind, PendingOrder, Price, RequestId, Timestamp,
    expiration_time, is_otc,
};
use qxlink_ports::Clock;
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::state::SharedState;
use crate::domain::FrameSink;
use crate::error::{GatewayError, GatewayResult};
use crate::infrastructure::codec;

const CHART_NOTIFICATION_VERSION: &str = "1.0.0";
const OPTION_TYPE_OTC: i64 = 100;
const OPTION_TYPE_REGULAR: i64 = 1;
const REQUEST_ID_JITTER: i64 = 100;
const REQUEST_ID_ATTEMPTS: usize = 100;
const PENDING_OPEN_DELAY_SECS: i64 = 65;

/// Option purchase
#[derive(Debug, Clone, PartialEq)]
pub struct BuyRequest {
    pub asset: Asset,
    pub amount: Amount,
    pub direction: Direction,
    /// Seconds
    pub duration: u32,
    /// Non-zero routes the order to the tournament account
    pub tournament_id: i64,
}

impl BuyRequest {
    pub fn new(asset: impl Into<Asset>, amount: Amount, direction: Direction, duration: u32) -> Self {
        Self {
            asset: asset.into(),
            amount,
            direction,
            duration,
            tournament_id: 0,
        }
    }

    pub fn with_tournament(mut self, tournament_id: i64) -> Self {
        self.tournament_id = tournament_id;
        self
    }
}

/// Deferred order opened at a time, or when a price is reached
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub asset: Asset,
    pub amount: Amount,
    pub direction: Direction,
    pub duration: u32,
    /// Defaults to 65 seconds from now when neither trigger is set
    pub open_time: Option<Timestamp>,
    /// Takes precedence over `open_time`
    pub open_price: Option<Price>,
}

impl PendingRequest {
    pub fn new(asset: impl Into<Asset>, amount: Amount, direction: Direction, duration: u32) -> Self {
        Self {
            asset: asset.into(),
            amount,
            direction,
            duration,
            open_time: None,
            open_price: None,
        }
    }

    pub fn at_time(mut self, open_time: Timestamp) -> Self {
        self.open_time = Some(open_time);
        self
    }

    pub fn at_price(mut self, open_price: Price) -> Self {
        self.open_price = Some(open_price);
        self
    }
}

/// Serializes commands into frames and writes them through one sink
///
/// Cheap to clone; clones share the sink and the session state.
#[derive(Clone)]
pub struct RequestGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    sink: Mutex<Option<Box<dyn FrameSink>>>,
    state: SharedState,
    clock: Arc<dyn Clock>,
}

impl RequestGateway {
    pub fn new(state: SharedState, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                sink: Mutex::new(None),
                state,
                clock,
            }),
        }
    }

    pub fn state(&self) -> &SharedState {
        &self.inner.state
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.inner.clock.as_ref()
    }

    /// Install the write half of a new connection, closing any previous one
    pub(crate) async fn attach(&self, sink: Box<dyn FrameSink>) {
        let previous = self.inner.sink.lock().await.replace(sink);
        if let Some(mut previous) = previous {
            if let Err(e) = previous.close().await {
                debug!(error = %e, "Closing superseded sink failed");
            }
        }
    }

    pub(crate) async fn detach(&self) -> Option<Box<dyn FrameSink>> {
        self.inner.sink.lock().await.take()
    }

    pub async fn is_attached(&self) -> bool {
        self.inner.sink.lock().await.is_some()
    }

    /// Send a close frame and drop the sink. Later sends fail with `NotConnected`.
    pub async fn close(&self) {
        if let Some(mut sink) = self.detach().await {
            if let Err(e) = sink.close().await {
                debug!(error = %e, "Close frame not delivered");
            }
        }
    }

    /// Encode and write one event
    pub async fn send(&self, action: &str, payload: Option<&Value>) -> GatewayResult<()> {
        self.send_raw(&codec::encode(action, payload)).await
    }

    /// Write a frame as-is (control packets such as `2` and `3`)
    pub async fn send_raw(&self, text: &str) -> GatewayResult<()> {
        let mut guard = self.inner.sink.lock().await;
        let sink = guard.as_mut().ok_or(GatewayError::NotConnected)?;
        sink.send_text(text.to_string()).await?;
        debug!(frame = %text, "Outbound frame");
        Ok(())
    }

    /// A request id not present in the ledger right now
    ///
    /// Orders placed through this gateway reserve their id atomically; this
    /// is for callers that need an id for their own bookkeeping.
    pub fn generate_request_id(&self) -> RequestId {
        let seed = self.inner.clock.unix_seconds();
        let state = self.inner.state.read();
        next_request_id(seed, |id| state.orders.contains(id), &mut rand::thread_rng())
    }

    /// Pick a fresh id and insert the order built from it, under one write lock
    fn reserve_order(
        &self,
        kind: OrderKind,
        build: impl FnOnce(RequestId) -> Value,
    ) -> (RequestId, Value) {
        let now = self.inner.clock.now();
        let mut state = self.inner.state.write();
        let request_id = next_request_id(
            self.inner.clock.unix_seconds(),
            |id| state.orders.contains(id),
            &mut rand::thread_rng(),
        );
        let request = build(request_id);
        state
            .orders
            .insert(PendingOrder::new(request_id, kind, request.clone(), now));
        (request_id, request)
    }

    fn release_order(&self, request_id: RequestId) {
        self.inner.state.write().orders.remove(request_id);
    }

    /// Server time when known, else the local clock
    fn server_time(&self) -> i64 {
        self.inner
            .state
            .server_time()
            .unwrap_or_else(|| self.inner.clock.unix_seconds())
    }

    /// Expiration value for an order or chart: the duration itself on OTC
    /// assets, an absolute minute boundary otherwise
    fn expiration_for(&self, asset: &str, duration: u32) -> i64 {
        if is_otc(asset) {
            i64::from(duration)
        } else {
            expiration_time(self.server_time(), i64::from(duration))
        }
    }

    pub async fn tick(&self) -> GatewayResult<()> {
        self.send("tick", None).await
    }

    /// Sends the session token
    pub async fn authorize(&self, token: &str, is_demo: bool) -> GatewayResult<()> {
        let payload = json!({
            "session": token,
            "isDemo": i32::from(is_demo),
            "tournamentId": 0,
        });
        self.send("authorization", Some(&payload)).await
    }

    /// Start streaming an asset; its tick queue starts over
    pub async fn subscribe_realtime_candle(&self, asset: &str, period: u32) -> GatewayResult<()> {
        self.inner.state.write().clear_ticks(asset);
        let payload = json!({"asset": asset, "period": period});
        self.send("instruments/update", Some(&payload)).await
    }

    pub async fn unsubscribe_realtime_candle(&self, asset: &str) -> GatewayResult<()> {
        self.send("subfor", Some(&json!(asset))).await
    }

    pub async fn follow_asset(&self, asset: &str) -> GatewayResult<()> {
        self.send("instruments/follow", Some(&json!(asset))).await
    }

    pub async fn follow_candle(&self, asset: &str) -> GatewayResult<()> {
        self.send("depth/follow", Some(&json!(asset))).await
    }

    pub async fn unfollow_candle(&self, asset: &str) -> GatewayResult<()> {
        self.send("depth/unfollow", Some(&json!(asset))).await
    }

    pub async fn chart_notifications(&self, asset: &str, version: &str) -> GatewayResult<()> {
        let payload = json!({"asset": asset, "version": version});
        self.send("chart_notification/get", Some(&payload)).await
    }

    /// Store chart settings for an asset and make it the current one
    pub async fn switch_to_asset(&self, asset: &str, duration: u32) -> GatewayResult<()> {
        self.inner.state.set_current_asset(asset);
        let payload = json!({
            "chartId": "graph",
            "settings": {
                "chartId": "graph",
                "chartType": 2,
                "currentExpirationTime": self.expiration_for(asset, duration),
                "isFastOption": false,
                "isFastAmountOption": false,
                "isIndicatorsMinimized": false,
                "isIndicatorsShowing": true,
                "isShortBetElement": false,
                "chartPeriod": 4,
                "currentAsset": {"symbol": asset},
                "dealValue": 1,
                "dealPercentValue": 1,
                "isVisible": true,
                "timePeriod": duration,
                "gridOpacity": 8,
                "isAutoScrolling": 1,
                "isOneClickTrade": true,
                "upColor": "#0FAF59",
                "downColor": "#FF6251",
            },
        });
        self.send("settings/store", Some(&payload)).await
    }

    /// The request burst a browser sends when the user picks an asset
    pub async fn simulate_asset_switch(&self, asset: &str, duration: u32) -> GatewayResult<()> {
        self.tick().await?;
        self.subscribe_realtime_candle(asset, duration).await?;
        self.chart_notifications(asset, CHART_NOTIFICATION_VERSION).await?;
        self.unfollow_candle(asset).await?;
        self.follow_candle(asset).await?;
        self.switch_to_asset(asset, duration).await
    }

    /// The request burst a browser sends right after the socket opens
    pub async fn warm_up(&self, asset: &str, period: u32) -> GatewayResult<()> {
        self.tick().await?;
        self.send("balance/list", None).await?;
        self.send("indicator/list", None).await?;
        self.send("drawing/load", None).await?;
        self.send("pending/list", None).await?;
        self.subscribe_realtime_candle(asset, period).await?;
        self.follow_asset(asset).await?;
        self.chart_notifications(asset, CHART_NOTIFICATION_VERSION).await?;
        self.follow_candle(asset).await?;
        self.switch_to_asset(asset, period).await?;
        self.tick().await
    }

    pub async fn refill_demo_balance(&self, amount: Amount) -> GatewayResult<()> {
        self.send("demo/refill", Some(&amount_value(amount))).await
    }

    pub async fn subscribe_signals(&self) -> GatewayResult<()> {
        self.send("signal/subscribe", None).await
    }

    pub async fn change_account_type(&self, is_demo: bool) -> GatewayResult<()> {
        self.inner.state.set_demo(is_demo);
        let payload = json!({"demo": i32::from(is_demo), "tournamentId": 0});
        self.send("account/change", Some(&payload)).await
    }

    /// Place an option. The order is tracked under the returned request id.
    pub async fn buy(&self, request: &BuyRequest) -> GatewayResult<RequestId> {
        let otc = is_otc(&request.asset);
        let option_type = if otc { OPTION_TYPE_OTC } else { OPTION_TYPE_REGULAR };
        let time = self.expiration_for(&request.asset, request.duration);
        let is_demo = if request.tournament_id > 0 {
            0
        } else {
            i32::from(self.inner.state.is_demo())
        };
        let action = if request.tournament_id > 0 {
            "orders/tournament/open"
        } else {
            "orders/open"
        };

        self.simulate_asset_switch(&request.asset, request.duration)
            .await?;

        let (request_id, payload) = self.reserve_order(OrderKind::Option, |request_id| {
            json!({
                "asset": request.asset,
                "amount": amount_value(request.amount),
                "time": time,
                "action": request.direction.as_str(),
                "isDemo": is_demo,
                "tournamentId": request.tournament_id,
                "requestId": request_id,
                "optionType": option_type,
            })
        });

        let sent = match self.tick().await {
            Ok(()) => self.send(action, Some(&payload)).await,
            Err(e) => Err(e),
        };
        if let Err(e) = sent {
            warn!(request_id, error = %e, "Buy not sent");
            self.release_order(request_id);
            return Err(e);
        }

        info!(
            request_id,
            asset = %request.asset,
            direction = request.direction.as_str(),
            amount = %request.amount,
            "Buy sent"
        );
        Ok(request_id)
    }

    /// Place a pending order. The broker does not echo an id for these, so
    /// the returned id only keys the local ledger entry.
    pub async fn open_pending(&self, request: &PendingRequest) -> GatewayResult<RequestId> {
        let mut payload = json!({
            "openType": i32::from(request.open_price.is_some()),
            "asset": request.asset,
            "timeframe": request.duration,
            "command": request.direction.as_str(),
            "amount": amount_value(request.amount),
        });
        match request.open_price {
            Some(price) => payload["openPrice"] = amount_value(price),
            None => {
                let open_time = request.open_time.unwrap_or_else(|| {
                    self.inner.clock.now() + ChronoDuration::seconds(PENDING_OPEN_DELAY_SECS)
                });
                payload["openTime"] = json!(open_time.format("%Y-%m-%dT%H:%M:%S").to_string());
            }
        }

        self.simulate_asset_switch(&request.asset, request.duration)
            .await?;

        let (request_id, payload) = self.reserve_order(OrderKind::Pending, |_| payload);
        if let Err(e) = self.send("pending/create", Some(&payload)).await {
            warn!(request_id, error = %e, "Pending order not sent");
            self.release_order(request_id);
            return Err(e);
        }
        info!(request_id, asset = %request.asset, "Pending order sent");
        Ok(request_id)
    }

    /// Sell an open option back before expiry
    pub async fn sell_option(&self, broker_order_id: &str) -> GatewayResult<()> {
        self.send("orders/cancel", Some(&json!({"ticket": broker_order_id})))
            .await
    }

    /// Request a page of candle history; the answer arrives as an `index` push
    pub async fn get_candles(
        &self,
        asset: &str,
        offset: i64,
        period: u32,
        index: i64,
    ) -> GatewayResult<()> {
        let payload = json!({
            "asset": asset,
            "index": index,
            "time": self.server_time(),
            "offset": offset,
            "period": period,
        });
        self.send("history/load", Some(&payload)).await
    }
}

/// Seed plus jitter, re-rolled on collision
///
/// Falls back to a linear probe above the jitter window when every roll
/// collides.
fn next_request_id(
    seed: i64,
    taken: impl Fn(RequestId) -> bool,
    rng: &mut impl Rng,
) -> RequestId {
    for _ in 0..REQUEST_ID_ATTEMPTS {
        let candidate = seed + rng.gen_range(1..=REQUEST_ID_JITTER);
        if !taken(candidate) {
            return candidate;
        }
    }
    let mut candidate = seed + REQUEST_ID_JITTER + 1;
    while taken(candidate) {
        candidate += 1;
    }
    candidate
}

/// Amounts go out as JSON numbers, integral ones without a fraction
fn amount_value(amount: Decimal) -> Value {
    if amount.fract().is_zero() {
        if let Some(whole) = amount.to_i64() {
            return json!(whole);
        }
    }
    amount.to_f64().map(|f| json!(f)).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Connector, HandshakeHeaders};
    use crate::infrastructure::{ChannelConnector, ChannelPeer};
    use chrono::{TimeZone, Utc};
    use qxlink_core::OrderStatus;
    use rust_decimal_macros::dec;
    use std::collections::HashSet;

    const NOW: i64 = 1_700_000_400;

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now(&self) -> Timestamp {
            Utc.timestamp_opt(self.0, 0).unwrap()
        }
    }

    fn gateway() -> RequestGateway {
        RequestGateway::new(SharedState::default(), Arc::new(FixedClock(NOW)))
    }

    async fn attached() -> (RequestGateway, ChannelPeer) {
        let gateway = gateway();
        let (connector, mut peers) = ChannelConnector::pair();
        let (sink, _source) = connector
            .open("ws://local/", &HandshakeHeaders::default())
            .await
            .unwrap();
        gateway.attach(sink).await;
        (gateway, peers.recv().await.unwrap())
    }

    fn drain(peer: &mut ChannelPeer) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = peer.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }

    fn event(frame: &str) -> (String, Option<Value>) {
        match codec::decode(frame.as_bytes()).kind {
            crate::domain::FrameKind::Event { action, payload } => (action, payload),
            other => panic!("not an event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_without_connection() {
        let gateway = gateway();
        assert!(matches!(gateway.tick().await, Err(GatewayError::NotConnected)));
        assert!(!gateway.is_attached().await);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (gateway, _peer) = attached().await;
        gateway.close().await;
        assert!(matches!(
            gateway.send_raw("2").await,
            Err(GatewayError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_simple_commands_frames() {
        let (gateway, mut peer) = attached().await;
        gateway.tick().await.unwrap();
        gateway.follow_asset("EURUSD_otc").await.unwrap();
        gateway.unsubscribe_realtime_candle("EURUSD_otc").await.unwrap();
        gateway.subscribe_signals().await.unwrap();
        gateway.refill_demo_balance(dec!(10000)).await.unwrap();
        gateway.sell_option("b-1").await.unwrap();

        assert_eq!(
            drain(&mut peer),
            vec![
                r#"42["tick"]"#,
                r#"42["instruments/follow","EURUSD_otc"]"#,
                r#"42["subfor","EURUSD_otc"]"#,
                r#"42["signal/subscribe"]"#,
                r#"42["demo/refill",10000]"#,
                r#"42["orders/cancel",{"ticket":"b-1"}]"#,
            ]
        );
    }

    #[tokio::test]
    async fn test_subscribe_clears_tick_queue() {
        let (gateway, mut peer) = attached().await;
        gateway.state().write().push_tick(
            "EURUSD_otc".to_string(),
            qxlink_core::Tick {
                time: Utc::now(),
                price: dec!(1.1),
            },
        );

        gateway.subscribe_realtime_candle("EURUSD_otc", 60).await.unwrap();

        assert!(gateway.state().ticks("EURUSD_otc").is_empty());
        let (action, payload) = event(&drain(&mut peer)[0]);
        assert_eq!(action, "instruments/update");
        assert_eq!(payload.unwrap(), json!({"asset": "EURUSD_otc", "period": 60}));
    }

    #[tokio::test]
    async fn test_switch_to_asset_sets_current_asset() {
        let (gateway, mut peer) = attached().await;
        gateway.switch_to_asset("EURUSD", 60).await.unwrap();

        assert_eq!(gateway.state().current_asset().as_deref(), Some("EURUSD"));
        let (action, payload) = event(&drain(&mut peer)[0]);
        let payload = payload.unwrap();
        assert_eq!(action, "settings/store");
        assert_eq!(payload["settings"]["currentAsset"]["symbol"], "EURUSD");
        assert_eq!(payload["settings"]["timePeriod"], 60);
        assert_eq!(
            payload["settings"]["currentExpirationTime"],
            expiration_time(NOW, 60)
        );
    }

    #[tokio::test]
    async fn test_warm_up_sequence() {
        let (gateway, mut peer) = attached().await;
        gateway.warm_up("EURUSD_otc", 60).await.unwrap();

        let actions: Vec<_> = drain(&mut peer).iter().map(|f| event(f).0).collect();
        assert_eq!(
            actions,
            vec![
                "tick",
                "balance/list",
                "indicator/list",
                "drawing/load",
                "pending/list",
                "instruments/update",
                "instruments/follow",
                "chart_notification/get",
                "depth/follow",
                "settings/store",
                "tick",
            ]
        );
    }

    #[tokio::test]
    async fn test_buy_otc_order() {
        let (gateway, mut peer) = attached().await;
        let request_id = gateway
            .buy(&BuyRequest::new("EURUSD_otc", dec!(5), Direction::Call, 60))
            .await
            .unwrap();

        let frames = drain(&mut peer);
        let actions: Vec<_> = frames.iter().map(|f| event(f).0).collect();
        assert_eq!(
            actions,
            vec![
                "tick",
                "instruments/update",
                "chart_notification/get",
                "depth/unfollow",
                "depth/follow",
                "settings/store",
                "tick",
                "orders/open",
            ]
        );

        let payload = event(frames.last().unwrap()).1.unwrap();
        assert_eq!(payload["asset"], "EURUSD_otc");
        assert_eq!(payload["amount"], 5);
        assert_eq!(payload["time"], 60);
        assert_eq!(payload["action"], "call");
        assert_eq!(payload["isDemo"], 1);
        assert_eq!(payload["optionType"], 100);
        assert_eq!(payload["requestId"], request_id);

        let order = gateway.state().order(request_id).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.request, payload);
        assert!(request_id > NOW && request_id <= NOW + REQUEST_ID_JITTER);
    }

    #[tokio::test]
    async fn test_buy_regular_asset_uses_expiration() {
        let (gateway, mut peer) = attached().await;
        gateway.state().write().server_time = Some(NOW + 40);

        gateway
            .buy(&BuyRequest::new("EURUSD", dec!(1.5), Direction::Put, 120))
            .await
            .unwrap();

        let payload = event(drain(&mut peer).last().unwrap()).1.unwrap();
        assert_eq!(payload["optionType"], 1);
        assert_eq!(payload["time"], expiration_time(NOW + 40, 120));
        assert_eq!(payload["amount"], 1.5);
        assert_eq!(payload["action"], "put");
    }

    #[tokio::test]
    async fn test_tournament_buy() {
        let (gateway, mut peer) = attached().await;
        gateway
            .buy(&BuyRequest::new("EURUSD_otc", dec!(1), Direction::Call, 60).with_tournament(7))
            .await
            .unwrap();

        let (action, payload) = event(drain(&mut peer).last().unwrap());
        assert_eq!(action, "orders/tournament/open");
        let payload = payload.unwrap();
        assert_eq!(payload["isDemo"], 0);
        assert_eq!(payload["tournamentId"], 7);
    }

    #[tokio::test]
    async fn test_buy_uses_account_type() {
        let (gateway, mut peer) = attached().await;
        gateway.change_account_type(false).await.unwrap();
        let (action, payload) = event(&drain(&mut peer)[0]);
        assert_eq!(action, "account/change");
        assert_eq!(payload.unwrap(), json!({"demo": 0, "tournamentId": 0}));

        gateway
            .buy(&BuyRequest::new("EURUSD_otc", dec!(1), Direction::Call, 60))
            .await
            .unwrap();
        let payload = event(drain(&mut peer).last().unwrap()).1.unwrap();
        assert_eq!(payload["isDemo"], 0);
    }

    #[tokio::test]
    async fn test_buy_without_connection_leaves_no_order() {
        let gateway = gateway();
        let result = gateway
            .buy(&BuyRequest::new("EURUSD_otc", dec!(1), Direction::Call, 60))
            .await;
        assert!(matches!(result, Err(GatewayError::NotConnected)));
        assert!(gateway.state().orders().is_empty());
    }

    #[tokio::test]
    async fn test_open_pending_by_price_and_time() {
        let (gateway, mut peer) = attached().await;
        let by_price = gateway
            .open_pending(
                &PendingRequest::new("EURUSD_otc", dec!(2), Direction::Put, 60).at_price(dec!(1.25)),
            )
            .await
            .unwrap();
        let payload = event(drain(&mut peer).last().unwrap()).1.unwrap();
        assert_eq!(payload["openType"], 1);
        assert_eq!(payload["openPrice"], 1.25);
        assert_eq!(payload["command"], "put");
        assert!(payload.get("openTime").is_none());

        let by_time = gateway
            .open_pending(&PendingRequest::new("EURUSD_otc", dec!(2), Direction::Call, 60))
            .await
            .unwrap();
        let (action, payload) = event(drain(&mut peer).last().unwrap());
        let payload = payload.unwrap();
        assert_eq!(action, "pending/create");
        assert_eq!(payload["openType"], 0);
        assert_eq!(payload["openTime"], "2023-11-14T22:21:05");

        assert_ne!(by_price, by_time);
        assert_eq!(gateway.state().order(by_time).unwrap().kind, OrderKind::Pending);
    }

    #[tokio::test]
    async fn test_get_candles_payload() {
        let (gateway, mut peer) = attached().await;
        gateway.get_candles("EURUSD_otc", 3600, 60, 1700000000123).await.unwrap();

        let (action, payload) = event(&drain(&mut peer)[0]);
        assert_eq!(action, "history/load");
        assert_eq!(
            payload.unwrap(),
            json!({"asset": "EURUSD_otc", "index": 1700000000123i64, "time": NOW, "offset": 3600, "period": 60})
        );
    }

    #[tokio::test]
    async fn test_authorize_payload() {
        let (gateway, mut peer) = attached().await;
        gateway.authorize("token-1", true).await.unwrap();
        assert_eq!(
            drain(&mut peer),
            vec![r#"42["authorization",{"session":"token-1","isDemo":1,"tournamentId":0}]"#]
        );
    }

    #[test]
    fn test_next_request_id_avoids_taken() {
        let taken: HashSet<i64> = (NOW + 1..=NOW + 99).collect();
        let mut rng = rand::thread_rng();
        let id = next_request_id(NOW, |id| taken.contains(&id), &mut rng);
        assert!(!taken.contains(&id));
        assert!(id > NOW);
    }

    #[test]
    fn test_next_request_id_falls_back_when_window_full() {
        let taken: HashSet<i64> = (NOW + 1..=NOW + 105).collect();
        let mut rng = rand::thread_rng();
        assert_eq!(next_request_id(NOW, |id| taken.contains(&id), &mut rng), NOW + 106);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_never_collide() {
        let gateway = gateway();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let gateway = gateway.clone();
            handles.push(tokio::spawn(async move {
                (0..40)
                    .map(|_| gateway.reserve_order(OrderKind::Option, |id| json!({"requestId": id})).0)
                    .collect::<Vec<_>>()
            }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(seen.insert(id), "duplicate request id {}", id);
            }
        }
        assert_eq!(seen.len(), 320);
        assert_eq!(gateway.state().orders().len(), 320);
        assert!(!seen.contains(&gateway.generate_request_id()));
    }

    #[test]
    fn test_amount_value() {
        assert_eq!(amount_value(dec!(5)), json!(5));
        assert_eq!(amount_value(dec!(5.00)), json!(5));
        assert_eq!(amount_value(dec!(1.5)), json!(1.5));
    }
}
