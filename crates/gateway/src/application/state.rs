//! Push-driven session state
//!
//! Written only by the router (and by order reservation in the request
//! gateway); read by callers through [`SharedState`] accessors that clone
//! out under a read lock.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use qxlink_core::{
    Asset, Balance, CandleHistory, CandleSeries, Deal, Instrument, PendingOrder, Profile,
    RequestId, Sentiment, SignalRecord, Tick,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::Notify;

use super::ledger::OrderLedger;
use crate::config::ClientConfig;
use crate::error::{GatewayError, GatewayResult};

/// Storage bounds; `0` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateCapacity {
    pub ticks: usize,
    pub trade_history: usize,
    pub orders: usize,
}

impl Default for StateCapacity {
    fn default() -> Self {
        Self {
            ticks: 1000,
            trade_history: 500,
            orders: 10_000,
        }
    }
}

impl From<&ClientConfig> for StateCapacity {
    fn from(config: &ClientConfig) -> Self {
        Self {
            ticks: config.tick_capacity,
            trade_history: config.trade_history_capacity,
            orders: config.order_capacity,
        }
    }
}

/// Everything the broker has pushed for this session
#[derive(Debug, Clone)]
pub struct SessionState {
    capacity: StateCapacity,
    pub(crate) balance: Option<Balance>,
    pub(crate) profile: Option<Profile>,
    pub(crate) ticks: HashMap<Asset, VecDeque<Tick>>,
    pub(crate) sentiment: HashMap<Asset, Sentiment>,
    pub(crate) candles: HashMap<Asset, CandleSeries>,
    pub(crate) candles_v2: HashMap<Asset, CandleHistory>,
    pub(crate) orders: OrderLedger,
    pub(crate) signals: HashMap<Asset, BTreeMap<i64, SignalRecord>>,
    pub(crate) instruments: Vec<Instrument>,
    pub(crate) settings: Option<Value>,
    pub(crate) trade_history: VecDeque<Deal>,
    pub(crate) last_error: Option<String>,
    pub(crate) server_time: Option<i64>,
    pub(crate) current_asset: Option<Asset>,
    pub(crate) is_demo: bool,
    pub(crate) sell_ack: Option<Value>,
    pub(crate) demo_refill_ack: Option<Value>,
    pub(crate) last_profit: Option<Decimal>,
}

impl SessionState {
    pub fn new(capacity: StateCapacity) -> Self {
        Self {
            capacity,
            balance: None,
            profile: None,
            ticks: HashMap::new(),
            sentiment: HashMap::new(),
            candles: HashMap::new(),
            candles_v2: HashMap::new(),
            orders: OrderLedger::new(capacity.orders),
            signals: HashMap::new(),
            instruments: Vec::new(),
            settings: None,
            trade_history: VecDeque::new(),
            last_error: None,
            server_time: None,
            current_asset: None,
            is_demo: true,
            sell_ack: None,
            demo_refill_ack: None,
            last_profit: None,
        }
    }

    /// Append a tick, dropping the oldest when the asset's queue is full
    pub(crate) fn push_tick(&mut self, asset: Asset, tick: Tick) {
        let limit = self.capacity.ticks;
        let queue = self.ticks.entry(asset).or_default();
        queue.push_back(tick);
        if limit > 0 {
            while queue.len() > limit {
                queue.pop_front();
            }
        }
    }

    pub(crate) fn clear_ticks(&mut self, asset: &str) {
        self.ticks.insert(asset.to_string(), VecDeque::new());
    }

    pub(crate) fn push_deal(&mut self, deal: Deal) {
        self.last_profit = Some(deal.profit);
        self.trade_history.push_back(deal);
        let limit = self.capacity.trade_history;
        if limit > 0 {
            while self.trade_history.len() > limit {
                self.trade_history.pop_front();
            }
        }
    }

    /// A new push for an asset replaces what was known for it
    pub(crate) fn set_signal(&mut self, record: SignalRecord) {
        let mut by_expiry = BTreeMap::new();
        let asset = record.asset.clone();
        by_expiry.insert(record.expiry, record);
        self.signals.insert(asset, by_expiry);
    }

    pub(crate) fn set_profile(&mut self, profile: Profile) {
        self.profile = Some(profile);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(StateCapacity::default())
    }
}

/// Shared handle to [`SessionState`]
///
/// Clones share the same state. Order updates wake
/// [`SharedState::wait_for_settlement`] callers.
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<RwLock<SessionState>>,
    order_updates: Arc<Notify>,
}

impl SharedState {
    pub fn new(capacity: StateCapacity) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionState::new(capacity))),
            order_updates: Arc::new(Notify::new()),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.inner.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.inner.write()
    }

    pub(crate) fn notify_order_update(&self) {
        self.order_updates.notify_waiters();
    }

    pub fn balance(&self) -> Option<Balance> {
        self.read().balance.clone()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.read().profile.clone()
    }

    pub fn ticks(&self, asset: &str) -> Vec<Tick> {
        self.read()
            .ticks
            .get(asset)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn sentiment(&self, asset: &str) -> Option<Sentiment> {
        self.read().sentiment.get(asset).copied()
    }

    pub fn candles(&self, asset: &str) -> Option<CandleSeries> {
        self.read().candles.get(asset).cloned()
    }

    pub fn candles_v2(&self, asset: &str) -> Option<CandleHistory> {
        self.read().candles_v2.get(asset).cloned()
    }

    pub fn order(&self, request_id: RequestId) -> Option<PendingOrder> {
        self.read().orders.get(request_id).cloned()
    }

    /// All tracked orders in issue order
    pub fn orders(&self) -> Vec<PendingOrder> {
        self.read().orders.iter().cloned().collect()
    }

    pub fn signals(&self, asset: &str) -> Vec<SignalRecord> {
        self.read()
            .signals
            .get(asset)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn instruments(&self) -> Vec<Instrument> {
        self.read().instruments.clone()
    }

    pub fn settings(&self) -> Option<Value> {
        self.read().settings.clone()
    }

    pub fn trade_history(&self) -> Vec<Deal> {
        self.read().trade_history.iter().cloned().collect()
    }

    pub fn last_error(&self) -> Option<String> {
        self.read().last_error.clone()
    }

    pub fn server_time(&self) -> Option<i64> {
        self.read().server_time
    }

    pub fn current_asset(&self) -> Option<Asset> {
        self.read().current_asset.clone()
    }

    pub fn is_demo(&self) -> bool {
        self.read().is_demo
    }

    pub fn sell_ack(&self) -> Option<Value> {
        self.read().sell_ack.clone()
    }

    pub fn demo_refill_ack(&self) -> Option<Value> {
        self.read().demo_refill_ack.clone()
    }

    pub fn last_profit(&self) -> Option<Decimal> {
        self.read().last_profit
    }

    pub fn set_current_asset(&self, asset: impl Into<Asset>) {
        self.write().current_asset = Some(asset.into());
    }

    pub fn set_demo(&self, is_demo: bool) {
        self.write().is_demo = is_demo;
    }

    pub fn set_profile(&self, profile: Profile) {
        self.write().set_profile(profile);
    }

    /// Wait until the order is settled (won or lost)
    pub async fn wait_for_settlement(
        &self,
        request_id: RequestId,
        timeout: Duration,
    ) -> GatewayResult<PendingOrder> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.order_updates.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.order(request_id) {
                Some(order) if order.status.is_settled() => return Ok(order),
                Some(_) => {}
                None => return Err(GatewayError::UnknownOrder(request_id)),
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(GatewayError::Timeout);
            }
        }
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(StateCapacity::default())
    }
}
