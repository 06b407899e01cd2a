use std::collections::HashMap;

use indexmap::IndexMap;
use qxlink_core::{BrokerOrderId, OrderStatus, PendingOrder, RequestId};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::RouteError;

/// Orders keyed by request id, in issue order
///
/// Broker ids are indexed the moment an order is acknowledged, so settlement
/// lookups never scan the ledger. With a capacity set, the oldest settled
/// orders are evicted first; unsettled orders are never evicted.
#[derive(Debug, Clone, Default)]
pub struct OrderLedger {
    orders: IndexMap<RequestId, PendingOrder>,
    by_broker_id: HashMap<BrokerOrderId, RequestId>,
    capacity: usize,
}

impl OrderLedger {
    /// `capacity == 0` keeps every order
    pub fn new(capacity: usize) -> Self {
        Self {
            orders: IndexMap::new(),
            by_broker_id: HashMap::new(),
            capacity,
        }
    }

    pub fn contains(&self, request_id: RequestId) -> bool {
        self.orders.contains_key(&request_id)
    }

    pub fn get(&self, request_id: RequestId) -> Option<&PendingOrder> {
        self.orders.get(&request_id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingOrder> {
        self.orders.values()
    }

    pub fn request_id_for(&self, broker_order_id: &str) -> Option<RequestId> {
        self.by_broker_id.get(broker_order_id).copied()
    }

    pub fn insert(&mut self, order: PendingOrder) {
        if let Some(broker_id) = &order.broker_order_id {
            self.by_broker_id.insert(broker_id.clone(), order.request_id);
        }
        self.orders.insert(order.request_id, order);
        self.evict(None);
    }

    pub fn remove(&mut self, request_id: RequestId) -> Option<PendingOrder> {
        let order = self.orders.shift_remove(&request_id)?;
        if let Some(broker_id) = &order.broker_order_id {
            self.by_broker_id.remove(broker_id);
        }
        Some(order)
    }

    /// Attach the broker's acknowledgement to the order it answers
    pub fn acknowledge(
        &mut self,
        request_id: RequestId,
        broker_order_id: BrokerOrderId,
        response: Value,
    ) -> Result<(), RouteError> {
        let order = self
            .orders
            .get_mut(&request_id)
            .ok_or_else(|| RouteError::CorrelationMiss(format!("request {}", request_id)))?;
        self.by_broker_id.insert(broker_order_id.clone(), request_id);
        order.acknowledge(broker_order_id, response);
        Ok(())
    }

    /// Settle the order the broker knows as `broker_order_id`
    pub fn settle(
        &mut self,
        broker_order_id: &str,
        profit: Decimal,
        deal: Value,
    ) -> Result<(RequestId, OrderStatus), RouteError> {
        let request_id = self
            .request_id_for(broker_order_id)
            .ok_or_else(|| RouteError::CorrelationMiss(format!("broker order {}", broker_order_id)))?;
        let order = self
            .orders
            .get_mut(&request_id)
            .ok_or_else(|| RouteError::CorrelationMiss(format!("request {}", request_id)))?;
        let status = order.settle(profit, deal);
        self.evict(Some(request_id));
        Ok((request_id, status))
    }

    /// Drop the oldest settled orders while over capacity. `keep` survives
    /// the pass so a waiter can still read the settlement it was woken for.
    fn evict(&mut self, keep: Option<RequestId>) {
        if self.capacity == 0 {
            return;
        }
        while self.orders.len() > self.capacity {
            let Some(index) = self
                .orders
                .values()
                .position(|o| o.status.is_settled() && Some(o.request_id) != keep)
            else {
                break;
            };
            if let Some((_, order)) = self.orders.shift_remove_index(index) {
                if let Some(broker_id) = &order.broker_order_id {
                    self.by_broker_id.remove(broker_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use qxlink_core::OrderKind;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn order(request_id: RequestId) -> PendingOrder {
        PendingOrder::new(
            request_id,
            OrderKind::Option,
            json!({"requestId": request_id}),
            Utc::now(),
        )
    }

    #[test]
    fn test_acknowledge_indexes_broker_id() {
        let mut ledger = OrderLedger::new(0);
        ledger.insert(order(1));

        ledger.acknowledge(1, "b-1".to_string(), json!({"id": "b-1"})).unwrap();

        assert_eq!(ledger.request_id_for("b-1"), Some(1));
        assert_eq!(ledger.get(1).unwrap().status, OrderStatus::Open);
    }

    #[test]
    fn test_acknowledge_unknown_request_is_miss() {
        let mut ledger = OrderLedger::new(0);
        let err = ledger.acknowledge(9, "b-9".to_string(), json!({})).unwrap_err();
        assert!(matches!(err, RouteError::CorrelationMiss(_)));
        assert_eq!(ledger.request_id_for("b-9"), None);
    }

    #[test]
    fn test_settle_by_broker_id() {
        let mut ledger = OrderLedger::new(0);
        ledger.insert(order(1));
        ledger.insert(order(2));
        ledger.acknowledge(1, "b-1".to_string(), json!({})).unwrap();
        ledger.acknowledge(2, "b-2".to_string(), json!({})).unwrap();

        assert_eq!(
            ledger.settle("b-1", dec!(0.85), json!({"profit": 0.85})).unwrap(),
            (1, OrderStatus::Won)
        );
        assert_eq!(
            ledger.settle("b-2", dec!(0), json!({"profit": 0})).unwrap(),
            (2, OrderStatus::Lost)
        );
        assert!(ledger.settle("b-3", dec!(1), json!({})).is_err());
    }

    #[test]
    fn test_eviction_prefers_oldest_settled() {
        let mut ledger = OrderLedger::new(2);
        ledger.insert(order(1));
        ledger.insert(order(2));
        ledger.acknowledge(2, "b-2".to_string(), json!({})).unwrap();
        ledger.settle("b-2", dec!(1), json!({})).unwrap();

        ledger.insert(order(3));

        assert_eq!(ledger.len(), 2);
        assert!(ledger.contains(1));
        assert!(!ledger.contains(2));
        assert!(ledger.contains(3));
        assert_eq!(ledger.request_id_for("b-2"), None);
    }

    #[test]
    fn test_settled_order_survives_its_own_settlement() {
        let mut ledger = OrderLedger::new(1);
        ledger.insert(order(1));
        ledger.insert(order(2));
        ledger.acknowledge(1, "b-1".to_string(), json!({})).unwrap();
        ledger.acknowledge(2, "b-2".to_string(), json!({})).unwrap();

        ledger.settle("b-2", dec!(1), json!({"profit": 1})).unwrap();
        assert_eq!(ledger.get(2).unwrap().status, OrderStatus::Won);
        assert_eq!(ledger.len(), 2);

        // The next settlement may evict the earlier one
        ledger.settle("b-1", dec!(-1), json!({"profit": -1})).unwrap();
        assert_eq!(ledger.get(1).unwrap().status, OrderStatus::Lost);
        assert!(!ledger.contains(2));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_unsettled_orders_never_evicted() {
        let mut ledger = OrderLedger::new(1);
        ledger.insert(order(1));
        ledger.insert(order(2));

        assert_eq!(ledger.len(), 2);
        let ids: Vec<_> = ledger.iter().map(|o| o.request_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
