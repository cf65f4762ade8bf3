//! Matching rules against the current snapshot
//!
//! Fills are all-or-nothing at the touch: market orders take the slipped
//! best opposite price for the full quantity, limit orders fill at the
//! better of their limit and the touch price when the probability draw
//! passes. There is no walking of deeper levels.

use crate::oms::types::{ExecutionRecord, Order, OrderStatus, OrderType};
use crate::sim::latency::LatencyModel;
use crate::types::{Side, Snapshot, Timestamp};

/// Candidate fill price with the maker/taker flag that picks the fee rate
#[derive(Debug, Clone, Copy)]
pub struct FillPrice {
    pub price: f64,
    pub is_maker: bool,
}

/// Applies fill rules and fees to active orders
#[derive(Debug, Clone, Copy)]
pub struct MatchingEngine {
    maker_fee: f64,
    taker_fee: f64,
}

impl MatchingEngine {
    pub fn new(maker_fee: f64, taker_fee: f64) -> Self {
        Self {
            maker_fee,
            taker_fee,
        }
    }

    /// Taker and maker fee rates, in that order
    pub fn fees(&self) -> (f64, f64) {
        (self.taker_fee, self.maker_fee)
    }

    /// Check whether an order fills against this snapshot
    ///
    /// Draws from the latency model: slippage for market orders, one
    /// Bernoulli sample per limit touch. A failed draw returns None and
    /// the order stays active.
    pub fn check_fill(
        &self,
        order: &Order,
        snapshot: &Snapshot,
        latency: &mut LatencyModel,
    ) -> Option<FillPrice> {
        match (order.order_type, order.side) {
            (OrderType::Market, side) => {
                let opposite = match side {
                    Side::Buy => snapshot.best_ask(),
                    Side::Sell => snapshot.best_bid(),
                }?;
                Some(FillPrice {
                    price: latency.apply_slippage(opposite.price, side),
                    is_maker: false,
                })
            }

            (OrderType::Limit, Side::Buy) => {
                let ask = snapshot.best_ask()?;
                if ask.price <= order.price && latency.should_fill_limit() {
                    Some(FillPrice {
                        price: order.price.min(ask.price),
                        is_maker: true,
                    })
                } else {
                    None
                }
            }

            (OrderType::Limit, Side::Sell) => {
                let bid = snapshot.best_bid()?;
                if bid.price >= order.price && latency.should_fill_limit() {
                    Some(FillPrice {
                        price: order.price.max(bid.price),
                        is_maker: true,
                    })
                } else {
                    None
                }
            }
        }
    }

    /// Fill the full quantity, mutate the order to Filled, and build the
    /// execution record
    pub fn execute_fill(
        &self,
        order: &mut Order,
        fill: FillPrice,
        exec_time: Timestamp,
    ) -> ExecutionRecord {
        let fee_rate = if fill.is_maker {
            self.maker_fee
        } else {
            self.taker_fee
        };
        let fee = order.qty * fill.price * fee_rate;

        order.status = OrderStatus::Filled;
        order.filled_qty = order.qty;
        order.avg_fill_price = fill.price;

        ExecutionRecord {
            order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            price: fill.price,
            qty: order.qty,
            exec_type: "Trade".to_string(),
            exec_value: order.qty * fill.price,
            exec_fee: fee,
            fee_rate,
            exec_time,
            order_type: order.order_type,
            order_price: order.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LatencyConfig;
    use crate::types::{BookLevel, Symbol};

    fn snapshot(bid: f64, ask: f64) -> Snapshot {
        Snapshot::new_unchecked(
            1_000,
            vec![BookLevel::new(bid, 1.0)],
            vec![BookLevel::new(ask, 1.0)],
            None,
        )
    }

    fn order(side: Side, order_type: OrderType, price: f64) -> Order {
        Order::new(
            "ord-1".to_string(),
            Symbol::new("BTCUSDT"),
            side,
            1.0,
            price,
            order_type,
            0,
            0,
        )
    }

    fn latency(slippage_bps: f64, fill_probability: f64) -> LatencyModel {
        LatencyModel::new(
            LatencyConfig {
                market_order_slippage_bps: slippage_bps,
                limit_order_fill_probability: fill_probability,
                ..LatencyConfig::frictionless()
            },
            Some(42),
        )
    }

    #[test]
    fn test_market_buy_pays_slipped_ask() {
        let engine = MatchingEngine::new(0.0001, 0.0006);
        let mut lat = latency(1.0, 1.0);
        let order = order(Side::Buy, OrderType::Market, 0.0);

        let fill = engine
            .check_fill(&order, &snapshot(99.0, 101.0), &mut lat)
            .unwrap();
        assert_eq!(fill.price, 101.0 * 1.0001);
        assert!(!fill.is_maker);
    }

    #[test]
    fn test_market_sell_hits_slipped_bid() {
        let engine = MatchingEngine::new(0.0001, 0.0006);
        let mut lat = latency(1.0, 1.0);
        let order = order(Side::Sell, OrderType::Market, 0.0);

        let fill = engine
            .check_fill(&order, &snapshot(99.0, 101.0), &mut lat)
            .unwrap();
        assert_eq!(fill.price, 99.0 * 0.9999);
    }

    #[test]
    fn test_market_order_waits_on_empty_side() {
        let engine = MatchingEngine::new(0.0001, 0.0006);
        let mut lat = latency(0.0, 1.0);
        let order = order(Side::Buy, OrderType::Market, 0.0);
        let empty_asks =
            Snapshot::new_unchecked(1_000, vec![BookLevel::new(99.0, 1.0)], vec![], None);

        assert!(engine.check_fill(&order, &empty_asks, &mut lat).is_none());
    }

    #[test]
    fn test_limit_buy_fills_at_touch() {
        let engine = MatchingEngine::new(0.0001, 0.0006);
        let mut lat = latency(0.0, 1.0);
        let order = order(Side::Buy, OrderType::Limit, 100.0);

        // Ask above the limit: no touch
        assert!(engine
            .check_fill(&order, &snapshot(99.0, 101.0), &mut lat)
            .is_none());

        // Ask through the limit: fill at the better price
        let fill = engine
            .check_fill(&order, &snapshot(98.0, 99.5), &mut lat)
            .unwrap();
        assert_eq!(fill.price, 99.5);
        assert!(fill.is_maker);
    }

    #[test]
    fn test_limit_sell_fills_at_touch() {
        let engine = MatchingEngine::new(0.0001, 0.0006);
        let mut lat = latency(0.0, 1.0);
        let order = order(Side::Sell, OrderType::Limit, 100.0);

        assert!(engine
            .check_fill(&order, &snapshot(99.0, 101.0), &mut lat)
            .is_none());

        let fill = engine
            .check_fill(&order, &snapshot(100.5, 101.0), &mut lat)
            .unwrap();
        assert_eq!(fill.price, 100.5);
    }

    #[test]
    fn test_limit_touch_gated_by_probability() {
        let engine = MatchingEngine::new(0.0001, 0.0006);
        let mut never = latency(0.0, 0.0);
        let order = order(Side::Buy, OrderType::Limit, 100.0);

        for _ in 0..50 {
            assert!(engine
                .check_fill(&order, &snapshot(98.0, 99.0), &mut never)
                .is_none());
        }
    }

    #[test]
    fn test_execute_fill_charges_taker_for_market() {
        let engine = MatchingEngine::new(0.0001, 0.0006);
        let mut order = order(Side::Buy, OrderType::Market, 0.0);
        let record = engine.execute_fill(
            &mut order,
            FillPrice {
                price: 101.0,
                is_maker: false,
            },
            5_000,
        );

        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_qty, 1.0);
        assert_eq!(order.avg_fill_price, 101.0);
        assert_eq!(record.fee_rate, 0.0006);
        assert_eq!(record.exec_fee, 101.0 * 0.0006);
        assert_eq!(record.exec_value, 101.0);
        assert_eq!(record.exec_time, 5_000);
    }

    #[test]
    fn test_execute_fill_charges_maker_for_limit() {
        let engine = MatchingEngine::new(0.0001, 0.0006);
        let mut order = order(Side::Sell, OrderType::Limit, 100.0);
        let record = engine.execute_fill(
            &mut order,
            FillPrice {
                price: 100.0,
                is_maker: true,
            },
            5_000,
        );

        assert_eq!(record.fee_rate, 0.0001);
        assert_eq!(record.order_price, 100.0);
    }
}
