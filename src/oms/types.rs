//! Order and history record types

use serde::{Deserialize, Serialize};

use crate::types::{Side, Symbol, Timestamp};

/// Opaque order identifier; strategies hold these, never the order itself
pub type OrderId = String;

/// Order type - determines execution logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Execute at the best opposite price, plus slippage, at the next tick
    Market,

    /// Execute when the best opposite price touches the limit price
    /// Buy limit: eligible when best ask <= limit_price
    /// Sell limit: eligible when best bid >= limit_price
    Limit,
}

/// Order lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Submitted, waiting out the sampled submission latency
    Pending,

    /// Past latency, eligible for matching
    Active,

    /// Completely filled and moved to history
    Filled,

    /// Cancelled by the strategy
    Cancelled,
}

/// A simulated order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: Side,

    /// Unsigned quantity, always > 0
    pub qty: f64,

    /// Limit price; 0.0 for market orders
    pub price: f64,

    pub order_type: OrderType,

    /// Virtual time the strategy placed the order
    pub submission_time: Timestamp,

    /// submission_time plus sampled latency; eligible to match from here
    pub execution_time: Timestamp,

    pub status: OrderStatus,
    pub filled_qty: f64,
    pub avg_fill_price: f64,
}

impl Order {
    pub fn new(
        id: OrderId,
        symbol: Symbol,
        side: Side,
        qty: f64,
        price: f64,
        order_type: OrderType,
        submission_time: Timestamp,
        execution_time: Timestamp,
    ) -> Self {
        Self {
            id,
            symbol,
            side,
            qty,
            price,
            order_type,
            submission_time,
            execution_time,
            status: OrderStatus::Pending,
            filled_qty: 0.0,
            avg_fill_price: 0.0,
        }
    }

    /// Quantity signed by side: positive long, negative short
    pub fn signed_qty(&self) -> f64 {
        match self.side {
            Side::Buy => self.qty,
            Side::Sell => -self.qty,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Filled
    }
}

/// Acknowledgement returned by order placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderAck {
    pub order_id: OrderId,
    pub ret_code: i32,
    pub time: Timestamp,
}

/// One execution, appended to the ledger at fill time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,

    /// Fill price after slippage
    pub price: f64,

    /// Filled quantity (unsigned)
    pub qty: f64,

    pub exec_type: String,

    /// |qty| * price
    pub exec_value: f64,

    pub exec_fee: f64,
    pub fee_rate: f64,
    pub exec_time: Timestamp,
    pub order_type: OrderType,

    /// The order's limit price (0.0 for market orders)
    pub order_price: f64,
}

/// Filled-order payload mirrored from the execution flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilledOrderRecord {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub price: f64,
    pub qty: f64,
    pub avg_price: f64,
    pub cum_exec_qty: f64,
    pub cum_exec_value: f64,
    pub order_status: OrderStatus,
    pub created_time: Timestamp,
    pub updated_time: Timestamp,
}

/// Public-trade shape synthesized from the execution ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TradeTick {
    pub ts: Timestamp,
    pub price: f64,
    pub qty: f64,

    /// +1 for Buy, -1 for Sell
    pub side: i8,
}

/// Per-symbol PnL record synthesized from the current position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PnlRecord {
    pub symbol: Symbol,
    pub closed_pnl: f64,
    pub unrealized_pnl: f64,
    pub created_time: Timestamp,
    pub updated_time: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(side: Side, qty: f64) -> Order {
        Order::new(
            "ord-1".to_string(),
            Symbol::new("BTCUSDT"),
            side,
            qty,
            100.0,
            OrderType::Limit,
            1_000,
            1_500,
        )
    }

    #[test]
    fn test_new_order_is_pending() {
        let o = order(Side::Buy, 1.0);
        assert_eq!(o.status, OrderStatus::Pending);
        assert_eq!(o.filled_qty, 0.0);
        assert_eq!(o.avg_fill_price, 0.0);
        assert!(o.execution_time >= o.submission_time);
    }

    #[test]
    fn test_signed_qty() {
        assert_eq!(order(Side::Buy, 2.0).signed_qty(), 2.0);
        assert_eq!(order(Side::Sell, 2.0).signed_qty(), -2.0);
    }
}
