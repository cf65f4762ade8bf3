//! Append-only execution and filled-order ledgers
//!
//! Queries take the tail (the `limit` most recent records) and then apply
//! symbol and time-range post-filters. Everything returned is an owned
//! copy; callers never observe internal state.

use crate::oms::types::{ExecutionRecord, FilledOrderRecord, Order, TradeTick};
use crate::types::{Symbol, Timestamp};

/// Append-only record of everything that filled
#[derive(Debug, Default)]
pub struct HistoryLedger {
    executions: Vec<ExecutionRecord>,
    filled_orders: Vec<FilledOrderRecord>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one execution; records arrive in fill order
    pub fn record_execution(&mut self, record: ExecutionRecord) {
        self.executions.push(record);
    }

    /// Append the filled-order payload for an order leaving the pipeline
    pub fn record_filled_order(&mut self, order: &Order, updated_time: Timestamp) {
        self.filled_orders.push(FilledOrderRecord {
            order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            order_type: order.order_type,
            price: order.price,
            qty: order.qty,
            avg_price: order.avg_fill_price,
            cum_exec_qty: order.filled_qty,
            cum_exec_value: order.filled_qty * order.avg_fill_price,
            order_status: order.status,
            created_time: order.submission_time,
            updated_time,
        });
    }

    pub fn execution_count(&self) -> usize {
        self.executions.len()
    }

    /// Tail of the execution log as public-trade rows for one symbol
    pub fn trades(&self, symbol: &Symbol, limit: usize) -> Vec<TradeTick> {
        tail(&self.executions, limit)
            .iter()
            .filter(|e| &e.symbol == symbol)
            .map(|e| TradeTick {
                ts: e.exec_time,
                price: e.price,
                qty: e.qty,
                side: e.side.sign(),
            })
            .collect()
    }

    /// Tail of the execution log with symbol and inclusive time-range filters
    pub fn trade_history(
        &self,
        symbol: Option<&Symbol>,
        limit: usize,
        start_time: Option<Timestamp>,
        end_time: Option<Timestamp>,
    ) -> Vec<ExecutionRecord> {
        tail(&self.executions, limit)
            .iter()
            .filter(|e| symbol.map_or(true, |s| &e.symbol == s))
            .filter(|e| start_time.map_or(true, |t| e.exec_time >= t))
            .filter(|e| end_time.map_or(true, |t| e.exec_time <= t))
            .cloned()
            .collect()
    }

    /// Tail of the filled-order log with an optional symbol filter
    pub fn filled_orders(&self, symbol: Option<&Symbol>, limit: usize) -> Vec<FilledOrderRecord> {
        tail(&self.filled_orders, limit)
            .iter()
            .filter(|o| symbol.map_or(true, |s| &o.symbol == s))
            .cloned()
            .collect()
    }
}

/// The `limit` most recent records
fn tail<T>(records: &[T], limit: usize) -> &[T] {
    &records[records.len().saturating_sub(limit)..]
}
