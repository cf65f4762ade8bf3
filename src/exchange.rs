//! Exchange operation surface
//!
//! The signatures a strategy codes against. The simulation engine
//! implements this trait; a live REST/WebSocket client would implement the
//! same surface, making the two swappable underneath a strategy.

use std::collections::HashMap;

use anyhow::Result;

use crate::oms::{
    ExecutionRecord, FilledOrderRecord, OrderType, PlaceOrderAck, PnlRecord, PositionSnapshot,
    TradeTick,
};
use crate::sim::market::OrderBookView;
use crate::sim::SimulationEngine;
use crate::types::{Symbol, Timestamp};

/// Operations a strategy calls on an exchange, simulated or live
pub trait Exchange {
    // --- Trading ---

    /// Place an order; the sign of `qty` picks the side
    fn place_order(
        &mut self,
        symbol: &Symbol,
        qty: f64,
        price: Option<f64>,
        order_type: OrderType,
    ) -> Result<PlaceOrderAck>;

    /// Cancel one order; 0 on success, nonzero otherwise
    fn cancel_order(&mut self, symbol: &Symbol, order_id: &str) -> i32;

    /// Cancel every working order for a symbol
    fn cancel_all_orders(&mut self, symbol: &Symbol) -> i32;

    /// Flatten positions; per symbol `Some(ret_code)` or `None` when flat
    fn close_positions(&mut self, symbols: &[Symbol]) -> HashMap<Symbol, Option<i32>>;

    /// Set position leverage
    fn set_leverage(&mut self, symbol: &Symbol, leverage: f64) -> i32;

    // --- Market data ---

    fn get_mid(&self, symbol: &Symbol) -> Result<f64>;

    fn get_bid(&self, symbol: &Symbol) -> Result<(f64, f64)>;

    fn get_ask(&self, symbol: &Symbol) -> Result<(f64, f64)>;

    fn get_orderbook(&self, symbol: &Symbol, depth: usize) -> Result<OrderBookView>;

    /// Measured or simulated feed latency in milliseconds
    fn get_latency(&self, symbol: &Symbol) -> f64;

    // --- Account ---

    fn get_wallet_balance(&self) -> f64;

    /// `(taker_fee, maker_fee)` rates
    fn get_fees(&self, symbol: &Symbol) -> (f64, f64);

    fn get_positions(&self, symbols: &[Symbol]) -> HashMap<Symbol, PositionSnapshot>;

    // --- History ---

    fn get_trades(&self, symbol: &Symbol, limit: usize) -> Vec<TradeTick>;

    fn get_trade_history(
        &self,
        symbol: Option<&Symbol>,
        limit: usize,
        start_time: Option<Timestamp>,
        end_time: Option<Timestamp>,
    ) -> Vec<ExecutionRecord>;

    fn get_filled_orders(&self, symbol: Option<&Symbol>, limit: usize)
        -> Vec<FilledOrderRecord>;

    fn get_pnl(&self, symbol: Option<&Symbol>, limit: usize) -> Vec<PnlRecord>;

    // --- Time ---

    /// Wait `seconds`; virtual in simulation, wall-clock on a live client.
    /// Returns false when the underlying data is exhausted.
    fn wait(&mut self, seconds: f64) -> bool;

    fn wait_seconds(&mut self, seconds: f64) -> bool;

    fn wait_minutes(&mut self, minutes: f64) -> bool;

    /// Current time in nanoseconds
    fn get_current_time(&self) -> Timestamp;
}

impl Exchange for SimulationEngine {
    fn place_order(
        &mut self,
        symbol: &Symbol,
        qty: f64,
        price: Option<f64>,
        order_type: OrderType,
    ) -> Result<PlaceOrderAck> {
        Ok(SimulationEngine::place_order(self, symbol, qty, price, order_type)?)
    }

    fn cancel_order(&mut self, symbol: &Symbol, order_id: &str) -> i32 {
        SimulationEngine::cancel_order(self, symbol, order_id)
    }

    fn cancel_all_orders(&mut self, symbol: &Symbol) -> i32 {
        SimulationEngine::cancel_all_orders(self, symbol)
    }

    fn close_positions(&mut self, symbols: &[Symbol]) -> HashMap<Symbol, Option<i32>> {
        SimulationEngine::close_positions(self, symbols)
    }

    fn set_leverage(&mut self, symbol: &Symbol, leverage: f64) -> i32 {
        SimulationEngine::set_leverage(self, symbol, leverage)
    }

    fn get_mid(&self, symbol: &Symbol) -> Result<f64> {
        Ok(SimulationEngine::get_mid(self, symbol)?)
    }

    fn get_bid(&self, symbol: &Symbol) -> Result<(f64, f64)> {
        Ok(SimulationEngine::get_bid(self, symbol)?)
    }

    fn get_ask(&self, symbol: &Symbol) -> Result<(f64, f64)> {
        Ok(SimulationEngine::get_ask(self, symbol)?)
    }

    fn get_orderbook(&self, symbol: &Symbol, depth: usize) -> Result<OrderBookView> {
        Ok(SimulationEngine::get_orderbook(self, symbol, depth)?)
    }

    fn get_latency(&self, symbol: &Symbol) -> f64 {
        SimulationEngine::get_latency(self, symbol)
    }

    fn get_wallet_balance(&self) -> f64 {
        SimulationEngine::get_wallet_balance(self)
    }

    fn get_fees(&self, symbol: &Symbol) -> (f64, f64) {
        SimulationEngine::get_fees(self, symbol)
    }

    fn get_positions(&self, symbols: &[Symbol]) -> HashMap<Symbol, PositionSnapshot> {
        SimulationEngine::get_positions(self, symbols)
    }

    fn get_trades(&self, symbol: &Symbol, limit: usize) -> Vec<TradeTick> {
        SimulationEngine::get_trades(self, symbol, limit)
    }

    fn get_trade_history(
        &self,
        symbol: Option<&Symbol>,
        limit: usize,
        start_time: Option<Timestamp>,
        end_time: Option<Timestamp>,
    ) -> Vec<ExecutionRecord> {
        SimulationEngine::get_trade_history(self, symbol, limit, start_time, end_time)
    }

    fn get_filled_orders(
        &self,
        symbol: Option<&Symbol>,
        limit: usize,
    ) -> Vec<FilledOrderRecord> {
        SimulationEngine::get_filled_orders(self, symbol, limit)
    }

    fn get_pnl(&self, symbol: Option<&Symbol>, limit: usize) -> Vec<PnlRecord> {
        SimulationEngine::get_pnl(self, symbol, limit)
    }

    fn wait(&mut self, seconds: f64) -> bool {
        SimulationEngine::wait(self, seconds)
    }

    fn wait_seconds(&mut self, seconds: f64) -> bool {
        SimulationEngine::wait_seconds(self, seconds)
    }

    fn wait_minutes(&mut self, minutes: f64) -> bool {
        SimulationEngine::wait_minutes(self, minutes)
    }

    fn get_current_time(&self) -> Timestamp {
        SimulationEngine::get_current_time(self)
    }
}
