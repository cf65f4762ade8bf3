//! Simulation engine
//!
//! Replays recorded book snapshots through a virtual clock and exposes the
//! operation surface a strategy would call on a live exchange: order
//! placement and cancellation, market data, positions, wallet, history,
//! and virtual waits. Construction advances the clock once so the first
//! strategy call already sees a live market.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::data::{SnapshotSource, TimeRange};
use crate::oms::{
    ExecutionRecord, FilledOrderRecord, HistoryLedger, Order, OrderPipeline, OrderType,
    PlaceOrderAck, PnlRecord, Position, PositionSnapshot, TradeTick,
};
use crate::sim::cursor::{CoalescedTick, TimeCursor};
use crate::sim::latency::LatencyModel;
use crate::sim::market::{MarketState, OrderBookView};
use crate::sim::matching::MatchingEngine;
use crate::types::{Side, SimError, Snapshot, Symbol, Timestamp, MAX_DEPTH, NANOS_PER_SEC};

/// Aggregate run statistics
#[derive(Debug, Clone, Serialize)]
pub struct SimulationStats {
    pub current_time: Timestamp,
    pub wallet_balance: f64,
    pub total_pnl: f64,
    pub total_trades: usize,
    pub open_orders: usize,

    /// Nonzero positions only
    pub positions: HashMap<Symbol, PositionStat>,
}

/// Per-symbol slice of [`SimulationStats`]
#[derive(Debug, Clone, Serialize)]
pub struct PositionStat {
    pub size: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
}

/// Historical-market replay and order-execution simulator
pub struct SimulationEngine {
    config: SimConfig,
    symbols: Vec<Symbol>,
    cursor: TimeCursor,
    market: MarketState,
    latency: LatencyModel,
    matching: MatchingEngine,
    pipeline: OrderPipeline,
    positions: HashMap<Symbol, Position>,
    history: HistoryLedger,
    wallet_balance: f64,
    next_order_seq: u64,
}

impl SimulationEngine {
    /// Build an engine by loading every subscribed symbol from `source`
    /// over the configured time range
    pub fn new(config: SimConfig, source: &dyn SnapshotSource) -> anyhow::Result<Self> {
        let range = TimeRange::parse(&config.times)?;

        let mut streams = Vec::with_capacity(config.symbols.len());
        for symbol in config.symbols() {
            let snapshots = source.load_book(&symbol, &range, MAX_DEPTH)?;
            if snapshots.is_empty() {
                warn!("No snapshots loaded for {}", symbol);
            }
            streams.push((symbol, snapshots));
        }

        Ok(Self::from_streams(config, streams))
    }

    /// Build an engine over prebuilt per-symbol streams
    ///
    /// The stream list defines the subscribed symbols and the tie-break
    /// order for coalesced ticks. Each stream must be sorted by `ts`.
    pub fn from_streams(config: SimConfig, streams: Vec<(Symbol, Vec<Snapshot>)>) -> Self {
        let symbols: Vec<Symbol> = streams.iter().map(|(s, _)| s.clone()).collect();
        let total: usize = streams.iter().map(|(_, v)| v.len()).sum();

        let positions = symbols
            .iter()
            .map(|s| (s.clone(), Position::new(s.clone())))
            .collect();

        let latency = LatencyModel::new(config.latency.clone(), config.rng_seed);
        let matching = MatchingEngine::new(config.maker_fee, config.taker_fee);

        let mut engine = SimulationEngine {
            symbols,
            cursor: TimeCursor::new(streams),
            market: MarketState::new(),
            latency,
            matching,
            pipeline: OrderPipeline::new(),
            positions,
            history: HistoryLedger::new(),
            wallet_balance: config.initial_balance,
            next_order_seq: 1,
            config,
        };

        info!(
            "Simulation engine ready: {} symbols, {} snapshots, balance {}",
            engine.symbols.len(),
            total,
            engine.wallet_balance
        );

        // Land on the first snapshot so market queries work immediately
        engine.next();
        engine
    }

    // =========================================================================
    // Time advancement
    // =========================================================================

    /// Advance one coalesced tick. Returns false once every stream is
    /// exhausted; the engine is then terminal.
    pub fn next(&mut self) -> bool {
        let Some(tick) = self.cursor.step() else {
            debug!(
                "Snapshot streams exhausted at {}",
                self.cursor.current_time()
            );
            return false;
        };
        self.apply_tick(tick);
        true
    }

    /// Jump to the first snapshot at or after `target`, then apply it
    pub fn jump_to(&mut self, target: Timestamp) -> bool {
        self.cursor.seek(target);
        self.next()
    }

    /// Virtual wait: jump `seconds` of simulated time forward
    pub fn wait(&mut self, seconds: f64) -> bool {
        self.wait_seconds(seconds)
    }

    /// Virtual wait in seconds
    pub fn wait_seconds(&mut self, seconds: f64) -> bool {
        let wait_ns = (seconds * NANOS_PER_SEC as f64) as Timestamp;
        self.jump_to(self.cursor.current_time() + wait_ns)
    }

    /// Virtual wait in minutes
    pub fn wait_minutes(&mut self, minutes: f64) -> bool {
        self.wait_seconds(minutes * 60.0)
    }

    /// Current virtual timestamp, nanoseconds
    pub fn get_current_time(&self) -> Timestamp {
        self.cursor.current_time()
    }

    /// True when every snapshot stream is fully consumed
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }

    fn apply_tick(&mut self, tick: CoalescedTick) {
        // Refresh every coalesced book before any matching happens
        for (symbol, snapshot) in tick.books {
            if let Some(mid) = snapshot.mid() {
                if let Some(position) = self.positions.get_mut(&symbol) {
                    position.update_mark_price(mid);
                }
            }
            self.market.refresh(symbol, snapshot);
        }

        let now = self.cursor.current_time();
        self.pipeline.promote_ready(now);
        self.match_active(now);
    }

    fn match_active(&mut self, now: Timestamp) {
        let Self {
            pipeline,
            market,
            matching,
            latency,
            positions,
            history,
            wallet_balance,
            ..
        } = self;

        for order in pipeline.active_iter_mut() {
            // No snapshot yet for this symbol: the order waits
            let Some(snapshot) = market.snapshot(&order.symbol) else {
                continue;
            };
            let Some(fill) = matching.check_fill(order, snapshot, latency) else {
                continue;
            };

            let record = matching.execute_fill(order, fill, now);
            *wallet_balance -= record.exec_fee;
            if let Some(position) = positions.get_mut(&order.symbol) {
                position.add_trade(order.signed_qty(), record.price, record.exec_fee);
            }

            debug!(
                "Filled {} {:?} {} {} @ {} (fee {})",
                record.order_id,
                record.side,
                record.qty,
                record.symbol,
                record.price,
                record.exec_fee
            );
            history.record_execution(record);
        }

        for order in pipeline.take_filled() {
            history.record_filled_order(&order, now);
        }
    }

    // =========================================================================
    // Trading
    // =========================================================================

    /// Place an order; sign of `qty` picks the side, `price` is required
    /// for limit orders. The order waits out its sampled submission
    /// latency before it becomes eligible to match.
    pub fn place_order(
        &mut self,
        symbol: &Symbol,
        qty: f64,
        price: Option<f64>,
        order_type: OrderType,
    ) -> Result<PlaceOrderAck, SimError> {
        if !self.positions.contains_key(symbol) {
            return Err(SimError::UnknownSymbol(symbol.to_string()));
        }
        if qty == 0.0 {
            return Err(SimError::ZeroQuantity);
        }
        if order_type == OrderType::Limit && price.is_none() {
            return Err(SimError::MissingLimitPrice);
        }

        let side = if qty > 0.0 { Side::Buy } else { Side::Sell };
        let now = self.cursor.current_time();
        let order_latency = self.latency.sample_submission_latency();

        let order_id = format!("sim-{:08}", self.next_order_seq);
        self.next_order_seq += 1;

        let order = Order::new(
            order_id.clone(),
            symbol.clone(),
            side,
            qty.abs(),
            price.unwrap_or(0.0),
            order_type,
            now,
            now + order_latency,
        );
        self.pipeline.submit(order);

        Ok(PlaceOrderAck {
            order_id,
            ret_code: 0,
            time: now,
        })
    }

    /// Cancel one active order; 0 on removal, 1 otherwise. Cancelling an
    /// unknown id is not an error. The `symbol` parameter mirrors the live
    /// API and is unused here.
    pub fn cancel_order(&mut self, _symbol: &Symbol, order_id: &str) -> i32 {
        match self.pipeline.cancel(order_id) {
            Some(_) => 0,
            None => 1,
        }
    }

    /// Cancel every active order for a symbol
    pub fn cancel_all_orders(&mut self, symbol: &Symbol) -> i32 {
        let removed = self.pipeline.cancel_all(symbol);
        if removed > 0 {
            debug!("Cancelled {} active orders for {}", removed, symbol);
        }
        0
    }

    /// Flatten positions with market orders
    ///
    /// Per symbol: `Some(ret_code)` when an order was placed, `None` when
    /// the position is already flat or unknown.
    pub fn close_positions(&mut self, symbols: &[Symbol]) -> HashMap<Symbol, Option<i32>> {
        let mut responses = HashMap::new();

        for symbol in symbols {
            let size = self.positions.get(symbol).map(|p| p.size).unwrap_or(0.0);
            let response = if size != 0.0 {
                match self.place_order(symbol, -size, None, OrderType::Market) {
                    Ok(ack) => Some(ack.ret_code),
                    Err(_) => Some(1),
                }
            } else {
                None
            };
            responses.insert(symbol.clone(), response);
        }

        responses
    }

    /// Store a leverage value on the position; no effect on matching
    pub fn set_leverage(&mut self, symbol: &Symbol, leverage: f64) -> i32 {
        if let Some(position) = self.positions.get_mut(symbol) {
            position.leverage = leverage;
        }
        0
    }

    // =========================================================================
    // Market data
    // =========================================================================

    /// Mid price of the current snapshot
    pub fn get_mid(&self, symbol: &Symbol) -> Result<f64, SimError> {
        self.market.mid(symbol)
    }

    /// Best bid `(price, size)`; `(0, 0)` on an empty side
    pub fn get_bid(&self, symbol: &Symbol) -> Result<(f64, f64), SimError> {
        self.market.best_bid(symbol)
    }

    /// Best ask `(price, size)`; `(0, 0)` on an empty side
    pub fn get_ask(&self, symbol: &Symbol) -> Result<(f64, f64), SimError> {
        self.market.best_ask(symbol)
    }

    /// Up to `depth` levels per side of the current snapshot
    pub fn get_orderbook(&self, symbol: &Symbol, depth: usize) -> Result<OrderBookView, SimError> {
        self.market.orderbook(symbol, depth)
    }

    /// Simulated feed latency; always 0, kept for live-API symmetry
    pub fn get_latency(&self, symbol: &Symbol) -> f64 {
        self.market.latency(symbol)
    }

    // =========================================================================
    // Account and history
    // =========================================================================

    /// Current wallet balance (initial balance minus all fees)
    pub fn get_wallet_balance(&self) -> f64 {
        self.wallet_balance
    }

    /// `(taker_fee, maker_fee)` rates
    pub fn get_fees(&self, _symbol: &Symbol) -> (f64, f64) {
        self.matching.fees()
    }

    /// Position query payloads for the requested symbols; unknown symbols
    /// are skipped
    pub fn get_positions(&self, symbols: &[Symbol]) -> HashMap<Symbol, PositionSnapshot> {
        symbols
            .iter()
            .filter_map(|s| self.positions.get(s).map(|p| (s.clone(), p.snapshot())))
            .collect()
    }

    /// Position payload for one symbol
    pub fn get_position(&self, symbol: &Symbol) -> Option<PositionSnapshot> {
        self.positions.get(symbol).map(Position::snapshot)
    }

    /// Recent executions for a symbol as public-trade rows
    pub fn get_trades(&self, symbol: &Symbol, limit: usize) -> Vec<TradeTick> {
        self.history.trades(symbol, limit)
    }

    /// Tail of the execution log with optional symbol/time filters
    pub fn get_trade_history(
        &self,
        symbol: Option<&Symbol>,
        limit: usize,
        start_time: Option<Timestamp>,
        end_time: Option<Timestamp>,
    ) -> Vec<ExecutionRecord> {
        self.history.trade_history(symbol, limit, start_time, end_time)
    }

    /// Tail of the filled-orders log with an optional symbol filter
    pub fn get_filled_orders(
        &self,
        symbol: Option<&Symbol>,
        limit: usize,
    ) -> Vec<FilledOrderRecord> {
        self.history.filled_orders(symbol, limit)
    }

    /// Per-symbol PnL records synthesized from current positions
    pub fn get_pnl(&self, symbol: Option<&Symbol>, limit: usize) -> Vec<PnlRecord> {
        let now = self.cursor.current_time();
        let records: Vec<PnlRecord> = self
            .symbols
            .iter()
            .filter(|s| symbol.map_or(true, |wanted| *s == wanted))
            .filter_map(|s| self.positions.get(s))
            .map(|p| PnlRecord {
                symbol: p.symbol.clone(),
                closed_pnl: p.realized_pnl,
                unrealized_pnl: p.unrealized_pnl,
                created_time: now,
                updated_time: now,
            })
            .collect();

        let skip = records.len().saturating_sub(limit);
        records.into_iter().skip(skip).collect()
    }

    /// Aggregate run statistics
    pub fn get_simulation_stats(&self) -> SimulationStats {
        let total_pnl = self
            .positions
            .values()
            .map(|p| p.realized_pnl + p.unrealized_pnl)
            .sum();

        let positions = self
            .positions
            .iter()
            .filter(|(_, p)| p.size != 0.0)
            .map(|(s, p)| {
                (
                    s.clone(),
                    PositionStat {
                        size: p.size,
                        unrealized_pnl: p.unrealized_pnl,
                        realized_pnl: p.realized_pnl,
                    },
                )
            })
            .collect();

        SimulationStats {
            current_time: self.cursor.current_time(),
            wallet_balance: self.wallet_balance,
            total_pnl,
            total_trades: self.history.execution_count(),
            open_orders: self.pipeline.active_len(),
            positions,
        }
    }

    /// Engine construction parameters
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Subscribed symbols in stream order
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LatencyConfig;
    use crate::types::BookLevel;

    fn snap(ts: Timestamp, bid: f64, ask: f64) -> Snapshot {
        Snapshot::new_unchecked(
            ts,
            vec![BookLevel::new(bid, 5.0)],
            vec![BookLevel::new(ask, 5.0)],
            None,
        )
    }

    fn frictionless_config() -> SimConfig {
        SimConfig {
            latency: LatencyConfig::frictionless(),
            rng_seed: Some(42),
            ..SimConfig::new(
                vec!["BTCUSDT".to_string()],
                ["250120.000000".to_string(), "250121.000000".to_string()],
            )
        }
    }

    fn engine_with(snapshots: Vec<Snapshot>) -> SimulationEngine {
        SimulationEngine::from_streams(
            frictionless_config(),
            vec![(Symbol::new("BTCUSDT"), snapshots)],
        )
    }

    #[test]
    fn test_construction_advances_once() {
        let engine = engine_with(vec![snap(100, 99.0, 101.0), snap(200, 99.0, 101.0)]);
        let symbol = Symbol::new("BTCUSDT");

        assert_eq!(engine.get_current_time(), 100);
        assert_eq!(engine.get_mid(&symbol).unwrap(), 100.0);
    }

    #[test]
    fn test_empty_streams_are_immediately_exhausted() {
        let mut engine = engine_with(vec![]);
        let symbol = Symbol::new("BTCUSDT");

        assert!(engine.is_exhausted());
        assert!(!engine.next());
        assert!(matches!(
            engine.get_mid(&symbol),
            Err(SimError::NoData(_))
        ));
    }

    #[test]
    fn test_market_buy_fills_on_next_tick() {
        let mut engine = engine_with(vec![snap(100, 99.0, 101.0), snap(200, 99.0, 101.0)]);
        let symbol = Symbol::new("BTCUSDT");

        let ack = engine
            .place_order(&symbol, 1.0, None, OrderType::Market)
            .unwrap();
        assert_eq!(ack.ret_code, 0);
        assert_eq!(ack.time, 100);

        assert!(engine.next());

        let position = engine.get_position(&symbol).unwrap();
        assert_eq!(position.size, 1.0);
        assert_eq!(position.aep, 101.0);
        assert_eq!(engine.get_filled_orders(None, 50).len(), 1);
    }

    #[test]
    fn test_unknown_symbol_rejected() {
        let mut engine = engine_with(vec![snap(100, 99.0, 101.0)]);
        let err = engine
            .place_order(&Symbol::new("DOGEUSDT"), 1.0, None, OrderType::Market)
            .unwrap_err();
        assert!(matches!(err, SimError::UnknownSymbol(_)));
    }

    #[test]
    fn test_limit_without_price_rejected() {
        let mut engine = engine_with(vec![snap(100, 99.0, 101.0)]);
        let err = engine
            .place_order(&Symbol::new("BTCUSDT"), 1.0, None, OrderType::Limit)
            .unwrap_err();
        assert!(matches!(err, SimError::MissingLimitPrice));
    }

    #[test]
    fn test_zero_qty_rejected() {
        let mut engine = engine_with(vec![snap(100, 99.0, 101.0)]);
        let err = engine
            .place_order(&Symbol::new("BTCUSDT"), 0.0, None, OrderType::Market)
            .unwrap_err();
        assert!(matches!(err, SimError::ZeroQuantity));
    }

    #[test]
    fn test_negative_qty_sells() {
        let mut engine = engine_with(vec![snap(100, 99.0, 101.0), snap(200, 99.0, 101.0)]);
        let symbol = Symbol::new("BTCUSDT");

        engine
            .place_order(&symbol, -2.0, None, OrderType::Market)
            .unwrap();
        engine.next();

        let position = engine.get_position(&symbol).unwrap();
        assert_eq!(position.size, -2.0);
        assert_eq!(position.aep, 99.0);
    }

    #[test]
    fn test_cancel_active_order() {
        let mut engine = engine_with(vec![
            snap(100, 99.0, 101.0),
            snap(200, 99.0, 101.0),
            snap(300, 99.0, 101.0),
        ]);
        let symbol = Symbol::new("BTCUSDT");

        let ack = engine
            .place_order(&symbol, 1.0, Some(95.0), OrderType::Limit)
            .unwrap();
        engine.next(); // promotes; ask 101 > 95, no fill

        assert_eq!(engine.cancel_order(&symbol, &ack.order_id), 0);
        assert_eq!(engine.cancel_order(&symbol, &ack.order_id), 1);
        assert_eq!(engine.cancel_order(&symbol, "unknown"), 1);
    }

    #[test]
    fn test_close_positions_signs() {
        let mut engine = engine_with(vec![
            snap(100, 99.0, 101.0),
            snap(200, 99.0, 101.0),
            snap(300, 99.0, 101.0),
        ]);
        let symbol = Symbol::new("BTCUSDT");

        engine
            .place_order(&symbol, 2.0, None, OrderType::Market)
            .unwrap();
        engine.next();

        let responses = engine.close_positions(&[symbol.clone()]);
        assert_eq!(responses[&symbol], Some(0));
        engine.next();

        assert_eq!(engine.get_position(&symbol).unwrap().size, 0.0);

        // Already flat: None, no order placed
        let responses = engine.close_positions(&[symbol.clone()]);
        assert_eq!(responses[&symbol], None);
    }

    #[test]
    fn test_set_leverage_stored_only() {
        let mut engine = engine_with(vec![snap(100, 99.0, 101.0)]);
        let symbol = Symbol::new("BTCUSDT");

        assert_eq!(engine.set_leverage(&symbol, 5.0), 0);
        assert_eq!(engine.get_position(&symbol).unwrap().leverage, 5.0);
    }

    #[test]
    fn test_stats_counts() {
        let mut engine = engine_with(vec![snap(100, 99.0, 101.0), snap(200, 99.0, 101.0)]);
        let symbol = Symbol::new("BTCUSDT");

        engine
            .place_order(&symbol, 1.0, None, OrderType::Market)
            .unwrap();
        engine.next();

        let stats = engine.get_simulation_stats();
        assert_eq!(stats.current_time, 200);
        assert_eq!(stats.total_trades, 1);
        assert_eq!(stats.open_orders, 0);
        assert_eq!(stats.positions[&symbol].size, 1.0);
    }

    #[test]
    fn test_wait_seconds_jumps() {
        let base = 1_000_000_000;
        let snapshots: Vec<Snapshot> = (0..100)
            .map(|i| snap(base + i * 10 * crate::types::NANOS_PER_MILLI, 99.0, 101.0))
            .collect();
        let mut engine = engine_with(snapshots);

        assert_eq!(engine.get_current_time(), base);
        assert!(engine.wait_seconds(0.5));
        assert_eq!(engine.get_current_time(), base + 500 * crate::types::NANOS_PER_MILLI);
    }

    #[test]
    fn test_get_pnl_synthesized() {
        let mut engine = engine_with(vec![snap(100, 99.0, 101.0), snap(200, 99.0, 101.0)]);
        let symbol = Symbol::new("BTCUSDT");

        engine
            .place_order(&symbol, 1.0, None, OrderType::Market)
            .unwrap();
        engine.next();

        let pnl = engine.get_pnl(None, 50);
        assert_eq!(pnl.len(), 1);
        assert_eq!(pnl[0].symbol, symbol);
        // Long 1 @ 101, mark 100
        assert_eq!(pnl[0].unrealized_pnl, -1.0);
    }
}
