//! Market-state cache
//!
//! Holds the most recently consumed snapshot per symbol and answers the
//! market-data queries the facade exposes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{SimError, Snapshot, Timestamp, MAX_DEPTH};
use crate::Symbol;

/// Book view returned by orderbook queries: `[[price, size], ...]` per side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookView {
    /// Bid levels, best first
    pub b: Vec<[f64; 2]>,

    /// Ask levels, best first
    pub a: Vec<[f64; 2]>,

    /// Exchange timestamp of the underlying snapshot
    pub ts: Timestamp,

    /// Arrival timestamp; falls back to `ts` when not recorded
    pub cts: Timestamp,
}

/// Latest snapshot per symbol with derived top-of-book accessors
#[derive(Debug, Default)]
pub struct MarketState {
    books: HashMap<Symbol, Snapshot>,
}

impl MarketState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached snapshot for a symbol
    pub fn refresh(&mut self, symbol: Symbol, snapshot: Snapshot) {
        self.books.insert(symbol, snapshot);
    }

    /// Cached snapshot, if the symbol has ticked at least once
    pub fn snapshot(&self, symbol: &Symbol) -> Option<&Snapshot> {
        self.books.get(symbol)
    }

    fn require(&self, symbol: &Symbol) -> Result<&Snapshot, SimError> {
        self.books
            .get(symbol)
            .ok_or_else(|| SimError::NoData(symbol.to_string()))
    }

    /// Arithmetic mid of the best bid and ask
    pub fn mid(&self, symbol: &Symbol) -> Result<f64, SimError> {
        let snapshot = self.require(symbol)?;
        snapshot
            .mid()
            .ok_or_else(|| SimError::NoData(symbol.to_string()))
    }

    /// Best bid as `(price, size)`; `(0, 0)` when the side is empty
    pub fn best_bid(&self, symbol: &Symbol) -> Result<(f64, f64), SimError> {
        let snapshot = self.require(symbol)?;
        Ok(snapshot
            .best_bid()
            .map(|l| (l.price, l.size))
            .unwrap_or((0.0, 0.0)))
    }

    /// Best ask as `(price, size)`; `(0, 0)` when the side is empty
    pub fn best_ask(&self, symbol: &Symbol) -> Result<(f64, f64), SimError> {
        let snapshot = self.require(symbol)?;
        Ok(snapshot
            .best_ask()
            .map(|l| (l.price, l.size))
            .unwrap_or((0.0, 0.0)))
    }

    /// Up to `depth` levels per side of the cached book
    pub fn orderbook(&self, symbol: &Symbol, depth: usize) -> Result<OrderBookView, SimError> {
        let snapshot = self.require(symbol)?;
        let depth = depth.min(MAX_DEPTH);

        let b = snapshot
            .bids
            .iter()
            .take(depth)
            .map(|l| [l.price, l.size])
            .collect();
        let a = snapshot
            .asks
            .iter()
            .take(depth)
            .map(|l| [l.price, l.size])
            .collect();

        Ok(OrderBookView {
            b,
            a,
            ts: snapshot.ts,
            cts: snapshot.ts_local.unwrap_or(snapshot.ts),
        })
    }

    /// Simulated feed latency, kept for API symmetry with a live client
    pub fn latency(&self, _symbol: &Symbol) -> f64 {
        0.0
    }
}
