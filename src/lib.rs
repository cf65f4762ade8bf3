//! Market Replay
//!
//! A historical-market replay and order-execution simulator for derivatives
//! trading research. Recorded order-book snapshots drive a virtual clock;
//! strategies trade against the replay through an exchange-like interface
//! with realistic submission latency, market-order slippage, and
//! probabilistic limit fills.

pub mod config;
pub mod data;
pub mod exchange;
pub mod oms;
pub mod sim;
pub mod types;

pub use config::{LatencyConfig, SimConfig, TimeMode};
pub use data::{CsvSource, MemorySource, SnapshotSource, TimeRange};
pub use exchange::Exchange;
pub use oms::{
    ExecutionRecord, FilledOrderRecord, Order, OrderId, OrderStatus, OrderType, PlaceOrderAck,
    PnlRecord, Position, PositionSnapshot, TradeTick,
};
pub use sim::{OrderBookView, SimulationEngine, SimulationStats};
pub use types::*;
