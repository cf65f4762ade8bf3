//! Simulation core
//!
//! Virtual-time replay over recorded book snapshots: the time cursor, the
//! market-state cache, the latency/slippage model, the matching rules, and
//! the engine that ties them to the order pipeline and accounts.

pub mod cursor;
pub mod engine;
pub mod latency;
pub mod market;
pub mod matching;

pub use cursor::{CoalescedTick, TimeCursor};
pub use engine::{PositionStat, SimulationEngine, SimulationStats};
pub use latency::LatencyModel;
pub use market::{MarketState, OrderBookView};
pub use matching::{FillPrice, MatchingEngine};
