//! Order management
//!
//! Orders, the latency-aware pending/active pipeline, per-symbol position
//! accounting, and the append-only history ledger. Orders live as values in
//! pipeline-owned containers; everything else refers to them by id.

pub mod history;
pub mod pipeline;
pub mod position;
pub mod types;

pub use history::HistoryLedger;
pub use pipeline::OrderPipeline;
pub use position::{Position, PositionSnapshot};
pub use types::{
    ExecutionRecord, FilledOrderRecord, Order, OrderId, OrderStatus, OrderType, PlaceOrderAck,
    PnlRecord, TradeTick,
};
