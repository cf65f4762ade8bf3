//! Core data types used across the simulator

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Nanoseconds since epoch. All ordering and time arithmetic use this scalar.
pub type Timestamp = i64;

/// Nanoseconds per millisecond
pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// Nanoseconds per second
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Errors surfaced by the simulation engine
#[derive(Debug, Error)]
pub enum SimError {
    #[error("symbol {0} is not subscribed in this simulation")]
    UnknownSymbol(String),

    #[error("no market data consumed yet for symbol {0}")]
    NoData(String),

    #[error("order quantity must be nonzero")]
    ZeroQuantity,

    #[error("limit order requires a price")]
    MissingLimitPrice,

    #[error("bad time string {input:?}, expected format {format}")]
    BadTimeFormat { input: String, format: &'static str },

    #[error("time range start {start} is not before end {end}")]
    EmptyTimeRange { start: Timestamp, end: Timestamp },
}

/// Validation errors for book snapshots
#[derive(Debug, Error)]
pub enum SnapshotValidationError {
    #[error("best bid ({bid}) crosses best ask ({ask})")]
    CrossedBook { bid: f64, ask: f64 },

    #[error("bids not strictly descending at level {level}: {prev} then {next}")]
    BidsNotDescending { level: usize, prev: f64, next: f64 },

    #[error("asks not strictly ascending at level {level}: {prev} then {next}")]
    AsksNotAscending { level: usize, prev: f64, next: f64 },

    #[error("non-positive price ({price}) at {side} level {level}")]
    NonPositivePrice {
        side: &'static str,
        level: usize,
        price: f64,
    },

    #[error("negative size ({size}) at {side} level {level}")]
    NegativeSize {
        side: &'static str,
        level: usize,
        size: f64,
    },

    #[error("snapshot carries {count} {side} levels, maximum is {max}")]
    TooManyLevels {
        side: &'static str,
        count: usize,
        max: usize,
    },
}

/// Maximum book depth carried per side
pub const MAX_DEPTH: usize = 25;

/// Trading symbol using Arc<str> for cheap cloning
///
/// Symbols are cloned on every order, position, and history record.
/// Arc<str> keeps those clones O(1) instead of reallocating the string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

/// Custom serde for Arc<str>
mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(std::sync::Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Signed unit for history payloads: Buy = +1, Sell = -1
    pub fn sign(self) -> i8 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

/// One price level of a book side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub size: f64,
}

impl BookLevel {
    pub fn new(price: f64, size: f64) -> Self {
        Self { price, size }
    }
}

/// Point-in-time view of up to [`MAX_DEPTH`] levels per side of one symbol's book
///
/// Invariants: bids strictly descending by price, asks strictly ascending,
/// and the top of book is not crossed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Exchange timestamp, nanoseconds
    pub ts: Timestamp,

    /// Bid levels, best first
    pub bids: Vec<BookLevel>,

    /// Ask levels, best first
    pub asks: Vec<BookLevel>,

    /// Local arrival timestamp, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts_local: Option<Timestamp>,
}

impl Snapshot {
    /// Create a snapshot with validation
    pub fn new(
        ts: Timestamp,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
        ts_local: Option<Timestamp>,
    ) -> Result<Self, SnapshotValidationError> {
        let snapshot = Self {
            ts,
            bids,
            asks,
            ts_local,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Create a snapshot without validation (for trusted recorded data)
    pub fn new_unchecked(
        ts: Timestamp,
        bids: Vec<BookLevel>,
        asks: Vec<BookLevel>,
        ts_local: Option<Timestamp>,
    ) -> Self {
        Self {
            ts,
            bids,
            asks,
            ts_local,
        }
    }

    /// Validate level counts, ordering, and the top-of-book cross
    pub fn validate(&self) -> Result<(), SnapshotValidationError> {
        Self::validate_side("bid", &self.bids, false)?;
        Self::validate_side("ask", &self.asks, true)?;

        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            if bid.price > ask.price {
                return Err(SnapshotValidationError::CrossedBook {
                    bid: bid.price,
                    ask: ask.price,
                });
            }
        }

        Ok(())
    }

    fn validate_side(
        side: &'static str,
        levels: &[BookLevel],
        ascending: bool,
    ) -> Result<(), SnapshotValidationError> {
        if levels.len() > MAX_DEPTH {
            return Err(SnapshotValidationError::TooManyLevels {
                side,
                count: levels.len(),
                max: MAX_DEPTH,
            });
        }

        for (i, level) in levels.iter().enumerate() {
            if level.price <= 0.0 {
                return Err(SnapshotValidationError::NonPositivePrice {
                    side,
                    level: i,
                    price: level.price,
                });
            }
            if level.size < 0.0 {
                return Err(SnapshotValidationError::NegativeSize {
                    side,
                    level: i,
                    size: level.size,
                });
            }
            if i > 0 {
                let prev = levels[i - 1].price;
                if ascending && level.price <= prev {
                    return Err(SnapshotValidationError::AsksNotAscending {
                        level: i,
                        prev,
                        next: level.price,
                    });
                }
                if !ascending && level.price >= prev {
                    return Err(SnapshotValidationError::BidsNotDescending {
                        level: i,
                        prev,
                        next: level.price,
                    });
                }
            }
        }

        Ok(())
    }

    /// Best bid level, if the side is non-empty
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first()
    }

    /// Best ask level, if the side is non-empty
    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }

    /// Arithmetic mid of the best bid and ask
    pub fn mid(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => Some((b.price + a.price) / 2.0),
            _ => None,
        }
    }

    /// Check validity without the detailed error
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
