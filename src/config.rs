//! Configuration management
//!
//! Handles construction parameters for the simulation engine and loading
//! them from JSON files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::Symbol;

/// Time simulation mode
///
/// Retained for API compatibility with earlier real-time pacing; the core
/// engine is purely virtual-time and ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeMode {
    Realtime,
    Fast,
    Instant,
}

impl Default for TimeMode {
    fn default() -> Self {
        TimeMode::Instant
    }
}

/// Latency, slippage, and fill-probability configuration
///
/// All fields are immutable after engine construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyConfig {
    /// Mean order submission latency in milliseconds
    #[serde(default = "default_order_latency_ms")]
    pub order_latency_ms: f64,

    /// Standard deviation of order submission latency in milliseconds
    #[serde(default = "default_order_latency_std_ms")]
    pub order_latency_std_ms: f64,

    /// Mean market data latency in milliseconds (retained, no effect in core)
    #[serde(default = "default_data_latency_ms")]
    pub data_latency_ms: f64,

    /// Standard deviation of market data latency (retained, no effect in core)
    #[serde(default = "default_data_latency_std_ms")]
    pub data_latency_std_ms: f64,

    /// Adverse move applied to market orders, in basis points
    #[serde(default = "default_market_order_slippage_bps")]
    pub market_order_slippage_bps: f64,

    /// Probability that a limit order fills when its price is touched
    #[serde(default = "default_limit_order_fill_probability")]
    pub limit_order_fill_probability: f64,

    /// Retained for compatibility, no effect in core
    #[serde(default)]
    pub time_mode: TimeMode,

    /// Retained for compatibility, no effect in core
    #[serde(default = "default_time_acceleration")]
    pub time_acceleration: f64,
}

fn default_order_latency_ms() -> f64 {
    50.0
}

fn default_order_latency_std_ms() -> f64 {
    10.0
}

fn default_data_latency_ms() -> f64 {
    10.0
}

fn default_data_latency_std_ms() -> f64 {
    5.0
}

fn default_market_order_slippage_bps() -> f64 {
    1.0
}

fn default_limit_order_fill_probability() -> f64 {
    0.95
}

fn default_time_acceleration() -> f64 {
    1.0
}

impl Default for LatencyConfig {
    fn default() -> Self {
        LatencyConfig {
            order_latency_ms: default_order_latency_ms(),
            order_latency_std_ms: default_order_latency_std_ms(),
            data_latency_ms: default_data_latency_ms(),
            data_latency_std_ms: default_data_latency_std_ms(),
            market_order_slippage_bps: default_market_order_slippage_bps(),
            limit_order_fill_probability: default_limit_order_fill_probability(),
            time_mode: TimeMode::Instant,
            time_acceleration: default_time_acceleration(),
        }
    }
}

impl LatencyConfig {
    /// Zero-latency, zero-slippage, always-fill configuration for tests
    pub fn frictionless() -> Self {
        LatencyConfig {
            order_latency_ms: 0.0,
            order_latency_std_ms: 0.0,
            market_order_slippage_bps: 0.0,
            limit_order_fill_probability: 1.0,
            ..LatencyConfig::default()
        }
    }
}

/// Engine construction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Symbols to subscribe
    pub symbols: Vec<String>,

    /// Time range `[start, end]` in `%y%m%d.%H%M%S` format
    pub times: [String; 2],

    /// Starting wallet balance
    #[serde(default = "default_initial_balance")]
    pub initial_balance: f64,

    /// Maker fee rate
    #[serde(default = "default_maker_fee")]
    pub maker_fee: f64,

    /// Taker fee rate
    #[serde(default = "default_taker_fee")]
    pub taker_fee: f64,

    /// Market name handed to the snapshot source
    #[serde(default = "default_market")]
    pub market: String,

    #[serde(default)]
    pub latency: LatencyConfig,

    /// Seed for the engine PRNG; None draws from entropy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

fn default_initial_balance() -> f64 {
    10_000.0
}

fn default_maker_fee() -> f64 {
    0.0001 // 0.01%
}

fn default_taker_fee() -> f64 {
    0.0006 // 0.06%
}

fn default_market() -> String {
    "binance-futures".to_string()
}

impl SimConfig {
    /// Minimal configuration over a symbol list and a time range
    pub fn new(symbols: Vec<String>, times: [String; 2]) -> Self {
        SimConfig {
            symbols,
            times,
            initial_balance: default_initial_balance(),
            maker_fee: default_maker_fee(),
            taker_fee: default_taker_fee(),
            market: default_market(),
            latency: LatencyConfig::default(),
            rng_seed: None,
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: SimConfig =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        Ok(config)
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.symbols.iter().map(Symbol::new).collect()
    }
}
