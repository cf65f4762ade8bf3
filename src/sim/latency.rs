//! Latency, slippage, and probabilistic fill model
//!
//! All randomness in the simulator flows through the single seedable PRNG
//! owned here, so a fixed seed replays an identical run.

use rand::distributions::{Bernoulli, Distribution};
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::Normal;

use crate::config::LatencyConfig;
use crate::types::{Side, Timestamp, NANOS_PER_MILLI};

/// Samples submission latency, market-order slippage, and limit-fill draws
pub struct LatencyModel {
    config: LatencyConfig,
    rng: StdRng,
    /// None when the configured std is not positive; latency is then the mean
    submission: Option<Normal>,
    limit_fill: Bernoulli,
}

impl LatencyModel {
    /// Build from config; `seed` fixes the PRNG for reproducible replays
    pub fn new(config: LatencyConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let submission =
            Normal::new(config.order_latency_ms, config.order_latency_std_ms).ok();

        let p = config.limit_order_fill_probability.clamp(0.0, 1.0);
        let limit_fill = Bernoulli::new(p).expect("clamped probability is valid");

        LatencyModel {
            config,
            rng,
            submission,
            limit_fill,
        }
    }

    /// Sampled order submission latency in nanoseconds, never negative
    pub fn sample_submission_latency(&mut self) -> Timestamp {
        let latency_ms = match &self.submission {
            Some(normal) => normal.sample(&mut self.rng),
            None => self.config.order_latency_ms,
        };
        (latency_ms.max(0.0) * NANOS_PER_MILLI as f64) as Timestamp
    }

    /// Adverse price concession for a market order
    ///
    /// Buys pay up, sells give up: `price * (1 ± bps/10_000)`.
    pub fn apply_slippage(&self, price: f64, side: Side) -> f64 {
        let slip = self.config.market_order_slippage_bps / 10_000.0;
        match side {
            Side::Buy => price * (1.0 + slip),
            Side::Sell => price * (1.0 - slip),
        }
    }

    /// One Bernoulli draw per touch of a limit order's price
    ///
    /// A rejection leaves the order active for the next opportunity.
    pub fn should_fill_limit(&mut self) -> bool {
        self.limit_fill.sample(&mut self.rng)
    }
}

impl std::fmt::Debug for LatencyModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatencyModel")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_with(config: LatencyConfig, seed: u64) -> LatencyModel {
        LatencyModel::new(config, Some(seed))
    }

    #[test]
    fn test_latency_never_negative() {
        let config = LatencyConfig {
            order_latency_ms: 1.0,
            order_latency_std_ms: 50.0, // wide enough to sample below zero
            ..LatencyConfig::default()
        };
        let mut model = model_with(config, 42);

        for _ in 0..1_000 {
            assert!(model.sample_submission_latency() >= 0);
        }
    }

    #[test]
    fn test_latency_mean_near_config() {
        let config = LatencyConfig {
            order_latency_ms: 50.0,
            order_latency_std_ms: 5.0,
            ..LatencyConfig::default()
        };
        let mut model = model_with(config, 7);

        let n = 10_000;
        let sum: f64 = (0..n)
            .map(|_| model.sample_submission_latency() as f64 / NANOS_PER_MILLI as f64)
            .sum();
        let mean = sum / n as f64;

        // 3 sigma / sqrt(N) band around the configured mean
        let tolerance = 3.0 * 5.0 / (n as f64).sqrt();
        assert!(
            (mean - 50.0).abs() < tolerance,
            "mean {} outside tolerance {}",
            mean,
            tolerance
        );
    }

    #[test]
    fn test_zero_std_is_deterministic() {
        let config = LatencyConfig {
            order_latency_ms: 10.0,
            order_latency_std_ms: 0.0,
            ..LatencyConfig::default()
        };
        let mut model = model_with(config, 1);

        assert_eq!(model.sample_submission_latency(), 10 * NANOS_PER_MILLI);
        assert_eq!(model.sample_submission_latency(), 10 * NANOS_PER_MILLI);
    }

    #[test]
    fn test_fixed_seed_replays() {
        let config = LatencyConfig::default();
        let mut a = model_with(config.clone(), 99);
        let mut b = model_with(config, 99);

        for _ in 0..100 {
            assert_eq!(a.sample_submission_latency(), b.sample_submission_latency());
            assert_eq!(a.should_fill_limit(), b.should_fill_limit());
        }
    }

    #[test]
    fn test_slippage_direction() {
        let config = LatencyConfig {
            market_order_slippage_bps: 1.0,
            ..LatencyConfig::default()
        };
        let model = model_with(config, 0);

        assert_eq!(model.apply_slippage(100.0, Side::Buy), 100.0 * 1.0001);
        assert_eq!(model.apply_slippage(100.0, Side::Sell), 100.0 * 0.9999);
    }

    #[test]
    fn test_fill_probability_extremes() {
        let never = LatencyConfig {
            limit_order_fill_probability: 0.0,
            ..LatencyConfig::default()
        };
        let mut model = model_with(never, 3);
        assert!((0..100).all(|_| !model.should_fill_limit()));

        let always = LatencyConfig {
            limit_order_fill_probability: 1.0,
            ..LatencyConfig::default()
        };
        let mut model = model_with(always, 3);
        assert!((0..100).all(|_| model.should_fill_limit()));
    }
}
