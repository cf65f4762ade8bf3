//! Per-symbol position accounting
//!
//! Linear-contract conventions: signed size, quote-currency PnL, fees
//! booked into realized PnL at trade time (and separately deducted from the
//! wallet by the engine).

use serde::{Deserialize, Serialize};

use crate::types::Symbol;

/// A signed position with weighted average entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,

    /// Positive long, negative short
    pub size: f64,

    /// Weighted average entry price; stale while size == 0
    pub avg_price: f64,

    /// Last mid seen for the symbol
    pub mark_price: f64,

    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
    pub leverage: f64,
}

/// Query payload for one position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub size: f64,
    pub aep: f64,
    pub mark_price: f64,
    pub value: f64,
    pub leverage: f64,
    pub position_balance: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
}

impl Position {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            size: 0.0,
            avg_price: 0.0,
            mark_price: 0.0,
            unrealized_pnl: 0.0,
            realized_pnl: 0.0,
            leverage: 1.0,
        }
    }

    /// Refresh the mark price and recompute unrealized PnL
    pub fn update_mark_price(&mut self, price: f64) {
        self.mark_price = price;
        self.recompute_unrealized();
    }

    fn recompute_unrealized(&mut self) {
        self.unrealized_pnl = if self.size != 0.0 {
            self.size * (self.mark_price - self.avg_price)
        } else {
            0.0
        };
    }

    /// Apply one fill with a signed quantity
    ///
    /// Four cases: open, increase (same sign), reduce (opposite sign,
    /// smaller), close-or-flip (opposite sign, equal or larger). Reducing
    /// realizes PnL on the closed portion and leaves the entry untouched;
    /// flipping re-enters at the fill price.
    pub fn add_trade(&mut self, qty: f64, price: f64, fee: f64) {
        if self.size == 0.0 {
            self.size = qty;
            self.avg_price = price;
        } else if (self.size > 0.0) == (qty > 0.0) {
            let total_value = self.size * self.avg_price + qty * price;
            self.size += qty;
            self.avg_price = total_value / self.size;
        } else if qty.abs() < self.size.abs() {
            self.realized_pnl += (-qty) * (price - self.avg_price) - fee;
            self.size += qty;
        } else {
            self.realized_pnl += self.size * (price - self.avg_price) - fee;
            self.size += qty;
            if self.size != 0.0 {
                self.avg_price = price;
            }
        }
        self.recompute_unrealized();
    }

    /// Query payload for this position
    pub fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            size: self.size,
            aep: self.avg_price,
            mark_price: self.mark_price,
            value: self.size.abs() * self.mark_price,
            leverage: self.leverage,
            position_balance: self.size.abs() * self.avg_price,
            unrealized_pnl: self.unrealized_pnl,
            realized_pnl: self.realized_pnl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn position() -> Position {
        Position::new(Symbol::new("BTCUSDT"))
    }

    #[test]
    fn test_open_long() {
        let mut pos = position();
        pos.add_trade(1.0, 100.0, 0.0);
        assert_eq!(pos.size, 1.0);
        assert_eq!(pos.avg_price, 100.0);
        assert_eq!(pos.realized_pnl, 0.0);
    }

    #[test]
    fn test_increase_averages_entry() {
        let mut pos = position();
        pos.add_trade(1.0, 100.0, 0.0);
        pos.add_trade(1.0, 110.0, 0.0);
        assert_eq!(pos.size, 2.0);
        assert_relative_eq!(pos.avg_price, 105.0);
    }

    #[test]
    fn test_increase_short() {
        let mut pos = position();
        pos.add_trade(-2.0, 100.0, 0.0);
        pos.add_trade(-2.0, 90.0, 0.0);
        assert_eq!(pos.size, -4.0);
        assert_relative_eq!(pos.avg_price, 95.0);
    }

    #[test]
    fn test_reduce_realizes_closed_portion() {
        let mut pos = position();
        pos.add_trade(2.0, 100.0, 0.0);
        pos.add_trade(-1.0, 110.0, 0.5);

        assert_eq!(pos.size, 1.0);
        // Entry unchanged on a reduce
        assert_eq!(pos.avg_price, 100.0);
        // (1.0) * (110 - 100) - 0.5
        assert_relative_eq!(pos.realized_pnl, 9.5);
    }

    #[test]
    fn test_full_close() {
        let mut pos = position();
        pos.add_trade(2.0, 100.0, 0.0);
        pos.add_trade(-2.0, 95.0, 1.0);

        assert_eq!(pos.size, 0.0);
        // 2 * (95 - 100) - 1
        assert_relative_eq!(pos.realized_pnl, -11.0);
        assert_eq!(pos.unrealized_pnl, 0.0);
    }

    #[test]
    fn test_flip_reenters_at_fill_price() {
        let mut pos = position();
        pos.add_trade(1.0, 100.0, 0.0);
        pos.add_trade(-3.0, 120.0, 0.0);

        assert_eq!(pos.size, -2.0);
        assert_eq!(pos.avg_price, 120.0);
        // Realized on the prior long: 1 * (120 - 100)
        assert_relative_eq!(pos.realized_pnl, 20.0);
    }

    #[test]
    fn test_short_reduce() {
        let mut pos = position();
        pos.add_trade(-2.0, 100.0, 0.0);
        pos.add_trade(1.0, 90.0, 0.0);

        assert_eq!(pos.size, -1.0);
        assert_eq!(pos.avg_price, 100.0);
        // (-1.0) * (90 - 100) = +10 profit on the covered unit
        assert_relative_eq!(pos.realized_pnl, 10.0);
    }

    #[test]
    fn test_mark_price_drives_unrealized() {
        let mut pos = position();
        pos.add_trade(2.0, 100.0, 0.0);
        pos.update_mark_price(103.0);
        assert_relative_eq!(pos.unrealized_pnl, 6.0);

        pos.update_mark_price(98.0);
        assert_relative_eq!(pos.unrealized_pnl, -4.0);
    }

    #[test]
    fn test_flat_position_has_zero_unrealized() {
        let mut pos = position();
        pos.update_mark_price(100.0);
        assert_eq!(pos.unrealized_pnl, 0.0);

        pos.add_trade(1.0, 100.0, 0.0);
        pos.add_trade(-1.0, 105.0, 0.0);
        pos.update_mark_price(110.0);
        assert_eq!(pos.unrealized_pnl, 0.0);
    }

    #[test]
    fn test_snapshot_shape() {
        let mut pos = position();
        pos.add_trade(2.0, 100.0, 0.0);
        pos.update_mark_price(105.0);

        let snap = pos.snapshot();
        assert_eq!(snap.size, 2.0);
        assert_eq!(snap.aep, 100.0);
        assert_eq!(snap.mark_price, 105.0);
        assert_relative_eq!(snap.value, 210.0);
        assert_relative_eq!(snap.position_balance, 200.0);
        assert_relative_eq!(snap.unrealized_pnl, 10.0);
        assert_eq!(snap.leverage, 1.0);
    }
}
