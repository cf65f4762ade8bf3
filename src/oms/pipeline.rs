//! Order pipeline: pending and active containers
//!
//! Pending holds orders still waiting out their submission latency; Active
//! holds orders eligible for matching. Both are insertion-ordered so that
//! promotion and matching are deterministic. The pending scan is O(P) per
//! tick, which is fine at the handful of in-flight orders a strategy keeps.

use crate::oms::types::{Order, OrderStatus};
use crate::types::{Symbol, Timestamp};

/// Owns every live order from placement until fill or cancellation
#[derive(Debug, Default)]
pub struct OrderPipeline {
    pending: Vec<Order>,
    active: Vec<Order>,
}

impl OrderPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a freshly placed order behind its submission latency
    pub fn submit(&mut self, order: Order) {
        debug_assert_eq!(order.status, OrderStatus::Pending);
        self.pending.push(order);
    }

    /// Move every pending order whose execution time has elapsed to Active,
    /// preserving placement order. Returns how many were promoted.
    pub fn promote_ready(&mut self, now: Timestamp) -> usize {
        let mut promoted = 0;
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].execution_time <= now {
                let mut order = self.pending.remove(i);
                order.status = OrderStatus::Active;
                self.active.push(order);
                promoted += 1;
            } else {
                i += 1;
            }
        }
        promoted
    }

    /// Cancel an active order by id
    ///
    /// Only Active is searched: a Pending order keeps its slot and will
    /// still promote, which mirrors the exchange not having seen the
    /// cancel before the order reached the book.
    pub fn cancel(&mut self, order_id: &str) -> Option<Order> {
        let idx = self.active.iter().position(|o| o.id == order_id)?;
        let mut order = self.active.remove(idx);
        order.status = OrderStatus::Cancelled;
        Some(order)
    }

    /// Cancel every active order for a symbol; returns how many were removed
    pub fn cancel_all(&mut self, symbol: &Symbol) -> usize {
        let before = self.active.len();
        self.active.retain(|o| &o.symbol != symbol);
        before - self.active.len()
    }

    /// Active orders in insertion order
    pub fn active(&self) -> &[Order] {
        &self.active
    }

    /// Mutable iteration over active orders, insertion order
    pub fn active_iter_mut(&mut self) -> impl Iterator<Item = &mut Order> {
        self.active.iter_mut()
    }

    /// Remove every order marked Filled from Active, preserving fill order
    pub fn take_filled(&mut self) -> Vec<Order> {
        let mut filled = Vec::new();
        let mut i = 0;
        while i < self.active.len() {
            if self.active[i].is_filled() {
                filled.push(self.active.remove(i));
            } else {
                i += 1;
            }
        }
        filled
    }

    /// Look up a live order (pending or active) by id
    pub fn get(&self, order_id: &str) -> Option<&Order> {
        self.active
            .iter()
            .chain(self.pending.iter())
            .find(|o| o.id == order_id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }
}
