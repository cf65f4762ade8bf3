//! Time cursor over multi-symbol snapshot streams
//!
//! Owns one consumed-up-to index per symbol plus the virtual clock.
//! Advancing is either a single coalesced step (consume every snapshot
//! sharing the minimum pending timestamp) or a binary-search jump to a
//! target time. Streams are consumed in order and never rewound.

use crate::types::{Snapshot, Timestamp};
use crate::Symbol;

/// One symbol's ordered snapshot stream and its consumption index
#[derive(Debug)]
struct SymbolStream {
    symbol: Symbol,
    snapshots: Vec<Snapshot>,
    index: usize,
}

impl SymbolStream {
    fn peek(&self) -> Option<&Snapshot> {
        self.snapshots.get(self.index)
    }

    fn is_exhausted(&self) -> bool {
        self.index >= self.snapshots.len()
    }
}

/// Snapshots consumed by one advance, all sharing one timestamp
///
/// The order of `books` follows stream construction order when several
/// symbols tick together; callers must not rely on it.
#[derive(Debug)]
pub struct CoalescedTick {
    pub ts: Timestamp,
    pub books: Vec<(Symbol, Snapshot)>,
}

/// Per-symbol cursor into the recorded streams plus the virtual clock
#[derive(Debug)]
pub struct TimeCursor {
    streams: Vec<SymbolStream>,
    current_time: Timestamp,
}

impl TimeCursor {
    /// Build a cursor over pre-sorted streams. Stream order fixes the
    /// tie-break order for coalesced ticks.
    pub fn new(streams: Vec<(Symbol, Vec<Snapshot>)>) -> Self {
        let streams = streams
            .into_iter()
            .map(|(symbol, snapshots)| {
                debug_assert!(snapshots.windows(2).all(|w| w[0].ts <= w[1].ts));
                SymbolStream {
                    symbol,
                    snapshots,
                    index: 0,
                }
            })
            .collect();

        TimeCursor {
            streams,
            current_time: 0,
        }
    }

    /// Current virtual timestamp; 0 until the first step
    pub fn current_time(&self) -> Timestamp {
        self.current_time
    }

    /// True when every stream is fully consumed
    pub fn is_exhausted(&self) -> bool {
        self.streams.iter().all(SymbolStream::is_exhausted)
    }

    /// Timestamp of the next unconsumed snapshot across all symbols
    pub fn peek_next_time(&self) -> Option<Timestamp> {
        self.streams
            .iter()
            .filter_map(|s| s.peek().map(|snap| snap.ts))
            .min()
    }

    /// Consume the next coalesced tick: every snapshot whose timestamp
    /// equals the minimum pending timestamp. Returns None when every
    /// stream is exhausted.
    pub fn step(&mut self) -> Option<CoalescedTick> {
        let min_ts = self.peek_next_time()?;

        let mut books = Vec::new();
        for stream in &mut self.streams {
            if let Some(snapshot) = stream.peek() {
                if snapshot.ts == min_ts {
                    books.push((stream.symbol.clone(), snapshot.clone()));
                    stream.index += 1;
                }
            }
        }

        debug_assert!(min_ts >= self.current_time);
        self.current_time = min_ts;

        Some(CoalescedTick { ts: min_ts, books })
    }

    /// Advance every stream to its first snapshot with `ts >= target`
    /// without consuming anything. A following [`step`](Self::step) lands
    /// on the next real snapshot at or after `target`.
    pub fn seek(&mut self, target: Timestamp) {
        for stream in &mut self.streams {
            let remaining = &stream.snapshots[stream.index..];
            stream.index += remaining.partition_point(|s| s.ts < target);
        }
    }
}
