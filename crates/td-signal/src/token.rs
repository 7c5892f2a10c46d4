//! Tick tokens: one per top-level tick, shared by every node read during it.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Identifies one evaluation pass over a signal graph.
///
/// Tokens are process-wide and strictly increasing, so a memo cell left
/// behind by one tick source can never be mistaken for the current pass of
/// another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickToken(u64);

impl TickToken {
    /// Mint a fresh token. Call once per top-level tick.
    pub fn mint() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw value.
    pub fn value(&self) -> u64 {
        self.0
    }
}
