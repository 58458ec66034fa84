//! Block window tracking.
//!
//! Decides which blocks a poll cycle covers given the persisted cursor, the
//! chain tip and the confirmation depth, and which of those still need work.

use std::collections::BTreeSet;

/// Inclusive range of blocks handled by one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockWindow {
	pub start: u64,
	pub end: u64,
}

impl BlockWindow {
	/// Computes the window for a cycle.
	///
	/// - no cursor (cold start): `[latest - depth, latest]`
	/// - cursor set: `[cursor, min(cursor + depth, latest)]`
	/// - `None` when the cursor has caught up with the tip
	///
	/// A window never spans more than `depth + 1` blocks and never ends past `latest`.
	pub fn determine(cursor: Option<u64>, latest: u64, depth: u64) -> Option<Self> {
		match cursor {
			None => Some(Self {
				start: latest.saturating_sub(depth),
				end: latest,
			}),
			Some(cursor) if cursor >= latest => None,
			Some(cursor) => Some(Self {
				start: cursor,
				end: cursor.saturating_add(depth).min(latest),
			}),
		}
	}

	pub fn block_count(&self) -> u64 {
		self.end - self.start + 1
	}

	pub fn blocks(&self) -> impl Iterator<Item = u64> {
		self.start..=self.end
	}

	/// Blocks of the window not yet marked processed, in increasing order
	pub fn pending_blocks(&self, processed: &BTreeSet<u64>) -> Vec<u64> {
		self.blocks().filter(|b| !processed.contains(b)).collect()
	}
}
