use std::collections::BTreeSet;

use contract_sentinel::services::blockwatcher::BlockWindow;
use proptest::{prelude::*, test_runner::Config};

const MAX_HEIGHT: u64 = 1_000_000_000_000;

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_window_is_bounded(
		cursor in prop::option::of(0..MAX_HEIGHT),
		latest in 0..MAX_HEIGHT,
		depth in 0u64..10_000,
	) {
		match BlockWindow::determine(cursor, latest, depth) {
			Some(window) => {
				prop_assert!(window.start <= window.end);
				prop_assert!(window.end <= latest);
				prop_assert!(window.block_count() <= depth + 1);
				if let Some(cursor) = cursor {
					prop_assert_eq!(window.start, cursor);
				}
			}
			None => {
				prop_assert!(cursor.is_some_and(|c| c >= latest));
			}
		}
	}

	#[test]
	fn test_cursor_never_moves_backwards(
		start in 0..MAX_HEIGHT,
		tips in prop::collection::vec(0..MAX_HEIGHT, 1..20),
		depth in 0u64..500,
	) {
		// Advancing to the window end, as a completed cycle does
		let mut cursor = Some(start);
		for latest in tips {
			if let Some(window) = BlockWindow::determine(cursor, latest, depth) {
				let next = cursor.map_or(window.end, |c| c.max(window.end));
				prop_assert!(Some(next) >= cursor);
				cursor = Some(next);
			}
		}
	}

	#[test]
	fn test_pending_blocks_exclude_processed(
		start in 0u64..1_000_000,
		len in 0u64..200,
		processed in prop::collection::btree_set(0u64..1_000_200, 0..100),
	) {
		let window = BlockWindow { start, end: start + len };
		let pending = window.pending_blocks(&processed);

		prop_assert!(pending.windows(2).all(|pair| pair[0] < pair[1]));
		prop_assert!(pending.iter().all(|b| (window.start..=window.end).contains(b)));
		prop_assert!(pending.iter().all(|b| !processed.contains(b)));

		let covered: BTreeSet<u64> = pending
			.iter()
			.copied()
			.chain(processed.range(window.start..=window.end).copied())
			.collect();
		prop_assert_eq!(covered.len() as u64, window.block_count());
	}
}
