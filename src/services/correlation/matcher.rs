//! Bytecode substring matching.
//!
//! A watched address matches a contract when its 40 hex characters appear,
//! case-insensitively, anywhere in the contract's deployed bytecode.

use std::collections::HashSet;

use crate::utils::{address_needle, parse_address, strip_hex_prefix, to_checksum_address};

/// A validated watched address with its precomputed search needle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchCandidate {
	/// Address as reported to users (checksummed)
	pub address: String,
	needle: String,
}

impl WatchCandidate {
	/// Returns `None` for malformed addresses
	pub fn new(address: &str) -> Option<Self> {
		let parsed = parse_address(address)?;
		Some(Self {
			address: to_checksum_address(&parsed),
			needle: address_needle(&parsed),
		})
	}

	/// Lowercase hex without prefix
	pub fn needle(&self) -> &str {
		&self.needle
	}
}

/// Validates and deduplicates watched addresses.
///
/// Malformed addresses are dropped; they can never match.
pub fn prepare_candidates<I, S>(addresses: I) -> Vec<WatchCandidate>
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut seen = HashSet::new();
	addresses
		.into_iter()
		.filter_map(|address| {
			let candidate = WatchCandidate::new(address.as_ref());
			if candidate.is_none() {
				tracing::debug!("Ignoring malformed watched address {}", address.as_ref());
			}
			candidate
		})
		.filter(|candidate| seen.insert(candidate.needle.clone()))
		.collect()
}

/// Candidates whose needle occurs in `bytecode`, in candidate order
pub fn find_references<'a>(
	bytecode: &str,
	candidates: &'a [WatchCandidate],
) -> Vec<&'a WatchCandidate> {
	let code = strip_hex_prefix(bytecode).to_ascii_lowercase();
	if code.is_empty() {
		return Vec::new();
	}
	candidates
		.iter()
		.filter(|candidate| code.contains(candidate.needle.as_str()))
		.collect()
}

/// Whether `bytecode` embeds `address`. Malformed addresses never match.
pub fn references_address(bytecode: &str, address: &str) -> bool {
	WatchCandidate::new(address)
		.map(|candidate| !find_references(bytecode, std::slice::from_ref(&candidate)).is_empty())
		.unwrap_or(false)
}
