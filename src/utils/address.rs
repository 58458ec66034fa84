//! Address helpers.
//!
//! Watched addresses and contract addresses arrive as free-form strings from
//! users and from RPC responses. Everything that is compared against bytecode
//! goes through these helpers so validation and normalisation stay consistent.

use alloy::primitives::Address;

use crate::utils::constants::ADDRESS_HEX_LENGTH;

/// Strips an optional `0x` / `0X` prefix
pub fn strip_hex_prefix(value: &str) -> &str {
	value
		.strip_prefix("0x")
		.or_else(|| value.strip_prefix("0X"))
		.unwrap_or(value)
}

/// Parses a 20-byte address, accepting an optional prefix and any letter case.
///
/// Returns `None` for anything that is not exactly 40 hex characters after the
/// prefix. No checksum verification is performed.
pub fn parse_address(value: &str) -> Option<Address> {
	let body = strip_hex_prefix(value.trim());
	if body.len() != ADDRESS_HEX_LENGTH {
		return None;
	}
	let bytes = hex::decode(body).ok()?;
	Some(Address::from_slice(&bytes))
}

/// Returns true when `value` is a well-formed address
pub fn is_valid_address(value: &str) -> bool {
	parse_address(value).is_some()
}

/// Lowercase, prefix-free hex form used as the search needle inside bytecode
pub fn address_needle(address: &Address) -> String {
	hex::encode(address.as_slice())
}

/// EIP-55 checksummed rendering, used for storage and display
pub fn to_checksum_address(address: &Address) -> String {
	address.to_checksum(None)
}

/// Canonical stored form of a raw address string, if valid
pub fn normalize_address(value: &str) -> Option<String> {
	parse_address(value).map(|address| to_checksum_address(&address))
}

/// Case- and prefix-insensitive address equality.
///
/// Falls back to a plain case-insensitive comparison when either side is malformed.
pub fn same_address(a: &str, b: &str) -> bool {
	match (parse_address(a), parse_address(b)) {
		(Some(left), Some(right)) => left == right,
		_ => strip_hex_prefix(a).eq_ignore_ascii_case(strip_hex_prefix(b)),
	}
}
