use crate::properties::strategies::{address_strategy, malformed_address_strategy};
use contract_sentinel::utils::{is_valid_address, normalize_address, same_address};
use proptest::{prelude::*, test_runner::Config};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_normalization_is_idempotent(address in address_strategy()) {
		let normalized = normalize_address(&address).unwrap();
		prop_assert!(normalized.starts_with("0x"));
		prop_assert_eq!(normalize_address(&normalized), Some(normalized.clone()));
		prop_assert!(same_address(&normalized, &address.to_lowercase()));
	}

	#[test]
	fn test_malformed_addresses_are_rejected(address in malformed_address_strategy()) {
		prop_assert!(!is_valid_address(&address));
		prop_assert!(normalize_address(&address).is_none());
	}
}
