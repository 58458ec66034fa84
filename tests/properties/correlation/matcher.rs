use crate::properties::strategies::{
	address_strategy, bytecode_fragment_strategy, malformed_address_strategy,
};
use contract_sentinel::{
	services::correlation::{find_references, prepare_candidates, references_address},
	utils::strip_hex_prefix,
};
use proptest::{prelude::*, test_runner::Config};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_embedded_address_always_matches(
		address in address_strategy(),
		before in bytecode_fragment_strategy(64),
		after in bytecode_fragment_strategy(64),
		upper in any::<bool>(),
		prefixed in any::<bool>(),
	) {
		let body = strip_hex_prefix(&address);
		let mut code = format!("{}{}{}", before, body, after);
		if upper {
			code = code.to_uppercase();
		}
		if prefixed {
			code = format!("0x{}", code);
		}

		prop_assert!(references_address(&code, &address));
	}

	#[test]
	fn test_absent_address_never_matches(
		address in address_strategy(),
		code in bytecode_fragment_strategy(256),
	) {
		let needle = strip_hex_prefix(&address).to_lowercase();
		prop_assume!(!code.contains(&needle));

		let prefixed = format!("0x{}", code);
		prop_assert!(!references_address(&code, &address));
		prop_assert!(!references_address(&prefixed, &address));
	}

	#[test]
	fn test_malformed_addresses_never_match(
		address in malformed_address_strategy(),
		code in bytecode_fragment_strategy(128),
	) {
		// Even when the malformed text is literally present
		let code = format!("{}{}", code, strip_hex_prefix(&address));
		prop_assert!(!references_address(&code, &address));
	}

	#[test]
	fn test_candidates_are_deduplicated(
		address in address_strategy(),
		copies in 1usize..5,
	) {
		let spellings: Vec<String> = (0..copies)
			.map(|i| match i % 3 {
				0 => address.to_lowercase(),
				1 => address.to_uppercase(),
				_ => format!("0x{}", strip_hex_prefix(&address)),
			})
			.collect();

		let candidates = prepare_candidates(&spellings);
		prop_assert_eq!(candidates.len(), 1);

		let code = format!("0x{}", candidates[0].needle());
		prop_assert_eq!(find_references(&code, &candidates).len(), 1);
	}
}
