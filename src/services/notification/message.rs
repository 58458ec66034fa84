//! Human-readable match messages.

use crate::models::{Chain, MatchEvent};

/// Renders the message relayed to subscribers of a match.
///
/// The transaction link is only included when the chain has an explorer
/// configured.
pub fn build_message(event: &MatchEvent, chain: Option<&Chain>) -> String {
	let creation_time = event.created_at().map_or_else(
		|| "unknown".to_string(),
		|time| {
			format!(
				"{} ({})",
				time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
				time.format("%Y-%m-%d %H:%M:%S UTC")
			)
		},
	);

	let mut message = format!(
		"Contract Address: {}\n\nInput Address: {}\n\nChain Index: {}\n\nBlock Number: {}\n\nTransaction Hash: {}\n\nCreation Time: {}",
		event.contract_address,
		event.user_address,
		event.chain_index,
		event.block_number,
		event.tx_hash,
		creation_time,
	);

	if let Some(link) = chain.and_then(|chain| chain.explorer_tx_url(&event.tx_hash)) {
		message.push_str("\n\nTransaction Link: ");
		message.push_str(&link);
	}

	message
}
