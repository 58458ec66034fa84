//! Core domain models.
//!
//! - Chains: Network definitions and connection details
//! - Events: Messages passed between the pollers, the correlation engine and the notifiers

mod chain;
mod events;

pub use chain::{Chain, RpcUrl};
pub use events::{ContractCreation, MatchEvent, NewContractsEvent};
