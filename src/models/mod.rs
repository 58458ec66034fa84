//! Domain models and data structures.
//!
//! - `blockchain`: EVM blocks, transactions and receipts as returned over JSON-RPC
//! - `config`: Configuration loading and validation
//! - `core`: Core domain models (Chain, contract and match events)

mod blockchain;
mod config;
mod core;

pub use blockchain::evm::{EvmBlock, EvmBlockTransaction, EvmReceipt, EvmTransaction};

pub use core::{Chain, ContractCreation, MatchEvent, NewContractsEvent, RpcUrl};

pub use config::{ConfigError, ConfigLoader};
