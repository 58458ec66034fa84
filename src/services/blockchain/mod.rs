//! Blockchain client interfaces and implementations.
//!
//! - Generic blockchain client trait
//! - EVM JSON-RPC client
//! - HTTP transport with endpoint rotation
//! - Error handling for blockchain operations

mod client;
mod clients;
mod error;
mod transports;

pub use client::{with_timeout, BlockChainClient};
pub use clients::{EvmClient, EvmClientTrait};
pub use error::BlockChainError;
pub use transports::{
	BlockchainTransport, EndpointManager, HttpTransportClient, RotatingTransport,
	ROTATE_ON_ERROR_CODES,
};
