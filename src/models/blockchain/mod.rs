//! Blockchain-specific model implementations.
//!
//! Only EVM-compatible chains are supported; their JSON-RPC payloads are
//! decoded into the types of the `evm` submodule.

pub mod evm;
