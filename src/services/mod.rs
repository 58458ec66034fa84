//! Core services of the contract sentinel.
//!
//! - `blockchain`: RPC clients and transports
//! - `blockwatcher`: per-chain block polling and cursor tracking
//! - `correlation`: bytecode correlation against watched addresses
//! - `notification`: match event delivery
//! - `storage`: persisted chain state, user registry and match log

pub mod blockchain;
pub mod blockwatcher;
pub mod correlation;
pub mod notification;
pub mod storage;
