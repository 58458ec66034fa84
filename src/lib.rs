//! Contract Sentinel
//!
//! Watches several EVM chains for newly deployed contracts and reports every
//! contract whose deployed bytecode embeds an address that a user registered
//! interest in.
//!
//! # Components
//! - `services::blockwatcher`: one scheduled poller per chain, tracking a block cursor
//! - `services::correlation`: matches new contract bytecode against watched addresses
//! - `services::storage`: file-backed chain state, user registry and match log
//! - `services::notification`: relays match events to the configured sinks
//! - `services::blockchain`: JSON-RPC client used by the pollers and the engine

pub mod bootstrap;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;
