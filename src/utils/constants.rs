//! Constants used across the application.

/// Directory holding the persisted stores when `DATA_DIR` is not set
pub const DEFAULT_DATA_DIR: &str = "data";

/// Directory holding the chain definitions when `CONFIG_DIR` is not set
pub const DEFAULT_CHAINS_CONFIG_DIR: &str = "config/chains";

/// Upper bound applied to every remote call when a chain does not set `rpc_timeout_ms`
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 30_000;

/// Capacity of the new-contract and match event channels
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Number of hex characters in an address without its prefix
pub const ADDRESS_HEX_LENGTH: usize = 40;
