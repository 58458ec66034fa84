//! EVM blockchain data structures.

mod block;
mod receipt;

pub use block::{EvmBlock, EvmBlockTransaction, EvmTransaction};
pub use receipt::EvmReceipt;
