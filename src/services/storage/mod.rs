//! Persistent stores.
//!
//! Every store keeps one JSON document per collection under the data directory.
//! Each operation loads the document, mutates it and rewrites it atomically; the
//! previous version is kept next to it as `<file>.bak`. Read-modify-write cycles
//! are serialized per store (per chain for the chain state store).
//!
//! - `chain_state`: processed blocks, cursor and missed blocks per chain
//! - `user_registry`: watched addresses per user and chain
//! - `match_log`: matched user addresses per chain, block and contract

mod chain_state;
mod error;
mod file;
mod match_log;
mod user_registry;

pub use chain_state::{BlockContracts, ChainStateStore, FileChainStateStore};
pub use error::StorageError;
pub use file::{write_atomic, JsonDocument};
pub use match_log::{BlockMatches, FileMatchStore, MatchStore};
pub use user_registry::{FileUserRegistry, UserRegistry};
