//! Contract correlation.
//!
//! Consumes new-contract events from the chain pollers, checks every new
//! contract's bytecode for watched addresses and publishes the matches.

mod engine;
mod error;
mod matcher;

pub use engine::CorrelationEngine;
pub use error::CorrelationError;
pub use matcher::{find_references, prepare_candidates, references_address, WatchCandidate};
