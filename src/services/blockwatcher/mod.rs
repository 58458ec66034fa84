//! Block watching functionality.
//!
//! - `service`: scheduled per-chain pollers and the poll cycle
//! - `tracker`: block window selection and gap detection
//! - `error`: error types

mod error;
mod service;
mod tracker;

pub use error::BlockWatcherError;
pub use service::{
	process_new_blocks, BlockWatcherService, ChainBlockWatcher, CycleReport, JobSchedulerTrait,
};
pub use tracker::BlockWindow;
