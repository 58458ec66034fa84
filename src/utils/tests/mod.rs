//! Test helper utilities
//!
//! - `builders`: Builders for test instances of models

pub mod builders {
	pub mod evm {
		pub mod block;
		pub mod receipt;
	}

	pub mod chain;
}

pub use builders::*;
