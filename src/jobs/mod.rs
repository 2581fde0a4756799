//! Background jobs.
//!
//! - [`CleanupSweeper`] - periodically removes registrations that were never
//!   confirmed

mod cleanup;

pub use cleanup::{CleanupConfig, CleanupSweeper, SweeperHandle};
