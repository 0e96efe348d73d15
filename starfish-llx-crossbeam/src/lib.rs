//! Crossbeam-based reclamation for starfish-llx records.
//!
//! This crate provides `EpochGuard`, an implementation of the `Guard` trait
//! using crossbeam-epoch for memory reclamation.
//!
//! # Usage
//!
//! ```ignore
//! use starfish_llx::{LinkContext, LinkedOperations, Record};
//! use starfish_llx_crossbeam::EpochGuard;
//!
//! let record: Arc<Record<i64, (), EpochGuard>> = Arc::new(Record::new([0; 4], ()));
//! let mut context = LinkContext::new();
//! ```

pub mod epoch_guard;

// Export the Guard implementation
pub use epoch_guard::EpochGuard;
