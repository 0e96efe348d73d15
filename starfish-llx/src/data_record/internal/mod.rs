//! Internal implementation details.
//!
//! These are pub(crate) and not intended for external use.

pub mod shared_cell;

pub(crate) use shared_cell::SharedCell;
