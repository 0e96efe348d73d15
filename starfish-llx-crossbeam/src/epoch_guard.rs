//! Epoch-based guard implementation using crossbeam-epoch.
//!
//! This module provides `EpochGuard`, an implementation of the `Guard` trait
//! using crossbeam-epoch for memory reclamation.
//!
//! # Design
//!
//! `EpochGuard` is a zero-sized type that schedules releases on the global
//! epoch collector. Records parameterized with `EpochGuard` get epoch-based
//! reclamation of their swapped-out field values and `info` references:
//!
//! ```text
//! Record<V, I, EpochGuard>
//!     │
//!     ├── field load:  epoch::pin ──► load slot ──► bump count ──► unpin
//!     └── field CAS:   old reference ──► defer_unchecked(release)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use starfish_llx::{FieldUpdate, LinkContext, LinkedOperations, LoadLinkResult, Record};
//! use starfish_llx_crossbeam::EpochGuard;
//!
//! let operations = LinkedOperations::default();
//! let record: Arc<Record<u64, (), EpochGuard>> = Arc::new(Record::new([0, 0], ()));
//! let mut context = LinkContext::new();
//!
//! context.with_linked_operations(|context| {
//!     if let Ok(LoadLinkResult::Success(snapshot)) = operations.load_link(context, &record) {
//!         let update = FieldUpdate::new(&record, 1, snapshot[1] + 1);
//!         let _ = operations.store_conditional(context, &[record.clone()], &[], Some(update));
//!     }
//! });
//! ```

use crossbeam_epoch::{self as epoch, Guard as CrossbeamGuard};
use starfish_llx::guard::Guard;

/// Epoch-based memory reclamation guard.
///
/// A reference swapped out of a record slot is released only after every
/// thread that was pinned when it was swapped out has unpinned.
///
/// # Design
///
/// Unlike `DeferredGuard`, which keeps pending releases until the record
/// drops, `EpochGuard` is stateless: releases go to the global epoch
/// collector, which runs them in batches as the epoch advances.
///
/// When `defer_destroy` is called, it:
/// 1. Pins the current thread to the current epoch
/// 2. Schedules the release to run after all threads have advanced
/// 3. Unpins immediately (the release is managed globally)
///
/// # Performance
///
/// - **Pin overhead**: Very low (thread-local check)
/// - **Reclamation**: Batched, amortized O(1) per reference
/// - **Memory**: Superseded values may accumulate while a thread stays pinned
///
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochGuard {
    // Zero-sized - all state is in the global epoch collector
}

impl EpochGuard {
    pub fn new() -> Self {
        EpochGuard {}
    }
}

impl Guard for EpochGuard {
    /// A pinned crossbeam guard; slot loads are protected while it lives.
    type ReadGuard = CrossbeamGuard;

    fn pin() -> Self::ReadGuard {
        epoch::pin()
    }

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        let guard = epoch::pin();
        unsafe {
            guard.defer_unchecked(move || {
                dealloc(node);
            });
        }
    }
}
