//! Guard trait for memory reclamation strategies.
//!
//! Every atomic slot of a [`Record`](crate::Record) (its mutable fields and
//! its `info` reference) owns a reference-counted pointer. When a CAS swaps a
//! pointer out, the old reference cannot be released on the spot: another
//! thread may have loaded the raw pointer and be about to bump its count.
//! The `Guard` trait abstracts over when that release becomes safe.
//!
//! # Design
//!
//! ```text
//! Record<V, I, G: Guard>
//!     │
//!     ├── Record<V, I, EpochGuard>      (production, starfish-llx-crossbeam)
//!     └── Record<V, I, DeferredGuard>   (testing)
//! ```
//!
//! Readers call [`Guard::pin`] around the load-and-increment of a slot;
//! writers hand the swapped-out pointer to [`Guard::defer_destroy`].

mod deferred_guard;

pub use deferred_guard::DeferredGuard;

/// A memory reclamation guard protecting the atomic slots of a record.
///
/// # Safety Contract
///
/// Implementations must ensure that a pointer passed to `defer_destroy` is not
/// released while any `ReadGuard` pinned before the call is still alive.
///
/// # Design Note
///
/// One guard value is stored in every record and must be `Send + Sync`.
/// Thread pinning (for epoch-based guards) happens per load, not when the
/// guard is created.
///
pub trait Guard: Sized + Default + Send + Sync {
    /// An active guard that protects slot loads for its lifetime.
    ///
    /// For epoch-based guards this holds a pinned `crossbeam_epoch::Guard`.
    /// For deferred guards it is `()`, since nothing is released before the
    /// owning record drops.
    ///
    type ReadGuard: Sized;

    /// Pin an active read guard.
    ///
    fn pin() -> Self::ReadGuard;

    /// Schedule a swapped-out reference for release.
    ///
    /// # Safety
    ///
    /// - `node` must have been produced by the matching `into_raw` of the
    ///   pointer type that `dealloc` reconstructs
    /// - `node` must no longer be reachable from any slot
    /// - ownership of that one reference moves to the guard
    ///
    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N));
}
