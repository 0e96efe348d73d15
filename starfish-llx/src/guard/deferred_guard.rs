//! Deferred guard implementation for testing.
//!
//! `DeferredGuard` keeps every swapped-out reference of a record until the
//! record itself is dropped.

use std::collections::HashSet;
use std::sync::Mutex;

use super::Guard;

/// A guard that defers every release until the guard is dropped.
///
/// Useful for tests: destruction timing is predictable and a reference that
/// is released twice is caught. Not suitable for long-lived records, since
/// every superseded field value and descriptor reference accumulates until
/// the record drops.
///
/// # Thread Safety
///
/// Deferred references are collected behind a `Mutex`, so any number of
/// helpers may swap slots of the same record concurrently.
///
pub struct DeferredGuard {
    deferred: Mutex<Vec<DeferredRelease>>,
    #[cfg(debug_assertions)]
    seen: Mutex<HashSet<usize>>,
}

struct DeferredRelease {
    ptr: *mut (),
    dealloc: unsafe fn(*mut ()),
}

// Safety: the pointer is only dereferenced by `dealloc`, once, when the guard
// drops; access to the list is serialized by the Mutex.
unsafe impl Send for DeferredRelease {}

impl DeferredGuard {
    /// Create a new deferred guard.
    pub fn new() -> Self {
        DeferredGuard {
            deferred: Mutex::new(Vec::new()),
            #[cfg(debug_assertions)]
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Number of references waiting for release.
    pub fn pending(&self) -> usize {
        self.deferred
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Default for DeferredGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeferredGuard {
    fn drop(&mut self) {
        let releases = match self.deferred.get_mut() {
            Ok(releases) => releases,
            Err(poisoned) => poisoned.into_inner(),
        };

        for release in releases.drain(..) {
            unsafe {
                (release.dealloc)(release.ptr);
            }
        }
    }
}

impl Guard for DeferredGuard {
    /// Nothing is released before the owning record drops, so reads need no
    /// protection of their own.
    type ReadGuard = ();

    fn pin() -> Self::ReadGuard {}

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        #[cfg(debug_assertions)]
        {
            let addr = node as usize;
            let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
            if !seen.insert(addr) {
                panic!("DUPLICATE defer_destroy at {:#x}", addr);
            }
        }

        let release = DeferredRelease {
            ptr: node as *mut (),
            dealloc: unsafe {
                std::mem::transmute::<unsafe fn(*mut N), unsafe fn(*mut ())>(dealloc)
            },
        };
        self.deferred
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(release);
    }
}
