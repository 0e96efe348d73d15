// Atomic slot owning one reference-counted pointer.
//
// A slot stores the raw pointer produced by `Arc::into_raw` / `Weak::into_raw`
// and owns exactly one reference through it. A null raw pointer is an empty
// slot (for `info` it stands for the sentinel descriptor).
//
//   load:  pin ──► raw = slot.load ──► bump count ──► unpin
//   swap:  CAS(slot, current, new) ──► defer release of `current` through the Guard
//
// Between `slot.load` and the count bump another thread may swap the pointer
// out; the swapped-out reference is only handed to `Guard::defer_destroy`, so
// the pinned reader still sees a live allocation.
//
// Identity comparisons (CAS expected values) use the raw pointer. A caller
// comparing against a pointer must itself hold a reference of that pointer
// (strong or weak), which keeps the allocation, and so the address, alive:
// no ABA.

use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Arc, Weak};

use crate::guard::Guard;

/// Reference-counted pointer that can round-trip through a raw pointer.
///
pub(crate) trait SharedPointer: Sized {
    type Target;

    fn into_raw(this: Self) -> *const Self::Target;

    /// # Safety
    /// `raw` must come from `into_raw` and carry one unreleased reference.
    ///
    unsafe fn from_raw(raw: *const Self::Target) -> Self;

    /// Produce a new reference without consuming the one `raw` carries.
    ///
    /// # Safety
    /// `raw` must point at a live allocation of this pointer type.
    ///
    unsafe fn clone_from_raw(raw: *const Self::Target) -> Self;
}

impl<T> SharedPointer for Arc<T> {
    type Target = T;

    #[inline]
    fn into_raw(this: Self) -> *const T {
        Arc::into_raw(this)
    }

    #[inline]
    unsafe fn from_raw(raw: *const T) -> Self {
        unsafe { Arc::from_raw(raw) }
    }

    #[inline]
    unsafe fn clone_from_raw(raw: *const T) -> Self {
        unsafe {
            Arc::increment_strong_count(raw);
            Arc::from_raw(raw)
        }
    }
}

impl<T> SharedPointer for Weak<T> {
    type Target = T;

    #[inline]
    fn into_raw(this: Self) -> *const T {
        Weak::into_raw(this)
    }

    #[inline]
    unsafe fn from_raw(raw: *const T) -> Self {
        unsafe { Weak::from_raw(raw) }
    }

    #[inline]
    unsafe fn clone_from_raw(raw: *const T) -> Self {
        let borrowed = ManuallyDrop::new(unsafe { Weak::from_raw(raw) });
        Weak::clone(&borrowed)
    }
}

// Release function handed to `Guard::defer_destroy`.
//
unsafe fn release<P: SharedPointer>(raw: *mut P::Target) {
    drop(unsafe { P::from_raw(raw as *const P::Target) });
}

pub(crate) struct SharedCell<P: SharedPointer> {
    raw: AtomicPtr<P::Target>,
    // Owns a `P`: Send/Sync follow the pointer type.
    _owned: PhantomData<P>,
}

impl<P: SharedPointer> SharedCell<P> {
    pub(crate) fn new(value: Option<P>) -> Self {
        let raw = value.map_or(ptr::null(), P::into_raw);

        SharedCell {
            raw: AtomicPtr::new(raw as *mut P::Target),
            _owned: PhantomData,
        }
    }

    /// Raw pointer currently installed (identity only, never dereferenced).
    #[inline]
    pub(crate) fn as_ptr(&self) -> *const P::Target {
        self.raw.load(Ordering::SeqCst)
    }

    /// Load a new reference to the current value.
    ///
    pub(crate) fn load<G: Guard>(&self) -> Option<P> {
        let _pin = G::pin();
        let raw = self.raw.load(Ordering::SeqCst);

        if raw.is_null() {
            None
        } else {
            // SAFETY: a value swapped out of this slot is only released through
            // the record's Guard, which waits for `_pin`.
            Some(unsafe { P::clone_from_raw(raw) })
        }
    }

    /// CAS the slot from `current` to `new`.
    ///
    /// On success the reference previously owned by the slot goes to `guard`
    /// for deferred release. On failure `new` is handed back untouched.
    ///
    pub(crate) fn compare_exchange<G: Guard>(
        &self,
        guard: &G,
        current: *const P::Target,
        new: P,
    ) -> Result<(), P> {
        let new_raw = P::into_raw(new);

        match self.raw.compare_exchange(
            current as *mut P::Target,
            new_raw as *mut P::Target,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(previous) => {
                if !previous.is_null() {
                    // SAFETY: `previous` is no longer reachable from the slot and
                    // carries the reference the slot owned.
                    unsafe { guard.defer_destroy(previous, release::<P>) };
                }
                Ok(())
            }
            // SAFETY: the CAS failed, so `new_raw` was never published.
            Err(_) => Err(unsafe { P::from_raw(new_raw) }),
        }
    }
}

impl<P: SharedPointer> Drop for SharedCell<P> {
    fn drop(&mut self) {
        let raw = *self.raw.get_mut();

        if !raw.is_null() {
            // SAFETY: exclusive access; the slot owns this reference.
            drop(unsafe { P::from_raw(raw) });
        }
    }
}
