use std::fmt;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crossbeam::utils::CachePadded;
use tracing::{debug, trace};

use crate::data_record::Record;
use crate::guard::Guard;

/// Lifecycle of an SCX.
///
/// ```text
///                ┌──► Committed
///   InProgress ──┤
///                └──► Aborted
/// ```
///
/// Both terminal states are final: every transition is a CAS out of
/// `InProgress`.
///
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScxState {
    InProgress = 0,
    Committed = 1,
    Aborted = 2,
}

impl ScxState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ScxState::InProgress,
            1 => ScxState::Committed,
            _ => ScxState::Aborted,
        }
    }
}

/// A value of a record's `info` field.
///
/// `Sentinel` is the null pointer every record starts with; it behaves as a
/// descriptor that committed long ago.
///
pub(crate) enum InfoRef<V, I, G: Guard> {
    Sentinel,
    Descriptor(Weak<ScxDescriptor<V, I, G>>),
}

impl<V, I, G: Guard> InfoRef<V, I, G> {
    /// Identity used by the freezing CAS. Null for the sentinel.
    pub(crate) fn as_ptr(&self) -> *const ScxDescriptor<V, I, G> {
        match self {
            InfoRef::Sentinel => ptr::null(),
            InfoRef::Descriptor(descriptor) => descriptor.as_ptr(),
        }
    }
}

impl<V, I, G: Guard> Clone for InfoRef<V, I, G> {
    fn clone(&self) -> Self {
        match self {
            InfoRef::Sentinel => InfoRef::Sentinel,
            InfoRef::Descriptor(descriptor) => InfoRef::Descriptor(Weak::clone(descriptor)),
        }
    }
}

/// The one field write an SCX performs when it commits.
///
pub(crate) struct FieldWrite<V, I, G: Guard> {
    pub(crate) record: Arc<Record<V, I, G>>,
    pub(crate) field: usize,
    pub(crate) old_value: Arc<V>,
    pub(crate) new_value: Arc<V>,
}

/// Result of one freezing attempt.
///
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Freeze {
    /// This attempt installed the descriptor.
    Frozen,
    /// Another helper installed it first.
    AlreadyFrozen,
    /// The record moved on to a different descriptor.
    Conflict,
}

///
/// SCX descriptor (SCX record).
///
/// Describes one SCX: which records it needs frozen, which of them it
/// finalizes, and the field write it performs. Any thread that finds the
/// descriptor in a record's `info` may help it to completion.
///
/// ```text
/// affected_records   [r0] [r1] [r2] … [rN-1]     freeze in this order (serial helper)
/// info_fields        [i0] [i1] [i2] … [iN-1]     info each ri had at its LLX
///
/// freeze ri:  CAS(ri.info, ii ──► this)
/// commit:     all_frozen = true ──► mark finalized ──► CAS field ──► Committed
/// ```
///
/// `frozen_records` counts successful freezing CASes. A record is frozen
/// for a descriptor by exactly one successful CAS and a record's `info`
/// never returns to an earlier value, so the counter reaching
/// `affected_records.len()` means every record is frozen.
///
pub struct ScxDescriptor<V, I, G: Guard> {
    affected_records: Vec<Arc<Record<V, I, G>>>,
    records_to_finalize: Vec<Arc<Record<V, I, G>>>,
    field_write: Option<FieldWrite<V, I, G>>,
    info_fields: Vec<InfoRef<V, I, G>>,
    state: AtomicU8,
    all_frozen: AtomicBool,
    threads_helping: CachePadded<AtomicUsize>,
    frozen_records: CachePadded<AtomicUsize>,
}

impl<V, I, G: Guard> ScxDescriptor<V, I, G> {
    pub(crate) fn new(
        affected_records: Vec<Arc<Record<V, I, G>>>,
        records_to_finalize: Vec<Arc<Record<V, I, G>>>,
        field_write: Option<FieldWrite<V, I, G>>,
        info_fields: Vec<InfoRef<V, I, G>>,
    ) -> Self {
        debug_assert_eq!(affected_records.len(), info_fields.len());

        ScxDescriptor {
            affected_records,
            records_to_finalize,
            field_write,
            info_fields,
            state: AtomicU8::new(ScxState::InProgress as u8),
            all_frozen: AtomicBool::new(false),
            threads_helping: CachePadded::new(AtomicUsize::new(0)),
            frozen_records: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    pub fn state(&self) -> ScxState {
        ScxState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_all_frozen(&self) -> bool {
        self.all_frozen.load(Ordering::SeqCst)
    }

    /// Helpers currently working on this descriptor.
    pub fn threads_helping(&self) -> usize {
        self.threads_helping.load(Ordering::SeqCst)
    }

    /// Successful freezing CASes so far.
    pub fn frozen_records(&self) -> usize {
        self.frozen_records.load(Ordering::SeqCst)
    }

    pub fn affected_records(&self) -> &[Arc<Record<V, I, G>>] {
        &self.affected_records
    }

    pub fn records_to_finalize(&self) -> &[Arc<Record<V, I, G>>] {
        &self.records_to_finalize
    }

    // =========================================================================
    // Helping
    // =========================================================================

    /// Register a helper. The slot holds the 1-based helper number and
    /// leaves again when dropped, on every exit path.
    pub(crate) fn join(&self) -> HelperSlot<'_> {
        let number = self.threads_helping.fetch_add(1, Ordering::SeqCst) + 1;

        HelperSlot {
            threads_helping: &self.threads_helping,
            number,
        }
    }

    /// Try to freeze `affected_records[index]` for this descriptor.
    pub(crate) fn freeze(self: &Arc<Self>, index: usize) -> Freeze {
        let record = &self.affected_records[index];

        if record.cas_info(&self.info_fields[index], self) {
            self.frozen_records.fetch_add(1, Ordering::SeqCst);
            trace!(index, "froze record");
            Freeze::Frozen
        } else if record.is_owned_by(self) {
            Freeze::AlreadyFrozen
        } else {
            Freeze::Conflict
        }
    }

    /// Settle a freezing conflict on `affected_records[index]`.
    ///
    /// If every record was already frozen the conflict is stale (the
    /// descriptor committed and the record has since moved on) and the SCX
    /// succeeded. Otherwise the SCX aborts.
    ///
    pub(crate) fn resolve_conflict(&self, index: usize) -> bool {
        if self.is_all_frozen() {
            return true;
        }

        if self.abort() {
            debug!(index, "scx aborted on a conflicting record");
            false
        } else {
            self.state() == ScxState::Committed
        }
    }

    /// CAS `InProgress ──► Aborted`. True if this call aborted.
    pub(crate) fn abort(&self) -> bool {
        self.transition(ScxState::Aborted)
    }

    /// Complete a fully frozen SCX. Idempotent: every helper that gets here
    /// repeats the same steps and all but the first are no-ops.
    pub(crate) fn commit(&self) -> bool {
        self.all_frozen.store(true, Ordering::SeqCst);

        for record in &self.records_to_finalize {
            record.mark();
        }

        if let Some(write) = &self.field_write {
            write
                .record
                .cas_field(write.field, &write.old_value, &write.new_value);
        }

        if self.transition(ScxState::Committed) {
            trace!(
                records = self.affected_records.len(),
                finalized = self.records_to_finalize.len(),
                "scx committed"
            );
        }
        true
    }

    fn transition(&self, to: ScxState) -> bool {
        self.state
            .compare_exchange(
                ScxState::InProgress as u8,
                to as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

impl<V, I, G: Guard> fmt::Debug for ScxDescriptor<V, I, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScxDescriptor")
            .field("state", &self.state())
            .field("all_frozen", &self.is_all_frozen())
            .field("records", &self.affected_records.len())
            .field("finalize", &self.records_to_finalize.len())
            .field("threads_helping", &self.threads_helping())
            .field("frozen_records", &self.frozen_records())
            .finish()
    }
}

/// Membership of one helper in `threads_helping`.
///
pub(crate) struct HelperSlot<'a> {
    threads_helping: &'a AtomicUsize,
    number: usize,
}

impl HelperSlot<'_> {
    pub(crate) fn number(&self) -> usize {
        self.number
    }
}

impl Drop for HelperSlot<'_> {
    fn drop(&mut self) {
        self.threads_helping.fetch_sub(1, Ordering::SeqCst);
        trace!(helper = self.number, "helper left");
    }
}
