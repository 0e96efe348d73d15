use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use crate::data_record::internal::SharedCell;
use crate::data_record::{InfoRef, ScxDescriptor, ScxState, Snapshot};
use crate::guard::Guard;

/// Stable identity of a record, valid while the record is alive.
///
/// SCX callers that may touch overlapping records must list
/// `affected_records` in one global order; sorting by `RecordId` gives one.
///
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(usize);

///
/// Data record: the unit LLX snapshots and SCX freezes.
///
/// ```text
/// ┌──────────────────────────────┐
/// │ Record                       │
/// │  mutable_fields [A][B][C]…   │◄── CAS per slot (only by a committing SCX)
/// │  immutable_fields            │    write-once
/// │  info ──────────────────────►│──► ScxDescriptor (weak), null = sentinel
/// │  marked  false ──► true      │    once, never back
/// └──────────────────────────────┘
/// ```
///
/// Records are shared as `Arc<Record<..>>`. A descriptor holds its records
/// strongly while a record's `info` holds its descriptor weakly, so the two
/// never form a reference cycle.
///
pub struct Record<V, I, G: Guard> {
    mutable_fields: Box<[SharedCell<Arc<V>>]>,
    immutable_fields: I,
    info: SharedCell<Weak<ScxDescriptor<V, I, G>>>,
    marked: AtomicBool,
    guard: G,
}

/// What a record's `info` pointed at when it was read.
///
pub(crate) struct InfoView<V, I, G: Guard> {
    pub(crate) info: InfoRef<V, I, G>,
    /// `None` for the sentinel, and for a descriptor nobody works on any more.
    pub(crate) descriptor: Option<Arc<ScxDescriptor<V, I, G>>>,
}

impl<V, I, G: Guard> InfoView<V, I, G> {
    /// A descriptor is held strongly by its originator and by every helper
    /// until they return, and none of them returns before the descriptor
    /// reached a terminal state (or another helper holding it commits). A
    /// released descriptor is therefore finished; an aborted one is never
    /// found on a marked record, so it reads as committed.
    pub(crate) fn state(&self) -> ScxState {
        self.descriptor
            .as_ref()
            .map_or(ScxState::Committed, |descriptor| descriptor.state())
    }
}

impl<V, I, G: Guard> Record<V, I, G> {
    pub fn new<F>(mutable_fields: F, immutable_fields: I) -> Self
    where
        F: IntoIterator<Item = V>,
    {
        Record {
            mutable_fields: mutable_fields
                .into_iter()
                .map(|value| SharedCell::new(Some(Arc::new(value))))
                .collect(),
            immutable_fields,
            info: SharedCell::new(None),
            marked: AtomicBool::new(false),
            guard: G::default(),
        }
    }

    pub fn id(&self) -> RecordId {
        RecordId(self as *const Self as usize)
    }

    pub fn immutable_fields(&self) -> &I {
        &self.immutable_fields
    }

    pub fn field_count(&self) -> usize {
        self.mutable_fields.len()
    }

    /// True once a committed SCX finalized this record.
    pub fn is_marked(&self) -> bool {
        self.marked.load(Ordering::SeqCst)
    }

    /// Current value of a field, read directly.
    ///
    /// This is not linked: it takes part in no SCX validation and may observe
    /// a record in the middle of an SCX. Use LLX for consistent snapshots.
    ///
    pub fn read_field(&self, field: usize) -> Option<Arc<V>> {
        self.mutable_fields.get(field)?.load::<G>()
    }

    /// True if `info` currently points at `descriptor`.
    pub fn is_owned_by(&self, descriptor: &Arc<ScxDescriptor<V, I, G>>) -> bool {
        self.info.as_ptr() == Arc::as_ptr(descriptor)
    }

    // =========================================================================
    // Protocol accessors
    // =========================================================================

    pub(crate) fn load_info(&self) -> InfoView<V, I, G> {
        match self.info.load::<G>() {
            None => InfoView {
                info: InfoRef::Sentinel,
                descriptor: None,
            },
            Some(weak) => InfoView {
                descriptor: weak.upgrade(),
                info: InfoRef::Descriptor(weak),
            },
        }
    }

    /// True if `info` still points where `expected` does.
    pub(crate) fn holds_info(&self, expected: &InfoRef<V, I, G>) -> bool {
        self.info.as_ptr() == expected.as_ptr()
    }

    /// Element-wise copy of the mutable fields.
    pub(crate) fn snapshot(&self) -> Snapshot<V> {
        // Field slots are created populated and only ever swapped for another
        // value, so no slot is empty.
        Snapshot::new(
            self.mutable_fields
                .iter()
                .filter_map(|field| field.load::<G>())
                .collect(),
        )
    }

    /// Freezing CAS: `info` from `expected` to `descriptor`.
    pub(crate) fn cas_info(
        &self,
        expected: &InfoRef<V, I, G>,
        descriptor: &Arc<ScxDescriptor<V, I, G>>,
    ) -> bool {
        self.info
            .compare_exchange(&self.guard, expected.as_ptr(), Arc::downgrade(descriptor))
            .is_ok()
    }

    /// Retire the record. Idempotent; `marked` never goes back.
    pub(crate) fn mark(&self) {
        self.marked.store(true, Ordering::SeqCst);
    }

    pub(crate) fn cas_field(&self, field: usize, old_value: &Arc<V>, new_value: &Arc<V>) -> bool {
        match self.mutable_fields.get(field) {
            Some(slot) => slot
                .compare_exchange(&self.guard, Arc::as_ptr(old_value), Arc::clone(new_value))
                .is_ok(),
            None => false,
        }
    }
}

impl<V, I: fmt::Debug, G: Guard> fmt::Debug for Record<V, I, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id())
            .field("fields", &self.field_count())
            .field("immutable_fields", &self.immutable_fields)
            .field("marked", &self.is_marked())
            .finish()
    }
}
