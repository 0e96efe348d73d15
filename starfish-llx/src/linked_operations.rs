//! LLX and SCX.
//!
//! ```text
//! LLX(r):   read marked ──► read info ──► read marked ──► snapshot ──► info unchanged?
//!                                                                        │
//!                      Success(snapshot) + link in scope  ◄──────────── yes
//!
//! SCX(V, R, fld, new):  check links ──► build descriptor ──► help it ──► committed?
//! ```
//!
//! Both operations need an open [`LinkContext`] scope, see
//! [`LinkContext::with_linked_operations`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::data_record::{FieldWrite, LinkContext, Record, ScxDescriptor, ScxState, Snapshot};
use crate::error::{LinkError, UnlinkedScx};
use crate::guard::Guard;
use crate::helper::{HelpStrategy, Helper, HelperOptions};

/// Outcome of an LLX.
///
pub enum LoadLinkResult<V> {
    /// The record was quiescent; the snapshot is linked in the scope.
    Success(Snapshot<V>),
    /// The record was finalized by a committed SCX and never changes again.
    Finalized,
    /// Contention. Retry with a fresh LLX.
    Fail,
}

impl<V> LoadLinkResult<V> {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadLinkResult::Success(_))
    }

    pub fn snapshot(&self) -> Option<&Snapshot<V>> {
        match self {
            LoadLinkResult::Success(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn into_snapshot(self) -> Option<Snapshot<V>> {
        match self {
            LoadLinkResult::Success(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for LoadLinkResult<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadLinkResult::Success(snapshot) => f.debug_tuple("Success").field(snapshot).finish(),
            LoadLinkResult::Finalized => f.write_str("Finalized"),
            LoadLinkResult::Fail => f.write_str("Fail"),
        }
    }
}

/// The single field an SCX writes: `record.mutable_fields[field] = new_value`.
///
pub struct FieldUpdate<V, I, G: Guard> {
    record: Arc<Record<V, I, G>>,
    field: usize,
    new_value: V,
}

impl<V, I, G: Guard> FieldUpdate<V, I, G> {
    pub fn new(record: &Arc<Record<V, I, G>>, field: usize, new_value: V) -> Self {
        FieldUpdate {
            record: Arc::clone(record),
            field,
            new_value,
        }
    }
}

///
/// Entry point of the LLX/SCX primitive, parameterized by its helping
/// strategy.
///
pub struct LinkedOperations<H: Helper = HelpStrategy> {
    helper: H,
}

impl LinkedOperations<HelpStrategy> {
    pub fn with_options(options: &HelperOptions) -> Self {
        Self::new(HelpStrategy::from_options(options))
    }
}

impl Default for LinkedOperations<HelpStrategy> {
    fn default() -> Self {
        Self::new(HelpStrategy::default())
    }
}

impl<H: Helper> LinkedOperations<H> {
    pub fn new(helper: H) -> Self {
        LinkedOperations { helper }
    }

    pub fn helper(&self) -> &H {
        &self.helper
    }

    /// Load-link extended.
    ///
    /// `Success` carries a snapshot of the record's mutable fields, taken
    /// while no SCX was working on the record, and links the record in the
    /// scope. `Finalized` and `Fail` remove an older link to the record, if
    /// any. An SCX found in progress on the record is helped before `Fail`
    /// or `Finalized` is returned.
    ///
    pub fn load_link<V, I, G: Guard>(
        &self,
        context: &mut LinkContext<V, I, G>,
        record: &Arc<Record<V, I, G>>,
    ) -> Result<LoadLinkResult<V>, LinkError> {
        let table = context.table_mut().ok_or(LinkError::NakedOperation)?;

        let marked_before = record.is_marked();
        let observed = record.load_info();
        let state = observed.state();
        let marked_after = record.is_marked();

        if state == ScxState::Aborted || (state == ScxState::Committed && !marked_after) {
            let snapshot = record.snapshot();

            // No SCX froze the record while the fields were read.
            if record.holds_info(&observed.info) {
                table.link(record, observed.info.clone(), snapshot.clone());
                return Ok(LoadLinkResult::Success(snapshot));
            }
        }

        table.unlink(record);

        let finished = match &observed.descriptor {
            None => true,
            Some(descriptor) => match descriptor.state() {
                ScxState::Committed => true,
                ScxState::Aborted => false,
                ScxState::InProgress => self.helper.help(descriptor),
            },
        };

        if finished && marked_before {
            trace!(record = ?record.id(), "llx found a finalized record");
            Ok(LoadLinkResult::Finalized)
        } else {
            trace!(record = ?record.id(), ?state, "llx failed");
            Ok(LoadLinkResult::Fail)
        }
    }

    /// Validate an SCX against the scope's links and build its descriptor
    /// without running it.
    ///
    /// Every record in `affected_records` must be linked, and
    /// `records_to_finalize` and the record of `update` must be affected
    /// records. The descriptor captures, per affected record, the `info`
    /// seen by its LLX, and for `update` the field value seen by the LLX of
    /// the modified record.
    ///
    pub fn prepare_store_conditional<V, I, G: Guard>(
        &self,
        context: &LinkContext<V, I, G>,
        affected_records: &[Arc<Record<V, I, G>>],
        records_to_finalize: &[Arc<Record<V, I, G>>],
        update: Option<FieldUpdate<V, I, G>>,
    ) -> Result<Arc<ScxDescriptor<V, I, G>>, LinkError> {
        let table = context.table().ok_or(LinkError::NakedOperation)?;

        let info_fields = affected_records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                table
                    .get(record)
                    .map(|link| link.info.clone())
                    .ok_or(UnlinkedScx::AffectedRecord { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let affected: HashSet<_> = affected_records.iter().map(|record| record.id()).collect();

        if let Some(index) = records_to_finalize
            .iter()
            .position(|record| !affected.contains(&record.id()))
        {
            return Err(UnlinkedScx::FinalizeNotAffected { index }.into());
        }

        let field_write = match update {
            None => None,
            Some(update) => {
                let link = table
                    .get(&update.record)
                    .ok_or(UnlinkedScx::RecordToModify)?;

                if !affected.contains(&update.record.id()) {
                    return Err(UnlinkedScx::ModifyNotAffected.into());
                }

                let old_value = link.snapshot.shared_value(update.field).ok_or(
                    UnlinkedScx::FieldOutOfRange {
                        field: update.field,
                        len: link.snapshot.len(),
                    },
                )?;

                Some(FieldWrite {
                    old_value: Arc::clone(old_value),
                    new_value: Arc::new(update.new_value),
                    field: update.field,
                    record: Arc::clone(&link.record),
                })
            }
        };

        Ok(Arc::new(ScxDescriptor::new(
            affected_records.to_vec(),
            records_to_finalize.to_vec(),
            field_write,
            info_fields,
        )))
    }

    /// Store-conditional extended.
    ///
    /// Atomically, if none of `affected_records` changed since their linked
    /// LLX: finalize `records_to_finalize`, apply `update`, and return
    /// `Ok(true)`. Returns `Ok(false)` if an SCX that interfered got there
    /// first. Records the caller may share with concurrent SCXs must be
    /// listed in one global order (for instance by [`Record::id`]).
    ///
    pub fn store_conditional<V, I, G: Guard>(
        &self,
        context: &LinkContext<V, I, G>,
        affected_records: &[Arc<Record<V, I, G>>],
        records_to_finalize: &[Arc<Record<V, I, G>>],
        update: Option<FieldUpdate<V, I, G>>,
    ) -> Result<bool, LinkError> {
        let descriptor = self.prepare_store_conditional(
            context,
            affected_records,
            records_to_finalize,
            update,
        )?;

        let committed = self.helper.help(&descriptor);
        debug!(
            records = affected_records.len(),
            finalize = records_to_finalize.len(),
            committed,
            "scx finished"
        );
        Ok(committed)
    }
}

impl<H: Helper + fmt::Debug> fmt::Debug for LinkedOperations<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkedOperations")
            .field("helper", &self.helper)
            .finish()
    }
}
