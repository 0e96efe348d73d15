// Per-thread record of successful LLXs.
//
// A `LinkContext` belongs to one thread of control (a thread, or a task that
// keeps it across suspension points). Its table exists only inside a
// `with_linked_operations` scope:
//
//   with_linked_operations ──► table = {} ──► body ──► table = None
//                                             │
//                                             └── nested call: reuses the table
//
// Dropping the table on scope exit (also when the body panics) is what makes
// links scope-bound: an SCX in a later scope cannot reuse an old link.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::data_record::{InfoRef, Record, RecordId, Snapshot};
use crate::guard::Guard;

/// One successful LLX: the record, the `info` it had and its fields.
///
pub(crate) struct LinkedRecord<V, I, G: Guard> {
    pub(crate) record: Arc<Record<V, I, G>>,
    pub(crate) info: InfoRef<V, I, G>,
    pub(crate) snapshot: Snapshot<V>,
}

pub(crate) struct LinkTable<V, I, G: Guard> {
    links: HashMap<RecordId, LinkedRecord<V, I, G>>,
}

impl<V, I, G: Guard> LinkTable<V, I, G> {
    fn new() -> Self {
        LinkTable {
            links: HashMap::new(),
        }
    }

    /// Record a successful LLX, replacing an older link to the same record.
    pub(crate) fn link(
        &mut self,
        record: &Arc<Record<V, I, G>>,
        info: InfoRef<V, I, G>,
        snapshot: Snapshot<V>,
    ) {
        self.links.insert(
            record.id(),
            LinkedRecord {
                record: Arc::clone(record),
                info,
                snapshot,
            },
        );
    }

    pub(crate) fn unlink(&mut self, record: &Record<V, I, G>) {
        self.links.remove(&record.id());
    }

    pub(crate) fn get(&self, record: &Record<V, I, G>) -> Option<&LinkedRecord<V, I, G>> {
        self.links.get(&record.id())
    }

    fn len(&self) -> usize {
        self.links.len()
    }
}

///
/// The linking state of one thread of control.
///
/// LLX and SCX take the context explicitly, so the same code serves OS
/// threads and cooperatively scheduled tasks alike.
///
/// ```ignore
/// let mut context = LinkContext::new();
///
/// context.with_linked_operations(|context| {
///     if let LoadLinkResult::Success(snapshot) = operations.load_link(context, &record)? {
///         let update = FieldUpdate::new(&record, 0, snapshot[0] + 1);
///         operations.store_conditional(context, &[record.clone()], &[], Some(update))?;
///     }
///     Ok::<_, LinkError>(())
/// })?;
/// ```
///
pub struct LinkContext<V, I, G: Guard> {
    table: Option<LinkTable<V, I, G>>,
}

impl<V, I, G: Guard> LinkContext<V, I, G> {
    pub fn new() -> Self {
        LinkContext { table: None }
    }

    /// Run `body` inside a linked-operations scope.
    ///
    /// The outermost call opens an empty link table and clears it when
    /// `body` returns or unwinds. Nested calls run in the enclosing scope.
    ///
    pub fn with_linked_operations<T, F>(&mut self, body: F) -> T
    where
        F: FnOnce(&mut Self) -> T,
    {
        if self.table.is_some() {
            return body(self);
        }

        self.table = Some(LinkTable::new());
        let scope = ScopeRelease { context: self };
        body(&mut *scope.context)
    }

    /// True inside a `with_linked_operations` scope.
    pub fn in_scope(&self) -> bool {
        self.table.is_some()
    }

    /// Number of records currently linked in this scope.
    pub fn linked_count(&self) -> usize {
        self.table.as_ref().map_or(0, LinkTable::len)
    }

    pub fn is_linked(&self, record: &Record<V, I, G>) -> bool {
        self.table
            .as_ref()
            .is_some_and(|table| table.get(record).is_some())
    }

    pub(crate) fn table(&self) -> Option<&LinkTable<V, I, G>> {
        self.table.as_ref()
    }

    pub(crate) fn table_mut(&mut self) -> Option<&mut LinkTable<V, I, G>> {
        self.table.as_mut()
    }
}

impl<V, I, G: Guard> Default for LinkContext<V, I, G> {
    fn default() -> Self {
        Self::new()
    }
}

// Clears the table when the outermost scope ends.
//
struct ScopeRelease<'a, V, I, G: Guard> {
    context: &'a mut LinkContext<V, I, G>,
}

impl<V, I, G: Guard> Drop for ScopeRelease<'_, V, I, G> {
    fn drop(&mut self) {
        if let Some(table) = self.context.table.take() {
            trace!(links = table.len(), "linked operations scope closed");
        }
    }
}
