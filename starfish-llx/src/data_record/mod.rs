//! Data records, SCX descriptors and the per-thread link table.

mod descriptor;
pub(crate) mod internal;
mod link_table;
mod record;
mod snapshot;

pub use descriptor::{ScxDescriptor, ScxState};
pub use link_table::LinkContext;
pub use record::{Record, RecordId};
pub use snapshot::Snapshot;

pub(crate) use descriptor::{FieldWrite, Freeze, InfoRef};
