//! Non-blocking LLX/SCX over multi-field data records.
//!
//! LLX (load-link extended) takes a snapshot of a record and links it in the
//! calling thread's scope. SCX (store-conditional extended) then atomically
//! finalizes some of the linked records and writes one field of one of them,
//! provided none of them changed since their LLX. Threads that run into an
//! SCX in progress help it finish, so the primitive is lock-free.

pub mod common_tests;
pub mod data_record;
pub mod error;
pub mod guard;
pub mod helper;
pub mod linked_operations;

pub use data_record::{LinkContext, Record, RecordId, ScxDescriptor, ScxState, Snapshot};
pub use error::{LinkError, UnlinkedScx};
pub use guard::{DeferredGuard, Guard};
pub use helper::{
    HelpStrategy, Helper, HelperOptions, PartitionedHelper, Pause, SerialHelper, StrategyKind,
    ThreadSleep, ThreadYield,
};
pub use linked_operations::{FieldUpdate, LinkedOperations, LoadLinkResult};
