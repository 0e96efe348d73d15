use thiserror::Error;

/// Misuse of the LLX/SCX API.
///
/// Contention never produces an error: a contended LLX returns
/// [`LoadLinkResult::Fail`](crate::LoadLinkResult::Fail) and a contended SCX
/// returns `Ok(false)`.
///
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    #[error("LLX or SCX called outside of a with_linked_operations scope")]
    NakedOperation,

    #[error("SCX precondition violated: {0}")]
    UnlinkedScx(#[from] UnlinkedScx),
}

/// Which SCX precondition failed.
///
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UnlinkedScx {
    #[error("affected record #{index} is not linked in this scope")]
    AffectedRecord { index: usize },

    #[error("record to finalize #{index} is not one of the affected records")]
    FinalizeNotAffected { index: usize },

    #[error("record to modify is not linked in this scope")]
    RecordToModify,

    #[error("record to modify is not one of the affected records")]
    ModifyNotAffected,

    #[error("field {field} is out of range for a record with {len} fields")]
    FieldOutOfRange { field: usize, len: usize },
}
