//! Scenario tests shared by every guard and helping strategy.
//!
//! The functions are generic over the `Guard` and the `Helper`; the
//! integration tests of each crate instantiate them.

use std::sync::Arc;
use std::time::Duration;

use crate::data_record::{LinkContext, Record};
use crate::error::LinkError;
use crate::guard::Guard;
use crate::helper::{Helper, HelperOptions, StrategyKind};
use crate::linked_operations::{FieldUpdate, LinkedOperations, LoadLinkResult};

pub mod llx_scx_core_tests;

pub type TestRecord<G> = Record<i32, Vec<i32>, G>;
pub type TestContext<G> = LinkContext<i32, Vec<i32>, G>;

/// Fresh record with mutable fields `0..10` and immutable fields `10..20`.
pub fn basic_record<G: Guard>() -> Arc<TestRecord<G>> {
    Arc::new(Record::new(0..10, (10..20).collect()))
}

/// Operations for `kind` with short pauses, so tests with excess
/// partitioned helpers stay quick.
pub fn operations_for(kind: StrategyKind) -> LinkedOperations {
    LinkedOperations::with_options(&HelperOptions {
        strategy: kind,
        pause_interval: Duration::from_micros(100),
        max_pauses: 16,
    })
}

/// LLX every record of `affected` in order, then SCX `target.fields[0] += 1`.
///
/// `Ok(false)` if an LLX did not succeed or the SCX lost to another one.
///
pub fn increment_linked<G: Guard, H: Helper>(
    operations: &LinkedOperations<H>,
    context: &mut TestContext<G>,
    affected: &[Arc<TestRecord<G>>],
    target: &Arc<TestRecord<G>>,
) -> Result<bool, LinkError> {
    context.with_linked_operations(|context| {
        let mut current = None;

        for record in affected {
            match operations.load_link(context, record)? {
                LoadLinkResult::Success(snapshot) => {
                    if Arc::ptr_eq(record, target) {
                        current = Some(snapshot[0]);
                    }
                }
                LoadLinkResult::Finalized | LoadLinkResult::Fail => return Ok(false),
            }
        }

        let Some(current) = current else {
            return Ok(false);
        };

        let update = FieldUpdate::new(target, 0, current + 1);
        operations.store_conditional(context, affected, &[], Some(update))
    })
}
