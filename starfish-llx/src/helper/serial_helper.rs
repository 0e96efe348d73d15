use std::sync::Arc;

use tracing::trace;

use crate::data_record::{Freeze, ScxDescriptor};
use crate::guard::Guard;
use crate::helper::{Helper, settled};

/// Freezes the affected records one by one, in list order.
///
/// Every helper walks the whole list from the start; a record some other
/// helper froze already counts as frozen.
///
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialHelper;

impl Helper for SerialHelper {
    fn help<V, I, G: Guard>(&self, descriptor: &Arc<ScxDescriptor<V, I, G>>) -> bool {
        if let Some(outcome) = settled(descriptor) {
            return outcome;
        }

        let slot = descriptor.join();
        trace!(
            helper = slot.number(),
            records = descriptor.affected_records().len(),
            "serial helper joined"
        );

        for index in 0..descriptor.affected_records().len() {
            if descriptor.freeze(index) == Freeze::Conflict {
                return descriptor.resolve_conflict(index);
            }
        }

        descriptor.commit()
    }
}
