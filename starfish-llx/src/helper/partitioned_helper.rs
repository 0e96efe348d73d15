// Work-stealing freezing.
//
// Helpers of one descriptor split the affected records into buckets and each
// starts on its own bucket, then continues round-robin through the others:
//
//   records   [0 ...... N/4)[N/4 .... N/2)[N/2 ... 3N/4)[3N/4 ...... N)
//   bucket          0              1              2              3
//   helper #1 ──►   0 ──► 1 ──► 2 ──► 3
//   helper #2 ──►   1 ──► 2 ──► 3 ──► 0
//
// The number of buckets is the largest power of two not above the number of
// helpers present. A helper whose number is above that waits (a bounded
// number of pauses) for more helpers to arrive or for the SCX to settle, and
// then works anyway. Its slot and bucket count stay fixed once it starts.
//
// A helper stops scanning when all_frozen is set, when the descriptor's
// frozen_records count covers every record, or after one full round over
// all buckets (it then has seen every record frozen for the descriptor).
// Either way it commits.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use crate::data_record::{Freeze, ScxDescriptor};
use crate::guard::Guard;
use crate::helper::pause::{Pause, ThreadSleep};
use crate::helper::{Helper, settled};

pub const DEFAULT_PAUSE_INTERVAL: Duration = Duration::from_millis(1);
pub const DEFAULT_MAX_PAUSES: u32 = 64;

/// Helper that partitions freezing work among concurrent helpers.
///
#[derive(Clone)]
pub struct PartitionedHelper {
    pause: Arc<dyn Pause>,
    pause_interval: Duration,
    max_pauses: u32,
}

impl PartitionedHelper {
    pub fn new() -> Self {
        Self::with_pause(ThreadSleep, DEFAULT_PAUSE_INTERVAL, DEFAULT_MAX_PAUSES)
    }

    pub fn with_pause<P>(pause: P, pause_interval: Duration, max_pauses: u32) -> Self
    where
        P: Pause + 'static,
    {
        PartitionedHelper {
            pause: Arc::new(pause),
            pause_interval,
            max_pauses,
        }
    }

    pub fn pause_interval(&self) -> Duration {
        self.pause_interval
    }

    pub fn max_pauses(&self) -> u32 {
        self.max_pauses
    }

    // Wait until this helper fits the effective concurrency, or the pause
    // budget runs out. Returns the bucket count to work with, or the outcome
    // if the SCX settled meanwhile.
    fn wait_for_slot<V, I, G: Guard>(
        &self,
        descriptor: &ScxDescriptor<V, I, G>,
        number: usize,
    ) -> Result<usize, bool> {
        let mut pauses = 0;

        loop {
            if let Some(outcome) = settled(descriptor) {
                return Err(outcome);
            }

            let buckets = effective_concurrency(descriptor.threads_helping());
            if number <= buckets || pauses >= self.max_pauses {
                return Ok(buckets);
            }

            pauses += 1;
            trace!(helper = number, buckets, pauses, "partitioned helper pausing");
            self.pause.pause(self.pause_interval);
        }
    }
}

impl Default for PartitionedHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PartitionedHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartitionedHelper")
            .field("pause_interval", &self.pause_interval)
            .field("max_pauses", &self.max_pauses)
            .finish()
    }
}

impl Helper for PartitionedHelper {
    fn help<V, I, G: Guard>(&self, descriptor: &Arc<ScxDescriptor<V, I, G>>) -> bool {
        if let Some(outcome) = settled(descriptor) {
            return outcome;
        }

        let slot = descriptor.join();
        let buckets = match self.wait_for_slot(descriptor, slot.number()) {
            Ok(buckets) => buckets,
            Err(outcome) => return outcome,
        };

        let records = descriptor.affected_records().len();
        let first_bucket = (slot.number() - 1) % buckets;
        trace!(
            helper = slot.number(),
            buckets,
            first_bucket,
            records,
            "partitioned helper joined"
        );

        'scan: for step in 0..buckets {
            let bucket = (first_bucket + step) % buckets;

            for index in bucket_bounds(records, bucket, buckets) {
                if descriptor.freeze(index) == Freeze::Conflict {
                    return descriptor.resolve_conflict(index);
                }

                if descriptor.is_all_frozen() || descriptor.frozen_records() == records {
                    break 'scan;
                }
            }
        }

        descriptor.commit()
    }
}

/// Largest power of two not above `helpers` (at least 1).
pub(crate) fn effective_concurrency(helpers: usize) -> usize {
    if helpers <= 1 {
        1
    } else {
        1 << helpers.ilog2()
    }
}

/// Index range of `bucket` when `records` are split into `buckets` parts.
pub(crate) fn bucket_bounds(records: usize, bucket: usize, buckets: usize) -> Range<usize> {
    records * bucket / buckets..records * (bucket + 1) / buckets
}
