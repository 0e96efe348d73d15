//! Helping strategies.
//!
//! A helper drives an SCX descriptor to a terminal state: it freezes the
//! affected records, then commits, or aborts on a conflict. The originating
//! SCX runs a helper, and so does any LLX that finds the descriptor still in
//! progress on a record.
//!
//! ```text
//! HelpStrategy
//!     ├── Serial(SerialHelper)             one ordered pass per helper
//!     └── Partitioned(PartitionedHelper)   helpers split the records
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::data_record::{ScxDescriptor, ScxState};
use crate::guard::Guard;

pub mod partitioned_helper;
pub mod pause;
pub mod serial_helper;

pub use partitioned_helper::PartitionedHelper;
pub use pause::{Pause, ThreadSleep, ThreadYield};
pub use serial_helper::SerialHelper;

/// Drives one descriptor to completion.
///
/// Returns true if the SCX committed, false if it aborted. Any number of
/// helpers may run on the same descriptor concurrently and all of them
/// return the same outcome.
///
pub trait Helper: Send + Sync {
    fn help<V, I, G: Guard>(&self, descriptor: &Arc<ScxDescriptor<V, I, G>>) -> bool;
}

// Outcome of a descriptor that needs no more work, checked on helper entry.
//
pub(crate) fn settled<V, I, G: Guard>(descriptor: &ScxDescriptor<V, I, G>) -> Option<bool> {
    if descriptor.is_all_frozen() {
        return Some(true);
    }

    match descriptor.state() {
        ScxState::InProgress => None,
        ScxState::Committed => Some(true),
        ScxState::Aborted => Some(false),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Serial,
    #[default]
    Partitioned,
}

/// Options for building a [`HelpStrategy`].
///
/// `pause_interval` and `max_pauses` only apply to the partitioned
/// strategy.
///
#[derive(Debug, Clone)]
pub struct HelperOptions {
    pub strategy: StrategyKind,
    pub pause_interval: Duration,
    pub max_pauses: u32,
}

impl HelperOptions {
    pub fn new(strategy: StrategyKind) -> Self {
        HelperOptions {
            strategy,
            ..Self::default()
        }
    }
}

impl Default for HelperOptions {
    fn default() -> Self {
        HelperOptions {
            strategy: StrategyKind::Partitioned,
            pause_interval: partitioned_helper::DEFAULT_PAUSE_INTERVAL,
            max_pauses: partitioned_helper::DEFAULT_MAX_PAUSES,
        }
    }
}

/// A helper chosen at runtime.
///
#[derive(Debug, Clone)]
pub enum HelpStrategy {
    Serial(SerialHelper),
    Partitioned(PartitionedHelper),
}

impl HelpStrategy {
    pub fn from_options(options: &HelperOptions) -> Self {
        match options.strategy {
            StrategyKind::Serial => HelpStrategy::Serial(SerialHelper),
            StrategyKind::Partitioned => HelpStrategy::Partitioned(PartitionedHelper::with_pause(
                ThreadSleep,
                options.pause_interval,
                options.max_pauses,
            )),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            HelpStrategy::Serial(_) => StrategyKind::Serial,
            HelpStrategy::Partitioned(_) => StrategyKind::Partitioned,
        }
    }
}

impl Default for HelpStrategy {
    fn default() -> Self {
        Self::from_options(&HelperOptions::default())
    }
}

impl Helper for HelpStrategy {
    fn help<V, I, G: Guard>(&self, descriptor: &Arc<ScxDescriptor<V, I, G>>) -> bool {
        match self {
            HelpStrategy::Serial(helper) => helper.help(descriptor),
            HelpStrategy::Partitioned(helper) => helper.help(descriptor),
        }
    }
}
