use std::fmt;
use std::ops::Index;
use std::sync::Arc;

/// The mutable fields of a record as seen by one successful LLX.
///
/// A snapshot shares the field values with the record (values are immutable
/// once published; a record field changes by swapping in a new value), so
/// cloning a snapshot or taking one is cheap.
///
pub struct Snapshot<V> {
    values: Arc<[Arc<V>]>,
}

impl<V> Snapshot<V> {
    pub(crate) fn new(values: Vec<Arc<V>>) -> Self {
        Snapshot {
            values: values.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, field: usize) -> Option<&V> {
        self.values.get(field).map(|value| value.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.values.iter().map(|value| value.as_ref())
    }

    /// The shared value itself; its address is the expected value of a
    /// later field CAS.
    pub(crate) fn shared_value(&self, field: usize) -> Option<&Arc<V>> {
        self.values.get(field)
    }
}

impl<V: Clone> Snapshot<V> {
    pub fn to_vec(&self) -> Vec<V> {
        self.iter().cloned().collect()
    }
}

impl<V> Clone for Snapshot<V> {
    fn clone(&self) -> Self {
        Snapshot {
            values: Arc::clone(&self.values),
        }
    }
}

impl<V> Index<usize> for Snapshot<V> {
    type Output = V;

    fn index(&self, field: usize) -> &V {
        &self.values[field]
    }
}

impl<V: fmt::Debug> fmt::Debug for Snapshot<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
