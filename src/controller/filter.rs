//! Event filter for the Dataset watch
//!
//! Only changes to `spec.datasetMetadata.plugin` cause a reconcile; status
//! writes and other spec edits are suppressed before they reach the queue.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::crd::Dataset;

/// Returns true if the plugin reference differs between two versions
pub fn plugin_changed(old: &Dataset, new: &Dataset) -> bool {
    old.plugin() != new.plugin()
}

/// Fingerprint of the plugin reference, for `predicate_filter`
///
/// The watch stream drops an event when the fingerprint matches the last one
/// seen for the same object. Values are process-local and never persisted.
pub fn plugin_fingerprint(dataset: &Dataset) -> Option<u64> {
    let mut hasher = DefaultHasher::new();
    dataset.plugin().hash(&mut hasher);
    Some(hasher.finish())
}
