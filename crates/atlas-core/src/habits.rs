//! Habit suggestions from the action log.

use crate::store::{Store, StoreError};

/// Names of the actions most often completed at `hour` (0-23), most frequent
/// first, ties broken by name.
pub fn suggest_for_hour(store: &Store, hour: u32, limit: usize) -> Result<Vec<String>, StoreError> {
    if hour > 23 || limit == 0 {
        return Ok(Vec::new());
    }
    Ok(store
        .action_counts_at_hour(hour, limit)?
        .into_iter()
        .map(|(name, _)| name)
        .collect())
}
