//! Completion diff detection.
//!
//! Given the before/after snapshots of a single habit record write, find the
//! habits whose effective count strictly increased. This is a pure function
//! over the two snapshots.

use crate::completions::Completions;
use crate::habit::{HabitKey, HabitSet};
use crate::record::HabitRecord;

/// Habits activated between two completion snapshots.
///
/// `before` is `None` when the record was just created. Keys outside the
/// catalogue are ignored.
#[must_use]
pub fn detect_activations(before: Option<&Completions>, after: &Completions) -> HabitSet {
    HabitKey::ALL
        .into_iter()
        .filter(|&habit| after.count(habit) > before.map_or(0, |b| b.count(habit)))
        .collect()
}

/// Habits activated by a record write.
///
/// A deletion (`after` absent) never activates anything.
#[must_use]
pub fn detect_record_activations(
    before: Option<&HabitRecord>,
    after: Option<&HabitRecord>,
) -> HabitSet {
    match after {
        Some(after) => detect_activations(before.map(|b| &b.completions), &after.completions),
        None => HabitSet::new(),
    }
}
