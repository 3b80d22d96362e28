//! Per-day completion maps.
//!
//! A stored completion value is either a legacy boolean flag or a counter.
//! Readers never see the raw value directly: `Completions::count` clamps it
//! into `[0, max_count]` for the habit, with `true` counting as one.
//! Keys outside the catalogue are kept as-is so writes never drop fields
//! written by other clients.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::habit::HabitKey;

/// A raw completion value as stored in a habit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompletionValue {
    /// Legacy done/not-done flag.
    Flag(bool),
    /// Number of completions that day.
    Count(i64),
}

impl CompletionValue {
    /// The value as a count clamped to `[0, max_count]`.
    #[must_use]
    pub fn effective_count(self, max_count: u32) -> u32 {
        match self {
            Self::Flag(done) => u32::from(done).min(max_count),
            Self::Count(n) => u32::try_from(n.max(0)).map_or(max_count, |n| n.min(max_count)),
        }
    }
}

/// The completion map of one habit record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Completions(BTreeMap<String, CompletionValue>);

impl Completions {
    /// An empty map (nothing completed).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a raw value.
    #[must_use]
    pub fn with(mut self, habit: HabitKey, value: CompletionValue) -> Self {
        self.insert(habit, value);
        self
    }

    /// Insert a raw value for a habit.
    pub fn insert(&mut self, habit: HabitKey, value: CompletionValue) {
        self.0.insert(habit.as_str().to_string(), value);
    }

    /// The raw stored value for a habit, if any.
    #[must_use]
    pub fn get(&self, habit: HabitKey) -> Option<CompletionValue> {
        self.0.get(habit.as_str()).copied()
    }

    /// The effective count of a habit; absent values count as zero.
    #[must_use]
    pub fn count(&self, habit: HabitKey) -> u32 {
        self.get(habit)
            .map_or(0, |value| value.effective_count(habit.max_count()))
    }

    /// Whether the habit has been completed at least once.
    #[must_use]
    pub fn is_completed(&self, habit: HabitKey) -> bool {
        self.count(habit) > 0
    }

    /// Store a count for a habit, clamped to its maximum.
    pub fn set_count(&mut self, habit: HabitKey, count: u32) {
        let clamped = count.min(habit.max_count());
        self.insert(habit, CompletionValue::Count(i64::from(clamped)));
    }

    /// Toggle a habit: increment its count, wrapping to zero past the maximum.
    ///
    /// Legacy flags are normalized to counts on the way.
    #[must_use]
    pub fn toggled(&self, habit: HabitKey) -> Self {
        let max = habit.max_count();
        let current = self.count(habit);
        let next = if current >= max { 0 } else { current + 1 };

        let mut updated = self.clone();
        updated.set_count(habit, next);
        updated
    }

    /// Iterate over the raw entries, including keys outside the catalogue.
    pub fn raw_entries(&self) -> impl Iterator<Item = (&str, CompletionValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), *value))
    }
}
