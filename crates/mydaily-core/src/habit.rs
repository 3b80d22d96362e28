//! The habit catalogue and habit sets.
//!
//! The catalogue is fixed. Its order is canonical: `HabitKey` derives `Ord`
//! from declaration order, so every `HabitSet` iterates in catalogue order
//! regardless of the order habits were activated in.

use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A habit tracked by every user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitKey {
    /// Sun exposure.
    Sun,
    /// Reading.
    Book,
    /// The "three" goal.
    Three,
    /// Social connection.
    Network,
}

/// Static description of a catalogue habit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HabitDefinition {
    /// The habit key.
    pub key: HabitKey,
    /// Emoji shown in grids and notification bodies.
    pub emoji: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Short description.
    pub description: &'static str,
    /// Highest count a day can hold for this habit.
    pub max_count: u32,
}

/// The habit catalogue, in canonical order.
pub static HABITS: [HabitDefinition; 4] = [
    HabitDefinition {
        key: HabitKey::Sun,
        emoji: "☀️",
        name: "Soleil",
        description: "Exposition au soleil",
        max_count: 2,
    },
    HabitDefinition {
        key: HabitKey::Book,
        emoji: "📖",
        name: "Lecture",
        description: "Lire",
        max_count: 2,
    },
    HabitDefinition {
        key: HabitKey::Three,
        emoji: "3️⃣",
        name: "Trois",
        description: "Objectif 3",
        max_count: 5,
    },
    HabitDefinition {
        key: HabitKey::Network,
        emoji: "🌐",
        name: "Réseau",
        description: "Connexion sociale",
        max_count: 2,
    },
];

impl HabitKey {
    /// Every habit key in canonical order.
    pub const ALL: [Self; 4] = [Self::Sun, Self::Book, Self::Three, Self::Network];

    /// The key as stored in completion maps.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sun => "sun",
            Self::Book => "book",
            Self::Three => "three",
            Self::Network => "network",
        }
    }

    /// The catalogue entry for this habit.
    #[must_use]
    pub fn definition(self) -> &'static HabitDefinition {
        match self {
            Self::Sun => &HABITS[0],
            Self::Book => &HABITS[1],
            Self::Three => &HABITS[2],
            Self::Network => &HABITS[3],
        }
    }

    /// The habit's emoji.
    #[must_use]
    pub fn emoji(self) -> &'static str {
        self.definition().emoji
    }

    /// The habit's maximum daily count.
    #[must_use]
    pub fn max_count(self) -> u32 {
        self.definition().max_count
    }
}

impl FromStr for HabitKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| DomainError::UnknownHabit(s.to_string()))
    }
}

impl fmt::Display for HabitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deduplicated set of habits, iterated in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HabitSet(BTreeSet<HabitKey>);

impl HabitSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a habit. Returns `false` if it was already present.
    pub fn insert(&mut self, habit: HabitKey) -> bool {
        self.0.insert(habit)
    }

    /// Check membership.
    #[must_use]
    pub fn contains(&self, habit: HabitKey) -> bool {
        self.0.contains(&habit)
    }

    /// Number of distinct habits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = HabitKey> + '_ {
        self.0.iter().copied()
    }

    /// The union of two sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).copied().collect())
    }

    /// Add every habit of `other` to this set.
    pub fn merge(&mut self, other: &Self) {
        self.0.extend(other.0.iter().copied());
    }
}

impl FromIterator<HabitKey> for HabitSet {
    fn from_iter<I: IntoIterator<Item = HabitKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[HabitKey; N]> for HabitSet {
    fn from(habits: [HabitKey; N]) -> Self {
        habits.into_iter().collect()
    }
}

impl IntoIterator for HabitSet {
    type Item = HabitKey;
    type IntoIter = btree_set::IntoIter<HabitKey>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a HabitSet {
    type Item = HabitKey;
    type IntoIter = std::iter::Copied<btree_set::Iter<'a, HabitKey>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}
