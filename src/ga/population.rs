//! Score-keyed population container.
//!
//! Members are ordered by score and a score is held at most once: inserting
//! a field whose score is already present is rejected, which keeps literal
//! duplicates (and most equivalent layouts) out of the population.
//! Truncation drops the lowest scores first, so the best member always
//! survives.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::field::Field;

/// Working set of candidate fields for the genetic search.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Population {
    members: BTreeMap<u64, Field>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `field` unless a member with the same score exists.
    pub fn insert(&mut self, field: Field) -> bool {
        match self.members.entry(field.score()) {
            Entry::Vacant(slot) => {
                slot.insert(field);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Inserts every field and returns how many were accepted.
    pub fn extend<I: IntoIterator<Item = Field>>(&mut self, fields: I) -> usize {
        let mut accepted = 0;
        for field in fields {
            if self.insert(field) {
                accepted += 1;
            }
        }
        accepted
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn best(&self) -> Option<&Field> {
        self.members.last_key_value().map(|(_, f)| f)
    }

    pub fn worst(&self) -> Option<&Field> {
        self.members.first_key_value().map(|(_, f)| f)
    }

    pub fn contains_score(&self, score: u64) -> bool {
        self.members.contains_key(&score)
    }

    /// Drops the lowest-scoring members until at most `capacity` remain.
    /// Returns the number removed.
    pub fn truncate(&mut self, capacity: usize) -> usize {
        let mut removed = 0;
        while self.members.len() > capacity {
            self.members.pop_first();
            removed += 1;
        }
        removed
    }

    /// Gap between the best score and the score of the member just above
    /// the worst `percentage`% (rounded up to whole members). 0 when the
    /// population has fewer members than that tail needs.
    pub fn spread(&self, percentage: usize) -> u64 {
        let Some(best) = self.best() else {
            return 0;
        };
        let len = self.len();
        let tail = (len * percentage).div_ceil(100);
        let index = len.saturating_sub(tail + 1);
        self.iter()
            .nth(index)
            .map_or(0, |member| best.score() - member.score())
    }

    /// Members from best to worst.
    pub fn iter(&self) -> impl Iterator<Item = &Field> + '_ {
        self.members.values().rev()
    }

    /// Scores from best to worst.
    pub fn scores(&self) -> Vec<u64> {
        self.members.keys().rev().copied().collect()
    }

    /// The best `k` members, best first.
    pub fn into_best(self, k: usize) -> Vec<Field> {
        self.members.into_values().rev().take(k).collect()
    }

    /// All members, best first.
    pub fn into_vec(self) -> Vec<Field> {
        self.members.into_values().rev().collect()
    }
}

impl FromIterator<Field> for Population {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut population = Population::new();
        population.extend(iter);
        population
    }
}
