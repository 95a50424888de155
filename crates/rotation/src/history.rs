//! Per-channel record of who already rotated in the current cycle.

use std::collections::BTreeSet;

/// Names chosen since the last full cycle of a channel.
///
/// Grows one name per selection and empties all at once when every eligible
/// member has had a turn. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationHistory {
    rotated: BTreeSet<String>,
}

impl RotationHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.rotated.contains(name)
    }

    /// Returns `false` if the name was already recorded.
    pub fn record(&mut self, name: impl Into<String>) -> bool {
        self.rotated.insert(name.into())
    }

    pub fn reset(&mut self) {
        self.rotated.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rotated.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rotated.is_empty()
    }

    /// Recorded names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rotated.iter().map(String::as_str)
    }
}
