use serde::{Deserialize, Serialize};

use crate::location::Location;
use crate::tumbler::Height;

/// One height transition, consumed by renderers to animate pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightChange {
    pub location: Location,
    pub before: Height,
    pub after: Height,
}

/// Oldest-first sequence of height transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLog {
    changes: Vec<HeightChange>,
}

impl ChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a transition; no-op transitions are dropped.
    pub fn record(&mut self, location: Location, before: Height, after: Height) {
        if before != after {
            self.changes.push(HeightChange {
                location,
                before,
                after,
            });
        }
    }

    pub fn extend(&mut self, other: &ChangeLog) {
        self.changes.extend_from_slice(&other.changes);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeightChange> {
        self.changes.iter()
    }

    pub fn as_slice(&self) -> &[HeightChange] {
        &self.changes
    }

    /// First and last height seen per location, for renderers that only
    /// animate the net movement.
    pub fn net(&self) -> Vec<HeightChange> {
        let mut net: Vec<HeightChange> = Vec::new();
        for change in &self.changes {
            match net.iter_mut().find(|c| c.location == change.location) {
                Some(existing) => existing.after = change.after,
                None => net.push(*change),
            }
        }
        net.retain(|c| c.before != c.after);
        net
    }

    pub fn take(&mut self) -> ChangeLog {
        std::mem::take(self)
    }

    pub fn into_vec(self) -> Vec<HeightChange> {
        self.changes
    }
}
