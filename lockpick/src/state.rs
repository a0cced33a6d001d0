use serde::{Deserialize, Serialize};

use crate::location::Location;
use crate::tumbler::{Height, Tumbler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TumblerSnapshot {
    pub location: Location,
    pub height: Height,
    pub pushed: bool,
    pub jammed: bool,
    pub releasing: bool,
    pub difference: Height,
}

impl From<&Tumbler> for TumblerSnapshot {
    fn from(tumbler: &Tumbler) -> Self {
        Self {
            location: tumbler.location(),
            height: tumbler.height(),
            pushed: tumbler.is_pushed(),
            jammed: tumbler.is_jammed(),
            releasing: tumbler.is_releasing(),
            difference: tumbler.difference(),
        }
    }
}

/// Frozen view of a lock's runtime state, in location order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSnapshot {
    pub tumblers: Vec<TumblerSnapshot>,
    pub picks: Vec<Option<Location>>,
    pub current_pick: usize,
    pub won: bool,
}

impl LockSnapshot {
    pub fn tumbler(&self, location: Location) -> Option<&TumblerSnapshot> {
        self.tumblers.iter().find(|t| t.location == location)
    }

    pub fn heights(&self) -> Vec<(Location, Height)> {
        self.tumblers.iter().map(|t| (t.location, t.height)).collect()
    }
}
