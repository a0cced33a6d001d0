use std::fmt;

use serde::{Deserialize, Serialize};

/// Address of a tumbler slot.
///
/// Ordered by position, then side (lower before upper), so arenas keyed by
/// `Location` iterate from the front of the lock to the back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub position: u32,
    pub upper: bool,
}

impl Location {
    pub const fn new(position: u32, upper: bool) -> Self {
        Self { position, upper }
    }

    pub const fn upper(position: u32) -> Self {
        Self::new(position, true)
    }

    pub const fn lower(position: u32) -> Self {
        Self::new(position, false)
    }

    /// The opposing slot at the same position.
    pub const fn counter(self) -> Self {
        Self::new(self.position, !self.upper)
    }

    pub fn side_name(self) -> &'static str {
        if self.upper { "upper" } else { "lower" }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.position, self.side_name())
    }
}
