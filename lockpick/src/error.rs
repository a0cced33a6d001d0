use thiserror::Error;

use crate::location::Location;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("no tumbler at {0}")]
    MissingTumbler(Location),
    #[error("duplicate tumbler at {0}")]
    DuplicateTumbler(Location),
    #[error("tumbler at {location}: base height {height} outside 1..{max_height}")]
    InvalidHeight {
        location: Location,
        height: i32,
        max_height: i32,
    },
    #[error("group must be non-negative, got {0}")]
    InvalidGroup(i64),
    #[error("max height must be at least {min}, got {got}")]
    InvalidMaxHeight { min: i32, got: i64 },
    #[error("a lock needs at least one pick")]
    NoPicks,
    #[error("group {group} has {masters} master tumblers, expected exactly one")]
    MasterCount { group: u32, masters: usize },
    #[error("binding {from} -> {to} references a missing tumbler")]
    DanglingBinding { from: Location, to: Location },
    #[error("pick revision did not settle after {limit} passes; bindings are cyclic or contradictory")]
    RevisionLimitExceeded { limit: usize },
}

pub type Result<T> = std::result::Result<T, LockError>;
