pub mod agent;
pub mod change_log;
pub mod demo;
pub mod editor_api;
pub mod error;
pub mod level;
pub mod level_editor;
pub mod level_file;
pub mod location;
pub mod lock;
pub mod playtest;
pub mod settings;
pub mod state;
pub mod tumbler;

mod serde_arena;

pub use change_log::{ChangeLog, HeightChange};
pub use error::LockError;
pub use level::{Binding, Level, LevelWarning, MasterPolicy};
pub use location::Location;
pub use lock::{Lock, LockOptions, Propagation};
pub use tumbler::{Height, Tumbler, TumblerConfig};
