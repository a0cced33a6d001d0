use serde::{Deserialize, Serialize};

use crate::error::{LockError, Result};
use crate::location::Location;

/// Heights are signed so binding differences and post-release offsets can
/// drive the raw value below the shear line before clamping.
pub type Height = i32;

/// Height at which a pin sits on the shear line.
pub const SHEAR_LINE: Height = 1;

/// Static, editor-owned description of a tumbler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TumblerConfig {
    pub location: Location,
    pub group: u32,
    pub base_height: Height,
    #[serde(default)]
    pub post_release_height: Height,
    #[serde(default)]
    pub master: bool,
}

impl TumblerConfig {
    pub fn new(location: Location, group: u32, base_height: Height) -> Self {
        Self {
            location,
            group,
            base_height,
            post_release_height: 0,
            master: false,
        }
    }

    pub fn with_master(mut self, master: bool) -> Self {
        self.master = master;
        self
    }

    pub fn with_post_release_height(mut self, height: Height) -> Self {
        self.post_release_height = height;
        self
    }
}

/// Runtime state; cleared on reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TumblerState {
    pub current_height: Height,
    pub pushed: bool,
    pub jammed: bool,
    pub releasing: bool,
    pub difference: Height,
    /// Last known height of the opposing pin, 0 when the slot is empty.
    pub counter_height: Height,
}

/// How a tumbler leaves the pushed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    /// A pick let go: the post-release offset applies and binding differences are forgotten.
    Direct,
    /// A binding re-seated the pin: keep the difference the binding just applied.
    Binding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tumbler {
    config: TumblerConfig,
    max_height: Height,
    state: TumblerState,
}

impl Tumbler {
    pub fn new(config: TumblerConfig, max_height: Height) -> Result<Self> {
        check_base_height(config.location, config.base_height, max_height)?;
        let mut tumbler = Self {
            config,
            max_height,
            state: TumblerState::default(),
        };
        tumbler.recalculate();
        Ok(tumbler)
    }

    pub fn config(&self) -> &TumblerConfig {
        &self.config
    }

    pub fn state(&self) -> &TumblerState {
        &self.state
    }

    pub fn location(&self) -> Location {
        self.config.location
    }

    pub fn group(&self) -> u32 {
        self.config.group
    }

    pub fn base_height(&self) -> Height {
        self.config.base_height
    }

    pub fn post_release_height(&self) -> Height {
        self.config.post_release_height
    }

    pub fn is_master(&self) -> bool {
        self.config.master
    }

    pub fn max_height(&self) -> Height {
        self.max_height
    }

    pub fn height(&self) -> Height {
        self.state.current_height
    }

    pub fn difference(&self) -> Height {
        self.state.difference
    }

    pub fn is_pushed(&self) -> bool {
        self.state.pushed
    }

    pub fn is_jammed(&self) -> bool {
        self.state.jammed
    }

    pub fn is_releasing(&self) -> bool {
        self.state.releasing
    }

    /// Seated at the shear line.
    pub fn is_free(&self) -> bool {
        self.state.current_height <= SHEAR_LINE
    }

    pub fn push(&mut self) {
        self.state.releasing = false;
        self.state.pushed = true;
        self.recalculate();
    }

    pub fn jam(&mut self) {
        self.state.releasing = false;
        self.state.jammed = true;
        self.state.pushed = true;
        self.recalculate();
    }

    /// Clears the jam but leaves the pin pushed.
    pub fn unjam(&mut self) {
        self.state.releasing = false;
        self.state.jammed = false;
        self.recalculate();
    }

    pub fn release(&mut self, kind: ReleaseKind) {
        self.state.jammed = false;
        self.state.pushed = false;
        self.state.releasing = kind == ReleaseKind::Direct;
        if kind == ReleaseKind::Direct {
            self.state.difference = 0;
        }
        self.recalculate();
    }

    pub fn set_difference(&mut self, difference: Height) {
        self.state.difference = difference;
        self.recalculate();
    }

    /// Returns whether the current height moved.
    pub fn set_counter_height(&mut self, counter_height: Height) -> bool {
        let before = self.state.current_height;
        self.state.counter_height = counter_height;
        self.recalculate();
        before != self.state.current_height
    }

    pub fn set_base_height(&mut self, height: Height) -> Result<()> {
        check_base_height(self.config.location, height, self.max_height)?;
        self.config.base_height = height;
        self.recalculate();
        Ok(())
    }

    pub fn set_group(&mut self, group: u32) {
        self.config.group = group;
    }

    pub fn set_master(&mut self, master: bool) {
        self.config.master = master;
    }

    pub fn set_post_release_height(&mut self, height: Height) {
        self.config.post_release_height = height;
        self.recalculate();
    }

    /// Drops all runtime state, keeping the configuration and the counter height.
    pub fn reset_state(&mut self) {
        self.state = TumblerState {
            counter_height: self.state.counter_height,
            ..TumblerState::default()
        };
        self.recalculate();
    }

    fn recalculate(&mut self) {
        self.state.current_height = if self.state.pushed {
            SHEAR_LINE
        } else {
            let mut height = self.config.base_height + self.state.difference;
            if self.state.releasing {
                height += self.config.post_release_height;
            }
            height
                .min(self.max_height - self.state.counter_height)
                .max(SHEAR_LINE)
        };
    }
}

pub(crate) fn check_base_height(location: Location, height: Height, max_height: Height) -> Result<()> {
    if height < SHEAR_LINE || height >= max_height {
        return Err(LockError::InvalidHeight {
            location,
            height,
            max_height,
        });
    }
    Ok(())
}
