use engine::GameLogic;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::level::Level;
use crate::location::Location;
use crate::lock::{Lock, LockOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockAction {
    Push(Location),
    /// A click on a pin: let go with the current pick, then push.
    PickAndPush(Location),
    Release,
    SelectPick(usize),
    ChangePick,
    Reset,
    Noop,
}

#[derive(Debug, Clone)]
pub struct LockLogic {
    initial: Lock,
}

impl LockLogic {
    pub fn new(level: Level) -> Result<Self> {
        Self::with_options(level, LockOptions::default())
    }

    pub fn with_options(level: Level, options: LockOptions) -> Result<Self> {
        Ok(Self {
            initial: Lock::with_options(level, options)?,
        })
    }

    pub fn level(&self) -> &Level {
        self.initial.level()
    }
}

impl GameLogic for LockLogic {
    type State = Lock;
    type Input = LockAction;

    fn initial_state(&self) -> Self::State {
        self.initial.clone()
    }

    fn step(&self, state: &Self::State, input: Self::Input) -> Self::State {
        let mut next = state.clone();
        match apply_action(&mut next, input) {
            Ok(()) => {
                // Frames hold state, not a backlog of animation records.
                next.drain_changes();
                next
            }
            Err(err) => {
                tracing::error!(?input, %err, "lock step failed, keeping previous frame");
                state.clone()
            }
        }
    }
}

pub fn apply_action(lock: &mut Lock, action: LockAction) -> Result<()> {
    match action {
        LockAction::Push(location) => {
            lock.push(location)?;
        }
        LockAction::PickAndPush(location) => {
            lock.release_current_pick()?;
            lock.push(location)?;
        }
        LockAction::Release => {
            lock.release_current_pick()?;
        }
        LockAction::SelectPick(pick) => {
            lock.select_pick(pick);
        }
        LockAction::ChangePick => lock.change_current_pick(),
        LockAction::Reset => lock.reset(),
        LockAction::Noop => {}
    }
    Ok(())
}
