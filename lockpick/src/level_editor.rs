use std::path::Path;

use engine::TimeMachine;

use crate::error::LockError;
use crate::level::Level;
use crate::level_file::{self, Result};
use crate::location::Location;
use crate::lock::{Lock, LockOptions};
use crate::tumbler::{Height, TumblerConfig};

/// Authoring session over a lock. Every accepted edit is recorded as an
/// encoded level payload, so undo and redo restore exactly what was saved.
#[derive(Debug, Clone)]
pub struct LevelEditor {
    lock: Lock,
    history: TimeMachine<Vec<u8>>,
}

impl LevelEditor {
    pub fn new(level: Level, options: LockOptions) -> Result<Self> {
        let level = level.pristine();
        let payload = level_file::encode(&level)?;
        Ok(Self {
            lock: Lock::with_options(level, options)?,
            history: TimeMachine::new(payload),
        })
    }

    pub fn open(path: impl AsRef<Path>, options: LockOptions) -> Result<Self> {
        Self::new(level_file::load(path)?, options)
    }

    pub fn lock(&self) -> &Lock {
        &self.lock
    }

    /// Test-play access. Play state is discarded by the next edit.
    pub fn lock_mut(&mut self) -> &mut Lock {
        &mut self.lock
    }

    pub fn level(&self) -> &Level {
        self.lock.level()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_rewind()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_forward()
    }

    pub fn revision(&self) -> usize {
        self.history.frame()
    }

    pub fn add_tumbler(&mut self, config: TumblerConfig) -> Result<()> {
        self.edit(|level| level.add_tumbler(config))
    }

    pub fn delete_tumbler(&mut self, location: Location) -> Result<()> {
        self.edit(|level| {
            level
                .remove_tumbler(location)
                .map(|_| ())
                .ok_or(LockError::MissingTumbler(location))
        })
    }

    pub fn add_binding(&mut self, from: Location, to: Location, difference: Height) -> Result<()> {
        self.edit(|level| level.add_binding(from, to, difference))
    }

    /// Returns whether a binding was removed.
    pub fn remove_binding(&mut self, from: Location, to: Location) -> Result<bool> {
        self.edit(|level| Ok(level.remove_binding(from, to).is_some()))
    }

    /// Making a tumbler master demotes every other master in its group.
    pub fn set_master(&mut self, location: Location, master: bool) -> Result<()> {
        self.edit(|level| {
            let group = level
                .tumbler(location)
                .map(|t| t.group())
                .ok_or(LockError::MissingTumbler(location))?;
            if master {
                for member in level.group_members(group) {
                    if member != location {
                        level.set_master(member, false)?;
                    }
                }
            }
            level.set_master(location, master)
        })
    }

    pub fn set_base_height(&mut self, location: Location, height: Height) -> Result<()> {
        self.edit(|level| level.set_base_height(location, height))
    }

    pub fn set_group(&mut self, location: Location, group: u32) -> Result<()> {
        self.edit(|level| level.set_group(location, group))
    }

    pub fn set_post_release_height(&mut self, location: Location, height: Height) -> Result<()> {
        self.edit(|level| level.set_post_release_height(location, height))
    }

    pub fn set_number_of_picks(&mut self, number_of_picks: u32) -> Result<()> {
        self.edit(|level| level.set_number_of_picks(number_of_picks))
    }

    /// Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        if !self.history.can_rewind() {
            return Ok(false);
        }
        self.history.rewind(1);
        self.restore()?;
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool> {
        if !self.history.can_forward() {
            return Ok(false);
        }
        self.history.forward(1);
        self.restore()?;
        Ok(true)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        level_file::save(&self.lock.level().pristine(), path)
    }

    /// Replaces the level with the file's and starts a fresh history.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let level = level_file::load(path)?;
        let payload = level_file::encode(&level)?;
        self.lock.set_level(level)?;
        self.history = TimeMachine::new(payload);
        Ok(())
    }

    fn edit<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Level) -> crate::error::Result<T>,
    {
        let mut level = self.lock.level().pristine();
        let out = f(&mut level)?;
        let payload = level_file::encode(&level)?;
        if payload != *self.history.state() {
            self.lock.set_level(level)?;
            let revision = self.history.record(payload);
            tracing::debug!(revision, "level edited");
        }
        Ok(out)
    }

    fn restore(&mut self) -> Result<()> {
        let level = level_file::decode(self.history.state())?;
        self.lock.set_level(level)?;
        tracing::debug!(revision = self.history.frame(), "level restored");
        Ok(())
    }
}
