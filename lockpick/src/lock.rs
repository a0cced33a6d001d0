use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::change_log::ChangeLog;
use crate::error::{LockError, Result};
use crate::level::{Level, LevelWarning, MasterPolicy};
use crate::location::Location;
use crate::state::{LockSnapshot, TumblerSnapshot};
use crate::tumbler::{Height, ReleaseKind, Tumbler, TumblerConfig};

pub const DEFAULT_REVISION_LIMIT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockOptions {
    pub master_policy: MasterPolicy,
    /// Revision passes allowed per public operation.
    pub revision_limit: usize,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            master_policy: MasterPolicy::default(),
            revision_limit: DEFAULT_REVISION_LIMIT,
        }
    }
}

/// Which way a binding cascade runs. Unrelated to a tumbler's own pushed flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    Push,
    Release,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    level: Level,
    options: LockOptions,
    current_pick: usize,
    picks: Vec<Option<Location>>,
    #[serde(skip)]
    changes: ChangeLog,
}

/// Scratch state for one public operation.
#[derive(Debug, Default)]
struct Cascade {
    log: ChangeLog,
    revision_passes: usize,
}

impl Lock {
    pub fn new(level: Level) -> Result<Self> {
        Self::with_options(level, LockOptions::default())
    }

    pub fn with_options(level: Level, options: LockOptions) -> Result<Self> {
        let mut lock = Self {
            level: Level::default(),
            options,
            current_pick: 0,
            picks: Vec::new(),
            changes: ChangeLog::new(),
        };
        lock.set_level(level)?;
        Ok(lock)
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn options(&self) -> LockOptions {
        self.options
    }

    /// Swaps in a new level, dropping every pick and pending change.
    pub fn set_level(&mut self, level: Level) -> Result<Vec<LevelWarning>> {
        let warnings = level.validate(self.options.master_policy)?;
        self.picks = vec![None; level.number_of_picks() as usize];
        self.level = level;
        self.current_pick = 0;
        self.changes = ChangeLog::new();
        Ok(warnings)
    }

    /// Back to the level's resting configuration.
    pub fn reset(&mut self) {
        self.level = self.level.pristine();
        self.picks = vec![None; self.level.number_of_picks() as usize];
        self.current_pick = 0;
        self.changes = ChangeLog::new();
    }

    pub fn push(&mut self, location: Location) -> Result<Option<ChangeLog>> {
        if !self.can_push(location) {
            tracing::debug!(%location, "push denied");
            return Ok(None);
        }
        tracing::debug!(%location, pick = self.current_pick, "push");

        self.transact(|lock, cx| lock.push_inner(location, cx)).map(Some)
    }

    pub fn release_current_pick(&mut self) -> Result<Option<ChangeLog>> {
        if self.picks[self.current_pick].is_none() {
            return Ok(None);
        }

        self.transact(Self::release_pick).map(Some)
    }

    /// Returns false for an out-of-range pick.
    pub fn select_pick(&mut self, pick: usize) -> bool {
        if pick >= self.picks.len() {
            return false;
        }
        self.current_pick = pick;
        true
    }

    pub fn change_current_pick(&mut self) {
        self.current_pick = (self.current_pick + 1) % self.picks.len();
    }

    pub fn current_pick(&self) -> usize {
        self.current_pick
    }

    pub fn number_of_picks(&self) -> usize {
        self.picks.len()
    }

    pub fn get_pick(&self, pick: usize) -> Option<Location> {
        self.picks.get(pick).copied().flatten()
    }

    pub fn picks(&self) -> &[Option<Location>] {
        &self.picks
    }

    pub fn check_win(&self) -> bool {
        self.level.tumblers().values().all(Tumbler::is_free)
    }

    /// Every location a push would currently succeed on, upper side first.
    pub fn get_possible_moves(&self) -> Vec<Location> {
        let mut moves = Vec::new();
        for upper in [true, false] {
            let side: Vec<Location> = self
                .level
                .tumblers()
                .keys()
                .copied()
                .filter(|loc| loc.upper == upper)
                .collect();
            let Some(bound) = side.iter().rev().find(|loc| self.is_reachable(**loc)) else {
                continue;
            };
            moves.extend(
                side.iter()
                    .copied()
                    .filter(|loc| loc.position <= bound.position && self.can_push(*loc)),
            );
        }
        moves
    }

    pub fn can_push(&self, location: Location) -> bool {
        let Some(target) = self.level.tumbler(location) else {
            return false;
        };
        self.is_reachable(location) && self.fits_channel(target)
    }

    pub fn get_tumbler(&self, location: Location) -> Option<&Tumbler> {
        self.level.tumbler(location)
    }

    pub fn get_tumblers_by_location(&self) -> &BTreeMap<Location, Tumbler> {
        self.level.tumblers()
    }

    pub fn get_tumblers_by_group(&self) -> BTreeMap<u32, Vec<&Tumbler>> {
        let mut groups: BTreeMap<u32, Vec<&Tumbler>> = BTreeMap::new();
        for tumbler in self.level.tumblers().values() {
            groups.entry(tumbler.group()).or_default().push(tumbler);
        }
        groups
    }

    /// Everything recorded since the previous drain, oldest first.
    pub fn drain_changes(&mut self) -> ChangeLog {
        self.changes.take()
    }

    pub fn snapshot(&self) -> LockSnapshot {
        LockSnapshot {
            tumblers: self
                .level
                .tumblers()
                .values()
                .map(TumblerSnapshot::from)
                .collect(),
            picks: self.picks.clone(),
            current_pick: self.current_pick,
            won: self.check_win(),
        }
    }

    pub fn add_tumbler(&mut self, config: TumblerConfig) -> Result<()> {
        self.level.add_tumbler(config)
    }

    pub fn delete_tumbler(&mut self, location: Location) -> Option<Tumbler> {
        for pick in self.picks.iter_mut() {
            if *pick == Some(location) {
                *pick = None;
            }
        }
        self.level.remove_tumbler(location)
    }

    pub fn add_binding(&mut self, from: Location, to: Location, difference: Height) -> Result<()> {
        self.level.add_binding(from, to, difference)
    }

    pub fn remove_binding(&mut self, from: Location, to: Location) -> Option<Height> {
        self.level.remove_binding(from, to)
    }

    /// Dropped picks let go of their tumblers before the pick count shrinks.
    pub fn set_number_of_picks(&mut self, number_of_picks: u32) -> Result<()> {
        let keep = number_of_picks as usize;
        let selected = self.current_pick;
        self.transact(|lock, cx| {
            lock.level.set_number_of_picks(number_of_picks)?;
            for pick in (keep..lock.picks.len()).rev() {
                lock.current_pick = pick;
                lock.release_pick(cx)?;
            }
            lock.picks.resize(keep, None);
            lock.current_pick = if selected < keep { selected } else { 0 };
            Ok(())
        })
        .map(|_| ())
    }

    /// Runs one public operation against a fresh cascade. A failed operation
    /// leaves the lock exactly as it was.
    fn transact<F>(&mut self, op: F) -> Result<ChangeLog>
    where
        F: FnOnce(&mut Self, &mut Cascade) -> Result<()>,
    {
        let level = self.level.clone();
        let picks = self.picks.clone();
        let current_pick = self.current_pick;

        let mut cascade = Cascade::default();
        match op(self, &mut cascade) {
            Ok(()) => {
                self.changes.extend(&cascade.log);
                Ok(cascade.log)
            }
            Err(err) => {
                tracing::warn!(%err, "lock operation rolled back");
                self.level = level;
                self.picks = picks;
                self.current_pick = current_pick;
                Err(err)
            }
        }
    }

    fn push_inner(&mut self, location: Location, cx: &mut Cascade) -> Result<()> {
        self.release_pick(cx)?;
        self.picks[self.current_pick] = Some(location);

        if self.level.tumbler(location).is_some_and(Tumbler::is_jammed) {
            self.level.update(location, &mut cx.log, Tumbler::unjam);
            return Ok(());
        }

        self.level.update(location, &mut cx.log, |t| {
            t.unjam();
            t.push();
        });
        self.apply_bindings_iteratively(location, Propagation::Push, cx)?;
        self.apply_master_tumbler(location, cx);
        Ok(())
    }

    fn release_pick(&mut self, cx: &mut Cascade) -> Result<()> {
        let Some(location) = self.picks[self.current_pick].take() else {
            return Ok(());
        };
        self.release_tumbler(location, cx)?;
        self.revise_picks(cx)?;
        Ok(())
    }

    fn release_tumbler(&mut self, location: Location, cx: &mut Cascade) -> Result<()> {
        let releasable = self.level.tumbler(location).is_some_and(|t| !t.is_jammed())
            && !self.is_held_by_other_pick(location);
        if releasable {
            self.level.update(location, &mut cx.log, |t| t.release(ReleaseKind::Direct));
        }
        self.apply_bindings_iteratively(location, Propagation::Release, cx)
    }

    fn is_held_by_other_pick(&self, location: Location) -> bool {
        self.picks
            .iter()
            .enumerate()
            .any(|(pick, held)| pick != self.current_pick && *held == Some(location))
    }

    /// Every tumbler in front of `location` on its side is seated.
    fn is_reachable(&self, location: Location) -> bool {
        self.level
            .tumblers()
            .values()
            .filter(|t| {
                let loc = t.location();
                loc.upper == location.upper && loc.position < location.position
            })
            .all(Tumbler::is_free)
    }

    /// Each opposing pin up to the target must leave room in the channel for
    /// the pin facing it (the target itself at its own position).
    fn fits_channel(&self, target: &Tumbler) -> bool {
        let location = target.location();
        let max_height = self.level.max_height();
        self.level
            .tumblers()
            .values()
            .filter(|counter| {
                let loc = counter.location();
                loc.upper != location.upper && loc.position <= location.position
            })
            .all(|counter| {
                let facing = counter.location().counter();
                let pin = if facing == location {
                    target.height()
                } else {
                    self.level.height_at(facing)
                };
                pin + counter.height() < max_height
            })
    }

    fn apply_bindings(&mut self, source: Location, direction: Propagation, cx: &mut Cascade) {
        for (target, difference) in self.level.bindings_from(source) {
            if !self.level.contains(target) {
                continue;
            }
            if direction == Propagation::Push && self.is_held_by_other_pick(target) {
                tracing::debug!(%source, %target, "contested binding jams target");
                self.level.update(target, &mut cx.log, Tumbler::jam);
                continue;
            }

            let (source_pushed, source_jammed) = self
                .level
                .tumbler(source)
                .map_or((false, false), |t| (t.is_pushed(), t.is_jammed()));
            let difference = if source_pushed { difference } else { 0 };
            let reseat = direction == Propagation::Push && !source_jammed;
            self.level.update(target, &mut cx.log, |t| {
                t.set_difference(difference);
                if reseat {
                    t.release(ReleaseKind::Binding);
                }
            });
        }
    }

    fn apply_bindings_iteratively(
        &mut self,
        source: Location,
        direction: Propagation,
        cx: &mut Cascade,
    ) -> Result<()> {
        self.apply_bindings(source, direction, cx);
        if !self.revise_picks(cx)? {
            // Releases inside the revision share this machinery and can undo
            // the cascade that triggered them; re-apply it once.
            self.apply_bindings(source, direction, cx);
        }
        Ok(())
    }

    fn is_pick_valid(&self, pick: usize) -> bool {
        let Some(location) = self.picks[pick] else {
            return true;
        };
        self.level
            .tumblers()
            .values()
            .filter(|t| {
                let loc = t.location();
                loc.upper == location.upper && loc.position <= location.position
            })
            .all(Tumbler::is_free)
    }

    /// Releases picks left holding unseated pins until a full pass is clean.
    /// Returns whether the first pass already was.
    fn revise_picks(&mut self, cx: &mut Cascade) -> Result<bool> {
        let mut passes = 0;
        loop {
            passes += 1;
            cx.revision_passes += 1;
            if cx.revision_passes > self.options.revision_limit {
                return Err(LockError::RevisionLimitExceeded {
                    limit: self.options.revision_limit,
                });
            }

            let mut all_valid = true;
            for pick in 0..self.picks.len() {
                if self.is_pick_valid(pick) {
                    continue;
                }
                all_valid = false;
                let Some(location) = self.picks[pick] else {
                    continue;
                };
                tracing::debug!(pick, %location, "pick invalidated");
                self.apply_bindings(location, Propagation::Release, cx);
                self.picks[pick] = None;
                self.release_tumbler(location, cx)?;
            }

            if all_valid {
                return Ok(passes == 1);
            }
        }
    }

    fn apply_master_tumbler(&mut self, location: Location, cx: &mut Cascade) {
        let Some(group) = self
            .level
            .tumbler(location)
            .filter(|t| t.is_master() && t.is_pushed())
            .map(Tumbler::group)
        else {
            return;
        };
        for member in self.level.group_members(group) {
            self.level.update(member, &mut cx.log, |t| {
                t.jam();
                t.set_difference(0);
            });
        }
        tracing::debug!(group, "master pushed, group jammed");
    }
}
