use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::change_log::ChangeLog;
use crate::error::{LockError, Result};
use crate::location::Location;
use crate::tumbler::{Height, Tumbler, TumblerConfig};

pub const DEFAULT_NUMBER_OF_PICKS: u32 = 2;
pub const DEFAULT_MAX_HEIGHT: Height = 11;
pub const MIN_MAX_HEIGHT: Height = 3;

// A pin and its counter clamp each other; the pair converges in a couple of rounds.
const PAIR_SETTLE_LIMIT: usize = 8;

/// A directed rule: moving `from` shifts `to` by `difference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub from: Location,
    pub to: Location,
    pub difference: Height,
}

/// How `validate` treats a group without exactly one master tumbler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterPolicy {
    Strict,
    #[default]
    Warn,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelWarning {
    MasterCount { group: u32, masters: usize },
}

impl fmt::Display for LevelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelWarning::MasterCount { group, masters } => write!(
                f,
                "group {group} has {masters} master tumblers, expected exactly one"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    number_of_picks: u32,
    max_height: Height,
    #[serde(with = "crate::serde_arena::tumblers")]
    tumblers: BTreeMap<Location, Tumbler>,
    #[serde(with = "crate::serde_arena::bindings")]
    bindings: BTreeMap<Location, BTreeMap<Location, Height>>,
}

impl Default for Level {
    fn default() -> Self {
        Self {
            number_of_picks: DEFAULT_NUMBER_OF_PICKS,
            max_height: DEFAULT_MAX_HEIGHT,
            tumblers: BTreeMap::new(),
            bindings: BTreeMap::new(),
        }
    }
}

impl Level {
    pub fn new(number_of_picks: u32, max_height: Height) -> Result<Self> {
        check_number_of_picks(number_of_picks)?;
        check_max_height(max_height)?;
        Ok(Self {
            number_of_picks,
            max_height,
            ..Self::default()
        })
    }

    pub fn from_parts(
        number_of_picks: u32,
        max_height: Height,
        tumblers: impl IntoIterator<Item = TumblerConfig>,
        bindings: impl IntoIterator<Item = Binding>,
    ) -> Result<Self> {
        let mut level = Self::new(number_of_picks, max_height)?;
        for config in tumblers {
            level.add_tumbler(config)?;
        }
        for binding in bindings {
            level.add_binding(binding.from, binding.to, binding.difference)?;
        }
        Ok(level)
    }

    pub fn number_of_picks(&self) -> u32 {
        self.number_of_picks
    }

    pub fn max_height(&self) -> Height {
        self.max_height
    }

    pub fn tumblers(&self) -> &BTreeMap<Location, Tumbler> {
        &self.tumblers
    }

    pub fn tumbler(&self, location: Location) -> Option<&Tumbler> {
        self.tumblers.get(&location)
    }

    pub fn contains(&self, location: Location) -> bool {
        self.tumblers.contains_key(&location)
    }

    /// Current height at `location`, 0 for an empty slot.
    pub fn height_at(&self, location: Location) -> Height {
        self.tumblers.get(&location).map_or(0, Tumbler::height)
    }

    pub fn bindings(&self) -> impl Iterator<Item = Binding> + '_ {
        self.bindings.iter().flat_map(|(from, targets)| {
            targets.iter().map(|(to, difference)| Binding {
                from: *from,
                to: *to,
                difference: *difference,
            })
        })
    }

    pub fn bindings_from(&self, from: Location) -> Vec<(Location, Height)> {
        self.bindings
            .get(&from)
            .map(|targets| targets.iter().map(|(to, d)| (*to, *d)).collect())
            .unwrap_or_default()
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.values().map(BTreeMap::len).sum()
    }

    /// Group id to member locations, members in location order.
    pub fn groups(&self) -> BTreeMap<u32, Vec<Location>> {
        let mut groups: BTreeMap<u32, Vec<Location>> = BTreeMap::new();
        for tumbler in self.tumblers.values() {
            groups.entry(tumbler.group()).or_default().push(tumbler.location());
        }
        groups
    }

    pub fn group_members(&self, group: u32) -> Vec<Location> {
        self.tumblers
            .values()
            .filter(|t| t.group() == group)
            .map(Tumbler::location)
            .collect()
    }

    pub fn last_position(&self) -> Option<u32> {
        self.tumblers.keys().map(|loc| loc.position).max()
    }

    pub fn add_tumbler(&mut self, config: TumblerConfig) -> Result<()> {
        let location = config.location;
        if self.tumblers.contains_key(&location) {
            return Err(LockError::DuplicateTumbler(location));
        }
        let tumbler = Tumbler::new(config, self.max_height)?;
        self.tumblers.insert(location, tumbler);
        self.sync_pair(location);
        Ok(())
    }

    /// Removes the tumbler and every binding that touches it.
    pub fn remove_tumbler(&mut self, location: Location) -> Option<Tumbler> {
        let removed = self.tumblers.remove(&location)?;
        self.bindings.remove(&location);
        for targets in self.bindings.values_mut() {
            targets.remove(&location);
        }
        self.bindings.retain(|_, targets| !targets.is_empty());
        self.sync_pair(location.counter());
        Some(removed)
    }

    pub fn add_binding(&mut self, from: Location, to: Location, difference: Height) -> Result<()> {
        for location in [from, to] {
            if !self.tumblers.contains_key(&location) {
                return Err(LockError::MissingTumbler(location));
            }
        }
        self.bindings.entry(from).or_default().insert(to, difference);
        Ok(())
    }

    pub fn remove_binding(&mut self, from: Location, to: Location) -> Option<Height> {
        let targets = self.bindings.get_mut(&from)?;
        let removed = targets.remove(&to);
        if targets.is_empty() {
            self.bindings.remove(&from);
        }
        removed
    }

    pub fn set_number_of_picks(&mut self, number_of_picks: u32) -> Result<()> {
        check_number_of_picks(number_of_picks)?;
        self.number_of_picks = number_of_picks;
        Ok(())
    }

    pub fn set_base_height(&mut self, location: Location, height: Height) -> Result<()> {
        self.tumbler_mut(location)?.set_base_height(height)?;
        self.sync_pair(location);
        Ok(())
    }

    pub fn set_group(&mut self, location: Location, group: u32) -> Result<()> {
        self.tumbler_mut(location)?.set_group(group);
        Ok(())
    }

    pub fn set_master(&mut self, location: Location, master: bool) -> Result<()> {
        self.tumbler_mut(location)?.set_master(master);
        Ok(())
    }

    pub fn set_post_release_height(&mut self, location: Location, height: Height) -> Result<()> {
        self.tumbler_mut(location)?.set_post_release_height(height);
        self.sync_pair(location);
        Ok(())
    }

    /// Checks level integrity. Hard violations are errors; the master rule
    /// follows `policy` and comes back as warnings under `MasterPolicy::Warn`.
    pub fn validate(&self, policy: MasterPolicy) -> Result<Vec<LevelWarning>> {
        check_number_of_picks(self.number_of_picks)?;
        check_max_height(self.max_height)?;

        for (location, tumbler) in &self.tumblers {
            if *location != tumbler.location() {
                return Err(LockError::DuplicateTumbler(tumbler.location()));
            }
            crate::tumbler::check_base_height(*location, tumbler.base_height(), self.max_height)?;
        }

        for binding in self.bindings() {
            if !self.contains(binding.from) || !self.contains(binding.to) {
                return Err(LockError::DanglingBinding {
                    from: binding.from,
                    to: binding.to,
                });
            }
        }

        let mut warnings = Vec::new();
        if policy == MasterPolicy::Ignore {
            return Ok(warnings);
        }
        for (group, members) in self.groups() {
            let masters = members
                .iter()
                .filter(|loc| self.tumblers.get(*loc).is_some_and(Tumbler::is_master))
                .count();
            if masters == 1 {
                continue;
            }
            if policy == MasterPolicy::Strict {
                return Err(LockError::MasterCount { group, masters });
            }
            let warning = LevelWarning::MasterCount { group, masters };
            tracing::warn!(group, masters, "{warning}");
            warnings.push(warning);
        }
        Ok(warnings)
    }

    /// Full value clone, runtime state included.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Clone with every tumbler back at rest.
    pub fn pristine(&self) -> Self {
        let mut level = self.clone();
        for tumbler in level.tumblers.values_mut() {
            tumbler.reset_state();
        }
        let locations: Vec<Location> = level.tumblers.keys().copied().collect();
        for location in locations {
            level.sync_pair(location);
        }
        level
    }

    /// Applies `f` to the tumbler at `location`, re-settles the pin pair and
    /// records every height that moved.
    pub(crate) fn update<F>(&mut self, location: Location, log: &mut ChangeLog, f: F)
    where
        F: FnOnce(&mut Tumbler),
    {
        let counter = location.counter();
        let before = self.height_at(location);
        let counter_before = self.height_at(counter);
        let Some(tumbler) = self.tumblers.get_mut(&location) else {
            return;
        };
        f(tumbler);
        self.sync_pair(location);
        log.record(location, before, self.height_at(location));
        if self.contains(counter) {
            log.record(counter, counter_before, self.height_at(counter));
        }
    }

    fn tumbler_mut(&mut self, location: Location) -> Result<&mut Tumbler> {
        self.tumblers
            .get_mut(&location)
            .ok_or(LockError::MissingTumbler(location))
    }

    fn sync_pair(&mut self, location: Location) {
        let counter = location.counter();
        for _ in 0..PAIR_SETTLE_LIMIT {
            let mut moved = false;
            let height = self.height_at(location);
            if let Some(t) = self.tumblers.get_mut(&counter) {
                moved |= t.set_counter_height(height);
            }
            let counter_height = self.height_at(counter);
            if let Some(t) = self.tumblers.get_mut(&location) {
                moved |= t.set_counter_height(counter_height);
            }
            if !moved {
                break;
            }
        }
    }
}

fn check_number_of_picks(number_of_picks: u32) -> Result<()> {
    if number_of_picks == 0 {
        return Err(LockError::NoPicks);
    }
    Ok(())
}

fn check_max_height(max_height: Height) -> Result<()> {
    if max_height < MIN_MAX_HEIGHT {
        return Err(LockError::InvalidMaxHeight {
            min: MIN_MAX_HEIGHT,
            got: i64::from(max_height),
        });
    }
    Ok(())
}
