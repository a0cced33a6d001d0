use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::level::{DEFAULT_MAX_HEIGHT, DEFAULT_NUMBER_OF_PICKS, Level, MIN_MAX_HEIGHT, MasterPolicy};
use crate::lock::{DEFAULT_REVISION_LIMIT, LockOptions};
use crate::tumbler::Height;

const MAX_NUMBER_OF_PICKS: u32 = 16;
const MAX_MAX_HEIGHT: Height = 64;
const MAX_REVISION_LIMIT: usize = 65_536;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineSettings {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub master_policy: MasterPolicy,
    #[serde(default = "default_revision_limit")]
    pub revision_limit: usize,
    /// Defaults for levels created from scratch.
    #[serde(default = "default_number_of_picks")]
    pub number_of_picks: u32,
    #[serde(default = "default_max_height")]
    pub max_height: Height,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            version: default_version(),
            master_policy: MasterPolicy::default(),
            revision_limit: default_revision_limit(),
            number_of_picks: default_number_of_picks(),
            max_height: default_max_height(),
        }
    }
}

impl EngineSettings {
    pub fn sanitized(mut self) -> Self {
        self.version = default_version();
        self.revision_limit = self.revision_limit.clamp(1, MAX_REVISION_LIMIT);
        self.number_of_picks = self.number_of_picks.clamp(1, MAX_NUMBER_OF_PICKS);
        self.max_height = self.max_height.clamp(MIN_MAX_HEIGHT, MAX_MAX_HEIGHT);
        self
    }

    pub fn lock_options(&self) -> LockOptions {
        LockOptions {
            master_policy: self.master_policy,
            revision_limit: self.revision_limit,
        }
    }

    pub fn empty_level(&self) -> Result<Level> {
        Level::new(self.number_of_picks, self.max_height)
    }
}

fn default_version() -> u32 {
    1
}

fn default_revision_limit() -> usize {
    DEFAULT_REVISION_LIMIT
}

fn default_number_of_picks() -> u32 {
    DEFAULT_NUMBER_OF_PICKS
}

fn default_max_height() -> Height {
    DEFAULT_MAX_HEIGHT
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os("LOCKPICK_SETTINGS_PATH") {
            return Self {
                path: PathBuf::from(explicit),
            };
        }

        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut path = base;
        path.push("lockpick");
        path.push("settings.json");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable files fall back to defaults.
    pub fn load(&self) -> EngineSettings {
        let Ok(bytes) = fs::read(&self.path) else {
            return EngineSettings::default();
        };
        match serde_json::from_slice::<EngineSettings>(&bytes) {
            Ok(settings) => settings.sanitized(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "ignoring corrupt settings file");
                EngineSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &EngineSettings) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(settings)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&self.path, text)
    }
}
