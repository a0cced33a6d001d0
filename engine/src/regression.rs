//! Engine-level regression testing helpers.
//!
//! These utilities help you:
//! - hash every state of a headless run into a golden JSON file,
//! - record a run as a `TimeMachine` (JSON), replay it from disk, and
//! - assert the replayed states hash identically to the live ones.
//!
//! The engine stays game-agnostic by requiring a caller-provided encoder closure
//! that turns a state into the bytes to hash.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};

use crate::{GameLogic, HeadlessRunner, TimeMachine};

/// Environment flag helper: accepts `1/true/yes/on` (case-insensitive).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// If set, regression tests may update golden files in-place.
pub fn update_goldens_enabled() -> bool {
    env_flag("LOCKPICK_UPDATE_GOLDENS")
}

pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[macro_export]
macro_rules! regression_golden_path {
    ($name:expr) => {{
        let base = $crate::regression::sanitize_filename($name);
        ::std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("goldens")
            .join(format!("{base}.json"))
    }};
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex::encode(digest)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateHashGolden {
    pub version: u32,
    pub name: String,
    pub hash_alg: String,
    /// One hash per logical engine frame / state.
    pub hashes: Vec<String>,
}

impl StateHashGolden {
    pub fn new(name: impl Into<String>, hashes: Vec<String>) -> Self {
        Self {
            version: 1,
            name: name.into(),
            hash_alg: "sha256".to_string(),
            hashes,
        }
    }
}

pub fn load_golden_json(path: impl AsRef<Path>) -> io::Result<StateHashGolden> {
    let path = path.as_ref();
    let file = fs::File::open(path)?;
    let reader = io::BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("failed parsing golden json {}: {e}", path.display()),
        )
    })
}

pub fn save_golden_json(path: impl AsRef<Path>, golden: &StateHashGolden) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = fs::File::create(path)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, golden)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    writer.flush()?;
    Ok(())
}

pub fn assert_or_update_golden_json(
    path: impl AsRef<Path>,
    golden: &StateHashGolden,
    update: bool,
) -> io::Result<()> {
    let path = path.as_ref();
    let exists = path.exists();

    if update || !exists {
        save_golden_json(path, golden)?;
        if !exists {
            eprintln!("wrote golden: {}", path.display());
        } else {
            eprintln!("updated golden: {}", path.display());
        }
        return Ok(());
    }

    let expected = load_golden_json(path)?;
    if expected.version != golden.version || expected.hash_alg != golden.hash_alg {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "golden metadata mismatch at {}:\nexpected: v{} alg={}\nactual:   v{} alg={}\n(hint: set LOCKPICK_UPDATE_GOLDENS=1 to rewrite)",
                path.display(),
                expected.version,
                expected.hash_alg,
                golden.version,
                golden.hash_alg,
            ),
        ));
    }

    if expected.hashes.len() != golden.hashes.len() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!(
                "golden frame count mismatch at {}: expected {} hashes, got {}\n(hint: set LOCKPICK_UPDATE_GOLDENS=1 to rewrite)",
                path.display(),
                expected.hashes.len(),
                golden.hashes.len()
            ),
        ));
    }

    for (i, (a, b)) in expected.hashes.iter().zip(golden.hashes.iter()).enumerate() {
        if a != b {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "golden mismatch at {} (frame {i}):\nexpected: {a}\nactual:   {b}\n(hint: set LOCKPICK_UPDATE_GOLDENS=1 to rewrite)",
                    path.display()
                ),
            ));
        }
    }

    Ok(())
}

/// Hashes every state in `history` with the caller's encoder.
pub fn state_hashes<S, Encode>(history: &[S], mut encode: Encode) -> Vec<String>
where
    Encode: FnMut(&S) -> Vec<u8>,
{
    history.iter().map(|state| sha256_hex(&encode(state))).collect()
}

#[derive(Debug, Clone)]
pub struct RecordReplayArtifacts {
    pub state_json: PathBuf,
    pub hashes: Vec<String>,
}

/// Engine-level regression helper:
/// - run a scenario live and save its `TimeMachine` as JSON
/// - load the JSON recording and replay it frame-by-frame via `seek`
/// - assert every replayed state hashes the same as the live one
pub fn record_then_replay_and_compare<G, Encode>(
    name: &str,
    out_dir: impl AsRef<Path>,
    game: G,
    inputs: impl IntoIterator<Item = G::Input>,
    mut encode: Encode,
) -> io::Result<RecordReplayArtifacts>
where
    G: GameLogic + Clone,
    G::State: Serialize + DeserializeOwned,
    Encode: FnMut(&G::State) -> Vec<u8>,
{
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)?;

    let base = sanitize_filename(name);
    let state_json = out_dir.join(format!("{base}.json"));

    let mut live_runner = HeadlessRunner::new(game.clone());
    live_runner.run(inputs);
    let live_hashes = state_hashes(live_runner.history(), &mut encode);
    live_runner.timemachine().save_json_file(&state_json)?;

    let tm = TimeMachine::<G::State>::load_json_file(&state_json)?;
    let mut replay_runner = HeadlessRunner::from_timemachine(game, tm);
    let frames = replay_runner.history().len();
    let mut replay_hashes = Vec::with_capacity(frames);
    for frame in 0..frames {
        replay_runner.seek(frame);
        replay_hashes.push(sha256_hex(&encode(replay_runner.state())));
    }

    if live_hashes != replay_hashes {
        let first = live_hashes
            .iter()
            .zip(replay_hashes.iter())
            .position(|(a, b)| a != b)
            .unwrap_or(live_hashes.len().min(replay_hashes.len()));
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "replay of {} diverged at frame {first} (live {} frames, replay {} frames)",
                state_json.display(),
                live_hashes.len(),
                replay_hashes.len()
            ),
        ));
    }

    Ok(RecordReplayArtifacts {
        state_json,
        hashes: live_hashes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_filename_replaces_separators() {
        assert_eq!(sanitize_filename("solve/two picks"), "solve_two_picks");
    }

    #[test]
    fn sha256_hex_matches_known_digest() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
