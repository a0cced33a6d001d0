use engine::agent::{AgentCommand, AgentHost, AgentResponse};
use engine::editor::{EditorAction, EditorManifest, EditorSnapshot, EditorStat, EditorTimeline};
use thiserror::Error;

use crate::level::Level;
use crate::location::Location;
use crate::lock::{Lock, LockOptions};
use crate::playtest::{LockAction, LockLogic};

const EDITOR_TITLE: &str = "Lockpick";

const FIXED_ACTIONS: &[(&str, &str, LockAction)] = &[
    ("release", "Release", LockAction::Release),
    ("changePick", "Change Pick", LockAction::ChangePick),
    ("reset", "Reset", LockAction::Reset),
    ("noop", "Noop", LockAction::Noop),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaySessionError {
    #[error("unknown actionId: {0}")]
    UnknownActionId(String),
}

/// Drives a lock through the engine's agent host so every action lands on a
/// rewindable timeline.
pub struct PlaySession {
    host: AgentHost<LockLogic>,
}

impl PlaySession {
    pub fn new(level: Level, options: LockOptions) -> crate::error::Result<Self> {
        Ok(Self {
            host: AgentHost::new(LockLogic::with_options(level, options)?),
        })
    }

    pub fn manifest(&self) -> EditorManifest {
        let lock = self.host.runner().state();
        let mut actions: Vec<EditorAction> = FIXED_ACTIONS
            .iter()
            .map(|(id, label, _)| EditorAction {
                id: (*id).to_string(),
                label: (*label).to_string(),
            })
            .collect();
        actions.extend((0..lock.number_of_picks()).map(|pick| EditorAction {
            id: format!("selectPick:{pick}"),
            label: format!("Pick {}", pick + 1),
        }));
        actions.extend(lock.get_tumblers_by_location().keys().map(|location| {
            EditorAction {
                id: push_action_id(*location),
                label: format!("Push {location}"),
            }
        }));
        EditorManifest {
            title: EDITOR_TITLE.to_string(),
            actions,
        }
    }

    pub fn timeline(&self) -> EditorTimeline {
        let runner = self.host.runner();
        let tm = runner.timemachine();
        EditorTimeline {
            frame: runner.frame(),
            history_len: runner.history().len(),
            can_rewind: tm.can_rewind(),
            can_forward: tm.can_forward(),
        }
    }

    pub fn lock(&self) -> &Lock {
        self.host.runner().state()
    }

    pub fn state(&mut self) -> EditorSnapshot {
        snapshot_from_response(self.host.handle(AgentCommand::GetState))
    }

    pub fn step(&mut self, action_id: &str) -> Result<EditorSnapshot, PlaySessionError> {
        let action = action_from_id(action_id)
            .ok_or_else(|| PlaySessionError::UnknownActionId(action_id.to_string()))?;
        Ok(snapshot_from_response(
            self.host.handle(AgentCommand::Step(action)),
        ))
    }

    pub fn rewind(&mut self, frames: usize) -> EditorSnapshot {
        snapshot_from_response(self.host.handle(AgentCommand::Rewind { frames }))
    }

    pub fn forward(&mut self, frames: usize) -> EditorSnapshot {
        snapshot_from_response(self.host.handle(AgentCommand::Forward { frames }))
    }

    pub fn seek(&mut self, frame: usize) -> EditorSnapshot {
        snapshot_from_response(self.host.handle(AgentCommand::Seek { frame }))
    }

    pub fn reset(&mut self) -> EditorSnapshot {
        snapshot_from_response(self.host.handle(AgentCommand::Reset))
    }
}

pub fn push_action_id(location: Location) -> String {
    format!("push:{}:{}", location.position, location.side_name())
}

pub fn action_from_id(id: &str) -> Option<LockAction> {
    if let Some(action) = FIXED_ACTIONS
        .iter()
        .find_map(|(action_id, _, action)| (*action_id == id).then_some(*action))
    {
        return Some(action);
    }

    if let Some(pick) = id.strip_prefix("selectPick:") {
        return pick.parse().ok().map(LockAction::SelectPick);
    }

    let (position, side) = id.strip_prefix("push:")?.split_once(':')?;
    let position = position.parse().ok()?;
    let upper = match side {
        "upper" => true,
        "lower" => false,
        _ => return None,
    };
    Some(LockAction::Push(Location::new(position, upper)))
}

fn snapshot_from_response(response: AgentResponse<Lock>) -> EditorSnapshot {
    match response {
        AgentResponse::State { frame, state } => snapshot_from_state(frame, &state),
        AgentResponse::History { frame, history } => match history.get(frame) {
            Some(state) => snapshot_from_state(frame, state),
            None => EditorSnapshot {
                frame,
                state: serde_json::Value::Null,
                stats: Vec::new(),
            },
        },
    }
}

pub fn snapshot_from_state(frame: usize, lock: &Lock) -> EditorSnapshot {
    let snapshot = lock.snapshot();
    let state = serde_json::to_value(&snapshot).unwrap_or_default();

    let pushed = snapshot.tumblers.iter().filter(|t| t.pushed).count();
    let jammed = snapshot.tumblers.iter().filter(|t| t.jammed).count();
    let held = snapshot
        .picks
        .get(snapshot.current_pick)
        .copied()
        .flatten()
        .map_or_else(|| "-".to_string(), |location| location.to_string());

    let stats = vec![
        EditorStat::new("won", snapshot.won),
        EditorStat::new("currentPick", snapshot.current_pick),
        EditorStat::new("heldTumbler", held),
        EditorStat::new("tumblers", snapshot.tumblers.len()),
        EditorStat::new("pushed", pushed),
        EditorStat::new("jammed", jammed),
        EditorStat::new("possibleMoves", lock.get_possible_moves().len()),
    ];

    EditorSnapshot {
        frame,
        state,
        stats,
    }
}
