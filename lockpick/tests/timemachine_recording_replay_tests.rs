use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use engine::regression::{
    StateHashGolden, assert_or_update_golden_json, record_then_replay_and_compare,
    update_goldens_enabled,
};
use engine::{HeadlessRunner, TimeMachine, regression_golden_path};
use lockpick::demo::demo_level;
use lockpick::playtest::{LockAction, LockLogic};
use lockpick::{Location, Lock};

fn unique_temp_json_path() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("lockpick_test_lock_timemachine_{nanos}.json"))
}

fn solve_inputs() -> Vec<LockAction> {
    vec![
        LockAction::Push(Location::upper(0)),
        LockAction::SelectPick(1),
        LockAction::Push(Location::upper(2)),
        LockAction::SelectPick(0),
        LockAction::Push(Location::lower(0)),
        LockAction::ChangePick,
        LockAction::Push(Location::lower(1)),
    ]
}

fn encode(lock: &Lock) -> Vec<u8> {
    serde_json::to_vec(&lock.snapshot()).expect("snapshot serializes")
}

#[test]
fn lock_timemachine_can_be_saved_and_replayed_from_disk() {
    let logic = LockLogic::new(demo_level().unwrap()).unwrap();
    let mut runner = HeadlessRunner::new(logic.clone());
    runner.run(solve_inputs());
    assert!(runner.state().check_win());

    let out = unique_temp_json_path();
    runner
        .timemachine()
        .save_json_file(&out)
        .expect("save lock timemachine json");

    let loaded_tm = TimeMachine::<Lock>::load_json_file(&out).expect("load lock timemachine json");
    let replay_runner = HeadlessRunner::from_timemachine(logic, loaded_tm);

    assert_eq!(replay_runner.frame(), runner.frame());
    let orig_tm = runner.timemachine();
    let replay_tm = replay_runner.timemachine();
    assert_eq!(replay_tm.len(), orig_tm.len());

    for frame in 0..orig_tm.len() {
        let a = orig_tm.state_at(frame).unwrap();
        let b = replay_tm.state_at(frame).unwrap();
        assert_eq!(a, b, "state mismatch at frame {frame}");
    }

    let _ = fs::remove_file(out);
}

#[test]
fn solve_run_matches_state_hash_golden() {
    let logic = LockLogic::new(demo_level().unwrap()).unwrap();
    let dir = std::env::temp_dir().join("lockpick_regression");

    let artifacts = record_then_replay_and_compare("demo_solve", &dir, logic, solve_inputs(), encode)
        .expect("replay matches live run");
    assert_eq!(artifacts.hashes.len(), solve_inputs().len() + 1);

    let golden = StateHashGolden::new("demo_solve", artifacts.hashes);
    assert_or_update_golden_json(
        regression_golden_path!("demo_solve"),
        &golden,
        update_goldens_enabled(),
    )
    .expect("state hashes match golden");
}
