use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use lockpick::demo::demo_level;
use lockpick::editor_api::{PlaySession, push_action_id};
use lockpick::level_editor::LevelEditor;
use lockpick::settings::EngineSettings;
use lockpick::{Location, LockOptions, MasterPolicy, TumblerConfig};

fn unique_temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("lockpick_test_{name}_{nanos}.lvl"))
}

fn author_demo(editor: &mut LevelEditor) {
    editor
        .add_tumbler(TumblerConfig::new(Location::upper(0), 0, 3))
        .unwrap();
    editor
        .add_tumbler(TumblerConfig::new(Location::upper(1), 0, 4))
        .unwrap();
    editor
        .add_tumbler(TumblerConfig::new(Location::upper(2), 0, 2))
        .unwrap();
    editor
        .add_tumbler(TumblerConfig::new(Location::lower(0), 1, 2))
        .unwrap();
    editor
        .add_tumbler(TumblerConfig::new(Location::lower(1), 1, 5))
        .unwrap();
    editor.set_master(Location::upper(1), true).unwrap();
    editor.set_master(Location::upper(2), true).unwrap();
    editor.set_master(Location::lower(1), true).unwrap();
    editor
        .add_binding(Location::upper(0), Location::upper(1), -3)
        .unwrap();
}

#[test]
fn authored_level_matches_demo_and_survives_disk() {
    let settings = EngineSettings::default();
    let mut editor = LevelEditor::new(settings.empty_level().unwrap(), settings.lock_options()).unwrap();
    author_demo(&mut editor);

    assert_eq!(editor.level(), &demo_level().unwrap());
    assert!(editor.level().validate(MasterPolicy::Strict).is_ok());

    let out = unique_temp_path("authored");
    editor.save(&out).expect("save authored level");

    let reopened = LevelEditor::open(&out, LockOptions::default()).expect("reopen level");
    assert_eq!(reopened.level(), editor.level());
    assert!(!reopened.can_undo());

    let _ = fs::remove_file(out);
}

#[test]
fn undo_all_returns_to_empty_level() {
    let settings = EngineSettings::default();
    let mut editor = LevelEditor::new(settings.empty_level().unwrap(), settings.lock_options()).unwrap();
    author_demo(&mut editor);

    let edits = editor.revision();
    for _ in 0..edits {
        assert!(editor.undo().unwrap());
    }
    assert!(editor.level().tumblers().is_empty());
    assert!(!editor.undo().unwrap());

    while editor.redo().unwrap() {}
    assert_eq!(editor.level(), &demo_level().unwrap());
}

#[test]
fn load_replaces_level_and_history() {
    let out = unique_temp_path("load");
    lockpick::level_file::save(&demo_level().unwrap(), &out).unwrap();

    let settings = EngineSettings::default();
    let mut editor = LevelEditor::new(settings.empty_level().unwrap(), settings.lock_options()).unwrap();
    editor
        .add_tumbler(TumblerConfig::new(Location::lower(4), 2, 2))
        .unwrap();
    editor.load(&out).unwrap();

    assert_eq!(editor.level(), &demo_level().unwrap());
    assert!(!editor.can_undo());
    let _ = fs::remove_file(out);
}

#[test]
fn play_session_solves_demo_by_action_ids() {
    let mut session = PlaySession::new(demo_level().unwrap(), LockOptions::default()).unwrap();

    let ids = [
        push_action_id(Location::upper(0)),
        "selectPick:1".to_string(),
        push_action_id(Location::upper(2)),
        "changePick".to_string(),
        push_action_id(Location::lower(0)),
        "selectPick:1".to_string(),
        push_action_id(Location::lower(1)),
    ];
    let mut last = session.state();
    for id in &ids {
        last = session.step(id).expect("known action id");
    }

    assert_eq!(last.frame, ids.len());
    assert_eq!(last.stat("won"), Some("true"));
    assert_eq!(last.stat("jammed"), Some("5"));
    assert!(session.lock().check_win());

    let rewound = session.rewind(1);
    assert_eq!(rewound.stat("won"), Some("false"));
    assert_eq!(session.reset().frame, 0);
    assert_eq!(session.timeline().history_len, 1);
}
