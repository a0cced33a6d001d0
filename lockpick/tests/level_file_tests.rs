use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use lockpick::demo::demo_level;
use lockpick::level_file::{self, LevelFileError};
use lockpick::{Level, Location, Lock};

fn unique_temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("lockpick_test_{name}_{nanos}.lvl"))
}

#[test]
fn saved_level_loads_back_identically() {
    let level = demo_level().unwrap();
    let out = unique_temp_path("roundtrip");

    level_file::save(&level, &out).expect("save level");
    let loaded = level_file::load(&out).expect("load level");

    assert_eq!(loaded, level);
    assert_eq!(loaded.binding_count(), 1);
    let _ = fs::remove_file(out);
}

#[test]
fn saving_a_played_lock_persists_only_configuration() {
    let mut lock = Lock::new(demo_level().unwrap()).unwrap();
    lock.push(Location::upper(0)).unwrap().expect("push front pin");
    let out = unique_temp_path("played");

    level_file::save(lock.level(), &out).expect("save level");
    let loaded = level_file::load(&out).expect("load level");

    assert_eq!(loaded, lock.level().pristine());
    assert_eq!(loaded.height_at(Location::upper(1)), 4);
    let _ = fs::remove_file(out);
}

#[test]
fn files_on_disk_are_gzip_compressed() {
    let level = demo_level().unwrap();
    let out = unique_temp_path("gzip");
    level_file::save(&level, &out).unwrap();

    let bytes = fs::read(&out).unwrap();
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    assert_eq!(level_file::decompress(&bytes).unwrap(), level_file::encode(&level).unwrap());
    let _ = fs::remove_file(out);
}

#[test]
fn uncompressed_payload_is_rejected() {
    let out = unique_temp_path("raw");
    fs::write(&out, level_file::encode(&Level::default()).unwrap()).unwrap();

    assert!(matches!(level_file::load(&out), Err(LevelFileError::Io(_))));
    let _ = fs::remove_file(out);
}

#[test]
fn missing_file_is_an_io_error() {
    let out = unique_temp_path("missing");
    assert!(matches!(level_file::load(&out), Err(LevelFileError::Io(_))));
}
