use lockpick::{Binding, Level, Location, Lock, TumblerConfig};

fn a() -> Location {
    Location::upper(0)
}

fn b() -> Location {
    Location::lower(0)
}

fn c() -> Location {
    Location::upper(1)
}

fn bound_pair(extra: Option<TumblerConfig>) -> Lock {
    let mut tumblers = vec![TumblerConfig::new(a(), 0, 4), TumblerConfig::new(b(), 0, 3)];
    tumblers.extend(extra);
    let level = Level::from_parts(
        2,
        10,
        tumblers,
        [Binding {
            from: a(),
            to: b(),
            difference: 2,
        }],
    )
    .expect("valid level");
    Lock::new(level).expect("valid lock")
}

fn height(lock: &Lock, location: Location) -> i32 {
    lock.get_tumbler(location).expect("tumbler present").height()
}

#[test]
fn binding_scenario_round_trips_to_initial_state() {
    let mut lock = bound_pair(None);
    let initial = lock.snapshot();

    lock.push(a()).unwrap().expect("push accepted");
    assert!(lock.get_tumbler(a()).unwrap().is_pushed());
    assert_eq!(height(&lock, a()), 1);
    assert_eq!(height(&lock, b()), 5);

    lock.release_current_pick().unwrap().expect("pick held a");
    assert_eq!(height(&lock, a()), 4);
    assert_eq!(height(&lock, b()), 3);
    assert_eq!(lock.get_tumbler(b()).unwrap().difference(), 0);

    // The released pin is left mid-release; everything else is back at rest.
    let after = lock.snapshot();
    assert_eq!(after.heights(), initial.heights());
    assert_eq!(after.picks, initial.picks);
    for (now, then) in after.tumblers.iter().zip(&initial.tumblers) {
        assert_eq!(now.difference, then.difference, "{}", now.location);
        assert_eq!(now.pushed, then.pushed, "{}", now.location);
        assert_eq!(now.jammed, then.jammed, "{}", now.location);
    }
    assert!(after.tumbler(a()).unwrap().releasing);
    assert!(!after.tumbler(b()).unwrap().releasing);
}

#[test]
fn solve_scenario_opens_the_lock() {
    let mut lock = bound_pair(Some(TumblerConfig::new(c(), 0, 5).with_master(true)));
    assert!(!lock.check_win());

    lock.select_pick(0);
    lock.push(a()).unwrap().expect("push a");
    assert_eq!(height(&lock, a()), 1);

    lock.select_pick(1);
    assert!(lock.can_push(c()));
    lock.push(c()).unwrap().expect("push c");

    for location in [a(), b(), c()] {
        let tumbler = lock.get_tumbler(location).unwrap();
        assert!(tumbler.is_jammed(), "{location} jammed");
        assert!(tumbler.is_pushed(), "{location} pushed");
        assert_eq!(tumbler.difference(), 0);
        assert_eq!(tumbler.height(), 1);
    }
    assert!(lock.check_win());
}

#[test]
fn blocked_pin_denies_push_without_side_effects() {
    let mut lock = bound_pair(Some(TumblerConfig::new(c(), 0, 5).with_master(true)));
    let before = lock.snapshot();

    assert_eq!(lock.push(c()).unwrap(), None);
    assert_eq!(lock.snapshot(), before);
    assert!(lock.drain_changes().is_empty());
}

#[test]
fn push_then_release_without_bindings_restores_heights() {
    let level = Level::from_parts(
        1,
        10,
        [
            TumblerConfig::new(Location::upper(0), 0, 6),
            TumblerConfig::new(Location::lower(0), 1, 2).with_master(true),
            TumblerConfig::new(Location::upper(1), 0, 3).with_master(true),
        ],
        [],
    )
    .unwrap();
    let mut lock = Lock::new(level).unwrap();
    let before = lock.snapshot().heights();

    lock.push(Location::upper(0)).unwrap().expect("push");
    lock.release_current_pick().unwrap().expect("release");
    assert_eq!(lock.snapshot().heights(), before);
}

#[test]
fn post_release_height_applies_until_next_push() {
    let level = Level::from_parts(
        1,
        10,
        [TumblerConfig::new(Location::upper(0), 0, 3)
            .with_master(true)
            .with_post_release_height(2)],
        [],
    )
    .unwrap();
    let mut lock = Lock::new(level).unwrap();

    lock.push(Location::upper(0)).unwrap();
    // A master push jams its own group; push again to free it from the jam.
    lock.release_current_pick().unwrap();
    lock.push(Location::upper(0)).unwrap();
    lock.release_current_pick().unwrap();
    assert_eq!(height(&lock, Location::upper(0)), 5);
    assert!(lock.get_tumbler(Location::upper(0)).unwrap().is_releasing());
}

#[test]
fn possible_moves_only_lists_accepted_pushes() {
    let lock = bound_pair(Some(TumblerConfig::new(c(), 0, 5).with_master(true)));
    let moves = lock.get_possible_moves();
    assert_eq!(moves, vec![a(), b()]);

    for location in moves {
        let mut probe = lock.clone();
        assert!(probe.push(location).unwrap().is_some(), "{location} listed but denied");
    }
}

#[test]
fn change_log_is_returned_and_accumulated() {
    let mut lock = bound_pair(None);

    let pushed = lock.push(a()).unwrap().unwrap();
    let released = lock.release_current_pick().unwrap().unwrap();

    let drained = lock.drain_changes();
    assert_eq!(drained.len(), pushed.len() + released.len());
    let first = drained.as_slice()[0];
    assert_eq!((first.location, first.before, first.after), (a(), 4, 1));
    assert!(lock.drain_changes().is_empty());
}

#[test]
fn groups_and_locations_are_queryable() {
    let lock = bound_pair(Some(TumblerConfig::new(c(), 1, 5).with_master(true)));

    let by_group = lock.get_tumblers_by_group();
    assert_eq!(by_group[&0].len(), 2);
    assert_eq!(by_group[&1][0].location(), c());

    let by_location = lock.get_tumblers_by_location();
    assert_eq!(by_location.keys().copied().collect::<Vec<_>>(), vec![b(), a(), c()]);
}

#[test]
fn editor_mutators_keep_bindings_consistent() {
    let mut lock = bound_pair(None);
    lock.add_tumbler(TumblerConfig::new(c(), 0, 2).with_master(true))
        .unwrap();
    lock.add_binding(c(), b(), -1).unwrap();
    assert_eq!(lock.level().binding_count(), 2);

    assert_eq!(lock.remove_binding(a(), b()), Some(2));
    assert!(lock.delete_tumbler(b()).is_some());
    assert_eq!(lock.level().binding_count(), 0);

    lock.set_number_of_picks(1).unwrap();
    assert_eq!(lock.picks().len(), 1);
}
