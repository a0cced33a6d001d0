use proptest::prelude::*;

use lockpick::{Binding, Level, Location, Lock, TumblerConfig};

#[derive(Debug, Clone)]
struct Slot {
    base: i32,
    group: u32,
    master: bool,
    post_release: i32,
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Push(usize),
    Release,
    ChangePick,
    SelectPick(usize),
}

fn build_level(
    max_height: i32,
    picks: u32,
    slots: &[Option<Slot>],
    bindings: &[(usize, usize, i32)],
) -> Level {
    let mut configs = Vec::new();
    for (i, slot) in slots.iter().enumerate() {
        let Some(slot) = slot else { continue };
        let location = Location::new((i / 2) as u32, i % 2 == 0);
        let base = 1 + slot.base % (max_height - 1);
        configs.push(
            TumblerConfig::new(location, slot.group, base)
                .with_master(slot.master)
                .with_post_release_height(slot.post_release),
        );
    }
    let locations: Vec<Location> = configs.iter().map(|c| c.location).collect();
    let bindings: Vec<Binding> = if locations.is_empty() {
        Vec::new()
    } else {
        bindings
            .iter()
            .map(|(from, to, difference)| Binding {
                from: locations[from % locations.len()],
                to: locations[to % locations.len()],
                difference: *difference,
            })
            .collect()
    };
    Level::from_parts(picks, max_height, configs, bindings).expect("generated level is valid")
}

fn slot_strategy(with_masters: bool, with_post_release: bool) -> impl Strategy<Value = Option<Slot>> {
    proptest::option::of((0..64i32, 0..3u32, any::<bool>(), -2..3i32).prop_map(
        move |(base, group, master, post_release)| Slot {
            base,
            group,
            master: with_masters && master,
            post_release: if with_post_release { post_release } else { 0 },
        },
    ))
}

fn level_strategy(with_masters: bool, with_bindings: bool) -> impl Strategy<Value = Level> {
    (
        4..12i32,
        1..4u32,
        proptest::collection::vec(slot_strategy(with_masters, with_masters), 1..10),
        proptest::collection::vec((0..16usize, 0..16usize, -3..5i32), 0..6),
    )
        .prop_map(move |(max_height, picks, slots, bindings)| {
            let bindings = if with_bindings { bindings } else { Vec::new() };
            build_level(max_height, picks, &slots, &bindings)
        })
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..16usize).prop_map(Op::Push),
        2 => Just(Op::Release),
        1 => Just(Op::ChangePick),
        1 => (0..4usize).prop_map(Op::SelectPick),
    ]
}

fn location_at(lock: &Lock, index: usize) -> Option<Location> {
    let keys: Vec<Location> = lock.get_tumblers_by_location().keys().copied().collect();
    (!keys.is_empty()).then(|| keys[index % keys.len()])
}

fn apply(lock: &mut Lock, op: Op) {
    match op {
        Op::Push(index) => {
            if let Some(location) = location_at(lock, index) {
                lock.push(location).expect("push settles");
            }
        }
        Op::Release => {
            lock.release_current_pick().expect("release settles");
        }
        Op::ChangePick => lock.change_current_pick(),
        Op::SelectPick(pick) => {
            lock.select_pick(pick);
        }
    }
}

fn assert_heights_fit(lock: &Lock) {
    let max_height = lock.level().max_height();
    for (location, tumbler) in lock.get_tumblers_by_location() {
        let height = tumbler.height();
        assert!(height >= 1, "{location} below the shear line: {height}");
        if let Some(counter) = lock.get_tumbler(location.counter()) {
            assert!(
                height + counter.height() <= max_height,
                "{location} at {height} overlaps counter at {}",
                counter.height()
            );
        }
    }
}

proptest! {
    #[test]
    fn heights_stay_within_the_channel(
        level in level_strategy(true, true),
        ops in proptest::collection::vec(op_strategy(), 0..40),
    ) {
        let mut lock = Lock::new(level).unwrap();
        assert_heights_fit(&lock);
        for op in ops {
            apply(&mut lock, op);
            assert_heights_fit(&lock);
        }
    }

    #[test]
    fn denied_push_changes_nothing(
        level in level_strategy(true, true),
        ops in proptest::collection::vec(op_strategy(), 0..20),
        probe in 0..16usize,
    ) {
        let mut lock = Lock::new(level).unwrap();
        for op in ops {
            apply(&mut lock, op);
        }
        let Some(location) = location_at(&lock, probe) else { return Ok(()) };
        if !lock.can_push(location) {
            let before = lock.clone();
            prop_assert_eq!(lock.push(location).unwrap(), None);
            prop_assert_eq!(lock, before);
        }
    }

    #[test]
    fn possible_moves_are_accepted(
        level in level_strategy(true, true),
        ops in proptest::collection::vec(op_strategy(), 0..20),
    ) {
        let mut lock = Lock::new(level).unwrap();
        for op in ops {
            apply(&mut lock, op);
        }
        for location in lock.get_possible_moves() {
            let mut probe = lock.clone();
            prop_assert!(probe.push(location).unwrap().is_some(), "{} listed but denied", location);
        }
    }

    #[test]
    fn win_means_every_pin_is_seated(
        level in level_strategy(true, true),
        ops in proptest::collection::vec(op_strategy(), 0..40),
    ) {
        let mut lock = Lock::new(level).unwrap();
        for op in ops {
            apply(&mut lock, op);
            let snapshot = lock.snapshot();
            prop_assert_eq!(snapshot.won, snapshot.tumblers.iter().all(|t| t.height <= 1));
            prop_assert_eq!(snapshot.won, lock.check_win());
        }
    }

    #[test]
    fn push_then_release_restores_plain_levels(
        level in level_strategy(false, false),
        probe in 0..16usize,
    ) {
        let mut lock = Lock::new(level).unwrap();
        let before = lock.snapshot().heights();
        let Some(location) = location_at(&lock, probe) else { return Ok(()) };
        if lock.push(location).unwrap().is_some() {
            lock.release_current_pick().unwrap();
            prop_assert_eq!(lock.snapshot().heights(), before);
        }
    }

    #[test]
    fn master_push_jams_its_group(
        level in level_strategy(true, false),
        probe in 0..16usize,
    ) {
        let mut lock = Lock::new(level).unwrap();
        let Some(location) = location_at(&lock, probe) else { return Ok(()) };
        let tumbler = lock.get_tumbler(location).unwrap().clone();
        if tumbler.is_master() && lock.push(location).unwrap().is_some() {
            for member in lock.level().group_members(tumbler.group()) {
                let t = lock.get_tumbler(member).unwrap();
                prop_assert!(t.is_jammed());
                prop_assert_eq!(t.difference(), 0);
                prop_assert_eq!(t.height(), 1);
            }
        }
    }
}
