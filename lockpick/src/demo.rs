use crate::error::Result;
use crate::level::{Binding, DEFAULT_MAX_HEIGHT, DEFAULT_NUMBER_OF_PICKS, Level};
use crate::location::Location;
use crate::tumbler::{Height, TumblerConfig};

/// Small two-pick level used when no level file is given.
///
/// Pushing the front upper pin drops the pin behind it onto the shear line,
/// which opens the way to the upper master. The lower row only needs order.
pub fn demo_level() -> Result<Level> {
    Level::from_parts(
        2,
        DEFAULT_MAX_HEIGHT,
        [
            TumblerConfig::new(Location::upper(0), 0, 3),
            TumblerConfig::new(Location::upper(1), 0, 4),
            TumblerConfig::new(Location::upper(2), 0, 2).with_master(true),
            TumblerConfig::new(Location::lower(0), 1, 2),
            TumblerConfig::new(Location::lower(1), 1, 5).with_master(true),
        ],
        [Binding {
            from: Location::upper(0),
            to: Location::upper(1),
            difference: -3,
        }],
    )
}

/// Three groups across nine positions, each closed by an upper master.
/// Bindings cross group boundaries, so opening one group disturbs the next.
pub fn showcase_level() -> Result<Level> {
    let upper = Location::upper;
    let lower = Location::lower;
    Level::from_parts(
        DEFAULT_NUMBER_OF_PICKS,
        DEFAULT_MAX_HEIGHT,
        [
            TumblerConfig::new(upper(0), 0, 5),
            TumblerConfig::new(upper(1), 0, 6),
            TumblerConfig::new(upper(2), 0, 4).with_master(true),
            TumblerConfig::new(upper(3), 1, 4),
            TumblerConfig::new(upper(4), 1, 5),
            TumblerConfig::new(upper(5), 1, 6).with_master(true),
            TumblerConfig::new(upper(6), 2, 6),
            TumblerConfig::new(upper(7), 2, 5),
            TumblerConfig::new(upper(8), 2, 6).with_master(true),
            TumblerConfig::new(lower(0), 0, 5).with_post_release_height(-1),
            TumblerConfig::new(lower(1), 0, 2),
            TumblerConfig::new(lower(3), 1, 4),
            TumblerConfig::new(lower(4), 1, 5),
            TumblerConfig::new(lower(6), 2, 3),
            TumblerConfig::new(lower(7), 2, 2),
        ],
        [
            binding(upper(0), lower(0), 1),
            binding(lower(0), upper(0), 3),
            binding(upper(1), lower(0), 2),
            binding(lower(1), upper(0), 2),
            binding(upper(3), lower(7), 4),
            binding(lower(3), upper(3), 3),
            binding(upper(4), lower(4), -2),
            binding(lower(4), upper(6), 2),
            binding(upper(6), lower(6), 1),
            binding(lower(6), lower(3), -1),
            binding(upper(7), upper(8), 1),
            binding(lower(7), upper(7), 3),
        ],
    )
}

/// Introductory levels, easiest first.
pub fn tutorial_levels() -> Result<Vec<Level>> {
    let upper = Location::upper;
    let lower = Location::lower;
    let level = |tumblers: Vec<TumblerConfig>, bindings: Vec<Binding>| {
        Level::from_parts(DEFAULT_NUMBER_OF_PICKS, DEFAULT_MAX_HEIGHT, tumblers, bindings)
    };

    Ok(vec![
        level(
            vec![
                TumblerConfig::new(upper(0), 0, 4),
                TumblerConfig::new(upper(1), 0, 6).with_master(true),
            ],
            vec![],
        )?,
        level(
            vec![
                TumblerConfig::new(upper(0), 0, 4),
                TumblerConfig::new(lower(0), 0, 5),
                TumblerConfig::new(upper(1), 0, 6).with_master(true),
            ],
            vec![binding(upper(0), lower(0), 1), binding(lower(0), upper(0), 2)],
        )?,
        level(
            vec![
                TumblerConfig::new(upper(0), 0, 4),
                TumblerConfig::new(lower(0), 0, 6),
                TumblerConfig::new(upper(1), 0, 8).with_master(true),
            ],
            vec![binding(upper(0), lower(0), 2)],
        )?,
        level(
            vec![
                TumblerConfig::new(upper(0), 0, 4),
                TumblerConfig::new(lower(0), 0, 6).with_post_release_height(-3),
                TumblerConfig::new(upper(1), 0, 7).with_post_release_height(-3),
                TumblerConfig::new(lower(1), 0, 4).with_master(true),
            ],
            vec![binding(upper(0), upper(1), -1), binding(upper(1), upper(0), 2)],
        )?,
        level(
            vec![
                TumblerConfig::new(upper(0), 0, 3),
                TumblerConfig::new(lower(0), 0, 4),
                TumblerConfig::new(upper(1), 0, 5).with_post_release_height(-1),
                TumblerConfig::new(lower(1), 0, 6).with_post_release_height(-2),
                TumblerConfig::new(upper(2), 0, 7).with_master(true),
            ],
            vec![
                binding(upper(0), lower(0), 3),
                binding(upper(0), upper(1), -1),
                binding(upper(0), lower(1), -1),
                binding(lower(0), upper(1), -1),
                binding(lower(1), upper(0), 2),
            ],
        )?,
    ])
}

/// Resolves a built-in level by name: `demo`, `showcase` or `tutorial-N`
/// (1-based).
pub fn builtin_level(name: &str) -> Option<Result<Level>> {
    match name {
        "demo" => Some(demo_level()),
        "showcase" => Some(showcase_level()),
        _ => {
            let index = name.strip_prefix("tutorial-")?.parse::<usize>().ok()?;
            match tutorial_levels() {
                Ok(levels) => levels.into_iter().nth(index.checked_sub(1)?).map(Ok),
                Err(err) => Some(Err(err)),
            }
        }
    }
}

fn binding(from: Location, to: Location, difference: Height) -> Binding {
    Binding {
        from,
        to,
        difference,
    }
}
