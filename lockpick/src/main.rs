use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use lockpick::agent::play_random_games_with_options;
use lockpick::demo::{builtin_level, demo_level};
use lockpick::level_file;
use lockpick::settings::SettingsStore;

const GAMES: usize = 500;
const MAX_MOVES: usize = 64;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = SettingsStore::from_env().load();
    let mut args = std::env::args_os().skip(1);

    let level = match args.next() {
        Some(arg) => {
            let name = arg.to_string_lossy().into_owned();
            match builtin_level(&name) {
                Some(level) => level.context("building built-in level")?,
                None => {
                    let path = PathBuf::from(arg);
                    level_file::load(&path)
                        .with_context(|| format!("loading level {}", path.display()))?
                }
            }
        }
        None => demo_level().context("building demo level")?,
    };
    let seed = match args.next() {
        Some(seed) => seed
            .to_string_lossy()
            .parse::<u64>()
            .context("seed must be an unsigned integer")?,
        None => 0,
    };

    println!(
        "level: {} tumblers, {} bindings, {} picks",
        level.tumblers().len(),
        level.binding_count(),
        level.number_of_picks()
    );

    match play_random_games_with_options(&level, settings.lock_options(), GAMES, MAX_MOVES, seed)? {
        Some(actions) => {
            println!("opened in {} moves:", actions.len());
            for action in actions {
                println!("  {action:?}");
            }
        }
        None => println!("no opening found in {GAMES} games of {MAX_MOVES} moves"),
    }
    Ok(())
}
