use crate::error::Result;
use crate::level::Level;
use crate::lock::{Lock, LockOptions};
use crate::playtest::{LockAction, apply_action};

/// xorshift64* generator; deterministic per seed so agent runs replay.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        let seed = if seed == 0 {
            0x9E37_79B9_7F4A_7C15
        } else {
            seed
        };
        Self { state: seed }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        (x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 32) as u32
    }

    /// Uniform-ish index below `len`; `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.next_u32() as usize % len
    }
}

/// Every action the agent may take from the current state.
pub fn legal_actions(lock: &Lock) -> Vec<LockAction> {
    let mut actions: Vec<LockAction> = lock
        .get_possible_moves()
        .into_iter()
        .map(LockAction::Push)
        .collect();
    if lock.number_of_picks() > 1 {
        actions.push(LockAction::ChangePick);
    }
    if lock.get_pick(lock.current_pick()).is_some() {
        actions.push(LockAction::Release);
    }
    actions
}

/// Plays one uniformly chosen legal action. Returns `None` when nothing is legal.
pub fn play_random_move(lock: &mut Lock, rng: &mut Rng) -> Result<Option<LockAction>> {
    let actions = legal_actions(lock);
    if actions.is_empty() {
        return Ok(None);
    }
    let action = actions[rng.index(actions.len())];
    apply_action(lock, action)?;
    Ok(Some(action))
}

/// Runs up to `games` random playthroughs of `max_moves` each and returns the
/// action sequence of the first one that opens the lock.
pub fn play_random_games(
    level: &Level,
    games: usize,
    max_moves: usize,
    seed: u64,
) -> Result<Option<Vec<LockAction>>> {
    play_random_games_with_options(level, LockOptions::default(), games, max_moves, seed)
}

pub fn play_random_games_with_options(
    level: &Level,
    options: LockOptions,
    games: usize,
    max_moves: usize,
    seed: u64,
) -> Result<Option<Vec<LockAction>>> {
    let mut lock = Lock::with_options(level.pristine(), options)?;
    let mut rng = Rng::new(seed);

    for game in 0..games {
        lock.reset();
        let mut actions = Vec::new();
        for _ in 0..max_moves {
            if lock.check_win() {
                break;
            }
            match play_random_move(&mut lock, &mut rng)? {
                Some(action) => actions.push(action),
                None => break,
            }
        }
        if lock.check_win() {
            tracing::info!(game, moves = actions.len(), "random agent opened the lock");
            return Ok(Some(actions));
        }
        tracing::debug!(game, "random game ended without a win");
    }
    Ok(None)
}
