use std::thread;
use std::time::Duration;

use cozy_chess::{Board, Move};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::Settings;
use crate::moves;
use crate::analysis::STARTUP_TIMEOUT;
use crate::uci::{SearchLimit, SharedEngine, Startup};
use crate::worker::{Pending, Poll};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlayerKind {
    Human,
    Engine,
}

// ────────────────────────────────────────────────────────────────────────────────
// Difficulty
// ────────────────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tier {
    Beginner,
    Intermediate,
    Advanced,
}

/// AI strength on a 1 (easy) to 20 (hard) scale.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Difficulty(u8);

impl Default for Difficulty {
    fn default() -> Self {
        Self(10)
    }
}

impl Difficulty {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 20;

    pub fn new(level: u8) -> Self {
        Self(level.clamp(Self::MIN, Self::MAX))
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Search depth: gentle at the bottom, one ply per level above.
    pub fn depth(self) -> u32 {
        let d = u32::from(self.0);
        match d {
            ..=5 => 1 + d,
            6..=10 => 6 + (d - 5),
            _ => 11 + (d - 10),
        }
    }

    /// Target rating when strength is limited.
    pub fn elo(self) -> u32 {
        let d = u32::from(self.0);
        match d {
            ..=5 => 800 + (d - 1) * 50,
            6..=10 => 1000 + (d - 5) * 100,
            11..=15 => 1500 + (d - 10) * 150,
            _ => 2250 + (d - 15) * 50,
        }
    }

    pub fn skill_level(self) -> u8 {
        // floor((d - 1) * 1.2) without float rounding surprises
        let skill = (u32::from(self.0) - 1) * 6 / 5;
        skill.min(20) as u8
    }

    pub fn tier(self) -> Tier {
        match self.0 {
            ..=8 => Tier::Beginner,
            9..=16 => Tier::Intermediate,
            _ => Tier::Advanced,
        }
    }

    /// Chance of ignoring the engine and playing any legal move.
    pub fn random_move_chance(self) -> f64 {
        if self.tier() != Tier::Beginner {
            return 0.0;
        }
        (0.56 - 0.06 * f64::from(self.0)).max(0.0)
    }

    /// UCI options for this level, in the order they are sent.
    pub fn engine_options(self) -> Vec<(&'static str, String)> {
        let mut options = vec![("Threads", "1".to_owned())];
        match self.tier() {
            Tier::Beginner | Tier::Intermediate => {
                options.push(("Skill Level", self.skill_level().to_string()));
                options.push(("UCI_LimitStrength", "true".to_owned()));
                options.push(("UCI_Elo", self.elo().to_string()));
            }
            Tier::Advanced => {
                options.push(("Skill Level", "20".to_owned()));
                options.push(("UCI_LimitStrength", "false".to_owned()));
            }
        }
        options
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Move choice
// ────────────────────────────────────────────────────────────────────────────────

/// Pick the AI move. `search` asks the engine and returns its UCI move text;
/// an engine answer that is missing or illegal falls back to a random move.
pub fn select_move<R: Rng>(
    board: &Board,
    difficulty: Difficulty,
    rng: &mut R,
    search: impl FnOnce(&Board) -> Option<String>,
) -> Option<Move> {
    let legal = moves::legal_moves(board);
    if legal.is_empty() {
        return None;
    }
    if rng.gen_bool(difficulty.random_move_chance()) {
        log::debug!("level {} plays a random move", difficulty.level());
        return legal.choose(rng).copied();
    }
    if let Some(mv) = search(board).and_then(|text| moves::from_uci(board, &text)) {
        return Some(mv);
    }
    log::warn!("no usable engine move, playing a random one");
    legal.choose(rng).copied()
}

/// Answer from the AI worker, tagged with the position it was computed for.
#[derive(Debug)]
pub struct Reply {
    pub fen: String,
    pub mv: Option<Move>,
}

pub struct EnginePlayer {
    engine: Option<SharedEngine>,
    startup: Option<Startup>,
    difficulty: Difficulty,
    delay: Duration,
    pending: Option<Pending<Reply>>,
}

impl EnginePlayer {
    /// Launch and configure the opponent engine in the background. Without
    /// one the AI still plays, choosing random legal moves.
    pub fn start(settings: &Settings, difficulty: Difficulty) -> Self {
        let startup = Startup::process(&settings.engine_path, STARTUP_TIMEOUT, move |engine| {
            for (name, value) in difficulty.engine_options() {
                engine.set_option(name, value)?;
            }
            engine.new_game()?;
            log::info!(
                "AI level {} ({:?}, depth {})",
                difficulty.level(),
                difficulty.tier(),
                difficulty.depth()
            );
            Ok(())
        });
        Self::starting(startup, difficulty, settings.ai_delay)
    }

    pub fn starting(startup: Startup, difficulty: Difficulty, delay: Duration) -> Self {
        Self {
            startup: Some(startup),
            ..Self::with_engine(None, difficulty, delay)
        }
    }

    pub fn with_engine(engine: Option<SharedEngine>, difficulty: Difficulty, delay: Duration) -> Self {
        Self {
            engine,
            startup: None,
            difficulty,
            delay,
            pending: None,
        }
    }

    /// Busy while the engine starts up or a move is being chosen.
    pub fn is_thinking(&self) -> bool {
        self.pending.is_some() || self.startup.is_some()
    }

    fn poll_startup(&mut self) {
        let Some(startup) = self.startup.as_ref() else {
            return;
        };
        match startup.poll() {
            Poll::Waiting => return,
            Poll::Ready(Ok(engine)) => self.engine = Some(engine),
            Poll::Ready(Err(e)) => {
                log::warn!("AI engine unavailable, falling back to random moves: {e}");
            }
            Poll::Lost => log::warn!("AI engine startup stopped, falling back to random moves"),
        }
        self.startup = None;
    }

    /// Start thinking about `board`. Returns false while busy.
    pub fn request(&mut self, board: &Board) -> bool {
        self.poll_startup();
        if self.is_thinking() {
            return false;
        }
        let engine = self.engine.clone();
        let difficulty = self.difficulty;
        let delay = self.delay;
        let board = board.clone();
        self.pending = Some(Pending::spawn(move || {
            thread::sleep(delay);
            let fen = board.to_string();
            let mut rng = SmallRng::from_entropy();
            let mv = select_move(&board, difficulty, &mut rng, |b| {
                let engine = engine?;
                let mut engine = engine.lock().ok()?;
                match engine.search(&b.to_string(), SearchLimit::Depth(difficulty.depth())) {
                    Ok(result) => result.best_move,
                    Err(e) => {
                        log::warn!("AI search failed: {e}");
                        None
                    }
                }
            });
            Reply { fen, mv }
        }));
        true
    }

    pub fn poll(&mut self) -> Option<Reply> {
        self.poll_startup();
        let reply = match self.pending.as_ref()?.poll() {
            Poll::Waiting => return None,
            Poll::Ready(reply) => Some(reply),
            Poll::Lost => {
                log::error!("AI worker stopped without answering");
                None
            }
        };
        self.pending = None;
        reply
    }

    /// Forget an outstanding request (after undo or leaving the game).
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}
