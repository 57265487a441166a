use std::time::Duration;

use cozy_chess::{Board, Color, Move};

use crate::config::Settings;
use crate::error::EngineError;
use crate::moves;
use crate::uci::{Score, SearchLimit, SearchResult, SharedEngine, Startup};
use crate::worker::{Pending, Poll};

/// Engine verdict on one position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    /// Always from White's point of view.
    pub score: Score,
    pub best_move: Option<Move>,
    pub depth: u32,
}

impl Evaluation {
    pub fn from_search(board: &Board, result: &SearchResult) -> Self {
        let score = result.score.unwrap_or(Score::Centipawns(0));
        let score = match board.side_to_move() {
            Color::White => score,
            Color::Black => score.negate(),
        };
        Self {
            score,
            best_move: result
                .best_move
                .as_deref()
                .and_then(|m| moves::from_uci(board, m)),
            depth: result.depth,
        }
    }

    pub fn score_text(&self) -> String {
        match self.score {
            Score::Centipawns(_) => self.score.to_string(),
            Score::Mate(0) => "Checkmate".to_owned(),
            Score::Mate(n) if n > 0 => format!("White mates in {n}"),
            Score::Mate(n) => format!("Black mates in {}", -n),
        }
    }
}

/// Result handed back to the UI, tagged with the position it belongs to.
#[derive(Debug)]
pub struct Finished {
    pub ply: usize,
    pub fen: String,
    pub evaluation: Evaluation,
}

struct Request {
    ply: usize,
    fen: String,
    pending: Pending<Result<Evaluation, EngineError>>,
}

/// How long an engine may take to answer the `uci`/`isready` handshake.
pub const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Evaluation panel backend. Without an engine it stays permanently off.
pub struct Analysis {
    engine: Option<SharedEngine>,
    startup: Option<Startup>,
    enabled: bool,
    depth: u32,
    request: Option<Request>,
}

impl Analysis {
    /// Launch the engine in the background; the panel shows "Analysing..."
    /// until it is ready.
    pub fn start(settings: &Settings) -> Self {
        let startup = Startup::process(&settings.engine_path, STARTUP_TIMEOUT, |_| Ok(()));
        Self::starting(startup, settings.analysis_depth, settings.analysis_on_start)
    }

    pub fn starting(startup: Startup, depth: u32, enabled: bool) -> Self {
        Self {
            engine: None,
            startup: Some(startup),
            enabled,
            depth,
            request: None,
        }
    }

    pub fn with_engine(engine: SharedEngine, depth: u32, enabled: bool) -> Self {
        Self {
            engine: Some(engine),
            startup: None,
            enabled,
            depth,
            request: None,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            engine: None,
            startup: None,
            enabled: false,
            depth: 0,
            request: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.engine.is_some() || self.startup.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_busy(&self) -> bool {
        self.request.is_some() || self.startup.is_some()
    }

    pub fn toggle(&mut self) {
        if self.is_available() {
            self.enabled = !self.enabled;
            log::debug!("analysis {}", if self.enabled { "on" } else { "off" });
        }
    }

    /// Start evaluating `board` (the position at `ply`). Only one search runs at
    /// a time; returns false when nothing was started.
    pub fn request(&mut self, ply: usize, board: &Board) -> bool {
        if !self.enabled || self.request.is_some() {
            return false;
        }
        let Some(engine) = self.engine.clone() else {
            return false;
        };
        let fen = board.to_string();
        let board = board.clone();
        let limit = SearchLimit::Depth(self.depth);
        let job_fen = fen.clone();
        let pending = Pending::spawn(move || -> Result<Evaluation, EngineError> {
            let mut engine = engine.lock().map_err(|_| EngineError::WorkerGone)?;
            let result = engine.search(&job_fen, limit)?;
            Ok(Evaluation::from_search(&board, &result))
        });
        log::debug!("analysing ply {ply}: {fen}");
        self.request = Some(Request { ply, fen, pending });
        true
    }

    fn poll_startup(&mut self) {
        let Some(startup) = self.startup.as_ref() else {
            return;
        };
        match startup.poll() {
            Poll::Waiting => return,
            Poll::Ready(Ok(engine)) => {
                log::info!("analysis engine ready");
                self.engine = Some(engine);
            }
            Poll::Ready(Err(e)) => {
                log::warn!("analysis unavailable: {e}");
                self.enabled = false;
            }
            Poll::Lost => {
                log::warn!("analysis unavailable: engine startup stopped");
                self.enabled = false;
            }
        }
        self.startup = None;
    }

    /// Collect a finished search, if any. A failing engine switches analysis
    /// off for the rest of the game.
    pub fn poll(&mut self) -> Option<Finished> {
        self.poll_startup();
        let request = self.request.as_ref()?;
        let outcome = match request.pending.poll() {
            Poll::Waiting => return None,
            Poll::Ready(r) => r,
            Poll::Lost => Err(EngineError::WorkerGone),
        };
        let Request { ply, fen, .. } = self.request.take()?;
        match outcome {
            Ok(evaluation) => Some(Finished {
                ply,
                fen,
                evaluation,
            }),
            Err(e) => {
                log::error!("analysis failed: {e}");
                self.engine = None;
                self.enabled = false;
                None
            }
        }
    }
}
