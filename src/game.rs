//! Turn bookkeeping on top of cozy-chess: selection, promotion choice, undo,
//! and deciding when the game is over.

use std::fmt;

use cozy_chess::{Board, Color, GameStatus, Move, Piece, Square};

use crate::history::GameRecord;
use crate::moves;
use crate::player::PlayerKind;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TurnState {
    // No more moves.
    GameOver,

    // Human: picking the piece for a pawn reaching the last rank.
    AwaitingPromotion,

    // Engine to move.
    EngineThinking,

    // Human: waiting for source square.
    AwaitSource,

    // Human: waiting for destination square (after showing targets).
    AwaitDestination,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
    ThreefoldRepetition,
    FiftyMoveRule,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Checkmate {
                winner: Color::White,
            } => write!(f, "Checkmate! White wins!"),
            Outcome::Checkmate {
                winner: Color::Black,
            } => write!(f, "Checkmate! Black wins!"),
            Outcome::Stalemate => write!(f, "Stalemate!"),
            Outcome::InsufficientMaterial => write!(f, "Draw by insufficient material!"),
            Outcome::ThreefoldRepetition => write!(f, "Draw by threefold repetition!"),
            Outcome::FiftyMoveRule => write!(f, "Draw by fifty-move rule!"),
        }
    }
}

/// Neither side can mate: bare kings, a single minor piece, or only bishops
/// that all stand on squares of one colour.
pub fn insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }
    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    if knights.len() + bishops.len() <= 1 {
        return true;
    }
    if !knights.is_empty() {
        return false;
    }
    let mut shades = bishops.into_iter().map(|sq| (sq.file() as usize + sq.rank() as usize) % 2);
    let first = shades.next();
    shades.all(|s| Some(s) == first)
}

pub fn outcome(record: &GameRecord) -> Option<Outcome> {
    let board = record.board();
    match board.status() {
        GameStatus::Won => {
            return Some(Outcome::Checkmate {
                winner: !board.side_to_move(),
            });
        }
        GameStatus::Drawn => {
            return Some(if moves::has_legal_move(board) {
                Outcome::FiftyMoveRule
            } else {
                Outcome::Stalemate
            });
        }
        GameStatus::Ongoing => {}
    }
    if insufficient_material(board) {
        Some(Outcome::InsufficientMaterial)
    } else if record.repetitions() >= 3 {
        Some(Outcome::ThreefoldRepetition)
    } else {
        None
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    Ignored,
    Selected,
    AwaitingPromotion,
    Moved(Move),
}

pub struct GameController {
    record: GameRecord,
    players: [PlayerKind; 2],
    selected: Option<Square>,
    selected_moves: Vec<Move>,
    promotion: Option<(Square, Square)>,
    outcome: Option<Outcome>,
}

impl GameController {
    pub fn new(white: PlayerKind, black: PlayerKind) -> Self {
        Self::from_record(GameRecord::default(), white, black)
    }

    pub fn from_record(record: GameRecord, white: PlayerKind, black: PlayerKind) -> Self {
        let outcome = outcome(&record);
        Self {
            record,
            players: [white, black],
            selected: None,
            selected_moves: Vec::new(),
            promotion: None,
            outcome,
        }
    }

    pub fn record(&self) -> &GameRecord {
        &self.record
    }

    pub fn board(&self) -> &Board {
        self.record.board()
    }

    pub fn fen(&self) -> String {
        self.record.board().to_string()
    }

    pub fn side_to_move(&self) -> Color {
        self.board().side_to_move()
    }

    pub fn player(&self, color: Color) -> PlayerKind {
        self.players[color as usize]
    }

    fn human_to_move(&self) -> bool {
        self.player(self.side_to_move()) == PlayerKind::Human
    }

    pub fn is_engine_turn(&self) -> bool {
        self.outcome.is_none() && !self.human_to_move()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn result_text(&self) -> Option<String> {
        self.outcome().map(|o| o.to_string())
    }

    pub fn selected(&self) -> Option<Square> {
        self.selected
    }

    /// Destination squares of the selected piece, as shown on the board.
    pub fn legal_targets(&self) -> Vec<Square> {
        self.selected_moves
            .iter()
            .map(|&mv| moves::display_target(self.board(), mv))
            .collect()
    }

    pub fn awaiting_promotion(&self) -> bool {
        self.promotion.is_some()
    }

    pub fn turn_state(&self) -> TurnState {
        if self.outcome.is_some() {
            TurnState::GameOver
        } else if self.promotion.is_some() {
            TurnState::AwaitingPromotion
        } else if !self.human_to_move() {
            TurnState::EngineThinking
        } else if self.selected.is_some() {
            TurnState::AwaitDestination
        } else {
            TurnState::AwaitSource
        }
    }

    fn select(&mut self, square: Square) {
        self.selected = Some(square);
        self.selected_moves = moves::moves_from(self.board(), square);
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.selected_moves.clear();
    }

    fn play(&mut self, mv: Move) -> bool {
        if !self.record.push(mv) {
            return false;
        }
        self.clear_selection();
        self.outcome = outcome(&self.record);
        if let Some(o) = self.outcome {
            log::info!("game over after {} plies: {o}", self.record.len());
        }
        true
    }

    pub fn handle_click(&mut self, square: Square) -> ClickOutcome {
        match self.turn_state() {
            TurnState::AwaitSource => {
                self.select(square);
                ClickOutcome::Selected
            }
            TurnState::AwaitDestination => {
                let Some(from) = self.selected else {
                    return ClickOutcome::Ignored;
                };
                let board = self.board();
                if moves::is_promotion_square(board, from, square)
                    && [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight]
                        .into_iter()
                        .any(|p| moves::resolve(board, from, square, Some(p)).is_some())
                {
                    self.promotion = Some((from, square));
                    return ClickOutcome::AwaitingPromotion;
                }
                match moves::resolve(board, from, square, None) {
                    Some(mv) if self.play(mv) => ClickOutcome::Moved(mv),
                    _ => {
                        self.select(square);
                        ClickOutcome::Selected
                    }
                }
            }
            _ => ClickOutcome::Ignored,
        }
    }

    /// Finish a pending promotion with `piece`. The dialog closes either way.
    pub fn choose_promotion(&mut self, piece: Piece) -> Option<Move> {
        let (from, to) = self.promotion.take()?;
        match moves::resolve(self.board(), from, to, Some(piece)) {
            Some(mv) if self.play(mv) => Some(mv),
            _ => {
                self.clear_selection();
                None
            }
        }
    }

    pub fn apply_engine_move(&mut self, mv: Move) -> bool {
        if !self.is_engine_turn() {
            return false;
        }
        self.play(mv)
    }

    /// Take back the last move. Against the engine, keep taking back until a
    /// human is to move again.
    pub fn undo_last_move(&mut self) -> bool {
        if self.outcome.is_some() || self.promotion.is_some() || self.record.is_empty() {
            return false;
        }
        self.record.pop();
        while !self.human_to_move() && !self.record.is_empty() {
            self.record.pop();
        }
        self.clear_selection();
        self.outcome = outcome(&self.record);
        true
    }
}
