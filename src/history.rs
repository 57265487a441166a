//! Move list, per-ply evaluations and the replay cursor.
//!
//! Ply `n` is the position after the first `n` moves; ply 0 is the initial
//! position. Historical boards are never stored, they are rebuilt by replaying
//! the move list from the initial board.

use cozy_chess::{Board, Move};

use crate::analysis::Evaluation;
use crate::moves;

#[derive(Clone, Debug)]
pub struct GameRecord {
    initial: Board,
    moves: Vec<Move>,
    live: Board,
}

impl Default for GameRecord {
    fn default() -> Self {
        Self::new(Board::default())
    }
}

impl GameRecord {
    pub fn new(initial: Board) -> Self {
        Self {
            live: initial.clone(),
            initial,
            moves: Vec::new(),
        }
    }

    /// The current (live) position.
    pub fn board(&self) -> &Board {
        &self.live
    }

    /// Number of plies played.
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Play a legal move. Returns false and leaves the record untouched for an
    /// illegal one.
    pub fn push(&mut self, mv: Move) -> bool {
        if self.live.try_play(mv).is_err() {
            return false;
        }
        self.moves.push(mv);
        true
    }

    pub fn pop(&mut self) -> Option<Move> {
        let mv = self.moves.pop()?;
        self.live = self.replay(self.moves.len());
        Some(mv)
    }

    /// Position after `ply` moves, clamped to the live position.
    pub fn board_at(&self, ply: usize) -> Board {
        if ply >= self.moves.len() {
            return self.live.clone();
        }
        self.replay(ply)
    }

    fn replay(&self, plies: usize) -> Board {
        let mut board = self.initial.clone();
        for &mv in &self.moves[..plies] {
            board.play_unchecked(mv);
        }
        board
    }

    pub fn fen_at(&self, ply: usize) -> String {
        self.board_at(ply).to_string()
    }

    /// The move that produced position `ply`.
    pub fn move_into(&self, ply: usize) -> Option<Move> {
        ply.checked_sub(1).and_then(|i| self.moves.get(i).copied())
    }

    /// The game so far in UCI notation (standard castling).
    pub fn uci_moves(&self) -> Vec<String> {
        let mut board = self.initial.clone();
        self.moves
            .iter()
            .map(|&mv| {
                let text = moves::to_uci(&board, mv);
                board.play_unchecked(mv);
                text
            })
            .collect()
    }

    /// How many positions in the game, the live one included, repeat the live
    /// position.
    pub fn repetitions(&self) -> usize {
        let mut board = self.initial.clone();
        let mut count = usize::from(board.same_position(&self.live));
        for &mv in &self.moves {
            board.play_unchecked(mv);
            if board.same_position(&self.live) {
                count += 1;
            }
        }
        count
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Per-ply evaluations
// ────────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
pub struct EvaluationCache {
    entries: Vec<Option<Evaluation>>,
}

impl EvaluationCache {
    /// Store an engine result for `ply`. Results computed for a position that
    /// is no longer at that ply (the move was undone meanwhile) are dropped.
    pub fn insert(&mut self, record: &GameRecord, ply: usize, fen: &str, eval: Evaluation) -> bool {
        if ply > record.len() || record.fen_at(ply) != fen {
            log::debug!("dropping stale evaluation for ply {ply}");
            return false;
        }
        if self.entries.len() <= ply {
            self.entries.resize(ply + 1, None);
        }
        self.entries[ply] = Some(eval);
        true
    }

    pub fn get(&self, ply: usize) -> Option<&Evaluation> {
        self.entries.get(ply).and_then(Option::as_ref)
    }

    pub fn contains(&self, ply: usize) -> bool {
        self.get(ply).is_some()
    }

    /// Forget everything past `plies` (call after undo).
    pub fn truncate(&mut self, plies: usize) {
        self.entries.truncate(plies + 1);
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Replay cursor
// ────────────────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Replay {
    // None follows the live position.
    cursor: Option<usize>,
}

impl Replay {
    pub fn is_live(&self) -> bool {
        self.cursor.is_none()
    }

    pub fn viewed_ply(&self, len: usize) -> usize {
        self.cursor.map_or(len, |c| c.min(len))
    }

    pub fn back(&mut self, len: usize) {
        let ply = self.viewed_ply(len);
        if ply > 0 {
            self.cursor = Some(ply - 1);
        }
    }

    pub fn forward(&mut self, len: usize) {
        if let Some(c) = self.cursor {
            self.cursor = if c + 1 >= len { None } else { Some(c + 1) };
        }
    }

    pub fn to_start(&mut self, len: usize) {
        if len > 0 {
            self.cursor = Some(0);
        }
    }

    pub fn to_live(&mut self) {
        self.cursor = None;
    }

    /// Keep the cursor inside the record after it shrank.
    pub fn clamp(&mut self, len: usize) {
        if matches!(self.cursor, Some(c) if c >= len) {
            self.cursor = None;
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HighlightKind {
    Played,
    Best,
}

/// Moves to mark while showing `ply`: the move that led there, and what the
/// engine preferred in the position before it. Both are expressed on the board
/// they were played from.
pub fn highlights(record: &GameRecord, cache: &EvaluationCache, ply: usize) -> Vec<(HighlightKind, Board, Move)> {
    let Some(played) = record.move_into(ply) else {
        return Vec::new();
    };
    let before = record.board_at(ply - 1);
    let mut out = vec![(HighlightKind::Played, before.clone(), played)];
    if let Some(best) = cache.get(ply - 1).and_then(|e| e.best_move) {
        out.push((HighlightKind::Best, before, best));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::Score;
    use cozy_chess::Square;
    use pretty_assertions::assert_eq;

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    fn eval(best: Option<Move>) -> Evaluation {
        Evaluation {
            score: Score::Centipawns(20),
            best_move: best,
            depth: 10,
        }
    }

    fn opening() -> GameRecord {
        let mut r = GameRecord::default();
        for m in ["e2e4", "e7e5", "g1f3"] {
            assert!(r.push(mv(m)));
        }
        r
    }

    #[test]
    fn replaying_rebuilds_past_positions() {
        let r = opening();
        assert_eq!(r.len(), 3);
        assert_eq!(r.board_at(0).to_string(), Board::default().to_string());
        assert!(
            r.fen_at(2)
                .starts_with("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq")
        );
        assert_eq!(r.board_at(3).to_string(), r.board().to_string());
        // Past the end clamps to live.
        assert_eq!(r.board_at(99).to_string(), r.board().to_string());
    }

    #[test]
    fn illegal_push_is_rejected() {
        let mut r = GameRecord::default();
        assert!(!r.push(mv("e2e5")));
        assert!(r.is_empty());
    }

    #[test]
    fn pop_restores_previous_position() {
        let mut r = opening();
        assert_eq!(r.pop(), Some(mv("g1f3")));
        assert_eq!(r.board().to_string(), r.fen_at(2));
        assert_eq!(r.board().piece_on(Square::G1), Some(cozy_chess::Piece::Knight));
        assert_eq!(r.board().side_to_move(), cozy_chess::Color::White);
        r.pop();
        r.pop();
        assert!(r.board().same_position(&Board::default()));
        assert_eq!(r.pop(), None);
    }

    #[test]
    fn move_into_indexes_by_ply() {
        let r = opening();
        assert_eq!(r.move_into(0), None);
        assert_eq!(r.move_into(1), Some(mv("e2e4")));
        assert_eq!(r.move_into(3), Some(mv("g1f3")));
        assert_eq!(r.move_into(4), None);
    }

    #[test]
    fn uci_moves_use_standard_castling() {
        let mut r = GameRecord::new(
            Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", false).unwrap(),
        );
        assert!(r.push(mv("e1h1")));
        assert!(r.push(mv("e8a8")));
        assert_eq!(r.uci_moves(), vec!["e1g1", "e8c8"]);
    }

    #[test]
    fn knight_shuffle_repeats_position() {
        let mut r = GameRecord::default();
        assert_eq!(r.repetitions(), 1);
        for _ in 0..2 {
            for m in ["g1f3", "g8f6", "f3g1", "f6g8"] {
                assert!(r.push(mv(m)));
            }
        }
        assert_eq!(r.repetitions(), 3);
    }

    #[test]
    fn cache_drops_stale_results() {
        let mut r = opening();
        let mut cache = EvaluationCache::default();
        let fen3 = r.fen_at(3);
        assert!(cache.insert(&r, 3, &fen3, eval(None)));
        assert!(cache.contains(3));

        r.pop();
        cache.truncate(r.len());
        assert!(!cache.contains(3));

        // A result for the undone position arriving late is ignored.
        assert!(!cache.insert(&r, 3, &fen3, eval(None)));
        // So is one whose position differs from the record at that ply.
        r.push(mv("b1c3"));
        assert!(!cache.insert(&r, 3, &fen3, eval(None)));
        assert!(!cache.contains(3));
    }

    #[test]
    fn cache_fills_sparse_plies() {
        let r = opening();
        let mut cache = EvaluationCache::default();
        assert!(cache.insert(&r, 2, &r.fen_at(2), eval(None)));
        assert!(!cache.contains(0));
        assert!(!cache.contains(1));
        assert!(cache.contains(2));
    }

    #[test]
    fn replay_walks_back_and_returns_to_live() {
        let mut replay = Replay::default();
        assert!(replay.is_live());
        assert_eq!(replay.viewed_ply(3), 3);

        replay.back(3);
        replay.back(3);
        assert_eq!(replay.viewed_ply(3), 1);
        replay.back(3);
        replay.back(3);
        assert_eq!(replay.viewed_ply(3), 0);

        replay.forward(3);
        replay.forward(3);
        assert_eq!(replay.viewed_ply(3), 2);
        replay.forward(3);
        assert!(replay.is_live());
        // Forward while live is a no-op.
        replay.forward(3);
        assert!(replay.is_live());
    }

    #[test]
    fn replay_on_empty_game_stays_live() {
        let mut replay = Replay::default();
        replay.back(0);
        replay.to_start(0);
        assert!(replay.is_live());
    }

    #[test]
    fn replay_clamps_after_undo() {
        let mut replay = Replay::default();
        replay.to_start(5);
        replay.forward(5);
        replay.forward(5);
        replay.forward(5);
        assert_eq!(replay.viewed_ply(5), 3);
        replay.clamp(3);
        assert!(replay.is_live());
    }

    #[test]
    fn highlights_pair_played_and_best() {
        let r = opening();
        let mut cache = EvaluationCache::default();
        assert!(highlights(&r, &cache, 0).is_empty());

        let only_played = highlights(&r, &cache, 2);
        assert_eq!(only_played.len(), 1);
        assert_eq!(only_played[0].0, HighlightKind::Played);
        assert_eq!(only_played[0].2, mv("e7e5"));

        cache.insert(&r, 1, &r.fen_at(1), eval(Some(mv("c7c5"))));
        let both = highlights(&r, &cache, 2);
        assert_eq!(
            both.iter().map(|(k, _, m)| (*k, *m)).collect::<Vec<_>>(),
            vec![(HighlightKind::Played, mv("e7e5")), (HighlightKind::Best, mv("c7c5"))]
        );
    }
}
