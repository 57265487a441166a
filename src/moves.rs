//! Glue between cozy-chess moves and the notation the rest of the world uses.
//!
//! cozy-chess encodes castling as "king takes own rook" (e1h1). UCI engines
//! and people clicking on the board expect the king's two-square move (e1g1),
//! so every move crossing that boundary goes through here.

use cozy_chess::{Board, Color, File, Move, Piece, Rank, Square};

/// Every legal move in the position.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|piece_moves| {
        moves.extend(piece_moves);
        false
    });
    moves
}

/// Legal moves of the piece standing on `from` (empty for an empty square or
/// a piece of the side not to move).
pub fn moves_from(board: &Board, from: Square) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves_for(from.bitboard(), |piece_moves| {
        moves.extend(piece_moves);
        false
    });
    moves
}

pub fn has_legal_move(board: &Board) -> bool {
    board.generate_moves(|_| true)
}

fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move())
}

/// The square a move lands on as a player sees it.
pub fn display_target(board: &Board, mv: Move) -> Square {
    if is_castling(board, mv) {
        let file = if (mv.to.file() as usize) > (mv.from.file() as usize) {
            File::G
        } else {
            File::C
        };
        Square::new(file, mv.from.rank())
    } else {
        mv.to
    }
}

/// UCI long algebraic notation with standard castling.
pub fn to_uci(board: &Board, mv: Move) -> String {
    let to = display_target(board, mv);
    match mv.promotion {
        Some(p) => format!("{}{}{}", mv.from, to, piece_char(p)),
        None => format!("{}{}", mv.from, to),
    }
}

/// Rank a pawn of `color` promotes on.
pub fn promotion_rank(color: Color) -> Rank {
    match color {
        Color::White => Rank::Eighth,
        Color::Black => Rank::First,
    }
}

pub fn is_promotion_square(board: &Board, from: Square, to: Square) -> bool {
    board.piece_on(from) == Some(Piece::Pawn)
        && board.color_on(from) == Some(board.side_to_move())
        && to.rank() == promotion_rank(board.side_to_move())
}

/// Library encoding of the king's two-square castling move, if the board
/// allows castling on that wing.
fn castle_move(board: &Board, from: Square, to: Square) -> Option<Move> {
    let side = board.side_to_move();
    if board.piece_on(from) != Some(Piece::King) || board.color_on(from) != Some(side) {
        return None;
    }
    if from.rank() != to.rank() || (from.file() as i32 - to.file() as i32).abs() != 2 {
        return None;
    }
    let rights = board.castle_rights(side);
    let rook_file = if (to.file() as usize) > (from.file() as usize) {
        rights.short
    } else {
        rights.long
    }?;
    let mv = Move {
        from,
        to: Square::new(rook_file, from.rank()),
        promotion: None,
    };
    board.is_legal(mv).then_some(mv)
}

/// Legal move from `from` to `to` as the user sees it, if there is one.
pub fn resolve(board: &Board, from: Square, to: Square, promotion: Option<Piece>) -> Option<Move> {
    let mv = Move {
        from,
        to,
        promotion,
    };
    if board.is_legal(mv) {
        return Some(mv);
    }
    if promotion.is_none() {
        return castle_move(board, from, to);
    }
    None
}

/// Parse an engine move. A pawn reaching the last rank without a suffix is
/// promoted to a queen.
pub fn from_uci(board: &Board, text: &str) -> Option<Move> {
    let mv: Move = text.trim().parse().ok()?;
    let promotion = match mv.promotion {
        None if is_promotion_square(board, mv.from, mv.to) => Some(Piece::Queen),
        p => p,
    };
    resolve(board, mv.from, mv.to, promotion)
}

pub fn piece_char(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}
