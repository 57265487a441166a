//! Mapping between board squares and screen positions.
//!
//! Screen cells are addressed as (col, row) with row 0 at the top. The side
//! in `bottom` sits on rows 6 and 7; with Black at the bottom the whole board
//! is turned by 180 degrees.

use cozy_chess::{Color, File, Piece, Rank, Square};
use eframe::egui::{Pos2, Rect, pos2, vec2};

use crate::config::{BOARD_SIZE, COORD_MARGIN, SQUARE_SIZE};

/// Order of the pieces in the promotion dialog.
pub const PROMOTION_PIECES: [Piece; 4] = [Piece::Queen, Piece::Rook, Piece::Bishop, Piece::Knight];

const MIN_SQUARE: f32 = 16.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoardGeometry {
    /// Top-left corner of the top-left square.
    pub origin: Pos2,
    pub square: f32,
    pub bottom: Color,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            origin: pos2(COORD_MARGIN, 0.0),
            square: SQUARE_SIZE,
            bottom: Color::White,
        }
    }
}

impl BoardGeometry {
    /// Largest board that fits `area`, leaving room for the rank strip on the
    /// left and the file strip below.
    pub fn fit(area: Rect, bottom: Color) -> Self {
        let side = (area.width() - COORD_MARGIN).min(area.height() - COORD_MARGIN);
        Self {
            origin: area.min + vec2(COORD_MARGIN, 0.0),
            square: (side / BOARD_SIZE as f32).max(MIN_SQUARE),
            bottom,
        }
    }

    pub fn side(&self) -> f32 {
        self.square * BOARD_SIZE as f32
    }

    pub fn board_rect(&self) -> Rect {
        Rect::from_min_size(self.origin, vec2(self.side(), self.side()))
    }

    fn flipped(&self) -> bool {
        self.bottom == Color::Black
    }

    pub fn cell_of(&self, sq: Square) -> (usize, usize) {
        let file = sq.file() as usize;
        let rank = sq.rank() as usize;
        if self.flipped() {
            (7 - file, rank)
        } else {
            (file, 7 - rank)
        }
    }

    pub fn square_of_cell(&self, col: usize, row: usize) -> Square {
        let (file, rank) = if self.flipped() {
            (7 - col, row)
        } else {
            (col, 7 - row)
        };
        Square::new(File::index(file), Rank::index(rank))
    }

    pub fn cell_rect(&self, col: usize, row: usize) -> Rect {
        let min = self.origin + vec2(col as f32 * self.square, row as f32 * self.square);
        Rect::from_min_size(min, vec2(self.square, self.square))
    }

    pub fn square_rect(&self, sq: Square) -> Rect {
        let (col, row) = self.cell_of(sq);
        self.cell_rect(col, row)
    }

    pub fn square_center(&self, sq: Square) -> Pos2 {
        self.square_rect(sq).center()
    }

    /// Square under a screen position, `None` outside the board.
    pub fn square_at(&self, pos: Pos2) -> Option<Square> {
        let rel = pos - self.origin;
        let side = self.side();
        if rel.x < 0.0 || rel.y < 0.0 || rel.x >= side || rel.y >= side {
            return None;
        }
        let col = ((rel.x / self.square) as usize).min(BOARD_SIZE - 1);
        let row = ((rel.y / self.square) as usize).min(BOARD_SIZE - 1);
        Some(self.square_of_cell(col, row))
    }

    /// Label under screen column `col`.
    pub fn file_label(&self, col: usize) -> char {
        let file = if self.flipped() { 7 - col } else { col };
        (b'a' + file as u8) as char
    }

    /// Label beside screen row `row`.
    pub fn rank_label(&self, row: usize) -> char {
        let rank = if self.flipped() { row } else { 7 - row };
        (b'1' + rank as u8) as char
    }

    /// Strip below the board holding the label of column `col`.
    pub fn file_strip(&self, col: usize) -> Rect {
        let min = self.origin + vec2(col as f32 * self.square, self.side());
        Rect::from_min_size(min, vec2(self.square, COORD_MARGIN))
    }

    /// Strip left of the board holding the label of row `row`.
    pub fn rank_strip(&self, row: usize) -> Rect {
        let min = self.origin + vec2(-COORD_MARGIN, row as f32 * self.square);
        Rect::from_min_size(min, vec2(COORD_MARGIN, self.square))
    }

    /// Four squares wide, one high, centred on the board.
    pub fn promotion_rect(&self) -> Rect {
        let n = PROMOTION_PIECES.len() as f32;
        let min = self.origin
            + vec2(
                (self.side() - n * self.square) / 2.0,
                (self.side() - self.square) / 2.0,
            );
        Rect::from_min_size(min, vec2(n * self.square, self.square))
    }

    pub fn promotion_slot(&self, index: usize) -> Rect {
        let r = self.promotion_rect();
        Rect::from_min_size(
            r.min + vec2(index as f32 * self.square, 0.0),
            vec2(self.square, self.square),
        )
    }

    pub fn promotion_choice_at(&self, pos: Pos2) -> Option<Piece> {
        let r = self.promotion_rect();
        if pos.x < r.min.x || pos.y < r.min.y || pos.x >= r.max.x || pos.y >= r.max.y {
            return None;
        }
        let index = ((pos.x - r.min.x) / self.square) as usize;
        PROMOTION_PIECES.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn black() -> BoardGeometry {
        BoardGeometry {
            bottom: Color::Black,
            ..BoardGeometry::default()
        }
    }

    #[test]
    fn corners_with_white_at_the_bottom() {
        let g = BoardGeometry::default();
        assert_eq!(g.square_at(pos2(24.0, 0.0)), Some(Square::A8));
        assert_eq!(g.square_at(pos2(24.0 + 639.0, 639.0)), Some(Square::H1));
        assert_eq!(g.square_at(pos2(24.0 + 80.0 * 4.5, 80.0 * 6.5)), Some(Square::E2));
    }

    #[test]
    fn corners_with_black_at_the_bottom() {
        let g = black();
        assert_eq!(g.square_at(pos2(24.0, 0.0)), Some(Square::H1));
        assert_eq!(g.square_at(pos2(24.0 + 639.0, 639.0)), Some(Square::A8));
        assert_eq!(g.cell_of(Square::E7), (3, 6));
    }

    #[test]
    fn outside_the_board_is_none() {
        let g = BoardGeometry::default();
        assert_eq!(g.square_at(pos2(23.9, 10.0)), None);
        assert_eq!(g.square_at(pos2(24.0 + 640.0, 10.0)), None);
        assert_eq!(g.square_at(pos2(100.0, 640.0)), None);
        assert_eq!(g.square_at(pos2(100.0, -1.0)), None);
    }

    #[test]
    fn centers_map_back_to_their_square() {
        for g in [BoardGeometry::default(), black()] {
            for sq in Square::ALL {
                assert_eq!(g.square_at(g.square_center(sq)), Some(sq));
                let (col, row) = g.cell_of(sq);
                assert_eq!(g.square_of_cell(col, row), sq);
            }
        }
    }

    #[test]
    fn labels_follow_orientation() {
        let w = BoardGeometry::default();
        let b = black();
        let files = |g: &BoardGeometry| (0..8).map(|c| g.file_label(c)).collect::<String>();
        let ranks = |g: &BoardGeometry| (0..8).map(|r| g.rank_label(r)).collect::<String>();
        assert_eq!(files(&w), "abcdefgh");
        assert_eq!(ranks(&w), "87654321");
        assert_eq!(files(&b), "hgfedcba");
        assert_eq!(ranks(&b), "12345678");
    }

    #[test]
    fn strips_sit_outside_the_board() {
        let g = BoardGeometry::default();
        assert_eq!(g.file_strip(0), Rect::from_min_size(pos2(24.0, 640.0), vec2(80.0, 24.0)));
        assert_eq!(g.rank_strip(7), Rect::from_min_size(pos2(0.0, 560.0), vec2(24.0, 80.0)));
    }

    #[test]
    fn promotion_dialog_slots() {
        let g = BoardGeometry::default();
        let r = g.promotion_rect();
        assert_eq!(r, Rect::from_min_size(pos2(24.0 + 160.0, 280.0), vec2(320.0, 80.0)));
        let y = r.center().y;
        assert_eq!(g.promotion_choice_at(pos2(r.min.x + 1.0, y)), Some(Piece::Queen));
        assert_eq!(g.promotion_choice_at(pos2(r.min.x + 81.0, y)), Some(Piece::Rook));
        assert_eq!(g.promotion_choice_at(pos2(r.min.x + 161.0, y)), Some(Piece::Bishop));
        assert_eq!(g.promotion_choice_at(pos2(r.max.x - 1.0, y)), Some(Piece::Knight));
        assert_eq!(g.promotion_choice_at(pos2(r.max.x, y)), None);
        assert_eq!(g.promotion_choice_at(pos2(r.min.x + 1.0, r.min.y - 1.0)), None);
        assert_eq!(g.promotion_slot(2).min.x, r.min.x + 160.0);
    }

    #[test]
    fn fit_picks_the_limiting_dimension() {
        let area = Rect::from_min_size(pos2(10.0, 20.0), vec2(1000.0, 424.0));
        let g = BoardGeometry::fit(area, Color::White);
        assert_eq!(g.square, 50.0);
        assert_eq!(g.origin, pos2(34.0, 20.0));
        // Degenerate areas still produce a usable board.
        let tiny = BoardGeometry::fit(Rect::from_min_size(Pos2::ZERO, vec2(5.0, 5.0)), Color::Black);
        assert_eq!(tiny.square, MIN_SQUARE);
    }
}
