//! Immediate-mode painting of the board, its overlays and the side panel.

use std::path::{Path, PathBuf};

use cozy_chess::{Board, Color, Move, Piece, Square};
use eframe::egui::{
    self, Align2, Color32, FontId, Painter, Rect, RichText, Sense, Stroke, StrokeKind, Ui, vec2,
};

use crate::analysis::Evaluation;
use crate::config::{self, BOARD_SIZE};
use crate::geometry::{BoardGeometry, PROMOTION_PIECES};
use crate::history::HighlightKind;
use crate::moves;

// ────────────────────────────────────────────────────────────────────────────────
// Pieces
// ────────────────────────────────────────────────────────────────────────────────

const PIECES: [Piece; 6] = [
    Piece::Pawn,
    Piece::Knight,
    Piece::Bishop,
    Piece::Rook,
    Piece::Queen,
    Piece::King,
];

/// Sprite file stem, e.g. `wQ`.
pub fn piece_key(color: Color, piece: Piece) -> String {
    let c = match color {
        Color::White => 'w',
        Color::Black => 'b',
    };
    let p = moves::piece_char(piece).to_ascii_uppercase();
    format!("{c}{p}")
}

fn glyph(color: Color, piece: Piece) -> &'static str {
    // The filled black pawn may render as an emoji with some fonts.
    match (color, piece) {
        (Color::White, Piece::King) => "♔",
        (Color::White, Piece::Queen) => "♕",
        (Color::White, Piece::Rook) => "♖",
        (Color::White, Piece::Bishop) => "♗",
        (Color::White, Piece::Knight) => "♘",
        (Color::White, Piece::Pawn) => "♙",
        (Color::Black, Piece::King) => "♚",
        (Color::Black, Piece::Queen) => "♛",
        (Color::Black, Piece::Rook) => "♜",
        (Color::Black, Piece::Bishop) => "♝",
        (Color::Black, Piece::Knight) => "♞",
        (Color::Black, Piece::Pawn) => "♟",
    }
}

/// PNG sprites from `<assets>/images/`, or Unicode glyphs when any is missing.
pub struct PieceSprites {
    dir: Option<PathBuf>,
}

impl PieceSprites {
    pub fn load(asset_dir: &Path) -> Self {
        let images = asset_dir.join("images");
        let complete = [Color::White, Color::Black].into_iter().all(|color| {
            PIECES
                .iter()
                .all(|&p| images.join(format!("{}.png", piece_key(color, p))).is_file())
        });
        let dir = if complete {
            std::fs::canonicalize(&images).ok()
        } else {
            None
        };
        match &dir {
            Some(d) => log::info!("piece images from {}", d.display()),
            None => log::info!("no piece images in {}, drawing glyphs", images.display()),
        }
        Self { dir }
    }

    fn uri(&self, color: Color, piece: Piece) -> Option<String> {
        let dir = self.dir.as_ref()?;
        let path = dir.join(format!("{}.png", piece_key(color, piece)));
        Some(format!("file://{}", path.display()))
    }

    pub fn paint(&self, ui: &Ui, painter: &Painter, rect: Rect, color: Color, piece: Piece) {
        match self.uri(color, piece) {
            Some(uri) => egui::Image::new(uri).paint_at(ui, rect),
            None => {
                painter.text(
                    rect.center(),
                    Align2::CENTER_CENTER,
                    glyph(color, piece),
                    FontId::proportional(rect.height() * 0.9),
                    Color32::BLACK,
                );
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Board
// ────────────────────────────────────────────────────────────────────────────────

pub struct BoardScene<'a> {
    pub board: &'a Board,
    pub selected: Option<Square>,
    pub targets: &'a [Square],
    pub highlights: &'a [(HighlightKind, Board, Move)],
}

pub fn draw_board(ui: &Ui, painter: &Painter, g: &BoardGeometry, scene: &BoardScene, sprites: &PieceSprites) {
    for row in 0..BOARD_SIZE {
        for col in 0..BOARD_SIZE {
            let rect = g.cell_rect(col, row);
            let shade = if (row + col) % 2 == 0 {
                config::LIGHT_SQUARE
            } else {
                config::DARK_SQUARE
            };
            painter.rect_filled(rect, 0.0, shade);

            let sq = g.square_of_cell(col, row);
            if let (Some(piece), Some(color)) = (scene.board.piece_on(sq), scene.board.color_on(sq)) {
                sprites.paint(ui, painter, rect, color, piece);
            }
        }
    }

    if let Some(sq) = scene.selected {
        painter.rect_filled(g.square_rect(sq), 0.0, config::rgba(config::SELECTED_RGBA));
    }

    for &sq in scene.targets {
        painter.circle_filled(g.square_center(sq), g.square / 6.0, config::LEGAL_MOVE);
    }

    for (kind, before, mv) in scene.highlights {
        let (fill, ring) = match kind {
            HighlightKind::Played => (config::rgba(config::PLAYED_RGBA), config::PLAYED_RING),
            HighlightKind::Best => (config::rgba(config::BEST_RGBA), config::BEST_RING),
        };
        painter.rect_filled(g.square_rect(mv.from), 0.0, fill);
        let to = moves::display_target(before, *mv);
        painter.circle_stroke(g.square_center(to), g.square / 3.0, Stroke::new(4.0, ring));
    }

    draw_coordinates(painter, g);
    painter.rect_stroke(g.board_rect(), 0.0, Stroke::new(2.0, Color32::BLACK), StrokeKind::Outside);
}

fn draw_coordinates(painter: &Painter, g: &BoardGeometry) {
    let font = FontId::proportional(16.0);
    for i in 0..BOARD_SIZE {
        let strip = g.file_strip(i);
        painter.rect_filled(strip, 0.0, config::COORD_BG);
        painter.text(
            strip.center(),
            Align2::CENTER_CENTER,
            g.file_label(i),
            font.clone(),
            config::COORD_TEXT,
        );

        let strip = g.rank_strip(i);
        painter.rect_filled(strip, 0.0, config::COORD_BG);
        painter.text(
            strip.right_center() - vec2(4.0, 0.0),
            Align2::RIGHT_CENTER,
            g.rank_label(i),
            font.clone(),
            config::COORD_TEXT,
        );
    }
}

pub fn draw_promotion_dialog(ui: &Ui, painter: &Painter, g: &BoardGeometry, color: Color, sprites: &PieceSprites) {
    let rect = g.promotion_rect();
    painter.rect_filled(rect, 0.0, Color32::from_rgb(50, 50, 50));
    for (i, &piece) in PROMOTION_PIECES.iter().enumerate() {
        let slot = g.promotion_slot(i).shrink(2.0);
        painter.rect_filled(slot, 4.0, config::LIGHT_SQUARE);
        sprites.paint(ui, painter, slot, color, piece);
    }
    painter.rect_stroke(
        rect,
        0.0,
        Stroke::new(2.0, Color32::from_rgb(200, 200, 200)),
        StrokeKind::Inside,
    );
}

pub fn draw_game_over(painter: &Painter, area: Rect, text: &str) {
    painter.rect_filled(area, 0.0, Color32::from_black_alpha(180));
    painter.text(
        area.center(),
        Align2::CENTER_CENTER,
        text,
        FontId::proportional(28.0),
        Color32::WHITE,
    );
}

// ────────────────────────────────────────────────────────────────────────────────
// Side panel
// ────────────────────────────────────────────────────────────────────────────────

pub struct PanelInfo<'a> {
    pub analysis_available: bool,
    pub analysis_enabled: bool,
    pub evaluation: Option<&'a Evaluation>,
    pub best_move_text: Option<String>,
    pub turn: Color,
    pub ai_thinking: bool,
    pub viewed_ply: usize,
    pub total_plies: usize,
    pub moves: &'a [String],
    pub result: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PanelAction {
    Back,
    Flip,
    Undo,
}

fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

/// Move list as numbered pairs: "1. e2e4 e7e5".
pub fn move_rows(moves: &[String]) -> Vec<String> {
    moves
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| format!("{}. {}", i + 1, pair.join(" ")))
        .collect()
}

pub fn side_panel(ui: &mut Ui, info: &PanelInfo) -> Option<PanelAction> {
    let mut action = None;
    let text = |s: &str| RichText::new(s).size(18.0);

    ui.add_space(10.0);
    if info.analysis_enabled {
        match info.evaluation {
            Some(e) => {
                ui.label(text(&format!("Evaluation: {}", e.score_text())));
                ui.label(text(&format!(
                    "Best Move: {}",
                    info.best_move_text.as_deref().unwrap_or("-")
                )));
                ui.label(RichText::new(format!("depth {}", e.depth)).weak());
            }
            None => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(text("Analysing..."));
                });
            }
        }
    } else if info.analysis_available {
        ui.label(text("Analysis: OFF"));
    } else {
        ui.label(text("Analysis: no engine"));
    }
    ui.add_space(10.0);

    ui.label(text(&format!("Turn: {}", color_name(info.turn))));
    if info.ai_thinking {
        ui.label(RichText::new("AI is thinking...").italics());
    }
    if let Some(result) = &info.result {
        ui.label(text(result).strong());
    }
    if info.viewed_ply < info.total_plies {
        ui.label(
            RichText::new(format!("Replay: ply {} of {}", info.viewed_ply, info.total_plies))
                .color(Color32::from_rgb(200, 140, 0)),
        );
    }
    ui.add_space(10.0);

    ui.label(text("Press 'A' to toggle analysis"));
    ui.label(text("← → to navigate moves"));
    ui.label(text("Ctrl+Z to undo, F to flip"));
    ui.add_space(10.0);

    ui.horizontal(|ui| {
        if ui.button("Flip board").clicked() {
            action = Some(PanelAction::Flip);
        }
        if ui.button("Undo").clicked() {
            action = Some(PanelAction::Undo);
        }
    });
    ui.separator();

    let bottom_reserve = 50.0;
    egui::ScrollArea::vertical()
        .max_height((ui.available_height() - bottom_reserve).max(40.0))
        .stick_to_bottom(true)
        .show(ui, |ui| {
            let current_row = info.viewed_ply.saturating_sub(1) / 2;
            for (i, row) in move_rows(info.moves).into_iter().enumerate() {
                let label = RichText::new(row).monospace();
                if i == current_row && info.viewed_ply > 0 {
                    ui.label(label.strong());
                } else {
                    ui.label(label);
                }
            }
        });

    ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
        ui.add_space(10.0);
        let back = egui::Button::new(RichText::new("Back").size(18.0).color(Color32::WHITE))
            .fill(config::BACK_BUTTON)
            .min_size(vec2(100.0, 30.0));
        if ui.add(back).clicked() {
            action = Some(PanelAction::Back);
        }
    });

    action
}

/// "Go back to menu?" dialog. `Some(true)` leaves the game, `Some(false)`
/// closes the dialog.
pub fn confirm_exit(ctx: &egui::Context) -> Option<bool> {
    let response = egui::Modal::new(egui::Id::new("confirm_exit")).show(ctx, |ui| {
        ui.set_width(260.0);
        let mut answer = None;
        ui.vertical_centered(|ui| {
            ui.add_space(10.0);
            ui.label(RichText::new("Go back to menu?").size(20.0));
            ui.add_space(20.0);
        });
        ui.horizontal(|ui| {
            ui.add_space(20.0);
            let yes = egui::Button::new(RichText::new("Yes").color(Color32::WHITE))
                .fill(config::CONFIRM_YES)
                .min_size(vec2(80.0, 30.0));
            if ui.add(yes).clicked() {
                answer = Some(true);
            }
            ui.add_space(60.0);
            let no = egui::Button::new(RichText::new("No").color(Color32::WHITE))
                .fill(config::CONFIRM_NO)
                .min_size(vec2(80.0, 30.0));
            if ui.add(no).clicked() {
                answer = Some(false);
            }
        });
        answer
    });
    if response.inner.is_none() && response.should_close() {
        return Some(false);
    }
    response.inner
}

/// Clickable area covering the board squares.
pub fn board_response(ui: &mut Ui, g: &BoardGeometry) -> egui::Response {
    ui.allocate_rect(g.board_rect(), Sense::click())
}
