use std::time::Duration;

use cozy_chess::{Board, Color, Move};
use eframe::egui::{self, Key};

use crate::analysis::Analysis;
use crate::config::{self, Settings};
use crate::display::{self, BoardScene, PanelAction, PanelInfo, PieceSprites};
use crate::game::GameController;
use crate::geometry::BoardGeometry;
use crate::history::{self, EvaluationCache, HighlightKind, Replay};
use crate::menu::{self, DifficultyChoice, GameMode, StartChoice};
use crate::moves;
use crate::player::{Difficulty, EnginePlayer, PlayerKind};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

// ────────────────────────────────────────────────────────────────────────────────
// Game screen
// ────────────────────────────────────────────────────────────────────────────────

/// Keyboard commands for one frame.
#[derive(Default)]
struct Keys {
    toggle_analysis: bool,
    undo: bool,
    back: bool,
    forward: bool,
    start: bool,
    live: bool,
    flip: bool,
}

impl Keys {
    fn read(ctx: &egui::Context) -> Self {
        ctx.input(|i| {
            let cmd = i.modifiers.command;
            Self {
                toggle_analysis: !cmd && i.key_pressed(Key::A),
                undo: cmd && i.key_pressed(Key::Z),
                back: i.key_pressed(Key::ArrowLeft),
                forward: i.key_pressed(Key::ArrowRight),
                start: i.key_pressed(Key::Home),
                live: i.key_pressed(Key::End),
                flip: !cmd && i.key_pressed(Key::F),
            }
        })
    }
}

pub struct GameScreen {
    controller: GameController,
    analysis: Analysis,
    opponent: Option<EnginePlayer>,
    cache: EvaluationCache,
    replay: Replay,
    bottom: Color,
    geometry: BoardGeometry,
    confirm_exit: bool,
}

impl GameScreen {
    pub fn new(settings: &Settings, mode: GameMode) -> Self {
        let kind = |color| {
            if mode.engine_side() == Some(color) {
                PlayerKind::Engine
            } else {
                PlayerKind::Human
            }
        };
        let opponent = match mode {
            GameMode::HumanVsHuman => None,
            GameMode::HumanVsAi { difficulty, .. } => Some(EnginePlayer::start(settings, difficulty)),
        };
        log::info!("new game: {mode:?}");
        Self::with_parts(
            GameController::new(kind(Color::White), kind(Color::Black)),
            Analysis::start(settings),
            opponent,
            mode.bottom(),
        )
    }

    pub fn with_parts(
        controller: GameController,
        analysis: Analysis,
        opponent: Option<EnginePlayer>,
        bottom: Color,
    ) -> Self {
        Self {
            controller,
            analysis,
            opponent,
            cache: EvaluationCache::default(),
            replay: Replay::default(),
            bottom,
            geometry: BoardGeometry::default(),
            confirm_exit: false,
        }
    }

    fn viewed_ply(&self) -> usize {
        self.replay.viewed_ply(self.controller.record().len())
    }

    /// Collect engine answers and start new requests.
    fn tick_engines(&mut self) {
        if let Some(done) = self.analysis.poll() {
            self.cache
                .insert(self.controller.record(), done.ply, &done.fen, done.evaluation);
        }
        // The viewed position first, then the one before it for the best-move mark.
        let ply = self.viewed_ply();
        let missing = [Some(ply), ply.checked_sub(1)]
            .into_iter()
            .flatten()
            .find(|p| !self.cache.contains(*p));
        if let Some(p) = missing {
            if self.analysis.is_enabled() && !self.analysis.is_busy() {
                self.analysis.request(p, &self.controller.record().board_at(p));
            }
        }

        let Some(opponent) = self.opponent.as_mut() else {
            return;
        };
        if let Some(reply) = opponent.poll() {
            match reply.mv {
                Some(mv) if reply.fen == self.controller.fen() => {
                    if !self.controller.apply_engine_move(mv) {
                        log::warn!("AI move {mv} rejected");
                    }
                }
                Some(_) => log::debug!("discarding AI move for an old position"),
                None => log::debug!("AI has no move"),
            }
        }
        // The AI waits while the player looks back through the game.
        if self.replay.is_live() && self.controller.is_engine_turn() && !opponent.is_thinking() {
            opponent.request(self.controller.board());
        }
    }

    fn is_busy(&self) -> bool {
        self.analysis.is_busy() || self.opponent.as_ref().is_some_and(EnginePlayer::is_thinking)
    }

    fn undo(&mut self) {
        if !self.controller.undo_last_move() {
            return;
        }
        if let Some(opponent) = self.opponent.as_mut() {
            opponent.cancel();
        }
        let len = self.controller.record().len();
        self.cache.truncate(len);
        self.replay.clamp(len);
        log::debug!("undo, {len} plies left");
    }

    fn flip(&mut self) {
        self.bottom = !self.bottom;
    }

    fn apply_keys(&mut self, keys: &Keys) {
        if keys.toggle_analysis {
            self.analysis.toggle();
        }
        if keys.flip {
            self.flip();
        }
        if keys.undo {
            self.undo();
        }
        // The promotion dialog belongs to the live position.
        if self.controller.awaiting_promotion() {
            return;
        }
        let len = self.controller.record().len();
        if keys.back {
            self.replay.back(len);
        }
        if keys.forward {
            self.replay.forward(len);
        }
        if keys.start {
            self.replay.to_start(len);
        }
        if keys.live {
            self.replay.to_live();
        }
    }

    fn handle_board_click(&mut self, pos: egui::Pos2) {
        if self.controller.awaiting_promotion() {
            if let Some(piece) = self.geometry.promotion_choice_at(pos) {
                self.controller.choose_promotion(piece);
            }
            return;
        }
        if !self.replay.is_live() {
            return;
        }
        if let Some(sq) = self.geometry.square_at(pos) {
            self.controller.handle_click(sq);
        }
    }

    /// Played and best moves to draw for `ply`; the engine's choice only
    /// while analysis is on.
    fn move_marks(&self, ply: usize) -> Vec<(HighlightKind, Board, Move)> {
        let mut marks = history::highlights(self.controller.record(), &self.cache, ply);
        if !self.analysis.is_enabled() {
            marks.retain(|(kind, _, _)| *kind != HighlightKind::Best);
        }
        marks
    }

    fn panel_info<'a>(&'a self, uci_moves: &'a [String]) -> PanelInfo<'a> {
        let ply = self.viewed_ply();
        let evaluation = self.cache.get(ply);
        let best_move_text = evaluation.and_then(|e| e.best_move).map(|mv| {
            let board = self.controller.record().board_at(ply);
            moves::to_uci(&board, mv)
        });
        PanelInfo {
            analysis_available: self.analysis.is_available(),
            analysis_enabled: self.analysis.is_enabled(),
            evaluation,
            best_move_text,
            turn: self.controller.record().board_at(ply).side_to_move(),
            ai_thinking: self.opponent.as_ref().is_some_and(EnginePlayer::is_thinking),
            viewed_ply: ply,
            total_plies: self.controller.record().len(),
            moves: uci_moves,
            result: self.controller.result_text(),
        }
    }

    /// Run one frame. Returns true when the player confirmed going back to
    /// the menu.
    pub fn update(&mut self, ctx: &egui::Context, sprites: &PieceSprites) -> bool {
        self.tick_engines();

        if self.confirm_exit {
            match display::confirm_exit(ctx) {
                Some(true) => return true,
                Some(false) => self.confirm_exit = false,
                None => {}
            }
        } else {
            self.apply_keys(&Keys::read(ctx));
        }

        let uci_moves = self.controller.record().uci_moves();
        let mut action = None;
        egui::SidePanel::right("analysis_panel")
            .exact_width(config::PANEL_WIDTH)
            .resizable(false)
            .show(ctx, |ui| {
                action = display::side_panel(ui, &self.panel_info(&uci_moves));
            });
        match action {
            Some(PanelAction::Back) => self.confirm_exit = true,
            Some(PanelAction::Flip) => self.flip(),
            Some(PanelAction::Undo) => self.undo(),
            None => {}
        }

        let mut clicked = None;
        egui::CentralPanel::default()
            .frame(egui::Frame::new().fill(config::BACKGROUND))
            .show(ctx, |ui| {
                self.geometry = BoardGeometry::fit(ui.max_rect(), self.bottom);
                let response = display::board_response(ui, &self.geometry);
                if response.clicked() {
                    clicked = response.interact_pointer_pos();
                }

                let ply = self.viewed_ply();
                let live = self.replay.is_live();
                let board = self.controller.record().board_at(ply);
                let targets = if live {
                    self.controller.legal_targets()
                } else {
                    Vec::new()
                };
                let marks = self.move_marks(ply);
                let scene = BoardScene {
                    board: &board,
                    selected: if live { self.controller.selected() } else { None },
                    targets: &targets,
                    highlights: &marks,
                };

                let painter = ui.painter().clone();
                display::draw_board(ui, &painter, &self.geometry, &scene, sprites);
                if self.controller.awaiting_promotion() {
                    display::draw_promotion_dialog(
                        ui,
                        &painter,
                        &self.geometry,
                        self.controller.side_to_move(),
                        sprites,
                    );
                }
                if live {
                    if let Some(result) = self.controller.result_text() {
                        display::draw_game_over(&painter, self.geometry.board_rect(), &result);
                    }
                }
            });

        if let Some(pos) = clicked.filter(|_| !self.confirm_exit) {
            self.handle_board_click(pos);
        }

        if self.is_busy() {
            ctx.request_repaint_after(POLL_INTERVAL);
        }
        false
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// App
// ────────────────────────────────────────────────────────────────────────────────

enum Screen {
    Menu,
    Difficulty { human: Color, level: u8 },
    Playing(Box<GameScreen>),
}

impl Screen {
    fn title(&self) -> &'static str {
        match self {
            Screen::Menu | Screen::Difficulty { .. } => "Chess App - Main Menu",
            Screen::Playing(_) => "Chess App",
        }
    }
}

pub struct ChessApp {
    settings: Settings,
    sprites: PieceSprites,
    screen: Screen,
    window_title: &'static str,
}

impl ChessApp {
    pub fn new(settings: Settings) -> Self {
        let sprites = PieceSprites::load(&settings.asset_dir);
        Self {
            settings,
            sprites,
            screen: Screen::Menu,
            window_title: "",
        }
    }
}

impl eframe::App for ChessApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let Self {
            settings,
            sprites,
            screen,
            window_title,
        } = self;

        if *window_title != screen.title() {
            *window_title = screen.title();
            ctx.send_viewport_cmd(egui::ViewportCommand::Title((*window_title).to_owned()));
        }

        let next = match screen {
            Screen::Menu => menu::start_screen(ctx).map(|choice| match choice {
                StartChoice::HumanVsHuman => Screen::Playing(Box::new(GameScreen::new(
                    settings,
                    GameMode::HumanVsHuman,
                ))),
                StartChoice::HumanVsAi(human) => Screen::Difficulty {
                    human,
                    level: Difficulty::default().level(),
                },
            }),
            Screen::Difficulty { human, level } => {
                let human = *human;
                match menu::difficulty_screen(ctx, human, level) {
                    Some(DifficultyChoice::Start) => {
                        let mode = GameMode::from_choice(StartChoice::HumanVsAi(human), *level);
                        Some(Screen::Playing(Box::new(GameScreen::new(settings, mode))))
                    }
                    Some(DifficultyChoice::Back) => Some(Screen::Menu),
                    None => None,
                }
            }
            Screen::Playing(game) => game.update(ctx, sprites).then_some(Screen::Menu),
        };

        if let Some(next) = next {
            // Dropping the old screen shuts its engines down.
            *screen = next;
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::{Score, SharedEngine, UciSession};
    use cozy_chess::Square;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Instant;

    fn two_humans() -> GameScreen {
        GameScreen::with_parts(
            GameController::new(PlayerKind::Human, PlayerKind::Human),
            Analysis::disconnected(),
            None,
            Color::White,
        )
    }

    fn click(screen: &mut GameScreen, sq: Square) {
        let pos = screen.geometry.square_center(sq);
        screen.handle_board_click(pos);
    }

    #[test]
    fn clicks_move_pieces_through_geometry() {
        let mut s = two_humans();
        click(&mut s, Square::E2);
        click(&mut s, Square::E4);
        assert_eq!(s.controller.record().len(), 1);
    }

    #[test]
    fn flipped_board_still_hits_the_right_squares() {
        let mut s = two_humans();
        s.flip();
        s.geometry.bottom = s.bottom;
        click(&mut s, Square::G1);
        click(&mut s, Square::F3);
        assert_eq!(s.controller.record().uci_moves(), vec!["g1f3"]);
    }

    #[test]
    fn board_is_read_only_during_replay() {
        let mut s = two_humans();
        click(&mut s, Square::E2);
        click(&mut s, Square::E4);
        s.apply_keys(&Keys {
            back: true,
            ..Keys::default()
        });
        assert!(!s.replay.is_live());
        assert_eq!(s.viewed_ply(), 0);
        click(&mut s, Square::E7);
        click(&mut s, Square::E5);
        assert_eq!(s.controller.record().len(), 1);

        s.apply_keys(&Keys {
            live: true,
            ..Keys::default()
        });
        click(&mut s, Square::E7);
        click(&mut s, Square::E5);
        assert_eq!(s.controller.record().len(), 2);
    }

    #[test]
    fn undo_trims_cache_and_replay() {
        let mut s = two_humans();
        for (f, t) in [(Square::E2, Square::E4), (Square::E7, Square::E5)] {
            click(&mut s, f);
            click(&mut s, t);
        }
        s.replay.to_start(2);
        s.replay.forward(2);
        s.apply_keys(&Keys {
            undo: true,
            ..Keys::default()
        });
        assert_eq!(s.controller.record().len(), 1);
        assert!(s.replay.is_live());
    }

    #[test]
    fn promotion_dialog_click_picks_piece() {
        use cozy_chess::{Board, Piece};
        use crate::history::GameRecord;

        let board = Board::from_fen("8/P6k/8/8/8/8/6K1/8 w - - 0 1", false).unwrap();
        let mut s = GameScreen::with_parts(
            GameController::from_record(GameRecord::new(board), PlayerKind::Human, PlayerKind::Human),
            Analysis::disconnected(),
            None,
            Color::White,
        );
        click(&mut s, Square::A7);
        click(&mut s, Square::A8);
        assert!(s.controller.awaiting_promotion());
        // Outside the dialog: nothing happens.
        s.handle_board_click(s.geometry.square_center(Square::A1));
        assert!(s.controller.awaiting_promotion());

        // Replay keys wait until the piece is chosen.
        s.apply_keys(&Keys {
            back: true,
            ..Keys::default()
        });
        assert!(s.replay.is_live());

        let rook_slot = s.geometry.promotion_slot(1).center();
        s.handle_board_click(rook_slot);
        assert!(!s.controller.awaiting_promotion());
        assert_eq!(s.controller.board().piece_on(Square::A8), Some(Piece::Rook));
    }

    #[test]
    fn engine_opponent_replies() {
        let controller = GameController::new(PlayerKind::Human, PlayerKind::Engine);
        let opponent = EnginePlayer::with_engine(None, Difficulty::new(5), Duration::ZERO);
        let mut s = GameScreen::with_parts(controller, Analysis::disconnected(), Some(opponent), Color::White);
        click(&mut s, Square::D2);
        click(&mut s, Square::D4);
        assert_eq!(s.controller.record().len(), 1);

        let deadline = Instant::now() + Duration::from_secs(5);
        while s.controller.record().len() < 2 && Instant::now() < deadline {
            s.tick_engines();
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(s.controller.record().len(), 2);
        assert_eq!(s.controller.side_to_move(), Color::White);
    }

    #[test]
    fn stale_ai_reply_is_ignored_after_undo() {
        let controller = GameController::new(PlayerKind::Human, PlayerKind::Engine);
        let opponent = EnginePlayer::with_engine(None, Difficulty::new(5), Duration::from_millis(100));
        let mut s = GameScreen::with_parts(controller, Analysis::disconnected(), Some(opponent), Color::White);
        click(&mut s, Square::D2);
        click(&mut s, Square::D4);
        s.tick_engines();
        assert!(s.is_busy());
        s.undo();
        assert!(!s.is_busy());
        assert_eq!(s.controller.record().len(), 0);
        thread::sleep(Duration::from_millis(200));
        s.tick_engines();
        assert_eq!(s.controller.record().len(), 0);
    }

    fn tick_until(s: &mut GameScreen, done: impl Fn(&GameScreen) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(s) && Instant::now() < deadline {
            s.tick_engines();
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn analysis_fills_viewed_ply_then_the_one_before() {
        // Answers in request order: the position after e2e4, then the start.
        let script = "info depth 5 score cp 20 pv e7e5\nbestmove e7e5\n\
                      info depth 5 score cp 30 pv d2d4\nbestmove d2d4\n";
        let engine: SharedEngine = Arc::new(Mutex::new(UciSession::new(
            Cursor::new(script.as_bytes().to_vec()),
            Vec::<u8>::new(),
        )));
        let mut s = GameScreen::with_parts(
            GameController::new(PlayerKind::Human, PlayerKind::Human),
            Analysis::with_engine(engine, 5, true),
            None,
            Color::White,
        );
        click(&mut s, Square::E2);
        click(&mut s, Square::E4);

        tick_until(&mut s, |s| s.cache.contains(0) && s.cache.contains(1));
        let after = s.cache.get(1).expect("ply 1 evaluated");
        assert_eq!(after.score, Score::Centipawns(-20));
        assert_eq!(after.best_move, Some("e7e5".parse().unwrap()));
        let start = s.cache.get(0).expect("ply 0 evaluated");
        assert_eq!(start.best_move, Some("d2d4".parse().unwrap()));

        // Both plies cached: no further search is started.
        s.tick_engines();
        assert!(!s.analysis.is_busy());
        assert!(s.analysis.is_enabled());

        let kinds = |s: &GameScreen| {
            s.move_marks(1)
                .into_iter()
                .map(|(kind, _, mv)| (kind, mv.to_string()))
                .collect::<Vec<_>>()
        };
        assert_eq!(
            kinds(&s),
            vec![
                (HighlightKind::Played, "e2e4".to_owned()),
                (HighlightKind::Best, "d2d4".to_owned()),
            ]
        );
        s.apply_keys(&Keys {
            toggle_analysis: true,
            ..Keys::default()
        });
        assert_eq!(kinds(&s), vec![(HighlightKind::Played, "e2e4".to_owned())]);
    }

    #[test]
    fn ai_waits_while_replaying() {
        let controller = GameController::new(PlayerKind::Human, PlayerKind::Engine);
        let opponent = EnginePlayer::with_engine(None, Difficulty::new(12), Duration::ZERO);
        let mut s = GameScreen::with_parts(controller, Analysis::disconnected(), Some(opponent), Color::White);
        click(&mut s, Square::D2);
        click(&mut s, Square::D4);
        s.apply_keys(&Keys {
            start: true,
            ..Keys::default()
        });
        for _ in 0..5 {
            s.tick_engines();
        }
        assert!(!s.is_busy());
        assert_eq!(s.controller.record().len(), 1);

        s.apply_keys(&Keys {
            live: true,
            ..Keys::default()
        });
        tick_until(&mut s, |s| s.controller.record().len() == 2);
        assert_eq!(s.controller.record().len(), 2);
    }
}
