use cozy_chess::Color;
use eframe::egui::{self, Color32, RichText, vec2};

use crate::config;
use crate::player::Difficulty;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StartChoice {
    HumanVsHuman,
    HumanVsAi(Color),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DifficultyChoice {
    Start,
    Back,
}

/// How a game is set up once the menus are done.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GameMode {
    HumanVsHuman,
    HumanVsAi { human: Color, difficulty: Difficulty },
}

fn menu_button(ui: &mut egui::Ui, text: &str, size: [f32; 2]) -> bool {
    let button = egui::Button::new(RichText::new(text).size(26.0).color(Color32::WHITE))
        .fill(config::MENU_BUTTON)
        .min_size(vec2(size[0], size[1]));
    ui.add(button).clicked()
}

fn title(ui: &mut egui::Ui, text: &str) {
    ui.label(RichText::new(text).size(48.0).color(config::MENU_TITLE));
}

pub fn start_screen(ctx: &egui::Context) -> Option<StartChoice> {
    let mut choice = None;
    egui::CentralPanel::default()
        .frame(egui::Frame::new().fill(config::MENU_BG))
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(100.0);
                title(ui, "Chess App");
                ui.add_space(40.0);

                let entries = [
                    ("Human vs Human", StartChoice::HumanVsHuman),
                    ("Human vs AI (Play as White)", StartChoice::HumanVsAi(Color::White)),
                    ("Human vs AI (Play as Black)", StartChoice::HumanVsAi(Color::Black)),
                ];
                for (text, c) in entries {
                    if menu_button(ui, text, [420.0, 55.0]) {
                        choice = Some(c);
                    }
                    ui.add_space(15.0);
                }
            });
        });
    if let Some(c) = choice {
        log::debug!("menu: {c:?}");
    }
    choice
}

pub fn difficulty_screen(ctx: &egui::Context, human: Color, level: &mut u8) -> Option<DifficultyChoice> {
    let mut choice = None;
    let side = match human {
        Color::White => "White",
        Color::Black => "Black",
    };
    egui::CentralPanel::default()
        .frame(egui::Frame::new().fill(config::MENU_BG))
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(100.0);
                title(ui, &format!("Human vs AI ({side})"));
                ui.add_space(30.0);
                ui.label(
                    RichText::new("Select AI Difficulty (1 = Easy, 20 = Hard)")
                        .size(26.0)
                        .color(config::MENU_SUBTITLE),
                );
                ui.add_space(30.0);

                ui.spacing_mut().slider_width = 400.0;
                ui.add(egui::Slider::new(level, Difficulty::MIN..=Difficulty::MAX).show_value(false));
                ui.label(RichText::new(level.to_string()).size(48.0).color(Color32::WHITE));
                ui.add_space(30.0);

                if menu_button(ui, "Start Game", [200.0, 50.0]) {
                    choice = Some(DifficultyChoice::Start);
                }
                ui.add_space(15.0);
                if menu_button(ui, "Back", [200.0, 50.0]) {
                    choice = Some(DifficultyChoice::Back);
                }
            });
        });
    choice
}

impl GameMode {
    pub fn from_choice(choice: StartChoice, level: u8) -> Self {
        match choice {
            StartChoice::HumanVsHuman => GameMode::HumanVsHuman,
            StartChoice::HumanVsAi(human) => GameMode::HumanVsAi {
                human,
                difficulty: Difficulty::new(level),
            },
        }
    }

    /// Colour shown at the bottom of the board when the game starts.
    pub fn bottom(self) -> Color {
        match self {
            GameMode::HumanVsHuman => Color::White,
            GameMode::HumanVsAi { human, .. } => human,
        }
    }

    pub fn engine_side(self) -> Option<Color> {
        match self {
            GameMode::HumanVsHuman => None,
            GameMode::HumanVsAi { human, .. } => Some(!human),
        }
    }
}
