use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use eframe::egui::Color32;

// ────────────────────────────────────────────────────────────────────────────────
// Layout
// ────────────────────────────────────────────────────────────────────────────────

pub const BOARD_SIZE: usize = 8;
pub const COORD_MARGIN: f32 = 24.0;
pub const SQUARE_SIZE: f32 = 80.0;
pub const PANEL_WIDTH: f32 = 300.0;

pub const BOARD_WIDTH: f32 = BOARD_SIZE as f32 * SQUARE_SIZE;
pub const WINDOW_SIZE: [f32; 2] = [
    BOARD_WIDTH + PANEL_WIDTH + COORD_MARGIN,
    BOARD_WIDTH + COORD_MARGIN,
];

// ────────────────────────────────────────────────────────────────────────────────
// Palette
// ────────────────────────────────────────────────────────────────────────────────

pub const BACKGROUND: Color32 = Color32::from_rgb(30, 30, 30);
pub const LIGHT_SQUARE: Color32 = Color32::from_rgb(240, 217, 181);
pub const DARK_SQUARE: Color32 = Color32::from_rgb(181, 136, 99);
pub const COORD_BG: Color32 = Color32::from_rgb(220, 190, 150);
pub const COORD_TEXT: Color32 = Color32::BLACK;

// Translucent highlight colours are built at runtime because the
// unmultiplied constructor is not const.
pub const SELECTED_RGBA: [u8; 4] = [0, 255, 0, 100];
pub const PLAYED_RGBA: [u8; 4] = [255, 255, 0, 180];
pub const BEST_RGBA: [u8; 4] = [0, 255, 255, 180];
pub const LEGAL_MOVE: Color32 = Color32::from_rgb(0, 200, 0);
pub const PLAYED_RING: Color32 = Color32::from_rgb(255, 255, 0);
pub const BEST_RING: Color32 = Color32::from_rgb(0, 255, 255);

pub const BACK_BUTTON: Color32 = Color32::from_rgb(200, 60, 60);
pub const CONFIRM_YES: Color32 = Color32::from_rgb(60, 180, 75);
pub const CONFIRM_NO: Color32 = Color32::from_rgb(200, 60, 60);
pub const MENU_BG: Color32 = Color32::from_rgb(40, 40, 40);
pub const MENU_BUTTON: Color32 = Color32::from_rgb(60, 180, 75);
pub const MENU_TITLE: Color32 = Color32::from_rgb(240, 240, 240);
pub const MENU_SUBTITLE: Color32 = Color32::from_rgb(200, 200, 200);

pub fn rgba(c: [u8; 4]) -> Color32 {
    Color32::from_rgba_unmultiplied(c[0], c[1], c[2], c[3])
}

// ────────────────────────────────────────────────────────────────────────────────
// Command line
// ────────────────────────────────────────────────────────────────────────────────

const BUNDLED_ENGINE: &str = "stockfish/stockfish";
const ENGINE_ON_PATH: &str = "stockfish";

#[derive(Debug, Parser)]
#[command(version, about = "Play and analyse chess games against a UCI engine")]
pub struct Args {
    /// UCI engine executable used for analysis and as the AI opponent
    #[arg(long, env = "CHESS_ENGINE")]
    pub engine: Option<PathBuf>,

    /// Search depth for the evaluation panel
    #[arg(long, default_value_t = 17)]
    pub analysis_depth: u32,

    /// Start games with the evaluation panel switched off
    #[arg(long)]
    pub no_analysis: bool,

    /// Directory holding images/wP.png ... images/bK.png
    #[arg(long, default_value = "assets")]
    pub assets: PathBuf,

    /// Minimum delay before the AI plays its move
    #[arg(long, default_value_t = 300)]
    pub ai_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub engine_path: PathBuf,
    pub analysis_depth: u32,
    pub analysis_on_start: bool,
    pub asset_dir: PathBuf,
    pub ai_delay: Duration,
}

impl Settings {
    pub fn from_args(args: Args) -> Self {
        let engine_path = resolve_engine(args.engine, Path::new(BUNDLED_ENGINE));
        Self {
            engine_path,
            analysis_depth: args.analysis_depth.max(1),
            analysis_on_start: !args.no_analysis,
            asset_dir: args.assets,
            ai_delay: Duration::from_millis(args.ai_delay_ms),
        }
    }
}

/// Explicit path wins, then the bundled binary next to the working directory,
/// then whatever `stockfish` the OS finds on `PATH`.
fn resolve_engine(explicit: Option<PathBuf>, bundled: &Path) -> PathBuf {
    match explicit {
        Some(path) => path,
        None if bundled.exists() => bundled.to_path_buf(),
        None => PathBuf::from(ENGINE_ON_PATH),
    }
}
