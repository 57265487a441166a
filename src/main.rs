// Desktop chess board with a UCI engine opponent and live analysis.

// Engine work runs on worker threads; the UI polls their channels each frame.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release
#![allow(rustdoc::missing_crate_level_docs)]

use clap::Parser;
use eframe::egui;

mod analysis;
mod app;
mod config;
mod display;
mod error;
mod game;
mod geometry;
mod history;
mod menu;
mod moves;
mod player;
mod uci;
mod worker;

use app::ChessApp;
use config::{Args, Settings};

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_args(Args::parse());
    log::info!(
        "engine {}, analysis depth {}",
        settings.engine_path.display(),
        settings.analysis_depth
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config::WINDOW_SIZE)
            .with_min_inner_size([480.0, 360.0])
            .with_title("Chess App - Main Menu"),
        ..Default::default()
    };
    eframe::run_native(
        "Chess App",
        options,
        Box::new(move |cc| {
            // Piece sprites are loaded from PNG files on disk.
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(ChessApp::new(settings)))
        }),
    )
}
