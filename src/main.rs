#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use cloud_frequency_map::app::CloudFrequencyApp;
use cloud_frequency_map::boot::BootConfig;
use eframe::egui;
use log::error;

fn main() -> eframe::Result {
    env_logger::init();

    let Some(path) = std::env::args().nth(1) else {
        error!("Usage: cloudfrequency <boot parameters JSON file>");
        std::process::exit(2);
    };
    let boot = match BootConfig::load(&path) {
        Ok(boot) => boot,
        Err(e) => {
            error!("{:?}", eyre::Report::new(e));
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Cloud frequency",
        options,
        Box::new(move |_cc| Ok(Box::new(CloudFrequencyApp::new(&boot)))),
    )
}
