//! FFR Check 桌面表单
//!
//! 填写参数并运行 ffrcheck

use eframe::NativeOptions;
use ffr_gui::GuiApp;

fn main() -> Result<(), eframe::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let native_options = NativeOptions::default();
    eframe::run_native(
        "FFR Check",
        native_options,
        Box::new(|_cc| Ok(Box::new(GuiApp::new()))),
    )
}
