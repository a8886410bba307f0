use eframe::egui;
use pulseboard::{
    gui::app::DisplayApp,
    DisplaySettings,
};

fn main() -> eframe::Result<()> {
    let settings = DisplaySettings::load();
    if settings.simulate {
        println!("pulseboard starting with the simulated feed");
    } else {
        println!("pulseboard starting against {}", settings.base_url);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Pulseboard")
            .with_inner_size([1280.0, 720.0]),
        ..Default::default()
    };

    eframe::run_native(
        "pulseboard",
        options,
        Box::new(|cc| Ok(Box::new(DisplayApp::new(cc, settings)))),
    )
}
