use eframe::egui;

use crate::ui::state::{Notice, NoticeLevel};

/// Centered alert window. Returns true once the user dismisses it.
pub fn render(ctx: &egui::Context, notice: &Notice) -> bool {
    let mut dismissed = false;
    let title = match notice.level {
        NoticeLevel::Info => "Notice",
        NoticeLevel::Error => "Error",
    };

    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            match notice.level {
                NoticeLevel::Info => ui.label(&notice.text),
                NoticeLevel::Error => ui.colored_label(egui::Color32::LIGHT_RED, &notice.text),
            };
            ui.add_space(8.0);
            if ui.button("OK").clicked() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                dismissed = true;
            }
        });

    dismissed
}
