use eframe::egui;

use crate::ui::state::{ConversationState, SocketStatus};

pub fn render(ui: &mut egui::Ui, state: &ConversationState) {
    ui.heading("Debug Info");
    ui.separator();

    let (color, label) = match state.socket_status() {
        SocketStatus::NotConnected => (egui::Color32::GRAY, "not connected"),
        SocketStatus::Connecting => (egui::Color32::YELLOW, "connecting"),
        SocketStatus::Open => (egui::Color32::GREEN, "open"),
        SocketStatus::Closed => (egui::Color32::RED, "closed"),
    };
    ui.horizontal(|ui| {
        ui.label("Socket:");
        ui.colored_label(color, label);
    });

    if let Some(user) = state.session() {
        ui.horizontal(|ui| {
            ui.label("Session:");
            ui.label(format!("{} (id {})", user.display_name(), user.id));
        });
    }
    ui.horizontal(|ui| {
        ui.label("Users:");
        ui.label(format!("{}", state.visible_roster().count()));
    });
    ui.horizontal(|ui| {
        ui.label("Rendered messages:");
        ui.label(format!("{}", state.log().len()));
    });

    ui.separator();

    ui.label("Recent Events:");
    egui::ScrollArea::vertical()
        .max_height(300.0)
        .show(ui, |ui| {
            for event in state.debug_events.iter().rev().take(20) {
                let time_str = event.timestamp.format("%H:%M:%S");
                let color = match event.event_type.as_str() {
                    "SOCKET_OPEN" => egui::Color32::GREEN,
                    "SOCKET_CLOSED" | "REQUEST_FAILED" => egui::Color32::RED,
                    "SESSION" => egui::Color32::YELLOW,
                    _ => egui::Color32::WHITE,
                };

                ui.horizontal(|ui| {
                    ui.colored_label(color, format!("[{}]", time_str));
                    ui.label(&event.message);
                });
            }
        });
}
