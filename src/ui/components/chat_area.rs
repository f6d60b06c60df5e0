use eframe::egui;

use crate::ui::state::{Author, ConversationState, Delivery, LogEntry};

pub fn render(ui: &mut egui::Ui, state: &ConversationState) {
    match state.talking_to() {
        Some(name) => ui.heading(format!("Talking to {name}")),
        None => ui.heading("Select a user to start chatting"),
    };
    ui.separator();

    if state.history_pending() {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label(egui::RichText::new("Loading messages...").weak());
        });
    }

    let bottom_margin = 40.0;
    egui::ScrollArea::vertical()
        .max_height(ui.available_height() - bottom_margin)
        .auto_shrink([false, false])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            for entry in state.log() {
                let layout = match entry.author {
                    Author::Me => egui::Layout::right_to_left(egui::Align::TOP),
                    Author::Peer => egui::Layout::left_to_right(egui::Align::TOP),
                };
                ui.push_id(entry.id, |ui| {
                    ui.with_layout(layout, |ui| render_entry(ui, entry));
                });
            }
        });
}

fn render_entry(ui: &mut egui::Ui, entry: &LogEntry) {
    let text = match entry.author {
        Author::Me => format!("You: {}", entry.content),
        Author::Peer => entry.content.clone(),
    };
    ui.label(text);

    let status = match (entry.delivery, entry.timestamp) {
        (Delivery::Failed, _) => {
            Some(egui::RichText::new("not sent").color(ui.visuals().error_fg_color))
        }
        (Delivery::Sending, _) => Some(egui::RichText::new("sending").weak()),
        (Delivery::Sent, Some(timestamp)) => {
            Some(egui::RichText::new(timestamp.format("%H:%M").to_string()).weak())
        }
        (Delivery::Sent, None) => None,
    };
    if let Some(status) = status {
        ui.label(status.small());
    }
}
