use crate::common::UserId;
use crate::ui::state::ConversationState;
use eframe::egui;

/// Roster list. Returns the user the operator clicked, if any.
pub fn render(ui: &mut egui::Ui, state: &ConversationState) -> Option<UserId> {
    let mut clicked = None;

    ui.heading("Users");
    ui.separator();

    let mut roster = state.visible_roster().peekable();
    if roster.peek().is_none() {
        ui.label(egui::RichText::new("No other users yet").weak());
        return None;
    }

    egui::ScrollArea::vertical().show(ui, |ui| {
        for user in roster {
            let selected = state.is_selected(user.id);
            let unread = state.unread_count(user.id);

            let mut label = egui::RichText::new(user.display_name());
            if selected {
                label = label.strong();
            }

            ui.horizontal(|ui| {
                if ui.selectable_label(selected, label).clicked() {
                    clicked = Some(user.id);
                }
                if unread > 0 {
                    ui.colored_label(egui::Color32::LIGHT_BLUE, format!("({unread})"));
                }
            });
        }
    });

    clicked
}
