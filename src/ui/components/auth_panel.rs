use eframe::egui;

use crate::common::Credentials;
use crate::ui::state::AuthForm;

pub enum AuthAction {
    Register(Credentials),
    Login(Credentials),
}

pub fn render(ui: &mut egui::Ui, form: &mut AuthForm) -> Option<AuthAction> {
    let mut action = None;

    ui.heading("Register");
    egui::Grid::new("register_form").num_columns(2).show(ui, |ui| {
        ui.label("First name:");
        ui.text_edit_singleline(&mut form.register_first_name);
        ui.end_row();
        ui.label("Last name:");
        ui.text_edit_singleline(&mut form.register_last_name);
        ui.end_row();
    });
    if ui.button("Register").clicked() {
        action = Some(AuthAction::Register(Credentials::new(
            form.register_first_name.trim(),
            form.register_last_name.trim(),
        )));
    }

    ui.add_space(16.0);
    ui.separator();

    ui.heading("Login");
    egui::Grid::new("login_form").num_columns(2).show(ui, |ui| {
        ui.label("First name:");
        ui.text_edit_singleline(&mut form.login_first_name);
        ui.end_row();
        ui.label("Last name:");
        ui.text_edit_singleline(&mut form.login_last_name);
        ui.end_row();
    });
    if ui.button("Login").clicked() {
        action = Some(AuthAction::Login(Credentials::new(
            form.login_first_name.trim(),
            form.login_last_name.trim(),
        )));
    }

    action
}
