use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::common::{NetworkCommand, NetworkEvent, UserId};

use super::components::{
    auth_panel::{self, AuthAction},
    chat_area, debug_panel, input_bar, notice, sidebar,
};
use super::state::{ConversationState, NoticeLevel};

pub struct ChatApp {
    state: ConversationState,
    command_sender: mpsc::Sender<NetworkCommand>,
    event_receiver: mpsc::Receiver<NetworkEvent>,
}

impl ChatApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        command_sender: mpsc::Sender<NetworkCommand>,
        event_receiver: mpsc::Receiver<NetworkEvent>,
    ) -> Self {
        Self {
            state: ConversationState::new(),
            command_sender,
            event_receiver,
        }
    }

    fn handle_network_events(&mut self) {
        while let Ok(event) = self.event_receiver.try_recv() {
            for command in self.state.apply_event(event) {
                self.send_command(command);
            }
        }
    }

    fn send_command(&mut self, command: NetworkCommand) {
        if let Err(err) = self.command_sender.try_send(command) {
            log::warn!("Failed to send command to network: {err}");
            self.state.push_notice(
                NoticeLevel::Error,
                "The network task is not responding.".to_string(),
            );
        }
    }

    fn handle_auth(&mut self, action: AuthAction) {
        match action {
            AuthAction::Register(credentials) => {
                self.send_command(NetworkCommand::Register(credentials))
            }
            AuthAction::Login(credentials) => self.send_command(NetworkCommand::Login(credentials)),
        }
    }

    fn select_peer(&mut self, peer_id: UserId) {
        match self.state.select_peer(peer_id) {
            Ok(request) => self.send_command(request.into()),
            Err(err) => log::warn!("Cannot select user {peer_id}: {err}"),
        }
    }

    fn send_message(&mut self) {
        // Validation failures already raised a notice.
        if let Ok(message) = self.state.submit_input() {
            self.send_command(NetworkCommand::SendMessage(message));
        }
    }
}

impl eframe::App for ChatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_network_events();

        let dismissed = self
            .state
            .current_notice()
            .is_some_and(|current| notice::render(ctx, current));
        if dismissed {
            self.state.dismiss_notice();
        }
        let blocked = self.state.current_notice().is_some();

        egui::TopBottomPanel::top("banner").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Rust DM Chat");
                if let Some(banner) = self.state.banner() {
                    ui.separator();
                    ui.label(banner);
                }
            });
        });

        if self.state.session().is_none() {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.add_enabled_ui(!blocked, |ui| {
                    if let Some(action) = auth_panel::render(ui, &mut self.state.auth) {
                        self.handle_auth(action);
                    }
                });
            });
            ctx.request_repaint_after(Duration::from_millis(100));
            return;
        }

        egui::SidePanel::left("user_sidebar")
            .resizable(true)
            .default_width(200.0)
            .show(ctx, |ui| {
                ui.add_enabled_ui(!blocked, |ui| {
                    if let Some(peer_id) = sidebar::render(ui, &self.state) {
                        self.select_peer(peer_id);
                    }
                });
            });

        egui::SidePanel::right("debug_panel")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                debug_panel::render(ui, &self.state);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            chat_area::render(ui, &self.state);

            ui.separator();
            if input_bar::render(ui, &mut self.state.input_text, !blocked) {
                self.send_message();
            }
        });

        ctx.request_repaint_after(Duration::from_millis(100));
    }
}
