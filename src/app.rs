use eframe::egui;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::Config;
use crate::host::Host;
use crate::loader::{load, Choice, LoadError};
use crate::picker::{Key, Picker, SearchDisplay};

struct LoadRequest {
    request_id: u64,
    config: Config,
}

struct LoadResponse {
    request_id: u64,
    result: Result<Vec<Choice>, LoadError>,
}

fn spawn_load_worker() -> (Sender<LoadRequest>, Receiver<LoadResponse>) {
    let (tx_req, rx_req) = mpsc::channel::<LoadRequest>();
    let (tx_res, rx_res) = mpsc::channel::<LoadResponse>();

    thread::spawn(move || {
        while let Ok(mut req) = rx_req.recv() {
            while let Ok(newer) = rx_req.try_recv() {
                req = newer;
            }
            let result = load(&req.config);
            if tx_res
                .send(LoadResponse {
                    request_id: req.request_id,
                    result,
                })
                .is_err()
            {
                break;
            }
        }
    });

    (tx_req, rx_res)
}

enum Phase {
    Loading,
    Failed(String),
    Ready,
}

pub struct SheetPickApp {
    picker: Picker,
    host: Box<dyn Host>,
    phase: Phase,
    choice_count: usize,
    status_line: String,
    load_tx: Sender<LoadRequest>,
    load_rx: Receiver<LoadResponse>,
    next_request_id: u64,
    pending_request_id: Option<u64>,
    scroll_to_highlight: bool,
    focus_query_requested: bool,
}

impl SheetPickApp {
    pub fn new(config: Config, host: Box<dyn Host>) -> Self {
        let (load_tx, load_rx) = spawn_load_worker();
        let mut app = Self {
            picker: Picker::new(config),
            host,
            phase: Phase::Loading,
            choice_count: 0,
            status_line: "Initializing...".to_string(),
            load_tx,
            load_rx,
            next_request_id: 1,
            pending_request_id: None,
            scroll_to_highlight: false,
            focus_query_requested: true,
        };
        app.request_load();
        app
    }

    /// Kick off a (re)load. Any previous error message is cleared and the
    /// previous choice set is replaced wholesale when the response arrives.
    fn request_load(&mut self) {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.saturating_add(1);
        self.pending_request_id = Some(request_id);
        self.phase = Phase::Loading;
        self.refresh_status_line();

        let req = LoadRequest {
            request_id,
            config: self.picker.config().clone(),
        };
        if self.load_tx.send(req).is_err() {
            self.pending_request_id = None;
            self.phase = Phase::Failed("load worker is unavailable".to_string());
            self.refresh_status_line();
        }
    }

    fn poll_load_response(&mut self) {
        while let Ok(response) = self.load_rx.try_recv() {
            if Some(response.request_id) != self.pending_request_id {
                continue;
            }
            self.pending_request_id = None;
            match response.result {
                Ok(choices) => {
                    self.choice_count = choices.len();
                    info!(count = self.choice_count, "choices loaded");
                    let stored = self.host.stored_value();
                    self.picker.set_choices(choices, stored.as_deref());
                    self.phase = Phase::Ready;
                    self.focus_query_requested = true;
                }
                Err(err) => {
                    warn!(error = %err, "load failed");
                    self.phase = Phase::Failed(err.to_string());
                }
            }
            self.refresh_status_line();
        }
    }

    fn refresh_status_line(&mut self) {
        self.status_line = match &self.phase {
            Phase::Loading => "Loading...".to_string(),
            Phase::Failed(message) => format!("Load failed: {message}"),
            Phase::Ready => {
                let selected = if self.picker.current_value().is_empty() {
                    String::new()
                } else {
                    format!(" | Selected: {}", self.picker.current_value())
                };
                format!(
                    "Choices: {} | Results: {}{}",
                    self.choice_count,
                    self.picker.results().len(),
                    selected
                )
            }
        };
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if !matches!(self.phase, Phase::Ready) {
            return;
        }
        let none = egui::Modifiers::NONE;
        let mut pressed = Vec::new();
        ctx.input_mut(|i| {
            if i.consume_key(none, egui::Key::ArrowDown) {
                pressed.push(Key::ArrowDown);
            }
            if i.consume_key(none, egui::Key::ArrowUp) {
                pressed.push(Key::ArrowUp);
            }
            if i.consume_key(none, egui::Key::Enter) {
                pressed.push(Key::Enter);
            }
            if i.consume_key(none, egui::Key::Escape) {
                pressed.push(Key::Escape);
            }
        });
        for key in pressed {
            self.picker.handle_key(key, self.host.as_mut());
            if matches!(key, Key::ArrowDown | Key::ArrowUp) {
                self.scroll_to_highlight = true;
            }
            self.refresh_status_line();
            // Keep focus on the query input instead of egui's focus traversal.
            self.focus_query_requested = true;
        }
    }

    fn dropdown_hint(&self) -> String {
        match self.picker.display() {
            SearchDisplay::Prompt => format!(
                "Type at least {} characters to search",
                self.picker.config().min_search_length
            ),
            SearchDisplay::Searching => "Searching...".to_string(),
            SearchDisplay::NoMatches => "No matches".to_string(),
            SearchDisplay::Results => String::new(),
        }
    }

    fn show_dropdown(&mut self, ui: &mut egui::Ui) {
        let hint = self.dropdown_hint();
        if !hint.is_empty() {
            ui.weak(hint);
            return;
        }

        let mut clicked_row: Option<usize> = None;
        let mut did_scroll = false;
        egui::ScrollArea::vertical()
            .max_height(240.0)
            .auto_shrink([false, true])
            .show(ui, |ui| {
                for (i, choice) in self.picker.results().iter().enumerate() {
                    let is_highlighted = self.picker.highlight() == Some(i);
                    let response = ui.selectable_label(is_highlighted, &choice.label);
                    if self.scroll_to_highlight && is_highlighted && !did_scroll {
                        response.scroll_to_me(Some(egui::Align::Center));
                        did_scroll = true;
                    }
                    if response.clicked() {
                        clicked_row = Some(i);
                    }
                }
            });
        if did_scroll {
            self.scroll_to_highlight = false;
        }

        if let Some(i) = clicked_row {
            if let Some(choice) = self.picker.results().get(i).cloned() {
                self.picker.select_choice(choice, true, self.host.as_mut());
                self.refresh_status_line();
            }
        }
    }

    fn show_ready(&mut self, ui: &mut egui::Ui) {
        let question = self.picker.config().question_label.clone();
        if !question.is_empty() {
            ui.heading(question);
        }

        let response = ui.add(
            egui::TextEdit::singleline(&mut self.picker.query)
                .desired_width(f32::INFINITY)
                .hint_text("Type to search..."),
        );
        if self.focus_query_requested {
            response.request_focus();
            self.focus_query_requested = false;
        }
        if response.gained_focus() {
            self.picker.open_list();
        }
        if response.changed() {
            self.picker.query_changed(Instant::now());
            self.picker.open_list();
            self.refresh_status_line();
        }
        if response.clicked_elsewhere() && self.picker.is_open() {
            self.picker.close_list();
        }

        if self.picker.is_open() {
            self.show_dropdown(ui);
        }

        ui.separator();
        if ui.button("Submit").clicked() {
            self.picker.handle_submit(self.host.as_mut());
        }
    }

    fn show_failed(&mut self, ui: &mut egui::Ui, message: String) {
        ui.colored_label(egui::Color32::from_rgb(248, 113, 113), &message);
        if ui.button("Retry").clicked() {
            self.request_load();
        }
    }
}

impl eframe::App for SheetPickApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_load_response();
        if self.picker.tick(Instant::now()) {
            self.scroll_to_highlight = true;
            self.refresh_status_line();
        }
        self.handle_shortcuts(ctx);

        if self.pending_request_id.is_some() || self.picker.has_pending_search() {
            ctx.request_repaint_after(Duration::from_millis(16));
        }

        egui::TopBottomPanel::bottom("status")
            .resizable(false)
            .exact_height(24.0)
            .show(ctx, |ui| {
                ui.add(egui::Label::new(&self.status_line).truncate());
            });

        egui::CentralPanel::default().show(ctx, |ui| match &self.phase {
            Phase::Loading => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading choices...");
                });
            }
            Phase::Failed(message) => {
                let message = message.clone();
                self.show_failed(ui, message);
            }
            Phase::Ready => self.show_ready(ui),
        });
    }
}
