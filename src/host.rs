use std::collections::HashMap;

/// Seam to the embedding form host. The real integration supplies widget
/// settings, may replay a previously stored value on startup, and receives
/// the selected value (`send_data`) and the final submit verdict
/// (`send_submit`). Standalone runs use [`NullHost`].
pub trait Host {
    fn settings(&self) -> HashMap<String, String>;

    /// Value the host remembered from an earlier session, replayed so the
    /// widget can restore the selection after a fresh load.
    fn stored_value(&self) -> Option<String>;

    fn send_data(&mut self, value: &str);

    fn send_submit(&mut self, valid: bool, value: &str);
}

/// No-op host for standalone and CLI runs.
#[derive(Debug, Default)]
pub struct NullHost;

impl Host for NullHost {
    fn settings(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    fn stored_value(&self) -> Option<String> {
        None
    }

    fn send_data(&mut self, _value: &str) {}

    fn send_submit(&mut self, _valid: bool, _value: &str) {}
}

/// Test double that records every outbound host call.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub settings: HashMap<String, String>,
    pub stored: Option<String>,
    pub sent_values: Vec<String>,
    pub submits: Vec<(bool, String)>,
}

impl Host for RecordingHost {
    fn settings(&self) -> HashMap<String, String> {
        self.settings.clone()
    }

    fn stored_value(&self) -> Option<String> {
        self.stored.clone()
    }

    fn send_data(&mut self, value: &str) {
        self.sent_values.push(value.to_string());
    }

    fn send_submit(&mut self, valid: bool, value: &str) {
        self.submits.push((valid, value.to_string()));
    }
}
