use std::time::Instant;
use tracing::debug;

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::host::Host;
use crate::loader::Choice;

/// What the dropdown should show for the current query state. `Prompt`
/// (keep typing) is distinct from `NoMatches` (a real empty result).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDisplay {
    Prompt,
    Searching,
    Results,
    NoMatches,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

/// Search-and-select controller. Pure widget state: the view layer renders
/// it and feeds events back in; the host connection is injected per call.
pub struct Picker {
    config: Config,
    choices: Vec<Choice>,
    /// Visible text of the search input. Bound directly by the view layer.
    pub query: String,
    results: Vec<Choice>,
    display: SearchDisplay,
    open: bool,
    highlight: Option<usize>,
    selected: Option<Choice>,
    current_value: String,
    debouncer: Debouncer,
}

impl Picker {
    pub fn new(config: Config) -> Self {
        let debouncer = Debouncer::from_millis(config.debounce_delay_ms);
        Self {
            config,
            choices: Vec::new(),
            query: String::new(),
            results: Vec::new(),
            display: SearchDisplay::Prompt,
            open: false,
            highlight: None,
            selected: None,
            current_value: String::new(),
            debouncer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn results(&self) -> &[Choice] {
        &self.results
    }

    pub fn display(&self) -> SearchDisplay {
        self.display
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    pub fn selected(&self) -> Option<&Choice> {
        self.selected.as_ref()
    }

    pub fn current_value(&self) -> &str {
        &self.current_value
    }

    /// Install a freshly loaded choice set, replacing any previous one. When
    /// the host already knows a value that matches a row, the selection is
    /// restored without re-notifying the host.
    pub fn set_choices(&mut self, choices: Vec<Choice>, stored_value: Option<&str>) {
        self.choices = choices;
        self.results.clear();
        self.highlight = None;
        self.display = SearchDisplay::Prompt;
        self.debouncer.cancel();

        if let Some(stored) = stored_value.map(str::trim).filter(|v| !v.is_empty()) {
            if let Some(choice) = self.choices.iter().find(|c| c.value == stored).cloned() {
                self.apply_selection(choice);
                debug!(value = %self.current_value, "restored stored selection");
            }
        }
    }

    /// React to an edit of the query text. Short queries show the prompt and
    /// cancel any pending search; everything else schedules the debounced
    /// filter and shows a pending state immediately.
    pub fn query_changed(&mut self, now: Instant) {
        if self.query.trim().chars().count() < self.config.min_search_length {
            self.display = SearchDisplay::Prompt;
            self.results.clear();
            self.highlight = None;
            self.debouncer.cancel();
            return;
        }
        self.display = SearchDisplay::Searching;
        self.debouncer.schedule(now);
    }

    /// Drive the debounce clock. Returns true when a filter pass ran this
    /// tick, so the view knows the list changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.debouncer.fire_ready(now) {
            self.run_filter();
            return true;
        }
        false
    }

    pub fn has_pending_search(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Case-insensitive substring filter over label and value, sorted by
    /// lower-cased label in Unicode codepoint order (fixed collation; the
    /// sort is stable, ties keep load order).
    pub fn run_filter(&mut self) {
        let needle = self.query.trim().to_lowercase();
        self.results = self
            .choices
            .iter()
            .filter(|c| {
                c.label.to_lowercase().contains(&needle)
                    || c.value.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        self.results
            .sort_by(|a, b| a.label.to_lowercase().cmp(&b.label.to_lowercase()));
        self.highlight = None;
        self.display = if self.results.is_empty() {
            SearchDisplay::NoMatches
        } else {
            SearchDisplay::Results
        };
        self.open = true;
    }

    pub fn select_choice(&mut self, choice: Choice, notify: bool, host: &mut dyn Host) {
        self.apply_selection(choice);
        if notify {
            host.send_data(&self.current_value);
        }
    }

    fn apply_selection(&mut self, choice: Choice) {
        self.query = choice.label.clone();
        self.current_value = choice.value.clone();
        self.selected = Some(choice);
        self.open = false;
        self.highlight = None;
        self.debouncer.cancel();
    }

    /// Focus gain opens the list.
    pub fn open_list(&mut self) {
        self.open = true;
    }

    /// Outside interaction, Escape, or a commit all land here. The visible
    /// text must not be left dangling without a selection behind it.
    pub fn close_list(&mut self) {
        self.open = false;
        self.highlight = None;
        if self.selected.is_none() && !self.query.is_empty() {
            self.query.clear();
            self.results.clear();
            self.display = SearchDisplay::Prompt;
            self.debouncer.cancel();
        }
    }

    pub fn handle_key(&mut self, key: Key, host: &mut dyn Host) {
        if !self.open {
            if matches!(key, Key::ArrowDown | Key::Enter) {
                self.open = true;
            }
            return;
        }
        match key {
            Key::ArrowDown => {
                if !self.results.is_empty() {
                    let last = self.results.len() - 1;
                    self.highlight = Some(match self.highlight {
                        Some(h) => (h + 1).min(last),
                        None => 0,
                    });
                }
            }
            Key::ArrowUp => {
                if !self.results.is_empty() {
                    // No highlight acts as one past the end, so the first
                    // ArrowUp lands on the last item.
                    let from = self.highlight.unwrap_or(self.results.len());
                    self.highlight = Some(from.saturating_sub(1));
                }
            }
            Key::Enter => {
                if let Some(choice) = self.highlight.and_then(|h| self.results.get(h)).cloned() {
                    self.select_choice(choice, true, host);
                } else {
                    self.close_list();
                }
            }
            Key::Escape => self.close_list(),
        }
    }

    /// The authoritative gate the host uses to accept or reject submission.
    pub fn handle_submit(&mut self, host: &mut dyn Host) {
        let valid = !self.current_value.is_empty();
        host.send_submit(valid, &self.current_value);
    }
}
