//! Host-tunable settings: the combo window, the chord-tail force-throttle
//! duration, default throttle/debounce durations, and the log filter
//! string, derived from CLI args.

use std::time::Duration;

use crate::dispatcher::{DEFAULT_CHORD_TAIL_THROTTLE_MS, DEFAULT_COMBO_WINDOW_MS};

#[derive(Clone, Debug)]
pub struct Config {
    pub combo_window_ms: u64,
    pub chord_tail_throttle_ms: u64,
    pub default_throttle_ms: u64,
    pub default_debounce_ms: u64,
    pub log_filter: String,
    pub verbose: bool,
}

impl Config {
    pub fn combo_window(&self) -> Duration {
        Duration::from_millis(self.combo_window_ms)
    }

    pub fn chord_tail_throttle(&self) -> Duration {
        Duration::from_millis(self.chord_tail_throttle_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            combo_window_ms: DEFAULT_COMBO_WINDOW_MS,
            chord_tail_throttle_ms: DEFAULT_CHORD_TAIL_THROTTLE_MS,
            default_throttle_ms: 100,
            default_debounce_ms: 100,
            log_filter: "input_dispatch=info".to_string(),
            verbose: false,
        }
    }
}

impl From<&crate::cli::Args> for Config {
    fn from(a: &crate::cli::Args) -> Self {
        Config {
            combo_window_ms: a.combo_window,
            chord_tail_throttle_ms: a.chord_tail_throttle,
            default_throttle_ms: a.default_throttle,
            default_debounce_ms: a.default_debounce,
            log_filter: a.log_filter.clone(),
            verbose: a.verbose,
        }
    }
}

/// The `Settings` adapter the dispatcher's host consults:
/// `get("input_map_combo_window") -> int`, defaulting to 300 if absent. A
/// single numeric getter rather than a generic key-value store, since the
/// engine only ever reads this one setting at mode-setup time.
pub trait Settings {
    fn combo_window_ms(&self) -> u64;
}

impl Settings for Config {
    fn combo_window_ms(&self) -> u64 {
        self.combo_window_ms
    }
}
