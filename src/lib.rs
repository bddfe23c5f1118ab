// Bet builder engine library
// Odds conversions, betslip bookkeeping and the bet builder state machine

pub mod types;
pub mod odds;
pub mod sorting;
pub mod errors;
pub mod config;
pub mod backend;
pub mod api;
pub mod processor;
pub mod transformer;

// Re-export commonly used types
pub use types::*;
pub use odds::*;
pub use sorting::*;
pub use errors::*;
pub use config::*;
pub use backend::*;
pub use api::*;
pub use processor::*;
pub use transformer::*;

// Global betslip history writer
use std::fs::File;
use std::io::Write;
use std::sync::{Mutex, OnceLock};

static HISTORY_FILE: OnceLock<Mutex<File>> = OnceLock::new();

/// Initialize the global history file writer (called by main.rs)
pub fn init_history_file(file: File) {
    // Ignore error if already initialized; this crate only has one main
    let _ = HISTORY_FILE.set(Mutex::new(file));
}

/// Write a message to the history file (without extra prefixes).
/// A no-op until [`init_history_file`] has been called.
pub fn log_to_history(message: &str) {
    if let Some(file_mutex) = HISTORY_FILE.get() {
        if let Ok(mut file) = file_mutex.lock() {
            let _ = write!(file, "{}", message);
            let _ = file.flush();
        }
    }
}

/// Log a betslip event to the history file with timestamp
pub fn log_betslip_event(event: &str) {
    use chrono::Utc;
    let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    log_to_history(&format!("[{}] {}\n", timestamp, event));
}

/// Macro to append a formatted line to the history file (like println! but persisted)
#[macro_export]
macro_rules! log_println {
    ($($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::log_to_history(&format!("{}\n", message));
    }};
}
