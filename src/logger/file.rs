/// File persistence for log output
///
/// Appends uncolored log lines to logs/chainscope.log. Failures to open or
/// write never panic the process; logging degrades to console-only.

use lazy_static::lazy_static;
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "logs/chainscope.log";

lazy_static! {
    static ref LOG_FILE_HANDLE: Mutex<Option<File>> = Mutex::new(None);
}

/// Open (or create) the log file for appending
pub fn init_file_logging() {
    if let Err(e) = create_dir_all(LOG_DIR) {
        eprintln!("logger: failed to create log directory: {}", e);
        return;
    }

    match OpenOptions::new().create(true).append(true).open(LOG_FILE) {
        Ok(file) => {
            let mut handle = LOG_FILE_HANDLE.lock().unwrap();
            *handle = Some(file);
        }
        Err(e) => {
            eprintln!("logger: failed to open {}: {}", LOG_FILE, e);
        }
    }
}

pub fn write_to_file(line: &str) {
    let mut handle = LOG_FILE_HANDLE.lock().unwrap();
    if let Some(ref mut file) = *handle {
        let _ = writeln!(file, "{}", line);
    }
}

pub fn flush_file_logging() {
    let mut handle = LOG_FILE_HANDLE.lock().unwrap();
    if let Some(ref mut file) = *handle {
        let _ = file.flush();
    }
}
