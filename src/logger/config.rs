/// Logger configuration and runtime filtering state
///
/// Debug output is opt-in per subsystem: passing --debug-crawler enables
/// Debug-level messages for the Crawler tag only. --verbose enables
/// everything.

use super::levels::LogLevel;
use super::tags::LogTag;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum level threshold (messages above it are dropped)
    pub min_level: LogLevel,

    /// Tags with --debug-<key> enabled
    pub debug_tags: HashSet<String>,

    /// Global --verbose flag
    pub verbose: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            verbose: false,
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().unwrap().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write().unwrap() = config;
}

/// Scan process arguments for --debug-<module> and --verbose flags
pub fn init_from_args() {
    let mut config = LoggerConfig::default();

    for arg in std::env::args() {
        if let Some(key) = arg.strip_prefix("--debug-") {
            config.debug_tags.insert(key.to_string());
            if config.min_level < LogLevel::Debug {
                config.min_level = LogLevel::Debug;
            }
        } else if arg == "--verbose" {
            config.verbose = true;
            config.min_level = LogLevel::Verbose;
        } else if arg == "--quiet" {
            config.min_level = LogLevel::Error;
        }
    }

    set_logger_config(config);
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = get_logger_config();
    config.verbose || config.debug_tags.contains(tag.to_debug_key())
}
