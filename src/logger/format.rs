//! Log formatting and output with ANSI colors
//!
//! Colorized console output with aligned tag and level columns, plus
//! uncolored file persistence.

use super::file::write_to_file;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

/// Column widths for alignment
const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 8;

/// Format and output a log message to console and file
pub fn format_and_log(tag: LogTag, level: &str, message: &str) {
    let now = Local::now();
    let time = now.format("%H:%M:%S").to_string();

    let tag_str = format_tag(&tag);
    let level_str = format_level(level);

    let console_line = format!(
        "{} [{}] [{}] {}",
        time.dimmed(),
        tag_str,
        level_str,
        message
    );
    print_stdout_safe(&console_line);

    let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let file_line = format!(
        "{} [{}] [{}] {}",
        timestamp,
        tag.to_plain_string(),
        level,
        message
    );
    write_to_file(&file_line);
}

fn format_tag(tag: &LogTag) -> ColoredString {
    let padded = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => padded.bright_yellow().bold(),
        LogTag::Api => padded.bright_cyan().bold(),
        LogTag::Explorer => padded.bright_blue().bold(),
        LogTag::Price => padded.bright_magenta().bold(),
        LogTag::Crawler => padded.bright_green().bold(),
        LogTag::Ledger => padded.bright_white().bold(),
        LogTag::Distribution => padded.cyan().bold(),
        LogTag::Pnl => padded.green().bold(),
        LogTag::Cache => padded.blue().bold(),
        LogTag::Service => padded.magenta().bold(),
    }
}

fn format_level(level: &str) -> ColoredString {
    let padded = format!("{:<width$}", level, width = LEVEL_WIDTH);
    match level {
        "ERROR" => padded.bright_red().bold(),
        "WARNING" => padded.bright_yellow(),
        "SUCCESS" => padded.bright_green(),
        "INFO" => padded.normal(),
        "DEBUG" => padded.bright_black(),
        "VERBOSE" => padded.dimmed(),
        _ => padded.normal(),
    }
}

/// Print to stdout, swallowing broken pipe errors from piped commands
fn print_stdout_safe(line: &str) {
    let mut out = stdout();
    if let Err(e) = writeln!(out, "{}", line) {
        if e.kind() != ErrorKind::BrokenPipe {
            eprintln!("logger: stdout write failed: {}", e);
        }
    }
}
