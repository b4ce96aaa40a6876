use chrono::Utc;
use owo_colors::OwoColorize;

use super::colors::{ERR, FG2, WARN};

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Informational progress line. Printed to stdout; this is the channel a human
/// running `krar` watches to see what it decided to do.
pub fn info(message: impl std::fmt::Display) {
    println!("{} {} {}", timestamp().dimmed(), "INFO".color(FG2), message);
}

/// Non-fatal condition — a malformed explicit target, a registry lookup that
/// exhausted its retries, an Event that failed to create. The run continues.
pub fn warn(message: impl std::fmt::Display) {
    eprintln!(
        "{} {} {}",
        timestamp().dimmed(),
        "WARN".color(WARN),
        message.to_string().color(WARN)
    );
}

/// A fatal condition is about to end the run (configuration or capability error).
pub fn error(message: impl std::fmt::Display) {
    eprintln!(
        "{} {} {}",
        timestamp().dimmed(),
        "ERROR".color(ERR),
        message.to_string().color(ERR)
    );
}
