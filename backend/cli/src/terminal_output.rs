//! Terminal notes with optional ANSI colour.

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

fn format_note(symbol: &str, colour: &str, label: &str, msg: &str, color: bool) -> String {
    if color {
        format!("{colour}{BOLD}{symbol}{RESET} {msg}")
    } else {
        format!("{label}: {msg}")
    }
}

/// Print a formatted INFO note to stdout.
pub fn note_info(msg: &str) {
    println!("{}", format_note("ℹ", CYAN, "INFO", msg, supports_color()));
}

/// Print a formatted WARNING note.
pub fn note_warn(msg: &str) {
    println!("{}", format_note("⚠", YELLOW, "WARN", msg, supports_color()));
}

/// Print a formatted ERROR note.
pub fn note_error(msg: &str) {
    eprintln!("{}", format_note("✗", RED, "ERROR", msg, supports_color()));
}

/// Print a formatted SUCCESS note.
pub fn note_success(msg: &str) {
    println!("{}", format_note("✓", GREEN, "OK", msg, supports_color()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_notes_carry_a_label() {
        assert_eq!(format_note("✓", GREEN, "OK", "ready", false), "OK: ready");
    }

    #[test]
    fn coloured_notes_reset_after_the_symbol() {
        let note = format_note("✗", RED, "ERROR", "boom", true);
        assert!(note.starts_with(RED));
        assert!(note.ends_with(&format!("{RESET} boom")));
    }
}
