use anyhow::{Context, Result, bail};
use colored::Colorize;

use crate::constants::ORANGE;

/// Calculate terminal display width, treating emojis as 2 cells wide
fn terminal_width(s: &str) -> usize {
    use unicode_width::UnicodeWidthChar;
    s.chars()
        .map(|c| {
            if c.is_ascii() {
                1
            } else {
                let w = UnicodeWidthChar::width(c).unwrap_or(0);
                if w > 0 { 2 } else { 0 }
            }
        })
        .sum()
}

/// Print a styled title bar with orange separator matching the title width
pub fn print_title_bar(title: &str) {
    println!("{}", title.bold().bright_white());
    let width = terminal_width(title);
    let separator: String = "─".repeat(width);
    println!("{}", separator.truecolor(ORANGE.0, ORANGE.1, ORANGE.2));
}

/// Display a success message
pub fn success(message: &str) {
    if message.is_empty() {
        println!("  {}", "✓".green());
    } else {
        println!("  {} {}", "✓".green(), message);
    }
}

/// Display a warning message
pub fn warning(message: &str) {
    println!("  {} {}", "⚠".bold().yellow(), message);
}

/// Display an info message
pub fn info(message: &str) {
    println!("  • {message}");
}

/// Display a labelled hex value
pub fn hex_line(label: &str, bytes: &[u8]) {
    println!("  {} {}", format!("{label}:").dimmed(), hex::encode(bytes));
}

/// Decode a hex argument of exactly `len` bytes
pub fn parse_hex(input: &str, len: usize) -> Result<Vec<u8>> {
    let trimmed = input.trim().trim_start_matches("0x");
    let bytes = hex::decode(trimmed).with_context(|| format!("Invalid hex: {input}"))?;
    if bytes.len() != len {
        bail!("Expected {len} bytes, got {}", bytes.len());
    }
    Ok(bytes)
}

/// Decode a packed address given as hex (big-endian, up to 8 bytes)
pub fn parse_packed_address(input: &str) -> Result<u64> {
    let trimmed = input.trim().trim_start_matches("0x");
    u64::from_str_radix(trimmed, 16).with_context(|| format!("Invalid packed address: {input}"))
}
