// Progress indicators for target round trips and campaigns

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::constants::ORANGE_256;
use crate::utils;

/// Create an orange-themed spinner with a message
///
/// The spinner auto-ticks every 80ms. Call `.finish_and_clear()` when done.
pub fn create_spinner(message: &str) -> ProgressBar {
    use std::time::Duration;

    let spinner = ProgressBar::new_spinner();
    let template = format!("  {{spinner:.{ORANGE_256}}} {{msg}}");
    if let Ok(style) = ProgressStyle::default_spinner().template(&template) {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Orange-themed bar counting campaign queries
pub fn create_query_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    let template =
        format!("  {{bar:40.{ORANGE_256}}} {{pos}}/{{len}} queries ({{eta}} left) {{msg}}");
    if let Ok(style) = ProgressStyle::default_bar().template(&template) {
        bar.set_style(style.progress_chars("━━─"));
    }
    bar
}

/// Run one target round trip with spinner and success indicator
///
/// Shows `  ⠋ description` while executing `f`, then `  ✓ description`.
pub fn run_step<F, R>(description: &str, f: F) -> Result<R>
where
    F: FnOnce() -> Result<R>,
{
    let spinner = create_spinner(description);
    let result = f();
    spinner.finish_and_clear();
    if result.is_ok() {
        utils::success(description);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_step_propagates_success() {
        let result = run_step("test desc", || Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_run_step_propagates_error() {
        let result: Result<()> = run_step("test desc", || anyhow::bail!("test error"));
        assert_eq!(result.unwrap_err().to_string(), "test error");
    }
}
