pub mod banner;
pub mod tui;

/// Prints the welcome banner and applies the inquire theme for all subsequent prompts.
/// Call once at startup (e.g. in main after tracing init).
pub fn init_ui() {
    banner::print_welcome();
    tui::apply_theme();
}
