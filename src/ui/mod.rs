// Terminal UI module for Exliar Compat
//
// Pastel-styled output in two forms: plain text reports printed by the
// command line, and the ratatui dashboard

pub mod colors;
pub mod report;
pub mod tui;

use std::io;

use crate::config::Config;

/// Runs the ratatui-based dashboard
pub fn run_tui(config: Config) -> io::Result<()> {
    tui::run_app(config)
}
