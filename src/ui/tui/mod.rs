// Ratatui dashboard for Exliar Compat

pub use app::run_app;

mod app;
mod input;
pub mod render;
mod state;
