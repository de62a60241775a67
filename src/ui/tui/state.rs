// Application state management for the TUI

use ratatui::style::Color;

use crate::config::Config;
use crate::core::probe::SystemProbe;
use crate::core::readiness::{ReadinessReport, Suite};
use crate::core::system::SystemInfo;
use crate::gpu::classify::CompatibilityReport;
use crate::gpu::DetectedDevice;
use crate::ui::colors::PastelColor;
use crate::usb::UsbSelection;

/// Entries kept in the console feed
const MAX_LOG_MESSAGES: usize = 100;

/// A styled log message for the console feed
#[derive(Clone)]
pub struct LogMessage {
    pub timestamp: String,
    pub text: String,
    pub level: LogLevel,
}

/// Log message levels with associated colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Get the color for this log level
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Info => PastelColor::Lavender.as_ratatui(),
            LogLevel::Success => PastelColor::Mint.as_ratatui(),
            LogLevel::Warning => PastelColor::Peach.as_ratatui(),
            LogLevel::Error => PastelColor::Pink.as_ratatui(),
        }
    }
}

/// What the GPU panel shows
#[derive(Debug, Clone)]
pub enum GpuPanel {
    Pending,
    Reports(Vec<CompatibilityReport>),
    TableError(String), // The table could not be loaded
}

/// Ratatui app state
pub struct AppState {
    pub title: String,
    pub should_quit: bool,
    pub config: Config,
    pub probe: Box<dyn SystemProbe>,
    pub system_info: Option<SystemInfo>,
    pub devices: Vec<DetectedDevice>,
    pub gpu_panel: GpuPanel,
    pub selected_suite: Suite,
    pub readiness: Option<ReadinessReport>,
    pub usb: UsbSelection,
    pub usb_cursor: usize, // 0-based row in the USB list
    pub show_usb: bool,
    pub loading_message: Option<String>,
    pub log_messages: Vec<LogMessage>,
}

impl AppState {
    pub fn new(config: Config, probe: Box<dyn SystemProbe>) -> Self {
        Self {
            title: "Exliar Compat".to_string(),
            should_quit: false,
            config,
            probe,
            system_info: None,
            devices: Vec::new(),
            gpu_panel: GpuPanel::Pending,
            selected_suite: Suite::Kvm,
            readiness: None,
            usb: UsbSelection::default(),
            usb_cursor: 0,
            show_usb: false,
            loading_message: None,
            log_messages: Vec::new(),
        }
    }

    /// Add a log message to the console feed
    pub fn add_log(&mut self, text: &str, level: LogLevel) {
        let timestamp = chrono::Local::now().format("%H:%M:%S").to_string();

        self.log_messages.push(LogMessage {
            timestamp,
            text: text.to_string(),
            level,
        });

        if self.log_messages.len() > MAX_LOG_MESSAGES {
            self.log_messages.remove(0);
        }
    }

    /// Moves the USB cursor, wrapping at both ends
    pub fn move_usb_cursor(&mut self, down: bool) {
        let count = self.usb.devices().len();
        if count == 0 {
            self.usb_cursor = 0;
            return;
        }
        self.usb_cursor = if down {
            (self.usb_cursor + 1) % count
        } else if self.usb_cursor == 0 {
            count - 1
        } else {
            self.usb_cursor - 1
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::probe::CannedProbe;
    use crate::usb::UsbDevice;

    fn app() -> AppState {
        AppState::new(Config::default(), Box::new(CannedProbe::new()))
    }

    #[test]
    fn console_feed_is_capped() {
        let mut app = app();
        for i in 0..(MAX_LOG_MESSAGES + 5) {
            app.add_log(&format!("message {}", i), LogLevel::Info);
        }
        assert_eq!(app.log_messages.len(), MAX_LOG_MESSAGES);
        assert_eq!(app.log_messages[0].text, "message 5");
    }

    #[test]
    fn usb_cursor_wraps() {
        let mut app = app();
        app.move_usb_cursor(true);
        assert_eq!(app.usb_cursor, 0);

        app.usb = UsbSelection::new(vec![
            UsbDevice { id: "046d:c52b".into(), name: "Receiver".into() },
            UsbDevice { id: "8087:0aaa".into(), name: "Bluetooth".into() },
        ]);
        app.move_usb_cursor(false);
        assert_eq!(app.usb_cursor, 1);
        app.move_usb_cursor(true);
        assert_eq!(app.usb_cursor, 0);
    }
}
