// Main application loop for the TUI

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::config::Config;
use crate::core::probe::{HostProbe, SystemProbe};
use crate::core::readiness::{run_suite, CheckStatus, Suite};
use crate::core::system::SystemInfo;
use crate::gpu::classify::{classify, match_summary};
use crate::gpu::detection::detect_gpus;
use crate::gpu::table::CompatibilityTable;
use crate::usb::{apply_to_script, locate_boot_script, parse_lsusb, UsbSelection};

use super::input::handle_key_event;
use super::render::ui;
use super::state::{AppState, GpuPanel, LogLevel};

/// Detect system information with progress messages
pub(super) fn detect_system_info(app: &mut AppState) {
    app.add_log("Starting system detection...", LogLevel::Info);
    app.loading_message = Some("Detecting system information...".to_string());

    let sys_info = SystemInfo::detect(app.probe.as_ref());
    let kernel_version = sys_info.kernel_version.full_version.clone();
    let virtualization_enabled = sys_info.virtualization_enabled;
    let virtualized_host = sys_info.virtualized_host;

    app.system_info = Some(sys_info);
    app.loading_message = None;

    app.add_log(&format!("Detected kernel: {}", kernel_version), LogLevel::Info);
    if virtualization_enabled {
        app.add_log("CPU virtualization extensions present", LogLevel::Success);
    } else {
        app.add_log("Warning: CPU virtualization extensions not found", LogLevel::Warning);
    }
    if virtualized_host {
        app.add_log("Running inside a virtual machine; passthrough is unsupported", LogLevel::Error);
    }
}

/// Detects display devices and classifies them against the compatibility table
pub(super) fn detect_and_classify_gpus(app: &mut AppState) {
    app.add_log("Starting GPU detection...", LogLevel::Info);
    app.loading_message = Some("Detecting GPU devices...".to_string());
    app.devices = detect_gpus(app.probe.as_ref());
    app.loading_message = None;

    let table = match CompatibilityTable::load(&app.config) {
        Ok(table) => table,
        Err(e) => {
            app.add_log(&format!("Cannot load GPU table: {}", e), LogLevel::Error);
            app.gpu_panel = GpuPanel::TableError(e.to_string());
            return;
        }
    };

    let reports = classify(&app.devices, &table, &app.config);
    let level = if reports.is_empty() { LogLevel::Warning } else { LogLevel::Success };
    app.add_log(&match_summary(reports.len()), level);
    for report in &reports {
        app.add_log(&format!("{}: {}", report.display_name, report.headline), LogLevel::Info);
    }
    app.gpu_panel = GpuPanel::Reports(reports);
}

/// Runs the selected readiness suite
pub(super) fn run_readiness(app: &mut AppState, suite: Suite) {
    app.selected_suite = suite;
    app.add_log(&format!("Running {}...", suite.title()), LogLevel::Info);

    let report = run_suite(suite, &app.config, app.probe.as_ref());
    let failures = report.results.iter().filter(|r| r.status == CheckStatus::Fail).count();
    let level = if failures == 0 { LogLevel::Success } else { LogLevel::Warning };
    app.add_log(
        &format!("{}: {} ({} point(s), {} failed check(s))", suite, report.tier, report.total, failures),
        level,
    );
    app.readiness = Some(report);
}

/// Lists USB devices; the previous selection is dropped
pub(super) fn list_usb_devices(app: &mut AppState) {
    match app.probe.run("lsusb", &[]) {
        Ok(output) => {
            app.usb = UsbSelection::new(parse_lsusb(&output.stdout));
            app.add_log(&format!("Found {} USB device(s)", app.usb.devices().len()), LogLevel::Info);
        }
        Err(e) => {
            app.usb = UsbSelection::default();
            app.add_log(&format!("Cannot list USB devices: {}", e), LogLevel::Warning);
        }
    }
    app.usb_cursor = 0;
}

/// Writes the selected USB devices into the user's boot script
pub(super) fn write_usb_flags(app: &mut AppState) {
    let flags = app.usb.qemu_flags();
    if flags.is_empty() {
        app.add_log("No USB devices selected", LogLevel::Warning);
        return;
    }
    let Some(script) = locate_boot_script(&app.config.repo_root) else {
        app.add_log("No AutoPilot boot script configured", LogLevel::Error);
        return;
    };

    match apply_to_script(&script, &flags) {
        Ok(backup) => app.add_log(
            &format!(
                "Wrote {} flag(s) to {} (backup {})",
                flags.len(),
                script.display(),
                backup.display()
            ),
            LogLevel::Success,
        ),
        Err(e) => app.add_log(&e.to_string(), LogLevel::Error),
    }
}

/// Full analysis run at startup and on refresh
pub(super) fn analyze(app: &mut AppState) {
    detect_system_info(app);
    detect_and_classify_gpus(app);
    let suite = app.selected_suite;
    run_readiness(app, suite);
    list_usb_devices(app);
}

/// Run the dashboard against the live host
pub fn run_app(config: Config) -> io::Result<()> {
    run_app_with(AppState::new(config, Box::new(HostProbe)))
}

fn run_app_with(mut app: AppState) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.add_log("Welcome to Exliar Compat", LogLevel::Info);
    terminal.draw(|f| ui(f, &app))?;
    analyze(&mut app);
    app.add_log(
        "Analysis complete. 1/2/3 switch checks, 'u' USB devices, 'r' refresh, 'q' quit.",
        LogLevel::Success,
    );

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let result = loop {
        if let Err(e) = terminal.draw(|f| ui(f, &app)) {
            break Err(e);
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        match event::poll(timeout) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    handle_key_event(&mut app, key.code, key.modifiers);
                }
                Ok(_) => {}
                Err(e) => break Err(e),
            },
            Ok(false) => {}
            Err(e) => break Err(e),
        }

        if app.should_quit {
            break Ok(());
        }
        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    };

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}
