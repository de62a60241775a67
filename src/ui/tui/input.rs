// Input handling for the TUI

use crossterm::event::{KeyCode, KeyModifiers};

use crate::core::readiness::Suite;

use super::app::{analyze, list_usb_devices, run_readiness, write_usb_flags};
use super::state::{AppState, LogLevel};

/// Handles key events for the application
pub fn handle_key_event(app: &mut AppState, key_code: KeyCode, modifiers: KeyModifiers) {
    match key_code {
        KeyCode::Char('c') | KeyCode::Char('q') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc => {
            if app.show_usb {
                app.show_usb = false;
                app.add_log("Returning to main dashboard view", LogLevel::Info);
            } else {
                app.should_quit = true;
            }
        }
        KeyCode::Char(digit @ '1'..='3') => {
            let suite = match digit {
                '1' => Suite::Kvm,
                '2' => Suite::Vfio,
                _ => Suite::Usb,
            };
            app.show_usb = false;
            run_readiness(app, suite);
        }
        KeyCode::Char('u') => {
            app.show_usb = !app.show_usb;
            if app.show_usb {
                if app.usb.devices().is_empty() {
                    list_usb_devices(app);
                }
                app.add_log("USB devices (↑/↓ move, space toggle, 'w' write to boot script)", LogLevel::Info);
            }
        }
        KeyCode::Up if app.show_usb => app.move_usb_cursor(false),
        KeyCode::Down if app.show_usb => app.move_usb_cursor(true),
        KeyCode::Char(' ') if app.show_usb => {
            let number = app.usb_cursor + 1;
            match app.usb.toggle(number) {
                Ok(selected) => {
                    let id = app.usb.devices()[app.usb_cursor].id.clone();
                    let verb = if selected { "Selected" } else { "Deselected" };
                    app.add_log(&format!("{} USB device {}", verb, id), LogLevel::Info);
                }
                Err(e) => app.add_log(&e.to_string(), LogLevel::Warning),
            }
        }
        KeyCode::Char('w') if app.show_usb => write_usb_flags(app),
        KeyCode::Char('r') => {
            app.add_log("Refreshing analysis...", LogLevel::Info);
            analyze(app);
            app.add_log("Analysis refreshed", LogLevel::Success);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::probe::CannedProbe;
    use crate::core::readiness::ReadinessTier;
    use crate::ui::tui::state::GpuPanel;
    use crate::utils::CommandOutput;

    const LSUSB: &str = "\
Bus 001 Device 003: ID 046d:c52b Logitech, Inc. Unifying Receiver
Bus 001 Device 002: ID 8087:0aaa Intel Corp. Bluetooth
";

    fn app() -> AppState {
        let probe = CannedProbe::new()
            .with_command("lsusb", CommandOutput::ok(LSUSB))
            .with_command(
                "lspci -nn",
                CommandOutput::ok(
                    "01:00.0 VGA compatible controller [0300]: NVIDIA Corporation GK107 [GeForce GTX 650] [10de:0fc6] (rev a1)\n",
                ),
            );
        AppState::new(Config::default(), Box::new(probe))
    }

    fn press(app: &mut AppState, code: KeyCode) {
        handle_key_event(app, code, KeyModifiers::NONE);
    }

    #[test]
    fn quit_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);

        let mut app = self::app();
        handle_key_event(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
    }

    #[test]
    fn esc_leaves_the_usb_view_before_quitting() {
        let mut app = app();
        press(&mut app, KeyCode::Char('u'));
        assert!(app.show_usb);
        press(&mut app, KeyCode::Esc);
        assert!(!app.show_usb);
        assert!(!app.should_quit);
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }

    #[test]
    fn digits_select_and_run_suites() {
        let mut app = app();
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.selected_suite, Suite::Vfio);
        let report = app.readiness.as_ref().unwrap();
        assert_eq!(report.suite, Some(Suite::Vfio));
        assert_ne!(report.tier, ReadinessTier::Ready);

        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.readiness.as_ref().unwrap().suite, Some(Suite::Usb));
    }

    #[test]
    fn space_toggles_the_device_under_the_cursor() {
        let mut app = app();
        press(&mut app, KeyCode::Char('u'));
        assert_eq!(app.usb.devices().len(), 2);

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.usb.qemu_flags(), vec!["-device usb-host,vendorid=0x8087,productid=0x0aaa".to_string()]);

        press(&mut app, KeyCode::Char(' '));
        assert!(app.usb.qemu_flags().is_empty());
    }

    #[test]
    fn space_outside_the_usb_view_does_nothing() {
        let mut app = app();
        press(&mut app, KeyCode::Char(' '));
        assert!(app.usb.devices().is_empty());
        assert!(app.log_messages.is_empty());
    }

    #[test]
    fn refresh_classifies_detected_gpus() {
        let mut app = app();
        press(&mut app, KeyCode::Char('r'));
        match &app.gpu_panel {
            GpuPanel::Reports(reports) => {
                assert!(reports.iter().any(|r| r.match_token == "GTX 650"));
            }
            other => panic!("unexpected panel: {other:?}"),
        }
        assert!(app.system_info.is_some());
        assert!(app.readiness.is_some());
    }
}
