// GPU detection module for Exliar Compat
//
// This module finds the host's display devices by scanning `lspci -nn`
// output and reduces each line to the bracketed device label the
// compatibility table is matched against

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::core::probe::SystemProbe;
use crate::gpu::DetectedDevice;

/// lspci class names of display devices
const DISPLAY_CLASSES: &[&str] = &["VGA compatible controller", "3D controller", "Display controller"];

fn id_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // [10de:0fc6] vendor:device ids and [0300] class codes added by -nn
    RE.get_or_init(|| Regex::new(r"\[([0-9a-fA-F]{4}:[0-9a-fA-F]{4}|[0-9a-fA-F]{4})\]").expect("static id pattern"))
}

fn bracketed() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[^\[\]]*\]").expect("static bracket pattern"))
}

/// Detects display devices on the host.
///
/// Runs the PCI enumeration once. If it cannot run the result is empty,
/// which callers treat as "nothing detected".
pub fn detect_gpus(probe: &dyn SystemProbe) -> Vec<DetectedDevice> {
    match probe.run("lspci", &["-nn"]) {
        Ok(output) => {
            let devices = parse_display_devices(&output.stdout);
            info!("Detected {} display device(s)", devices.len());
            devices
        }
        Err(e) => {
            warn!("GPU detection unavailable: {}", e);
            Vec::new()
        }
    }
}

/// Extracts one device per display-class line of lspci output
pub fn parse_display_devices(lspci_output: &str) -> Vec<DetectedDevice> {
    lspci_output
        .lines()
        .filter(|line| is_display_line(line))
        .filter_map(parse_device_line)
        .collect()
}

fn is_display_line(line: &str) -> bool {
    DISPLAY_CLASSES.iter().any(|class| line.contains(class))
}

/// Reduces a line to its last bracketed label.
/// Lines without one contribute no device.
fn parse_device_line(line: &str) -> Option<DetectedDevice> {
    let pci_id = id_token()
        .captures_iter(line)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|token| token.contains(':'))
        .last()
        .map(str::to_lowercase);

    let stripped = id_token().replace_all(line, "");
    let label = bracketed().find_iter(&stripped).last()?.as_str().to_string();

    debug!("Display device {} (id {:?})", label, pci_id);
    Some(DetectedDevice { label, pci_id })
}

/// Joins the labels into the single search blob matched against the table
pub fn search_blob(devices: &[DetectedDevice]) -> String {
    devices
        .iter()
        .map(|device| device.label.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
