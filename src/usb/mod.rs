// USB passthrough module for Exliar Compat
//
// This module lists host USB devices, keeps the user's multi-selection and
// writes the matching QEMU `-device usb-host` flags into an AutoPilot boot
// script below its `#USB_DEV_BEGIN` marker

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{CompatError, Result};
use crate::utils::create_timestamped_backup;

/// Marker present in every AutoPilot-generated boot script
pub const AUTOPILOT_MARKER: &str = "APC-RUN";

/// Line after which USB passthrough flags are inserted
pub const USB_MARKER: &str = "#USB_DEV_BEGIN";

/// Files naming the user's current boot script, relative to the repo root, newest layout first
pub const BOOT_SCRIPT_POINTERS: &[&str] = &["blobs/user/USR_CFG.apb", "blobs/USR_CFG.apb"];

/// A USB device as listed by `lsusb`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct UsbDevice {
    pub id: String, // "vvvv:pppp", lowercase
    pub name: String,
}

impl UsbDevice {
    pub fn vendor_id(&self) -> &str {
        self.id.split(':').next().unwrap_or_default()
    }

    pub fn product_id(&self) -> &str {
        self.id.split(':').nth(1).unwrap_or_default()
    }

    /// QEMU argument passing this device through
    pub fn qemu_flag(&self) -> String {
        format!(
            "-device usb-host,vendorid=0x{},productid=0x{}",
            self.vendor_id(),
            self.product_id()
        )
    }
}

/// Parses `lsusb` output into devices, one per id, sorted by id
pub fn parse_lsusb(output: &str) -> Vec<UsbDevice> {
    let devices: BTreeSet<UsbDevice> = output.lines().filter_map(parse_lsusb_line).collect();

    // Several identical devices share an id; keep the first name per id
    let mut unique: Vec<UsbDevice> = Vec::with_capacity(devices.len());
    for device in devices {
        if unique.last().map(|last| last.id == device.id) != Some(true) {
            unique.push(device);
        }
    }
    unique
}

// Bus 001 Device 002: ID 046d:c52b Logitech, Inc. Unifying Receiver
fn parse_lsusb_line(line: &str) -> Option<UsbDevice> {
    let (_, rest) = line.split_once(" ID ")?;
    let mut parts = rest.trim().splitn(2, ' ');
    let id = parts.next()?;

    let (vendor, product) = id.split_once(':')?;
    let is_hex_word = |s: &str| s.len() == 4 && s.chars().all(|c| c.is_ascii_hexdigit());
    if !is_hex_word(vendor) || !is_hex_word(product) {
        return None;
    }

    Some(UsbDevice {
        id: id.to_lowercase(),
        name: parts.next().unwrap_or_default().trim().to_string(),
    })
}

/// Devices picked for passthrough out of a fixed device list
#[derive(Debug, Clone, Default)]
pub struct UsbSelection {
    devices: Vec<UsbDevice>,
    selected: BTreeSet<usize>,
}

impl UsbSelection {
    pub fn new(devices: Vec<UsbDevice>) -> Self {
        Self {
            devices,
            selected: BTreeSet::new(),
        }
    }

    pub fn devices(&self) -> &[UsbDevice] {
        &self.devices
    }

    /// Toggles the device with the given 1-based list number.
    /// Returns whether it is selected afterwards.
    pub fn toggle(&mut self, number: usize) -> Result<bool> {
        if number == 0 || number > self.devices.len() {
            return Err(CompatError::InvalidSelection {
                number,
                available: self.devices.len(),
            });
        }

        let index = number - 1;
        let now_selected = if self.selected.remove(&index) {
            false
        } else {
            self.selected.insert(index);
            true
        };
        debug!("USB device {} ({}) selected: {}", number, self.devices[index].id, now_selected);
        Ok(now_selected)
    }

    /// Whether the device at a 0-based index is selected
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    /// Selected devices, in list order
    pub fn selected(&self) -> Vec<&UsbDevice> {
        self.selected.iter().filter_map(|&i| self.devices.get(i)).collect()
    }

    /// Devices not selected, in list order
    pub fn available(&self) -> Vec<&UsbDevice> {
        self.devices
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.selected.contains(i))
            .map(|(_, device)| device)
            .collect()
    }

    /// One `-device usb-host` flag per selected device, in list order
    pub fn qemu_flags(&self) -> Vec<String> {
        self.selected().iter().map(|device| device.qemu_flag()).collect()
    }
}

/// Finds the boot script the user's AutoPilot config points at
pub fn locate_boot_script(repo_root: &Path) -> Option<PathBuf> {
    BOOT_SCRIPT_POINTERS.iter().find_map(|pointer| {
        let target = fs::read_to_string(repo_root.join(pointer)).ok()?;
        let target = target.trim();
        if target.is_empty() {
            None
        } else {
            Some(repo_root.join(target))
        }
    })
}

/// Checks that a script is an AutoPilot script with a USB section
pub fn validate_script(path: &Path, contents: &str) -> Result<()> {
    if !contents.contains(AUTOPILOT_MARKER) {
        return Err(CompatError::InvalidScript {
            path: path.to_path_buf(),
            message: "not generated by AutoPilot".to_string(),
        });
    }
    if !contents.contains(USB_MARKER) {
        return Err(CompatError::InvalidScript {
            path: path.to_path_buf(),
            message: format!("no {} marker", USB_MARKER),
        });
    }
    Ok(())
}

/// Inserts the flags right after the USB marker, keeping their order
pub fn inject_flags(script: &str, flags: &[String]) -> String {
    if flags.is_empty() {
        return script.to_string();
    }
    let replacement = format!("{}\n{}", USB_MARKER, flags.join("\n"));
    script.replace(USB_MARKER, &replacement)
}

/// Writes the flags into a boot script after backing it up.
/// Returns the backup path.
pub fn apply_to_script(path: &Path, flags: &[String]) -> Result<PathBuf> {
    let contents = fs::read_to_string(path).map_err(|e| CompatError::InvalidScript {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    validate_script(path, &contents)?;

    let backup = create_timestamped_backup(path)?;
    fs::write(path, inject_flags(&contents, flags))?;
    info!(
        "Added {} USB passthrough flag(s) to {} (backup at {})",
        flags.len(),
        path.display(),
        backup.display()
    );
    Ok(backup)
}
