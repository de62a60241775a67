// USB passthrough workflow: list, select, write into a boot script

use std::fs;

use exliar_compat::error::CompatError;
use exliar_compat::usb::{apply_to_script, locate_boot_script, parse_lsusb, UsbSelection};
use tempfile::TempDir;

const LSUSB: &str = "\
Bus 003 Device 004: ID 1532:0084 Razer USA, Ltd RC30-0328 Gaming Mouse
Bus 003 Device 002: ID 046d:c52b Logitech, Inc. Unifying Receiver
Bus 001 Device 005: ID 0bda:8153 Realtek Semiconductor Corp. RTL8153 Gigabit Ethernet Adapter
Bus 001 Device 001: ID 1d6b:0002 Linux Foundation 2.0 root hub
";

fn autopilot_repo(script: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("blobs/user")).unwrap();
    fs::write(dir.path().join("blobs/user/USR_CFG.apb"), "scripts/boot-macOS.sh\n").unwrap();
    fs::create_dir_all(dir.path().join("scripts")).unwrap();
    fs::write(dir.path().join("scripts/boot-macOS.sh"), script).unwrap();
    dir
}

#[test]
fn selected_devices_are_written_after_the_marker() {
    let repo = autopilot_repo("#!/bin/bash\n# APC-RUN\nargs=(\n#USB_DEV_BEGIN\n-m 8G\n)\n");

    let mut selection = UsbSelection::new(parse_lsusb(LSUSB));
    // Sorted by id: 046d:c52b, 0bda:8153, 1532:0084, 1d6b:0002
    selection.toggle(3).unwrap();
    selection.toggle(1).unwrap();

    let script = locate_boot_script(repo.path()).unwrap();
    let backup = apply_to_script(&script, &selection.qemu_flags()).unwrap();

    assert_eq!(
        fs::read_to_string(&script).unwrap(),
        "#!/bin/bash\n# APC-RUN\nargs=(\n#USB_DEV_BEGIN\n\
         -device usb-host,vendorid=0x046d,productid=0xc52b\n\
         -device usb-host,vendorid=0x1532,productid=0x0084\n\
         -m 8G\n)\n"
    );
    assert!(backup.file_name().unwrap().to_string_lossy().contains(".backup_"));
    assert!(fs::read_to_string(&backup).unwrap().ends_with("#USB_DEV_BEGIN\n-m 8G\n)\n"));
}

#[test]
fn deselecting_removes_a_device_from_the_flags() {
    let mut selection = UsbSelection::new(parse_lsusb(LSUSB));
    selection.toggle(2).unwrap();
    selection.toggle(4).unwrap();
    selection.toggle(2).unwrap();

    assert_eq!(selection.qemu_flags(), vec!["-device usb-host,vendorid=0x1d6b,productid=0x0002".to_string()]);
    assert_eq!(selection.available().len(), 3);
}

#[test]
fn scripts_not_generated_by_autopilot_are_left_alone() {
    let repo = autopilot_repo("#!/bin/bash\nqemu-system-x86_64 \\\n#USB_DEV_BEGIN\n");
    let script = locate_boot_script(repo.path()).unwrap();

    let err = apply_to_script(&script, &["-device usb-host,vendorid=0x046d,productid=0xc52b".to_string()]).unwrap_err();
    assert!(matches!(err, CompatError::InvalidScript { .. }));
    assert_eq!(fs::read_to_string(&script).unwrap(), "#!/bin/bash\nqemu-system-x86_64 \\\n#USB_DEV_BEGIN\n");
}

#[test]
fn out_of_range_selection_is_an_error() {
    let mut selection = UsbSelection::new(parse_lsusb(LSUSB));
    assert!(matches!(
        selection.toggle(9),
        Err(CompatError::InvalidSelection { number: 9, available: 4 })
    ));
}
