// Concrete readiness checks and the suites built from them
//
// Every suite tops out at a score of 10 so the tiers mean the same thing
// whichever suite produced them.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{Config, KernelThreshold};
use crate::core::probe::SystemProbe;
use crate::core::readiness::{CheckOutcome, ReadinessCheck};
use crate::core::system::{detect_kernel_version, has_virtualization_flags};
use crate::error::{CompatError, Result};
use crate::usb::{parse_lsusb, AUTOPILOT_MARKER, BOOT_SCRIPT_POINTERS, USB_MARKER};

/// Module names listed by `lsmod`
fn loaded_modules(lsmod_output: &str) -> HashSet<&str> {
    lsmod_output
        .lines()
        .skip_while(|line| line.starts_with("Module"))
        .filter_map(|line| line.split_whitespace().next())
        .collect()
}

/// CPU exposes VT-x or AMD-V
pub struct CpuVirtualizationCheck {
    pub points: i32,
}

impl ReadinessCheck for CpuVirtualizationCheck {
    fn name(&self) -> &str {
        "cpu-virtualization"
    }

    fn points(&self) -> i32 {
        self.points
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        match probe.read_file(Path::new("/proc/cpuinfo")) {
            Some(cpuinfo) if has_virtualization_flags(&cpuinfo) => {
                CheckOutcome::pass("CPU virtualization (VT-x/AMD-V) is enabled")
            }
            Some(_) => CheckOutcome::fail("CPU virtualization is disabled in firmware or unsupported"),
            None => CheckOutcome::unknown("Unable to read CPU flags"),
        }
    }
}

/// kvm_intel or kvm_amd is loaded
pub struct KvmModuleCheck {
    pub points: i32,
}

impl ReadinessCheck for KvmModuleCheck {
    fn name(&self) -> &str {
        "kvm-module"
    }

    fn points(&self) -> i32 {
        self.points
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        let output = match probe.run("lsmod", &[]) {
            Ok(output) => output,
            Err(_) => return CheckOutcome::unknown("Unable to list kernel modules"),
        };
        let modules = loaded_modules(&output.stdout);
        if modules.contains("kvm_intel") || modules.contains("kvm_amd") {
            CheckOutcome::pass("KVM kernel module is loaded")
        } else {
            CheckOutcome::fail("KVM kernel module is not loaded")
        }
    }
}

/// /dev/kvm is present
pub struct KvmDeviceCheck {
    pub points: i32,
}

impl ReadinessCheck for KvmDeviceCheck {
    fn name(&self) -> &str {
        "kvm-device"
    }

    fn points(&self) -> i32 {
        self.points
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        if probe.path_exists(Path::new("/dev/kvm")) {
            CheckOutcome::pass("/dev/kvm is available")
        } else {
            CheckOutcome::fail("/dev/kvm does not exist")
        }
    }
}

/// Classifies `systemctl status libvirtd` text.
/// Text matching none of the known states is `ProbeIndeterminate`.
pub fn classify_libvirtd(status_text: &str) -> Result<CheckOutcome> {
    if status_text.contains("active (running)") {
        Ok(CheckOutcome::pass("Libvirt daemon is enabled and running"))
    } else if status_text.contains("enabled") {
        Ok(CheckOutcome::pass("Libvirt daemon is enabled"))
    } else if ["inactive", "disabled", "could not be found", "failed"]
        .iter()
        .any(|pattern| status_text.contains(pattern))
    {
        Ok(CheckOutcome::fail("Libvirt daemon is disabled or not working"))
    } else {
        Err(CompatError::ProbeIndeterminate {
            check: "libvirtd".to_string(),
            message: "no known service state in systemctl output".to_string(),
        })
    }
}

/// libvirtd is running or at least enabled
pub struct LibvirtDaemonCheck {
    pub points: i32,
}

impl ReadinessCheck for LibvirtDaemonCheck {
    fn name(&self) -> &str {
        "libvirtd"
    }

    fn points(&self) -> i32 {
        self.points
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        match probe.run("systemctl", &["status", "libvirtd"]) {
            // systemctl exits non-zero for inactive units, the text still tells us why
            Ok(output) => classify_libvirtd(&format!("{}\n{}", output.stdout, output.stderr))
                .unwrap_or_else(|e| {
                    debug!("{}", e);
                    CheckOutcome::unknown("Unable to determine status of libvirtd")
                }),
            Err(_) => CheckOutcome::unknown("Unable to determine status of libvirtd"),
        }
    }
}

/// A required binary is on PATH
pub struct PackageCheck {
    pub id: &'static str,
    pub binary: &'static str,
    pub package: &'static str, // Package that ships the binary, for the message
    pub points: i32,
}

impl ReadinessCheck for PackageCheck {
    fn name(&self) -> &str {
        self.id
    }

    fn points(&self) -> i32 {
        self.points
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        match probe.run("which", &[self.binary]) {
            Ok(output) if output.success => {
                CheckOutcome::pass(format!("{} is installed", self.package))
            }
            Ok(_) => CheckOutcome::fail(format!("{} is not installed ({} not found)", self.package, self.binary)),
            Err(_) => {
                let fallback = Path::new("/usr/bin").join(self.binary);
                if probe.path_exists(&fallback) {
                    CheckOutcome::pass(format!("{} is installed", self.package))
                } else {
                    CheckOutcome::unknown(format!("Couldn't check whether {} is installed", self.package))
                }
            }
        }
    }
}

/// Current user belongs to one of the given groups
pub struct GroupMembershipCheck {
    pub groups: &'static [&'static str],
    pub points: i32,
}

impl ReadinessCheck for GroupMembershipCheck {
    fn name(&self) -> &str {
        "groups"
    }

    fn points(&self) -> i32 {
        self.points
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        let wanted = self.groups.join("/");
        match probe.run("id", &["-nG"]) {
            Ok(output) if output.success => {
                let member = output
                    .stdout
                    .split_whitespace()
                    .any(|group| self.groups.contains(&group));
                if member {
                    CheckOutcome::pass(format!("User is a member of the {} group", wanted))
                } else {
                    CheckOutcome::fail(format!("User is not in the {} group", wanted))
                }
            }
            _ => CheckOutcome::unknown("Couldn't read group membership"),
        }
    }
}

/// Running kernel is recent enough
pub struct KernelVersionCheck {
    pub threshold: KernelThreshold,
    pub points: i32,
}

impl ReadinessCheck for KernelVersionCheck {
    fn name(&self) -> &str {
        "kernel-version"
    }

    fn points(&self) -> i32 {
        self.points
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        let version = detect_kernel_version(probe);
        let minimum = format!("{}.{}", self.threshold.major, self.threshold.minor);
        if !version.is_known() {
            CheckOutcome::unknown("Kernel version could not be determined")
        } else if version.meets(self.threshold) {
            CheckOutcome::pass(format!("Kernel {} meets the {} minimum", version.full_version, minimum))
        } else {
            CheckOutcome::fail(format!("Kernel {} is older than {}", version.full_version, minimum))
        }
    }
}

/// IOMMU groups are populated
pub struct IommuCheck {
    pub points: i32,
}

impl ReadinessCheck for IommuCheck {
    fn name(&self) -> &str {
        "iommu"
    }

    fn points(&self) -> i32 {
        self.points
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        if let Some(groups) = probe.dir_entry_count(Path::new("/sys/kernel/iommu_groups")) {
            if groups > 0 {
                return CheckOutcome::pass(format!("IOMMU is enabled ({} groups)", groups));
            }
        }

        match probe.read_file(Path::new("/proc/cmdline")) {
            Some(cmdline) if cmdline.contains("intel_iommu=on") || cmdline.contains("amd_iommu=on") => {
                CheckOutcome::unknown("IOMMU is requested on the kernel command line but no groups are visible")
            }
            Some(_) => CheckOutcome::fail("IOMMU is not enabled"),
            None => CheckOutcome::unknown("Couldn't determine IOMMU status"),
        }
    }
}

/// vfio_pci, vfio_pci_core and vfio_iommu_type1 are loaded
pub struct VfioModulesCheck {
    pub points: i32,
}

impl VfioModulesCheck {
    const REQUIRED: [&'static str; 3] = ["vfio_pci", "vfio_pci_core", "vfio_iommu_type1"];
}

impl ReadinessCheck for VfioModulesCheck {
    fn name(&self) -> &str {
        "vfio-modules"
    }

    fn points(&self) -> i32 {
        self.points
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        let output = match probe.run("lsmod", &[]) {
            Ok(output) => output,
            Err(_) => return CheckOutcome::unknown("Kernel set up could not be evaluated"),
        };
        let modules = loaded_modules(&output.stdout);
        let missing: Vec<&str> = Self::REQUIRED
            .iter()
            .copied()
            .filter(|module| !modules.contains(module))
            .collect();

        if missing.is_empty() {
            CheckOutcome::pass("Kernel set up correctly")
        } else {
            CheckOutcome::fail(format!("Kernel is not set up correctly (missing {})", missing.join(", ")))
        }
    }
}

/// Booted through UEFI firmware
pub struct UefiBootCheck {
    pub points: i32,
}

impl ReadinessCheck for UefiBootCheck {
    fn name(&self) -> &str {
        "uefi"
    }

    fn points(&self) -> i32 {
        self.points
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        if probe.path_exists(Path::new("/sys/firmware/efi")) {
            CheckOutcome::pass("Booted in UEFI mode")
        } else {
            CheckOutcome::fail("Booted in legacy BIOS mode")
        }
    }
}

/// Some device ids are handed to vfio-pci at boot
pub struct DeviceStubbingCheck {
    pub points: i32,
}

impl ReadinessCheck for DeviceStubbingCheck {
    fn name(&self) -> &str {
        "stubbing"
    }

    fn points(&self) -> i32 {
        self.points
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        let cmdline = probe.read_file(Path::new("/proc/cmdline"));
        let modprobe = probe.read_file(Path::new("/etc/modprobe.d/vfio.conf"));

        if cmdline.as_deref().is_some_and(|c| c.contains("vfio-pci.ids=")) {
            return CheckOutcome::pass("Devices are stubbed via the kernel command line");
        }
        let modprobe_stubs = modprobe.as_deref().is_some_and(|conf| {
            conf.lines()
                .map(str::trim)
                .any(|line| line.starts_with("options vfio-pci") && line.contains("ids="))
        });
        if modprobe_stubs {
            return CheckOutcome::pass("Devices are stubbed via modprobe configuration");
        }

        if cmdline.is_some() || modprobe.is_some() {
            CheckOutcome::fail("No devices are bound to vfio-pci at boot")
        } else {
            CheckOutcome::unknown("Couldn't determine device stubbing")
        }
    }
}

/// At least one USB device is attached
pub struct UsbDevicesCheck {
    pub points: i32,
}

impl ReadinessCheck for UsbDevicesCheck {
    fn name(&self) -> &str {
        "usb-devices"
    }

    fn points(&self) -> i32 {
        self.points
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        match probe.run("lsusb", &[]) {
            Ok(output) => {
                let count = parse_lsusb(&output.stdout).len();
                if count > 0 {
                    CheckOutcome::pass(format!("{} USB devices detected", count))
                } else {
                    CheckOutcome::fail("No USB devices detected")
                }
            }
            Err(_) => CheckOutcome::unknown("Couldn't list USB devices"),
        }
    }
}

/// The user's AutoPilot boot script exists and carries the expected markers
pub struct BootScriptCheck {
    pub repo_root: PathBuf,
    pub required_marker: Option<&'static str>, // Extra marker besides APC-RUN
    pub points: i32,
}

impl BootScriptCheck {
    fn locate_script(&self, probe: &dyn SystemProbe) -> Option<PathBuf> {
        BOOT_SCRIPT_POINTERS.iter().find_map(|pointer| {
            probe
                .read_file(&self.repo_root.join(pointer))
                .map(|target| self.repo_root.join(target.trim()))
        })
    }
}

impl ReadinessCheck for BootScriptCheck {
    fn name(&self) -> &str {
        "boot-script"
    }

    fn points(&self) -> i32 {
        self.points
    }

    // A missing or foreign script is a warning, not a defect of the host
    fn penalty(&self) -> i32 {
        0
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        let contents = match self.locate_script(probe).and_then(|path| probe.read_file(&path)) {
            Some(contents) => contents,
            None => return CheckOutcome::unknown("Couldn't find compatible boot config script"),
        };

        if !contents.contains(AUTOPILOT_MARKER) {
            return CheckOutcome::fail("Boot config script was not generated by AutoPilot");
        }
        match self.required_marker {
            Some(marker) if !contents.contains(marker) => {
                CheckOutcome::fail(format!("Boot config script has no {} section", marker))
            }
            _ => CheckOutcome::pass("Compatible boot config script found"),
        }
    }
}

/// Files an intact repository checkout ships, relative to the repo root
pub const REPO_INTEGRITY_FILES: &[&str] = &[
    "scripts/autopilot.py",
    "scripts/vfio-ids.py",
    "scripts/vfio-pci.py",
    "resources/baseConfig",
    "ovmf/OVMF_CODE.fd",
    "resources/oc_store/compat_new/OpenCore.qcow2",
];

/// The repository checkout still holds the files the boot tooling needs
pub struct RepoIntegrityCheck {
    pub repo_root: PathBuf,
    pub points: i32,
}

impl ReadinessCheck for RepoIntegrityCheck {
    fn name(&self) -> &str {
        "repo-integrity"
    }

    fn points(&self) -> i32 {
        self.points
    }

    // A damaged checkout is a warning, not a defect of the host
    fn penalty(&self) -> i32 {
        0
    }

    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome {
        if !probe.path_exists(&self.repo_root) {
            return CheckOutcome::unknown(format!(
                "Repository not found at {}",
                self.repo_root.display()
            ));
        }

        let missing: Vec<&str> = REPO_INTEGRITY_FILES
            .iter()
            .copied()
            .filter(|file| !probe.path_exists(&self.repo_root.join(file)))
            .collect();
        if missing.is_empty() {
            CheckOutcome::pass("Repository file integrity intact")
        } else {
            debug!("Missing repository files: {:?}", missing);
            CheckOutcome::fail(format!("Repository file integrity damaged (missing {})", missing.join(", ")))
        }
    }
}

/// Basic KVM readiness
pub fn kvm_suite(config: &Config) -> Vec<Box<dyn ReadinessCheck>> {
    vec![
        Box::new(CpuVirtualizationCheck { points: 2 }),
        Box::new(KvmModuleCheck { points: 2 }),
        Box::new(KvmDeviceCheck { points: 1 }),
        Box::new(LibvirtDaemonCheck { points: 1 }),
        Box::new(PackageCheck {
            id: "qemu",
            binary: "qemu-system-x86_64",
            package: "QEMU",
            points: 1,
        }),
        Box::new(GroupMembershipCheck {
            groups: &["kvm", "libvirt"],
            points: 1,
        }),
        Box::new(KernelVersionCheck {
            threshold: config.min_kernel,
            points: 1,
        }),
        Box::new(RepoIntegrityCheck {
            repo_root: config.repo_root.clone(),
            points: 1,
        }),
    ]
}

/// VFIO-PCI passthrough readiness
pub fn vfio_suite(config: &Config) -> Vec<Box<dyn ReadinessCheck>> {
    vec![
        Box::new(CpuVirtualizationCheck { points: 1 }),
        Box::new(IommuCheck { points: 2 }),
        Box::new(VfioModulesCheck { points: 2 }),
        Box::new(UefiBootCheck { points: 1 }),
        Box::new(DeviceStubbingCheck { points: 2 }),
        Box::new(LibvirtDaemonCheck { points: 1 }),
        Box::new(KernelVersionCheck {
            threshold: config.min_kernel,
            points: 1,
        }),
    ]
}

/// USB passthrough readiness
pub fn usb_suite(config: &Config) -> Vec<Box<dyn ReadinessCheck>> {
    vec![
        Box::new(PackageCheck {
            id: "usbutils",
            binary: "lsusb",
            package: "usbutils",
            points: 3,
        }),
        Box::new(UsbDevicesCheck { points: 3 }),
        Box::new(BootScriptCheck {
            repo_root: config.repo_root.clone(),
            required_marker: Some(USB_MARKER),
            points: 2,
        }),
        Box::new(LibvirtDaemonCheck { points: 2 }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::probe::CannedProbe;
    use crate::core::readiness::{CheckStatus, ReadinessTier, Suite};
    use crate::core::readiness::{run_suite, score};
    use crate::utils::CommandOutput;

    const LSMOD_VFIO: &str = "Module                  Size  Used by\n\
        vfio_pci               16384  0\n\
        vfio_pci_core          94208  1 vfio_pci\n\
        vfio_iommu_type1       45056  0\n\
        kvm_amd               204800  0\n\
        kvm                  1376256  1 kvm_amd\n";

    fn ready_kvm_host() -> CannedProbe {
        CannedProbe::new()
            .with_file("/proc/cpuinfo", "vendor_id\t: AuthenticAMD\nflags\t\t: fpu svm sse\n")
            .with_command("lsmod", CommandOutput::ok(LSMOD_VFIO))
            .with_path("/dev/kvm")
            .with_command(
                "systemctl status libvirtd",
                CommandOutput::ok("● libvirtd.service\n   Active: active (running) since Mon"),
            )
            .with_command("which qemu-system-x86_64", CommandOutput::ok("/usr/bin/qemu-system-x86_64\n"))
            .with_command("id -nG", CommandOutput::ok("user wheel kvm libvirt\n"))
            .with_command("uname -r", CommandOutput::ok("6.8.0-45-generic\n"))
            .with_command("lspci", CommandOutput::ok("01:00.0 VGA compatible controller: NVIDIA Corporation GK107 [GeForce GTX 650] (rev a1)\n"))
            .with_intact_repo(".")
    }

    fn broken_kvm_host() -> CannedProbe {
        CannedProbe::new()
            .with_file("/proc/cpuinfo", "vendor_id\t: GenuineIntel\nflags\t\t: fpu sse\n")
            .with_command("lsmod", CommandOutput::ok("Module                  Size  Used by\nsnd 1 0\n"))
            .with_command(
                "systemctl status libvirtd",
                CommandOutput::failed("Unit libvirtd.service could not be found."),
            )
            .with_command("which qemu-system-x86_64", CommandOutput::failed(""))
            .with_command("id -nG", CommandOutput::ok("user wheel\n"))
            .with_command("uname -r", CommandOutput::ok("4.15.0-20-generic\n"))
            .with_command("lspci", CommandOutput::ok(""))
            .with_path(".")
    }

    trait IntactRepo {
        fn with_intact_repo(self, root: &str) -> Self;
    }

    impl IntactRepo for CannedProbe {
        fn with_intact_repo(self, root: &str) -> Self {
            REPO_INTEGRITY_FILES
                .iter()
                .fold(self.with_path(root), |probe, file| probe.with_path(Path::new(root).join(file)))
        }
    }

    #[test]
    fn libvirtd_status_patterns() {
        assert_eq!(classify_libvirtd("Active: active (running)").unwrap().status, CheckStatus::Pass);
        assert_eq!(
            classify_libvirtd("Loaded: loaded (/usr/lib/systemd/system/libvirtd.service; enabled)")
                .unwrap()
                .status,
            CheckStatus::Pass
        );
        assert_eq!(classify_libvirtd("Active: inactive (dead)").unwrap().status, CheckStatus::Fail);
        assert!(matches!(
            classify_libvirtd("something unexpected"),
            Err(CompatError::ProbeIndeterminate { .. })
        ));

        let probe = CannedProbe::new()
            .with_command("systemctl status libvirtd", CommandOutput::ok("something unexpected"));
        let outcome = LibvirtDaemonCheck { points: 2 }.run(&probe);
        assert_eq!(outcome.status, CheckStatus::Unknown);
    }

    #[test]
    fn every_suite_tops_out_at_ten() {
        let config = Config::default();
        for suite in Suite::ALL {
            assert_eq!(suite.max_score(&config), 10, "suite {}", suite);
        }
    }

    #[test]
    fn fully_ready_kvm_host_is_ready() {
        let report = run_suite(Suite::Kvm, &Config::default(), &ready_kvm_host());
        assert!(report.results.iter().all(|r| r.status == CheckStatus::Pass), "{:?}", report.results);
        assert_eq!(report.total, 10);
        assert_eq!(report.tier, ReadinessTier::Ready);
        assert_eq!(report.suite, Some(Suite::Kvm));
    }

    #[test]
    fn fully_broken_kvm_host_is_not_ready() {
        let report = run_suite(Suite::Kvm, &Config::default(), &broken_kvm_host());
        assert!(report.results.iter().all(|r| r.status == CheckStatus::Fail), "{:?}", report.results);
        assert_eq!(report.total, -7);
        assert_eq!(report.tier, ReadinessTier::NotReady);
    }

    #[test]
    fn missing_commands_degrade_to_unknown() {
        // Only the cpuinfo file is available, every command is missing
        let probe = CannedProbe::new()
            .with_file("/proc/cpuinfo", "flags\t\t: vmx\n");
        let report = score(&kvm_suite(&Config::default()), &probe, false);

        assert_eq!(report.results.len(), 8);
        assert_eq!(report.status_of("cpu-virtualization"), Some(CheckStatus::Pass));
        assert_eq!(report.status_of("kvm-module"), Some(CheckStatus::Unknown));
        assert_eq!(report.status_of("libvirtd"), Some(CheckStatus::Unknown));
        assert_eq!(report.status_of("qemu"), Some(CheckStatus::Unknown));
        assert_eq!(report.status_of("groups"), Some(CheckStatus::Unknown));
        assert_eq!(report.status_of("kernel-version"), Some(CheckStatus::Unknown));
        assert_eq!(report.status_of("repo-integrity"), Some(CheckStatus::Unknown));
        // /dev/kvm is a plain existence check
        assert_eq!(report.status_of("kvm-device"), Some(CheckStatus::Fail));
        assert_eq!(report.total, 2 - 1);
    }

    #[test]
    fn virtualized_host_forces_unsupported() {
        let probe = ready_kvm_host().with_command(
            "lspci",
            CommandOutput::ok("00:01.0 VGA compatible controller: Device 1234:1111 (rev 02) Bochs\n"),
        );
        let report = run_suite(Suite::Kvm, &Config::default(), &probe);
        assert!(report.virtualized);
        assert_eq!(report.total, 0);
        assert_eq!(report.tier, ReadinessTier::Unsupported);
    }

    #[test]
    fn vfio_modules_lists_what_is_missing() {
        let probe = CannedProbe::new()
            .with_command("lsmod", CommandOutput::ok("Module Size Used\nvfio_pci 1 0\n"));
        let outcome = VfioModulesCheck { points: 2 }.run(&probe);
        assert_eq!(outcome.status, CheckStatus::Fail);
        assert!(outcome.message.contains("vfio_pci_core"));
        assert!(outcome.message.contains("vfio_iommu_type1"));
    }

    #[test]
    fn iommu_requested_but_not_active_is_unknown() {
        let probe = CannedProbe::new()
            .with_dir("/sys/kernel/iommu_groups", 0)
            .with_file("/proc/cmdline", "BOOT_IMAGE=/vmlinuz quiet intel_iommu=on");
        assert_eq!(IommuCheck { points: 2 }.run(&probe).status, CheckStatus::Unknown);

        let populated = CannedProbe::new().with_dir("/sys/kernel/iommu_groups", 24);
        assert_eq!(IommuCheck { points: 2 }.run(&populated).status, CheckStatus::Pass);

        let off = CannedProbe::new().with_file("/proc/cmdline", "BOOT_IMAGE=/vmlinuz quiet");
        assert_eq!(IommuCheck { points: 2 }.run(&off).status, CheckStatus::Fail);
    }

    #[test]
    fn stubbing_via_modprobe_config() {
        let probe = CannedProbe::new()
            .with_file("/proc/cmdline", "quiet")
            .with_file("/etc/modprobe.d/vfio.conf", "options vfio-pci ids=10de:0fc6,10de:0e1b\n");
        assert_eq!(DeviceStubbingCheck { points: 2 }.run(&probe).status, CheckStatus::Pass);

        let none = CannedProbe::new().with_file("/proc/cmdline", "quiet");
        assert_eq!(DeviceStubbingCheck { points: 2 }.run(&none).status, CheckStatus::Fail);
    }

    #[test]
    fn repo_integrity_needs_every_file() {
        let check = RepoIntegrityCheck {
            repo_root: PathBuf::from("/repo"),
            points: 1,
        };

        let intact = CannedProbe::new().with_intact_repo("/repo");
        assert_eq!(check.run(&intact).status, CheckStatus::Pass);

        let damaged = REPO_INTEGRITY_FILES
            .iter()
            .filter(|file| **file != "ovmf/OVMF_CODE.fd")
            .fold(CannedProbe::new().with_path("/repo"), |probe, file| {
                probe.with_path(Path::new("/repo").join(file))
            });
        let outcome = check.run(&damaged);
        assert_eq!(outcome.status, CheckStatus::Fail);
        assert!(outcome.message.contains("ovmf/OVMF_CODE.fd"));
        assert_eq!(check.delta(outcome.status), 0);

        let absent = CannedProbe::new();
        assert_eq!(check.run(&absent).status, CheckStatus::Unknown);
    }

    #[test]
    fn boot_script_needs_usb_marker() {
        let check = BootScriptCheck {
            repo_root: PathBuf::from("/repo"),
            required_marker: Some(USB_MARKER),
            points: 2,
        };

        let missing = CannedProbe::new();
        assert_eq!(check.run(&missing).status, CheckStatus::Unknown);
        assert_eq!(check.delta(CheckStatus::Fail), 0);

        let without_marker = CannedProbe::new()
            .with_file("/repo/blobs/user/USR_CFG.apb", "boot-macOS.sh\n")
            .with_file("/repo/boot-macOS.sh", "#!/bin/bash\n# APC-RUN\n");
        assert_eq!(check.run(&without_marker).status, CheckStatus::Fail);

        let valid = CannedProbe::new()
            .with_file("/repo/blobs/USR_CFG.apb", "boot-macOS.sh")
            .with_file("/repo/boot-macOS.sh", "#!/bin/bash\n# APC-RUN\n#USB_DEV_BEGIN\n");
        assert_eq!(check.run(&valid).status, CheckStatus::Pass);
    }
}
