// System detection module for Exliar Compat
//
// This module reads the host facts the readiness checks and the dashboard
// need:
// - Kernel version information
// - CPU vendor and hardware virtualization flags
// - Whether we are ourselves running inside a virtual machine

use std::path::Path;

use tracing::{debug, info};

use crate::config::KernelThreshold;
use crate::core::probe::SystemProbe;

/// Device strings in `lspci` output that betray a hypervisor's emulated hardware
const VIRTUAL_HARDWARE_MARKERS: &[&str] = &[
    "VMware",
    "VirtualBox",
    "Oracle",
    "Redhat",
    "RedHat",
    "QEMU",
    "Bochs",
    "Sea BIOS",
    "SeaBIOS",
];

/// Represents the system's CPU vendor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpuVendor {
    AMD,
    Intel,
    Other(String),
}

/// Holds information about the kernel version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
    pub full_version: String,
}

impl KernelVersion {
    /// Whether this kernel is at least the given major.minor
    pub fn meets(&self, threshold: KernelThreshold) -> bool {
        (self.major, self.minor) >= (threshold.major, threshold.minor)
    }

    /// Whether parsing found a real version
    pub fn is_known(&self) -> bool {
        self.major > 0
    }
}

/// Contains the detected system information
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub kernel_version: KernelVersion,
    pub cpu_vendor: CpuVendor,
    pub virtualization_enabled: bool, // vmx/svm flag present
    pub virtualized_host: bool,       // we are a guest ourselves
}

impl SystemInfo {
    /// Detects and collects system information through the given probe
    pub fn detect(probe: &dyn SystemProbe) -> Self {
        let cpuinfo = probe.read_file(Path::new("/proc/cpuinfo")).unwrap_or_default();
        let info = SystemInfo {
            kernel_version: detect_kernel_version(probe),
            cpu_vendor: parse_cpu_vendor(&cpuinfo),
            virtualization_enabled: has_virtualization_flags(&cpuinfo),
            virtualized_host: detect_virtualized_host(probe),
        };
        info!(
            "Kernel {}, CPU {:?}, virtualization {}, guest {}",
            info.kernel_version.full_version,
            info.cpu_vendor,
            info.virtualization_enabled,
            info.virtualized_host
        );
        info
    }

    /// Returns a textual summary of the system information
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str(&format!("Kernel: {}\n", self.kernel_version.full_version));
        summary.push_str(&format!("CPU Vendor: {:?}\n", self.cpu_vendor));
        summary.push_str(&format!("Virtualization: {}\n",
            if self.virtualization_enabled { "Enabled" } else { "Disabled" }));
        if self.virtualized_host {
            summary.push_str("Host: Virtual machine (nested setups are unsupported)\n");
        }

        summary
    }
}

/// Detects the Linux kernel version
pub fn detect_kernel_version(probe: &dyn SystemProbe) -> KernelVersion {
    match probe.run("uname", &["-r"]) {
        Ok(out) if out.success => parse_kernel_version(out.stdout.trim()),
        _ => {
            // Fallback to /proc/version
            if let Some(version) = probe.read_file(Path::new("/proc/version")) {
                if let Some(ver_str) = version.split_whitespace().nth(2) {
                    return parse_kernel_version(ver_str);
                }
            }

            KernelVersion {
                major: 0,
                minor: 0,
                patch: None,
                full_version: "unknown".to_string(),
            }
        }
    }
}

/// Parses kernel version string into components
pub fn parse_kernel_version(version_str: &str) -> KernelVersion {
    let parts: Vec<&str> = version_str.split('.').collect();

    let leading_number = |part: Option<&&str>| -> Option<u32> {
        part.and_then(|v| {
            let digits: String = v.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse::<u32>().ok()
        })
    };

    KernelVersion {
        major: leading_number(parts.first()).unwrap_or(0),
        minor: leading_number(parts.get(1)).unwrap_or(0),
        // Patch might include extra parts like "-generic"
        patch: leading_number(parts.get(2)),
        full_version: version_str.to_string(),
    }
}

/// Reads the CPU vendor from /proc/cpuinfo contents
pub fn parse_cpu_vendor(cpuinfo: &str) -> CpuVendor {
    for line in cpuinfo.lines() {
        if line.starts_with("vendor_id") {
            if line.contains("AuthenticAMD") {
                return CpuVendor::AMD;
            } else if line.contains("GenuineIntel") {
                return CpuVendor::Intel;
            } else if let Some(vendor) = line.split(':').nth(1) {
                return CpuVendor::Other(vendor.trim().to_string());
            }
            break; // Only need the first occurrence
        }
    }

    CpuVendor::Other("Unknown".to_string())
}

/// Checks /proc/cpuinfo contents for the AMD-V (svm) or Intel VT-x (vmx) flag
pub fn has_virtualization_flags(cpuinfo: &str) -> bool {
    cpuinfo
        .lines()
        .find(|line| line.starts_with("flags"))
        .map(|line| line.split_whitespace().any(|flag| flag == "svm" || flag == "vmx"))
        .unwrap_or(false)
}

/// Whether `lspci` output shows a hypervisor's emulated hardware
pub fn lspci_shows_virtual_hardware(lspci_output: &str) -> bool {
    VIRTUAL_HARDWARE_MARKERS
        .iter()
        .any(|marker| lspci_output.contains(marker))
}

/// Detects whether this system is itself a virtual machine.
/// An unavailable `lspci` counts as "not virtualized".
pub fn detect_virtualized_host(probe: &dyn SystemProbe) -> bool {
    match probe.run("lspci", &[]) {
        Ok(out) => {
            let virtualized = lspci_shows_virtual_hardware(&out.stdout);
            debug!("Virtualized host check: {}", virtualized);
            virtualized
        }
        Err(e) => {
            debug!("Virtualized host check skipped: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_distribution_kernel_strings() {
        let version = parse_kernel_version("6.8.0-45-generic");
        assert_eq!(version.major, 6);
        assert_eq!(version.minor, 8);
        assert_eq!(version.patch, Some(0));

        let arch = parse_kernel_version("6.10.10-arch1-1");
        assert_eq!((arch.major, arch.minor, arch.patch), (6, 10, Some(10)));

        let short = parse_kernel_version("5.4");
        assert_eq!(short.patch, None);
    }

    #[test]
    fn garbage_kernel_string_is_unknown() {
        let version = parse_kernel_version("unknown");
        assert!(!version.is_known());
    }

    #[test]
    fn threshold_comparison_is_by_major_then_minor() {
        let threshold = KernelThreshold { major: 4, minor: 19 };
        assert!(parse_kernel_version("4.19.0").meets(threshold));
        assert!(parse_kernel_version("5.0.1").meets(threshold));
        assert!(!parse_kernel_version("4.18.20").meets(threshold));
        assert!(!parse_kernel_version("3.99.0").meets(threshold));
    }

    #[test]
    fn cpu_vendor_and_flags_from_cpuinfo() {
        let cpuinfo = "processor\t: 0\nvendor_id\t: AuthenticAMD\nflags\t\t: fpu vme svm sse\n";
        assert_eq!(parse_cpu_vendor(cpuinfo), CpuVendor::AMD);
        assert!(has_virtualization_flags(cpuinfo));

        let no_virt = "vendor_id\t: GenuineIntel\nflags\t\t: fpu vme sse vmxnet\n";
        assert_eq!(parse_cpu_vendor(no_virt), CpuVendor::Intel);
        assert!(!has_virtualization_flags(no_virt));
    }

    #[test]
    fn recognises_emulated_hardware() {
        let guest = "00:02.0 VGA compatible controller: Red Hat, Inc. QXL paravirtual graphic card (rev 05)\n\
                     00:1f.0 ISA bridge: Intel Corporation 82801IB (ICH9) LPC Interface Controller\n\
                     00:03.0 Unclassified device [00ff]: QEMU Virtual Machine";
        assert!(lspci_shows_virtual_hardware(guest));

        let metal = "01:00.0 VGA compatible controller: NVIDIA Corporation GK107 [GeForce GTX 650] (rev a1)";
        assert!(!lspci_shows_virtual_hardware(metal));
    }
}
