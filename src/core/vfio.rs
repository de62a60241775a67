// VFIO id helper for Exliar Compat
//
// Lists the PCI functions that are usually handed to a guest together with a
// GPU (display and audio functions) and turns their ids into the kernel
// command line and modprobe snippets that stub them to vfio-pci at boot.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// Device classes worth stubbing for GPU passthrough
const CANDIDATE_CLASSES: &[&str] = &[
    "VGA compatible controller",
    "3D controller",
    "Display controller",
    "Audio device",
];

/// Soft dependencies so vfio-pci claims devices before the graphics drivers
pub const SOFTDEP_LINES: &[&str] = &[
    "softdep drm pre: vfio-pci",
    "softdep amdgpu pre: vfio-pci",
    "softdep nouveau pre: vfio-pci",
    "softdep radeon pre: vfio-pci",
    "softdep nvidia pre: vfio-pci",
    "softdep i915 pre: vfio-pci",
];

fn vendor_device_id() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([0-9a-fA-F]{4}:[0-9a-fA-F]{4})\]").expect("static id pattern"))
}

/// A PCI function that may be passed through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassthroughCandidate {
    pub bdf: String,         // Bus:Device.Function address, e.g. "01:00.0"
    pub class: String,       // e.g. "VGA compatible controller"
    pub description: String, // Rest of the lspci line
    pub id: String,          // "vvvv:dddd", lowercase
}

/// Picks display and audio functions out of `lspci -nn` output
pub fn passthrough_candidates(lspci_nn: &str) -> Vec<PassthroughCandidate> {
    lspci_nn
        .lines()
        .filter_map(parse_candidate_line)
        .collect()
}

fn parse_candidate_line(line: &str) -> Option<PassthroughCandidate> {
    let class = CANDIDATE_CLASSES.iter().find(|class| line.contains(*class))?;

    // The vendor:device id is the last [xxxx:xxxx] on the line;
    // subsystem ids never use that form in -nn output
    let id = vendor_device_id()
        .captures_iter(line)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())?;

    let (bdf, rest) = line.split_once(' ')?;
    let description = rest
        .split_once(": ")
        .map(|(_, desc)| desc)
        .unwrap_or(rest)
        .trim()
        .to_string();

    debug!("VFIO candidate {} [{}] {}", bdf, id, class);
    Some(PassthroughCandidate {
        bdf: bdf.to_string(),
        class: class.to_string(),
        description,
        id,
    })
}

/// Unique ids in first-seen order
pub fn unique_ids(candidates: &[PassthroughCandidate]) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .iter()
        .filter(|c| seen.insert(c.id.clone()))
        .map(|c| c.id.clone())
        .collect()
}

/// Kernel command line argument stubbing the given ids
pub fn vfio_kernel_arg(ids: &[String]) -> String {
    format!("vfio-pci.ids={}", ids.join(","))
}

/// `options vfio-pci` line for /etc/modprobe.d/vfio.conf
pub fn modprobe_options_line(ids: &[String]) -> String {
    // disable_vga=1 keeps vfio-pci off the VGA arbiter for the boot GPU
    format!("options vfio-pci ids={} disable_vga=1", ids.join(","))
}

/// Merges the vfio-pci options and softdeps into an existing vfio.conf.
///
/// An existing `options vfio-pci` line is replaced, later duplicates are
/// commented out, and missing softdep lines are appended. Other lines are
/// kept untouched.
pub fn merge_vfio_conf(current: &str, ids: &[String]) -> String {
    let options_line = modprobe_options_line(ids);
    let mut lines = Vec::new();
    let mut options_written = false;
    let mut existing_softdeps = HashSet::new();

    for line in current.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("options vfio-pci") {
            if options_written {
                lines.push(format!("# {}", line));
            } else {
                lines.push(options_line.clone());
                options_written = true;
            }
        } else {
            if trimmed.starts_with("softdep ") && trimmed.contains(" pre: vfio-pci") {
                existing_softdeps.insert(trimmed.to_string());
            }
            lines.push(line.to_string());
        }
    }

    if !options_written {
        lines.push(options_line);
    }
    for softdep in SOFTDEP_LINES {
        if !existing_softdeps.contains(*softdep) {
            lines.push(softdep.to_string());
        }
    }

    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    const LSPCI_NN: &str = "\
00:02.0 VGA compatible controller [0300]: Intel Corporation CometLake-S GT2 [UHD Graphics 630] [8086:3e92] (rev 05)
00:1f.3 Audio device [0403]: Intel Corporation Comet Lake PCH cAVS [8086:06c8]
00:14.0 USB controller [0c03]: Intel Corporation Comet Lake USB 3.1 xHCI Host Controller [8086:06ed]
01:00.0 VGA compatible controller [0300]: NVIDIA Corporation GK107 [GeForce GTX 650] [10DE:0FC6] (rev a1)
01:00.1 Audio device [0403]: NVIDIA Corporation GK107 HDMI Audio Controller [10de:0e1b] (rev a1)
";

    #[test]
    fn picks_display_and_audio_functions() {
        let candidates = passthrough_candidates(LSPCI_NN);
        let bdfs: Vec<&str> = candidates.iter().map(|c| c.bdf.as_str()).collect();
        assert_eq!(bdfs, vec!["00:02.0", "00:1f.3", "01:00.0", "01:00.1"]);

        let gpu = &candidates[2];
        assert_eq!(gpu.id, "10de:0fc6");
        assert_eq!(gpu.class, "VGA compatible controller");
        assert!(gpu.description.starts_with("NVIDIA Corporation GK107"));
    }

    #[test]
    fn kernel_and_modprobe_snippets() {
        let ids = vec!["10de:0fc6".to_string(), "10de:0e1b".to_string()];
        assert_eq!(vfio_kernel_arg(&ids), "vfio-pci.ids=10de:0fc6,10de:0e1b");
        assert_eq!(
            modprobe_options_line(&ids),
            "options vfio-pci ids=10de:0fc6,10de:0e1b disable_vga=1"
        );
    }

    #[test]
    fn unique_ids_keep_first_seen_order() {
        let mut candidates = passthrough_candidates(LSPCI_NN);
        candidates.push(candidates[2].clone());
        let ids = unique_ids(&candidates);
        assert_eq!(ids, vec!["8086:3e92", "8086:06c8", "10de:0fc6", "10de:0e1b"]);
    }

    #[test]
    fn merge_replaces_options_and_adds_softdeps() {
        let current = "# managed by hand\noptions vfio-pci ids=1002:67df\noptions vfio-pci ids=dead:beef\nsoftdep drm pre: vfio-pci\n";
        let ids = vec!["10de:0fc6".to_string()];
        let merged = merge_vfio_conf(current, &ids);

        assert!(merged.starts_with("# managed by hand\noptions vfio-pci ids=10de:0fc6 disable_vga=1\n"));
        assert!(merged.contains("# options vfio-pci ids=dead:beef"));
        assert_eq!(merged.matches("softdep drm pre: vfio-pci").count(), 1);
        assert!(merged.contains("softdep nvidia pre: vfio-pci"));

        // Merging twice is stable
        assert_eq!(merge_vfio_conf(&merged, &ids), merged);
    }
}
