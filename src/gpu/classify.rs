// GPU compatibility classification
//
// Every table record whose match token occurs in the detected device text
// produces a report. All matches are kept, in table order: tokens overlap
// ("RX 570" is inside "RX 5700") and each overlapping record is reported.

use tracing::debug;

use crate::config::{Config, MatchMode};
use crate::gpu::codename::{branding, codename, render_os, successor, OsVersion};
use crate::gpu::detection::search_blob;
use crate::gpu::table::CompatibilityTable;
use crate::gpu::{DetectedDevice, GpuRecord, SupportStatus};

/// Variant markers in device text and the suffix each adds to the display name
const VARIANT_SUFFIXES: &[(&str, &str)] = &[("Ti", " Ti"), ("SUPER", " Super"), ("XT", " XT")];

/// Rendered compatibility of one matched table record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityReport {
    pub record_index: usize, // Position of the record in the table
    pub match_token: String,
    pub display_name: String, // Record name plus variant suffixes
    pub vendor: String,
    pub supported: SupportStatus,
    pub headline: String,         // "Supported up to macOS High Sierra"
    pub max_os: String,           // "High Sierra (10.13)", "Latest / Sonoma (14)", "N/A"
    pub min_os: String,
    pub quirks: String,           // Quirk note with sentinels expanded
    pub end_of_support: Option<String>, // "Not supported by macOS Mojave or later."
}

/// Classifies detected devices against the table.
///
/// In the default joined mode all labels form one search blob, so a token
/// may match text belonging to a neighbouring device. Per-device mode
/// searches each label separately; a record is still reported once.
pub fn classify(
    devices: &[DetectedDevice],
    table: &CompatibilityTable,
    config: &Config,
) -> Vec<CompatibilityReport> {
    if devices.is_empty() {
        return Vec::new();
    }

    let reports: Vec<CompatibilityReport> = match config.match_mode {
        MatchMode::Joined => {
            let blob = search_blob(devices);
            table
                .records()
                .iter()
                .enumerate()
                .filter(|(_, record)| {
                    blob.contains(record.match_token.as_str())
                        || (config.strict_ids && devices_carry_id(devices, record))
                })
                .map(|(index, record)| build_report(index, record, &blob, config))
                .collect()
        }
        MatchMode::PerDevice => table
            .records()
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                devices
                    .iter()
                    .find(|device| {
                        device.label.contains(record.match_token.as_str())
                            || (config.strict_ids && device_carries_id(device, record))
                    })
                    .map(|device| build_report(index, record, &device.label, config))
            })
            .collect(),
    };

    debug!("{} device(s) matched {} table record(s)", devices.len(), reports.len());
    reports
}

/// Classifies a free-form model string, as typed by the user or forced on the command line
pub fn classify_text(text: &str, table: &CompatibilityTable, config: &Config) -> Vec<CompatibilityReport> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let device = DetectedDevice::from_label(text);
    classify(std::slice::from_ref(&device), table, config)
}

/// Normalizes a manually entered model: "RX 580" becomes "Radeon RX 580"
pub fn normalize_manual_model(input: &str) -> String {
    let input = input.trim();
    if input.contains("RX") && !input.contains("Radeon") {
        format!("Radeon {}", input)
    } else {
        input.to_string()
    }
}

/// Headline for the number of matched GPUs
pub fn match_summary(count: usize) -> String {
    match count {
        0 => "I failed to detect any GPUs in your system. Perhaps try entering your GPU model manually.".to_string(),
        1 => "I successfully detected 1 GPU in your system:".to_string(),
        n => format!("I successfully detected {} GPUs in your system:", n),
    }
}

fn device_carries_id(device: &DetectedDevice, record: &GpuRecord) -> bool {
    device.pci_id.as_deref().is_some_and(|id| record.has_id(id))
}

fn devices_carry_id(devices: &[DetectedDevice], record: &GpuRecord) -> bool {
    devices.iter().any(|device| device_carries_id(device, record))
}

fn build_report(index: usize, record: &GpuRecord, matched_text: &str, config: &Config) -> CompatibilityReport {
    debug!("Record {} ({}) matched", index, record.match_token);
    CompatibilityReport {
        record_index: index,
        match_token: record.match_token.clone(),
        display_name: display_name(record, matched_text),
        vendor: record.vendor.clone(),
        supported: record.supported,
        headline: headline(record),
        max_os: render_os(&record.max_os, &config.latest_os),
        min_os: render_os(&record.min_os, &config.latest_os),
        quirks: record.quirks_message().to_string(),
        end_of_support: end_of_support(record),
    }
}

fn display_name(record: &GpuRecord, matched_text: &str) -> String {
    let mut name = record.display_name.clone();
    for (marker, suffix) in VARIANT_SUFFIXES {
        if matched_text.contains(marker) {
            name.push_str(suffix);
        }
    }
    name
}

fn headline(record: &GpuRecord) -> String {
    match record.supported {
        SupportStatus::Supported => match codename(&record.max_os) {
            Some(name) => format!("Supported up to {} {}", branding(&record.max_os), name),
            None => SupportStatus::Supported.label().to_string(),
        },
        status => status.label().to_string(),
    }
}

fn end_of_support(record: &GpuRecord) -> Option<String> {
    if record.supported != SupportStatus::Supported {
        return None;
    }
    let (name, key) = successor(&record.max_os)?;
    let brand = OsVersion::parse(key)
        .map(|version| branding(&version))
        .unwrap_or("macOS");
    Some(format!("Not supported by {} {} or later.", brand, name))
}
