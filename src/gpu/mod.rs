// GPU compatibility module for Exliar Compat
//
// This module handles GPU detection on the host and classification of the
// detected devices against the macOS compatibility table

pub mod classify;
pub mod codename;
pub mod detection;
pub mod table;

use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::gpu::codename::OsVersion;

/// Whether macOS supports a GPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportStatus {
    Supported,
    Unsupported,
    Problematic, // Works with caveats, or support is unclear
}

impl SupportStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SupportStatus::Supported => "Supported",
            SupportStatus::Unsupported => "Unsupported",
            SupportStatus::Problematic => "Problematic",
        }
    }
}

impl fmt::Display for SupportStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// The table stores `true`/`false`; anything else means problematic
impl<'de> Deserialize<'de> for SupportStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Bool(true) => SupportStatus::Supported,
            serde_json::Value::Bool(false) => SupportStatus::Unsupported,
            _ => SupportStatus::Problematic,
        })
    }
}

/// Quirk note sentinel for "no quirks"
pub const QUIRKS_NONE: &str = "0";

/// Quirk note sentinel for "not supported at all"
pub const QUIRKS_UNSUPPORTED: &str = "-1";

/// One entry of the compatibility table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GpuRecord {
    #[serde(rename = "name")]
    pub match_token: String, // Substring searched for in detected device strings
    #[serde(rename = "fullName")]
    pub display_name: String,
    pub vendor: String,
    pub supported: SupportStatus,
    #[serde(rename = "minOS")]
    pub min_os: OsVersion,
    #[serde(rename = "maxOS")]
    pub max_os: OsVersion,
    #[serde(default = "default_quirks")]
    pub quirks: String,
    #[serde(default)]
    pub ids: Vec<String>, // Optional "vvvv:dddd" ids for strict matching
}

fn default_quirks() -> String {
    QUIRKS_NONE.to_string()
}

impl GpuRecord {
    /// Human readable quirk note
    pub fn quirks_message(&self) -> &str {
        match self.quirks.trim() {
            QUIRKS_NONE => "This GPU should work fine.",
            QUIRKS_UNSUPPORTED => "This GPU is NOT supported in macOS at all. Sorry :[",
            _ => &self.quirks,
        }
    }

    /// Whether the record lists the given vendor:device id
    pub fn has_id(&self, pci_id: &str) -> bool {
        self.ids.iter().any(|id| id.eq_ignore_ascii_case(pci_id))
    }
}

/// A display device found on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedDevice {
    pub label: String,          // Last bracketed substring of the lspci line, brackets kept
    pub pci_id: Option<String>, // "vvvv:dddd" when lspci reported it
}

impl DetectedDevice {
    /// A device known only by its label, e.g. a manually entered model
    pub fn from_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pci_id: None,
        }
    }
}
