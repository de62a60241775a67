// macOS version codes and codenames
//
// Table records carry their OS bounds either as integer codes (-1, 9999,
// 1013, 11) or as dotted strings ("10.13.6"). Both decode to an OsVersion,
// which is rendered through an explicit release table since the legacy
// codenames follow no numeric pattern.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::config::LatestOs;

/// Sentinel code for "not applicable"
pub const NOT_APPLICABLE_CODE: i64 = -1;

/// Sentinel code for "still supported by the latest release"
pub const LATEST_CODE: i64 = 9999;

/// Known releases, oldest first
const RELEASES: &[(&str, &str)] = &[
    ("10.2", "Jaguar"),
    ("10.3", "Panther"),
    ("10.4", "Tiger"),
    ("10.5", "Leopard"),
    ("10.6", "Snow Leopard"),
    ("10.7", "Lion"),
    ("10.8", "Mountain Lion"),
    ("10.9", "Mavericks"),
    ("10.10", "Yosemite"),
    ("10.11", "El Capitan"),
    ("10.12", "Sierra"),
    ("10.13", "High Sierra"),
    ("10.14", "Mojave"),
    ("10.15", "Catalina"),
    ("11", "Big Sur"),
    ("12", "Monterey"),
    ("13", "Ventura"),
    ("14", "Sonoma"),
    ("15", "Sequoia"),
];

/// An OS bound from the compatibility table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OsVersion {
    NotApplicable,
    Latest,
    Release {
        major: u32,
        minor: Option<u32>,
        patch: Option<u32>,
    },
}

impl OsVersion {
    /// Decodes an integer code: 1013 is 10.13, 11 is 11
    pub fn from_code(code: i64) -> Self {
        match code {
            LATEST_CODE => OsVersion::Latest,
            c if c < 0 => OsVersion::NotApplicable,
            c if c >= 1000 => match u32::try_from(c / 100) {
                Ok(major) => OsVersion::Release {
                    major,
                    minor: Some((c % 100) as u32),
                    patch: None,
                },
                Err(_) => OsVersion::NotApplicable,
            },
            c => match u32::try_from(c) {
                Ok(major) => OsVersion::Release {
                    major,
                    minor: None,
                    patch: None,
                },
                Err(_) => OsVersion::NotApplicable,
            },
        }
    }

    /// Decodes a table string: a sentinel code or a dotted version
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Ok(code) = text.parse::<i64>() {
            return Some(Self::from_code(code));
        }

        let mut parts = text.split('.').map(|p| p.parse::<u32>());
        let major = parts.next()?.ok()?;
        let minor = parts.next().transpose().ok()?;
        let patch = parts.next().transpose().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(OsVersion::Release { major, minor, patch })
    }

    /// Dotted version text, e.g. "10.13.6"; empty for the sentinels
    pub fn version_text(&self) -> String {
        match self {
            OsVersion::Release { major, minor, patch } => {
                let mut text = major.to_string();
                if let Some(minor) = minor {
                    text.push_str(&format!(".{}", minor));
                }
                if let Some(patch) = patch {
                    text.push_str(&format!(".{}", patch));
                }
                text
            }
            _ => String::new(),
        }
    }

    /// Whether this is a bounded release at least as new as 10.12 (the first "macOS")
    pub fn is_macos_branding(&self) -> bool {
        match self {
            OsVersion::Release { major, minor, .. } => {
                *major > 10 || (*major == 10 && minor.unwrap_or(0) >= 12)
            }
            OsVersion::Latest => true,
            OsVersion::NotApplicable => false,
        }
    }
}

/// Index of the release a version belongs to.
///
/// Keys are tried newest first and match on a dot boundary, so "10.1" never
/// claims "10.13".
fn release_index(version: &OsVersion) -> Option<usize> {
    let text = match version {
        OsVersion::Release { .. } => version.version_text(),
        _ => return None,
    };
    RELEASES.iter().rposition(|(key, _)| {
        text == *key
            || text
                .strip_prefix(key)
                .is_some_and(|rest| rest.starts_with('.'))
    })
}

/// Codename of a bounded release, if known
pub fn codename(version: &OsVersion) -> Option<&'static str> {
    release_index(version).map(|i| RELEASES[i].1)
}

/// Renders an OS bound for display.
///
/// Known releases render as "High Sierra (10.13)", the latest sentinel as
/// "Latest / Sonoma (14)" and everything else as "N/A".
pub fn render_os(version: &OsVersion, latest: &LatestOs) -> String {
    match version {
        OsVersion::Latest => format!("Latest / {} ({})", latest.name, latest.version),
        OsVersion::NotApplicable => "N/A".to_string(),
        release => match codename(release) {
            Some(name) => format!("{} ({})", name, release.version_text()),
            None => "N/A".to_string(),
        },
    }
}

/// The release following a bounded maximum, as (codename, version key)
pub fn successor(version: &OsVersion) -> Option<(&'static str, &'static str)> {
    let next = release_index(version)? + 1;
    RELEASES.get(next).map(|(key, name)| (*name, *key))
}

/// Branding used in front of a codename ("Mac OS X" before Sierra)
pub fn branding(version: &OsVersion) -> &'static str {
    if version.is_macos_branding() {
        "macOS"
    } else {
        "Mac OS X"
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OsVersion::NotApplicable => write!(f, "{}", NOT_APPLICABLE_CODE),
            OsVersion::Latest => write!(f, "{}", LATEST_CODE),
            release => write!(f, "{}", release.version_text()),
        }
    }
}

struct OsVersionVisitor;

impl<'de> Visitor<'de> for OsVersionVisitor {
    type Value = OsVersion;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "an OS version code such as -1, 9999, 1013 or \"10.13\"")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<OsVersion, E> {
        Ok(OsVersion::from_code(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<OsVersion, E> {
        i64::try_from(value)
            .map(OsVersion::from_code)
            .map_err(|_| E::custom(format!("OS version code {} is out of range", value)))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<OsVersion, E> {
        OsVersion::parse(value).ok_or_else(|| E::custom(format!("invalid OS version \"{}\"", value)))
    }
}

impl<'de> Deserialize<'de> for OsVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(OsVersionVisitor)
    }
}
