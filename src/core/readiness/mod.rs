// Readiness scoring for Exliar Compat
//
// A readiness suite is a fixed battery of independent host checks. Each check
// reports pass/fail/unknown and contributes a fixed signed delta; the sum is
// bucketed into a readiness tier. Checks never abort each other: a probe that
// cannot decide reports Unknown and contributes nothing.

pub mod checks;

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::probe::SystemProbe;
use crate::core::system::detect_virtualized_host;

/// Score forced on virtualized hosts
pub const OVERRIDE_SCORE: i32 = 0;

/// Number of segments in the rendered score bar; also the score of a full bar
pub const SCORE_BAR_SEGMENTS: i32 = 10;

/// Outcome classification of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    Pass,
    Fail,
    Unknown,
}

impl CheckStatus {
    /// Glyph shown in front of the check description
    pub fn glyph(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "✔",
            CheckStatus::Fail => "✘",
            CheckStatus::Unknown => "⚠",
        }
    }
}

/// What a check observed, before it is scored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub status: CheckStatus,
    pub message: String, // Human readable description of the observation
}

impl CheckOutcome {
    pub fn pass(message: impl Into<String>) -> Self {
        Self { status: CheckStatus::Pass, message: message.into() }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self { status: CheckStatus::Fail, message: message.into() }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self { status: CheckStatus::Unknown, message: message.into() }
    }
}

/// A single host probe taking part in a readiness suite
pub trait ReadinessCheck {
    /// Short identifier of the check
    fn name(&self) -> &str;

    /// Points awarded on pass
    fn points(&self) -> i32;

    /// Delta applied on failure
    fn penalty(&self) -> i32 {
        -1
    }

    /// Runs the probe. Must not panic or error; undecidable means Unknown.
    fn run(&self, probe: &dyn SystemProbe) -> CheckOutcome;

    /// Fixed delta for a status
    fn delta(&self, status: CheckStatus) -> i32 {
        match status {
            CheckStatus::Pass => self.points(),
            CheckStatus::Fail => self.penalty(),
            CheckStatus::Unknown => 0,
        }
    }
}

/// A scored check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub delta: i32,
    pub message: String,
}

/// Qualitative readiness verdict, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReadinessTier {
    Unsupported, // Virtualized host, other checks are meaningless
    NotReady,
    PartlyReady,
    AlmostReady,
    Ready,
}

impl ReadinessTier {
    /// Buckets a total score. Higher scores never map to a lower tier.
    pub fn from_score(score: i32) -> Self {
        match score {
            i32::MIN..=6 => ReadinessTier::NotReady,
            7 => ReadinessTier::PartlyReady,
            8 => ReadinessTier::AlmostReady,
            _ => ReadinessTier::Ready,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReadinessTier::Unsupported => "UNSUPPORTED",
            ReadinessTier::NotReady => "NOT READY",
            ReadinessTier::PartlyReady => "PARTLY READY",
            ReadinessTier::AlmostReady => "ALMOST READY",
            ReadinessTier::Ready => "READY",
        }
    }
}

impl fmt::Display for ReadinessTier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Full result of a readiness run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessReport {
    pub suite: Option<Suite>,
    pub total: i32,
    pub tier: ReadinessTier,
    pub results: Vec<CheckResult>,
    pub virtualized: bool,
}

impl ReadinessReport {
    /// Filled segments of the score bar
    pub fn filled_segments(&self) -> usize {
        self.total.clamp(0, SCORE_BAR_SEGMENTS) as usize
    }

    /// Score as a percentage of a full bar
    pub fn percent(&self) -> u32 {
        self.filled_segments() as u32 * 100 / SCORE_BAR_SEGMENTS as u32
    }

    /// Status recorded for a named check
    pub fn status_of(&self, name: &str) -> Option<CheckStatus> {
        self.results.iter().find(|r| r.name == name).map(|r| r.status)
    }
}

/// Sums already-scored results into a report.
///
/// The sum is order independent. A virtualized host overrides the total and
/// tier regardless of the individual results, which are kept for display.
pub fn tally(results: Vec<CheckResult>, virtualized: bool) -> ReadinessReport {
    let (total, tier) = if virtualized {
        (OVERRIDE_SCORE, ReadinessTier::Unsupported)
    } else {
        let total: i32 = results.iter().map(|r| r.delta).sum();
        (total, ReadinessTier::from_score(total))
    };

    ReadinessReport {
        suite: None,
        total,
        tier,
        results,
        virtualized,
    }
}

/// Runs every check once, in order, and scores the results
pub fn score(
    checks: &[Box<dyn ReadinessCheck>],
    probe: &dyn SystemProbe,
    virtualized: bool,
) -> ReadinessReport {
    let results = checks
        .iter()
        .map(|check| {
            let outcome = check.run(probe);
            let delta = check.delta(outcome.status);
            debug!("Check {}: {:?} ({:+}) {}", check.name(), outcome.status, delta, outcome.message);
            CheckResult {
                name: check.name().to_string(),
                status: outcome.status,
                delta,
                message: outcome.message,
            }
        })
        .collect();

    let report = tally(results, virtualized);
    if report.virtualized {
        warn!("Running inside a virtual machine, readiness forced to {}", report.tier);
    }
    info!("Readiness score {} ({})", report.total, report.tier);
    report
}

/// The readiness suites offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suite {
    Kvm,
    Vfio,
    Usb,
}

impl Suite {
    pub const ALL: [Suite; 3] = [Suite::Kvm, Suite::Vfio, Suite::Usb];

    pub fn title(&self) -> &'static str {
        match self {
            Suite::Kvm => "Basic KVM system check",
            Suite::Vfio => "VFIO-PCI passthrough readiness check",
            Suite::Usb => "USB passthrough readiness check",
        }
    }

    /// The checks making up this suite
    pub fn checks(&self, config: &Config) -> Vec<Box<dyn ReadinessCheck>> {
        match self {
            Suite::Kvm => checks::kvm_suite(config),
            Suite::Vfio => checks::vfio_suite(config),
            Suite::Usb => checks::usb_suite(config),
        }
    }

    /// Highest total this suite can reach
    pub fn max_score(&self, config: &Config) -> i32 {
        self.checks(config).iter().map(|c| c.points()).sum()
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Suite::Kvm => write!(f, "kvm"),
            Suite::Vfio => write!(f, "vfio"),
            Suite::Usb => write!(f, "usb"),
        }
    }
}

/// Detects virtualization, then runs a whole suite against the probe
pub fn run_suite(suite: Suite, config: &Config, probe: &dyn SystemProbe) -> ReadinessReport {
    info!("Running {}", suite.title());
    let virtualized = detect_virtualized_host(probe);
    let mut report = score(&suite.checks(config), probe, virtualized);
    report.suite = Some(suite);
    report
}
