// Text rendering of compatibility and readiness reports for the command line

use unicode_width::UnicodeWidthStr;

use crate::core::readiness::{ReadinessReport, SCORE_BAR_SEGMENTS};
use crate::gpu::classify::{match_summary, CompatibilityReport};
use crate::ui::colors::{PastelColor, StyledText, Theme};
use crate::usb::UsbSelection;

const BAR_FILLED: &str = "❚";
const BAR_EMPTY: &str = "·";

/// Whether output is decorated with terminal colors
#[derive(Debug, Clone, Copy)]
pub struct ReportStyle {
    color: bool,
    theme: Theme,
}

impl ReportStyle {
    pub fn colored() -> Self {
        Self { color: true, theme: Theme::default() }
    }

    pub fn plain() -> Self {
        Self { color: false, theme: Theme::default() }
    }

    fn paint(&self, text: &str, color: PastelColor) -> String {
        if self.color {
            StyledText::new(text, color).to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str, color: PastelColor) -> String {
        if self.color {
            StyledText::bold(text, color).to_string()
        } else {
            text.to_string()
        }
    }
}

/// Renders one compatibility report as a block of lines
pub fn render_compatibility(report: &CompatibilityReport, style: &ReportStyle) -> String {
    let theme = &style.theme;
    let rule = "─".repeat(UnicodeWidthStr::width(report.display_name.as_str()).max(1));
    let bullet_color = theme.support(report.supported, report.end_of_support.is_some());

    let mut out = String::new();
    out.push_str(&style.bold(&report.display_name, theme.primary));
    out.push('\n');
    out.push_str(&style.paint(&rule, theme.muted));
    out.push('\n');
    out.push_str(&format!(
        "{} {}\n",
        style.paint("●", bullet_color),
        style.bold(&report.headline, bullet_color)
    ));
    out.push_str(&format!("{} {}\n", style.paint("Maximum macOS:", theme.secondary), report.max_os));
    out.push_str(&format!("{} {}\n", style.paint("Minimum macOS:", theme.secondary), report.min_os));
    out.push('\n');
    out.push_str(&style.bold("Additional Information", theme.secondary));
    out.push('\n');
    out.push_str(&report.quirks);
    out.push('\n');
    if let Some(note) = &report.end_of_support {
        out.push_str(&style.paint(note, theme.warning));
        out.push('\n');
    }
    out
}

/// Renders the match summary followed by every report, in order
pub fn render_compatibility_list(reports: &[CompatibilityReport], style: &ReportStyle) -> String {
    let mut out = style.bold(&match_summary(reports.len()), style.theme.accent);
    out.push('\n');
    for report in reports {
        out.push('\n');
        out.push_str(&render_compatibility(report, style));
    }
    out
}

/// Score bar: one filled segment per point, clamped to the bar
pub fn score_bar(report: &ReadinessReport) -> String {
    let filled = report.filled_segments();
    let empty = SCORE_BAR_SEGMENTS as usize - filled;
    format!("{}{}", BAR_FILLED.repeat(filled), BAR_EMPTY.repeat(empty))
}

/// Renders check lines, the score bar and the tier
pub fn render_readiness(report: &ReadinessReport, style: &ReportStyle) -> String {
    let theme = &style.theme;
    let mut out = String::new();

    if let Some(suite) = report.suite {
        out.push_str(&style.bold(suite.title(), theme.primary));
        out.push('\n');
    }
    for result in &report.results {
        out.push_str(&format!(
            "  {} {}\n",
            style.paint(result.status.glyph(), theme.check(result.status)),
            result.message
        ));
    }
    if report.virtualized {
        out.push_str(&style.paint(
            "  Running inside a virtual machine; passthrough is not supported here.\n",
            theme.error,
        ));
    }

    let tier_color = theme.tier(report.tier);
    out.push('\n');
    out.push_str(&format!(
        "{} {:>3}%  {} ({})\n",
        style.paint(&score_bar(report), tier_color),
        report.percent(),
        style.bold(report.tier.label(), tier_color),
        report.total
    ));
    out
}

/// Numbered USB device list with selection marks, then the flags to be written
pub fn render_usb_selection(selection: &UsbSelection, style: &ReportStyle) -> String {
    let theme = &style.theme;
    let mut out = String::new();

    if selection.devices().is_empty() {
        out.push_str(&style.paint("No USB devices detected.\n", theme.warning));
        return out;
    }
    for (index, device) in selection.devices().iter().enumerate() {
        let mark = if selection.is_selected(index) {
            style.paint("[x]", theme.success)
        } else {
            "[ ]".to_string()
        };
        out.push_str(&format!("{:>3}. {} {}  {}\n", index + 1, mark, device.id, device.name));
    }

    let flags = selection.qemu_flags();
    if !flags.is_empty() {
        out.push('\n');
        out.push_str(&style.bold("QEMU flags", theme.secondary));
        out.push('\n');
        for flag in flags {
            out.push_str(&flag);
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::readiness::{tally, CheckResult, CheckStatus};
    use crate::gpu::SupportStatus;
    use crate::usb::UsbDevice;

    fn gtx_650() -> CompatibilityReport {
        CompatibilityReport {
            record_index: 0,
            match_token: "GTX 650".to_string(),
            display_name: "NVIDIA GeForce GTX 650".to_string(),
            vendor: "NVIDIA".to_string(),
            supported: SupportStatus::Supported,
            headline: "Supported up to macOS High Sierra".to_string(),
            max_os: "High Sierra (10.13)".to_string(),
            min_os: "N/A".to_string(),
            quirks: "No quirks.".to_string(),
            end_of_support: Some("Not supported by macOS Mojave or later.".to_string()),
        }
    }

    #[test]
    fn compatibility_block_layout() {
        let text = render_compatibility(&gtx_650(), &ReportStyle::plain());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "NVIDIA GeForce GTX 650");
        assert_eq!(lines[1].chars().count(), "NVIDIA GeForce GTX 650".len());
        assert!(lines[1].chars().all(|c| c == '─'));
        assert_eq!(lines[2], "● Supported up to macOS High Sierra");
        assert_eq!(lines[3], "Maximum macOS: High Sierra (10.13)");
        assert_eq!(lines[4], "Minimum macOS: N/A");
        assert_eq!(lines[6], "Additional Information");
        assert_eq!(lines.last(), Some(&"Not supported by macOS Mojave or later."));
    }

    #[test]
    fn list_starts_with_the_summary() {
        let text = render_compatibility_list(&[gtx_650()], &ReportStyle::plain());
        assert!(text.starts_with("I successfully detected 1 GPU in your system:"));

        let empty = render_compatibility_list(&[], &ReportStyle::plain());
        assert!(empty.starts_with("I failed to detect any GPUs"));
    }

    #[test]
    fn readiness_shows_glyphs_bar_and_tier() {
        let results = vec![
            CheckResult { name: "a".into(), status: CheckStatus::Pass, delta: 5, message: "KVM module loaded".into() },
            CheckResult { name: "b".into(), status: CheckStatus::Unknown, delta: 0, message: "libvirtd unclear".into() },
            CheckResult { name: "c".into(), status: CheckStatus::Fail, delta: -1, message: "not in kvm group".into() },
        ];
        let report = tally(results, false);
        let text = render_readiness(&report, &ReportStyle::plain());

        assert!(text.contains("  ✔ KVM module loaded\n"));
        assert!(text.contains("  ⚠ libvirtd unclear\n"));
        assert!(text.contains("  ✘ not in kvm group\n"));
        assert!(text.contains("❚❚❚❚····"));
        assert!(text.contains(" 40%"));
        assert!(text.contains(report.tier.label()));
    }

    #[test]
    fn negative_totals_draw_an_empty_bar() {
        let results = vec![CheckResult { name: "a".into(), status: CheckStatus::Fail, delta: -3, message: String::new() }];
        let report = tally(results, false);
        assert_eq!(score_bar(&report), "··········");
    }

    #[test]
    fn usb_list_marks_selection_and_prints_flags() {
        let mut selection = UsbSelection::new(vec![
            UsbDevice { id: "046d:c52b".into(), name: "Logitech Receiver".into() },
            UsbDevice { id: "8087:0aaa".into(), name: "Intel Bluetooth".into() },
        ]);
        selection.toggle(2).unwrap();
        let text = render_usb_selection(&selection, &ReportStyle::plain());

        assert!(text.contains("  1. [ ] 046d:c52b  Logitech Receiver\n"));
        assert!(text.contains("  2. [x] 8087:0aaa  Intel Bluetooth\n"));
        assert!(text.ends_with("-device usb-host,vendorid=0x8087,productid=0x0aaa\n"));
    }
}
