// Pastel color palette shared by the text reports and the dashboard

use crossterm::style::{Color, StyledContent, Stylize};
use std::fmt;

use crate::core::readiness::{CheckStatus, ReadinessTier};
use crate::gpu::SupportStatus;

/// Defines the pastel color palette for the UI
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PastelColor {
    Pink,
    Lavender,
    Mint,
    SkyBlue,
    Peach,
    LightYellow,
    White,
    Gray,
}

impl PastelColor {
    fn rgb(&self) -> Option<(u8, u8, u8)> {
        match self {
            PastelColor::Pink => Some((255, 182, 193)),
            PastelColor::Lavender => Some((204, 169, 221)),
            PastelColor::Mint => Some((176, 224, 183)),
            PastelColor::SkyBlue => Some((173, 216, 230)),
            PastelColor::Peach => Some((255, 218, 185)),
            PastelColor::LightYellow => Some((255, 255, 224)),
            PastelColor::White => None,
            PastelColor::Gray => Some((169, 169, 169)),
        }
    }

    /// Get the terminal color representation
    pub fn as_color(&self) -> Color {
        match self.rgb() {
            Some((r, g, b)) => Color::Rgb { r, g, b },
            None => Color::White,
        }
    }

    /// Same color for ratatui widgets
    pub fn as_ratatui(&self) -> ratatui::style::Color {
        match self.rgb() {
            Some((r, g, b)) => ratatui::style::Color::Rgb(r, g, b),
            None => ratatui::style::Color::White,
        }
    }
}

/// A styled text element with type safety
pub struct StyledText<'a> {
    content: &'a str,
    styled: StyledContent<&'a str>,
}

impl<'a> StyledText<'a> {
    /// Create new styled text with foreground color
    pub fn new(text: &'a str, fg_color: PastelColor) -> Self {
        Self {
            content: text,
            styled: text.with(fg_color.as_color()),
        }
    }

    /// Create bold styled text
    pub fn bold(text: &'a str, fg_color: PastelColor) -> Self {
        Self {
            content: text,
            styled: text.with(fg_color.as_color()).bold(),
        }
    }

    /// Get the raw text content
    pub fn content(&self) -> &str {
        self.content
    }
}

impl<'a> fmt::Display for StyledText<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.styled)
    }
}

/// Theme defining the main colors used by the UI
#[derive(Clone, Copy, Debug)]
pub struct Theme {
    pub primary: PastelColor,
    pub secondary: PastelColor,
    pub accent: PastelColor,
    pub text: PastelColor,
    pub muted: PastelColor,
    pub error: PastelColor,
    pub warning: PastelColor,
    pub success: PastelColor,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: PastelColor::Lavender,
            secondary: PastelColor::SkyBlue,
            accent: PastelColor::Pink,
            text: PastelColor::White,
            muted: PastelColor::Gray,
            error: PastelColor::Pink,
            warning: PastelColor::Peach,
            success: PastelColor::Mint,
        }
    }
}

impl Theme {
    /// Color of the support bullet in a compatibility report
    pub fn support(&self, status: SupportStatus, bounded: bool) -> PastelColor {
        match status {
            SupportStatus::Supported if bounded => self.warning,
            SupportStatus::Supported => self.success,
            SupportStatus::Unsupported => self.error,
            SupportStatus::Problematic => self.warning,
        }
    }

    /// Color of a readiness check glyph
    pub fn check(&self, status: CheckStatus) -> PastelColor {
        match status {
            CheckStatus::Pass => self.success,
            CheckStatus::Fail => self.error,
            CheckStatus::Unknown => self.warning,
        }
    }

    /// Color of a readiness tier label and bar
    pub fn tier(&self, tier: ReadinessTier) -> PastelColor {
        match tier {
            ReadinessTier::Ready => self.success,
            ReadinessTier::AlmostReady | ReadinessTier::PartlyReady => self.warning,
            ReadinessTier::NotReady | ReadinessTier::Unsupported => self.error,
        }
    }
}
