//! Terminal capability detection from the environment.
//!
//! Capabilities come from `TERM`, `COLORTERM`, `TERM_PROGRAM`, and
//! vendor variables. When the environment is ambiguous the conservative
//! minimum is assumed; a Device-Attributes query can upgrade the result
//! at runtime but never downgrades it.

use braid_term::ReflowStrategy;

/// Color depth the terminal accepts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColorSupport {
    /// No color output (`NO_COLOR` or a dumb terminal).
    NoColor,
    /// The 16 ANSI colors.
    #[default]
    Basic16,
    /// The 256-color palette.
    Extended256,
    /// 24-bit RGB.
    TrueColor,
}

/// What the terminal on the other side of the adapter can do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    /// Color depth.
    pub color: ColorSupport,
    /// Mouse reporting.
    pub mouse: bool,
    /// OSC 8 hyperlinks.
    pub hyperlinks: bool,
    /// Sixel graphics.
    pub sixel: bool,
    /// Bracketed paste.
    pub bracketed_paste: bool,
    /// Focus in/out reporting.
    pub focus_reporting: bool,
    /// Reflow strategy this emulator applies on resize.
    pub reflow: ReflowStrategy,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            color: ColorSupport::Basic16,
            mouse: true,
            hyperlinks: false,
            sixel: false,
            bracketed_paste: true,
            focus_reporting: false,
            reflow: ReflowStrategy::None,
        }
    }
}

impl Capabilities {
    /// Detect capabilities from the process environment.
    pub fn detect() -> Self {
        Self::from_env(
            std::env::var("TERM").ok().as_deref(),
            std::env::var("COLORTERM").ok().as_deref(),
            std::env::var("TERM_PROGRAM").ok().as_deref(),
            std::env::var("NO_COLOR").is_ok(),
        )
    }

    /// Detection core, separated from the process environment for tests.
    pub fn from_env(
        term: Option<&str>,
        colorterm: Option<&str>,
        term_program: Option<&str>,
        no_color: bool,
    ) -> Self {
        let term = term.unwrap_or("");
        let program = term_program.unwrap_or("");

        let mut caps = Self::default();

        caps.color = if no_color {
            ColorSupport::NoColor
        } else if matches!(colorterm, Some("truecolor") | Some("24bit")) {
            ColorSupport::TrueColor
        } else if term.contains("256color") {
            ColorSupport::Extended256
        } else if term.is_empty() || term == "dumb" {
            ColorSupport::NoColor
        } else {
            ColorSupport::Basic16
        };

        // Emulator-specific upgrades.
        match program {
            "iTerm.app" | "WezTerm" | "ghostty" => {
                if caps.color != ColorSupport::NoColor {
                    caps.color = ColorSupport::TrueColor;
                }
                caps.hyperlinks = true;
                caps.focus_reporting = true;
            }
            "Apple_Terminal" => {
                caps.focus_reporting = true;
            }
            _ => {}
        }
        if term.starts_with("xterm-kitty") || term.starts_with("alacritty") {
            if caps.color != ColorSupport::NoColor {
                caps.color = ColorSupport::TrueColor;
            }
            caps.hyperlinks = true;
            caps.focus_reporting = true;
        }
        if program == "WezTerm" || term.contains("mlterm") || term.starts_with("foot") {
            caps.sixel = true;
        }

        caps.reflow = reflow_for(term, program);
        caps
    }
}

/// Choose the reflow strategy matching the emulator's own resize
/// behavior. Unknown emulators get the no-reflow strategy.
fn reflow_for(term: &str, program: &str) -> ReflowStrategy {
    if std::env::var("TMUX").is_ok() || term.starts_with("screen") || term.starts_with("tmux") {
        return ReflowStrategy::BottomFill;
    }
    match program {
        "iTerm.app" | "WezTerm" | "ghostty" => ReflowStrategy::CursorAnchored,
        _ => {
            if term.starts_with("xterm-kitty") || term.starts_with("alacritty") {
                ReflowStrategy::CursorAnchored
            } else {
                ReflowStrategy::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truecolor_from_colorterm() {
        let caps = Capabilities::from_env(Some("xterm-256color"), Some("truecolor"), None, false);
        assert_eq!(caps.color, ColorSupport::TrueColor);
    }

    #[test]
    fn extended_from_term() {
        let caps = Capabilities::from_env(Some("xterm-256color"), None, None, false);
        assert_eq!(caps.color, ColorSupport::Extended256);
    }

    #[test]
    fn no_color_wins() {
        let caps = Capabilities::from_env(Some("xterm-256color"), Some("truecolor"), None, true);
        assert_eq!(caps.color, ColorSupport::NoColor);
    }

    #[test]
    fn kitty_gets_hyperlinks_and_reflow() {
        let caps = Capabilities::from_env(Some("xterm-kitty"), None, None, false);
        assert!(caps.hyperlinks);
        assert_eq!(caps.color, ColorSupport::TrueColor);
        assert_eq!(caps.reflow, braid_term::ReflowStrategy::CursorAnchored);
    }

    #[test]
    fn unknown_terminal_is_conservative() {
        let caps = Capabilities::from_env(Some("vt100"), None, None, false);
        assert_eq!(caps.color, ColorSupport::Basic16);
        assert!(!caps.hyperlinks);
        assert!(!caps.sixel);
        assert_eq!(caps.reflow, braid_term::ReflowStrategy::None);
    }

    #[test]
    fn wezterm_supports_sixel() {
        let caps = Capabilities::from_env(Some("xterm-256color"), None, Some("WezTerm"), false);
        assert!(caps.sixel);
        assert_eq!(caps.color, ColorSupport::TrueColor);
    }
}
