//! Terminal styling and color utilities.
//!
//! ANSI escape codes plus color detection, so the table renderers never
//! emit escapes into a pipe that asked for none.

/// ANSI escape codes for text styling and colors.
pub mod colors {
    /// Reset all styling.
    pub const RESET: &str = "\x1b[0m";
    /// Bright bold white for table headers.
    pub const WHITE_BOLD: &str = "\x1b[1;97m";
    /// Gray for secondary elements (separators, timestamps).
    pub const GRAY: &str = "\x1b[90m";
    /// Cyan for codes.
    pub const CYAN: &str = "\x1b[36m";
    /// Green for successful runs.
    pub const GREEN: &str = "\x1b[32m";
    /// Red for failed runs and stderr lines.
    pub const RED: &str = "\x1b[31m";
}

/// Resolved color codes, either ANSI sequences or empty strings when color
/// is disabled.
#[derive(Debug, Clone, Copy)]
pub struct ColorPalette {
    pub reset: &'static str,
    pub white_bold: &'static str,
    pub gray: &'static str,
    pub cyan: &'static str,
    pub green: &'static str,
    pub red: &'static str,
}

impl ColorPalette {
    #[must_use]
    pub const fn colored() -> Self {
        Self {
            reset: colors::RESET,
            white_bold: colors::WHITE_BOLD,
            gray: colors::GRAY,
            cyan: colors::CYAN,
            green: colors::GREEN,
            red: colors::RED,
        }
    }

    #[must_use]
    pub const fn plain() -> Self {
        Self {
            reset: "",
            white_bold: "",
            gray: "",
            cyan: "",
            green: "",
            red: "",
        }
    }

    /// `colored()` when the terminal supports ANSI colors, else `plain()`.
    #[must_use]
    pub fn detect() -> Self {
        if supports_color() {
            Self::colored()
        } else {
            Self::plain()
        }
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::detect()
    }
}

/// Check if the terminal supports ANSI color codes.
///
/// Respects `NO_COLOR` (https://no-color.org/) and `TERM=dumb`.
#[must_use]
pub fn supports_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if let Ok(term) = std::env::var("TERM") {
        if term.eq_ignore_ascii_case("dumb") {
            return false;
        }
    }
    true
}

/// Format a number with thousand separators (commas).
///
/// # Examples
///
/// ```
/// # use globalindex_cli::terminal::format_with_separators;
/// assert_eq!(format_with_separators(999), "999");
/// assert_eq!(format_with_separators(1234567), "1,234,567");
/// ```
#[must_use]
pub fn format_with_separators(n: u64) -> String {
    if n < 1000 {
        return n.to_string();
    }
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Format an indicator value for a table cell.
///
/// Whole values get thousand separators; fractional values keep two
/// decimals. A missing value renders as `-`.
///
/// ```
/// # use globalindex_cli::terminal::format_value;
/// assert_eq!(format_value(Some(21_000_000.0)), "21,000,000");
/// assert_eq!(format_value(Some(-3.25)), "-3.25");
/// assert_eq!(format_value(None), "-");
/// ```
#[must_use]
pub fn format_value(value: Option<f64>) -> String {
    let Some(value) = value else {
        return "-".to_string();
    };
    if !value.is_finite() {
        return value.to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let magnitude = value.abs();
    if magnitude.fract() == 0.0 && magnitude < u64::MAX as f64 {
        format!("{sign}{}", format_with_separators(magnitude as u64))
    } else {
        format!("{value:.2}")
    }
}
