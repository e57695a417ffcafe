//! Utility functions and constants
//!
//! **Why**: Centralized helpers used across multiple modules
//!
//! **Used by**: safe frame panel, preferences, headless export

/// Panel number formatting and parsing
pub mod numeric {
    use serde::{Deserialize, Serialize};

    /// Decimal places shown for angles and ratios
    pub const DECIMALS: usize = 2;

    /// Largest pixel count accepted for either export edge
    pub const MAX_PIXELS: u32 = 16384;

    /// Decimal separator used for display. Parsing accepts both.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub enum DecimalSeparator {
        #[default]
        Dot,
        Comma,
    }

    impl DecimalSeparator {
        pub fn as_char(&self) -> char {
            match self {
                DecimalSeparator::Dot => '.',
                DecimalSeparator::Comma => ',',
            }
        }

        pub fn as_str(&self) -> &'static str {
            match self {
                DecimalSeparator::Dot => "Dot (1.50)",
                DecimalSeparator::Comma => "Comma (1,50)",
            }
        }
    }

    /// Formats panel values and parses operator input.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NumberFormat {
        pub separator: DecimalSeparator,
    }

    impl NumberFormat {
        pub fn new(separator: DecimalSeparator) -> Self {
            Self { separator }
        }

        /// Ratio or angle with [`DECIMALS`] places.
        pub fn format_decimal(&self, value: f64) -> String {
            let text = format!("{:.*}", DECIMALS, value);
            match self.separator {
                DecimalSeparator::Dot => text,
                DecimalSeparator::Comma => text.replace('.', ","),
            }
        }

        pub fn format_pixels(&self, value: u32) -> String {
            value.to_string()
        }

        /// Parse a decimal typed with either separator.
        /// `None` for empty, malformed or non-finite input.
        pub fn parse_decimal(&self, text: &str) -> Option<f64> {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            let normalized = text.replace(',', ".");
            normalized.parse::<f64>().ok().filter(|v| v.is_finite())
        }

        /// Parse a pixel count in 1..=[`MAX_PIXELS`]. Decimal input is truncated.
        pub fn parse_pixels(&self, text: &str) -> Option<u32> {
            let text = text.trim();
            if let Ok(value) = text.parse::<u32>() {
                return (1..=MAX_PIXELS).contains(&value).then_some(value);
            }
            let value = self.parse_decimal(text)?;
            if (1.0..MAX_PIXELS as f64 + 1.0).contains(&value) {
                Some(value.trunc() as u32)
            } else {
                None
            }
        }
    }

}
