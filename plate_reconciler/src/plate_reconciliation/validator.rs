use regex::Regex;

use crate::error::Result;

/// Italian plates: two letters, three digits, two letters.
pub const ITALIAN_PLATE_PATTERN: &str = "[A-FZ][A-Z][0-9]{3}[A-Z]{2}";

/// Locale specific plate grammar.
pub trait PlateFormat: Send + Sync {
    fn is_valid(&self, text: &str) -> bool;
}

/// Plate grammar given as a regular expression matched against the whole text.
#[derive(Debug, Clone)]
pub struct RegexPlateFormat {
    pattern: Regex,
}

impl RegexPlateFormat {
    pub fn new(pattern: &str) -> Result<Self> {
        let anchored = format!("^(?:{})$", pattern);
        Ok(Self {
            pattern: Regex::new(&anchored)?,
        })
    }

    pub fn italian() -> Self {
        Self {
            pattern: Regex::new(&format!("^(?:{})$", ITALIAN_PLATE_PATTERN))
                .expect("built-in plate pattern compiles"),
        }
    }
}

impl Default for RegexPlateFormat {
    fn default() -> Self {
        Self::italian()
    }
}

impl PlateFormat for RegexPlateFormat {
    fn is_valid(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}
