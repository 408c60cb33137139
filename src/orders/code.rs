//! Human-readable order codes: `PED-<year>-<sequence>`
//!
//! The sequence restarts every year and is always one more than the highest
//! sequence already issued for that year, so gaps left by deleted orders
//! are never reused below the maximum.

use std::fmt;

/// A parsed order code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCode {
    pub prefix: String,
    pub year: i32,
    pub sequence: u32,
}

impl OrderCode {
    /// `"PED-2025-"` for prefix `"PED"` and year 2025
    pub fn year_prefix(prefix: &str, year: i32) -> String {
        format!("{prefix}-{year}-")
    }

    /// Parse a code issued with `prefix`; anything else yields `None`
    pub fn parse(code: &str, prefix: &str) -> Option<Self> {
        let rest = code.strip_prefix(prefix)?.strip_prefix('-')?;
        let (year, sequence) = rest.split_once('-')?;

        if sequence.is_empty() || !sequence.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            prefix: prefix.to_string(),
            year: year.parse().ok()?,
            sequence: sequence.parse().ok()?,
        })
    }

    /// Next code for `year` given the codes already present in the store
    pub fn next<'a, I>(prefix: &str, year: i32, existing: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let highest = existing
            .into_iter()
            .filter_map(|code| Self::parse(code, prefix))
            .filter(|code| code.year == year)
            .map(|code| code.sequence)
            .max()
            .unwrap_or(0);

        Self {
            prefix: prefix.to_string(),
            year,
            sequence: highest.saturating_add(1),
        }
    }
}

impl fmt::Display for OrderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{:04}", self.prefix, self.year, self.sequence)
    }
}
