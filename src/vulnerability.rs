//! Vulnerability records and the threshold policy that filters candidate
//! versions during expansion and simulation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    None,
    Unknown,
}

impl Severity {
    /// Derive a severity from a CVSS base score when the upstream record
    /// carries no explicit label.
    pub fn from_cvss(score: f64) -> Self {
        if score >= 9.0 {
            Severity::Critical
        } else if score >= 7.0 {
            Severity::High
        } else if score >= 4.0 {
            Severity::Medium
        } else if score >= 0.1 {
            Severity::Low
        } else {
            Severity::None
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::None => "NONE",
            Severity::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CveItem {
    pub id: String,
    pub description: String,
    pub severity: Severity,
    pub cvss: Option<f64>,
    pub published: Option<String>,
    pub modified: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

/// An ordered sequence of `CveItem`s with derived per-severity counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VulnerabilityList {
    pub items: Vec<CveItem>,
}

impl VulnerabilityList {
    pub fn new(items: Vec<CveItem>) -> Self {
        Self { items }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|i| i.severity == severity).count()
    }

    pub fn counts(&self) -> SeverityCounts {
        SeverityCounts {
            critical: self.count(Severity::Critical),
            high: self.count(Severity::High),
            medium: self.count(Severity::Medium),
            low: self.count(Severity::Low),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Four non-negative upper bounds, one per severity bucket. A
/// `VulnerabilityList` passes iff every bucket's count is within its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VulnerabilityThreshold {
    pub max_critical: u32,
    pub max_high: u32,
    pub max_medium: u32,
    pub max_low: u32,
}

impl VulnerabilityThreshold {
    pub const fn new(max_critical: u32, max_high: u32, max_medium: u32, max_low: u32) -> Self {
        Self {
            max_critical,
            max_high,
            max_medium,
            max_low,
        }
    }

    pub const CRITICAL: Self = Self::new(0, u32::MAX, u32::MAX, u32::MAX);
    pub const HIGH: Self = Self::new(0, 0, u32::MAX, u32::MAX);
    pub const MEDIUM: Self = Self::new(0, 0, 0, u32::MAX);
    pub const LOW: Self = Self::new(0, 0, 0, 0);

    pub fn passes(&self, list: &VulnerabilityList) -> bool {
        let counts = list.counts();
        counts.critical as u32 <= self.max_critical
            && counts.high as u32 <= self.max_high
            && counts.medium as u32 <= self.max_medium
            && counts.low as u32 <= self.max_low
    }

    /// Parse the external threshold encoding: `CRITICAL`, `HIGH`, `MEDIUM`,
    /// `LOW`, or `CUSTOM:<c>,<h>,<m>,<l>`. Any other value means "no
    /// threshold configured" and returns `None` rather than an error, since
    /// callers use this to mean "threshold filtering disabled".
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CRITICAL" => Some(Self::CRITICAL),
            "HIGH" => Some(Self::HIGH),
            "MEDIUM" => Some(Self::MEDIUM),
            "LOW" => Some(Self::LOW),
            other => other.strip_prefix("CUSTOM:").and_then(parse_custom),
        }
    }

    /// Like [`Self::parse`] but reports malformed `CUSTOM:` encodings as an
    /// error instead of silently disabling the threshold — used when
    /// parsing a value the caller explicitly intended to be a threshold
    /// (e.g. a CLI flag), as opposed to free-form config text.
    pub fn parse_strict(s: &str) -> Result<Option<Self>> {
        if let Some(rest) = s.strip_prefix("CUSTOM:") {
            return parse_custom(rest)
                .map(Some)
                .ok_or_else(|| Error::InvalidThreshold(s.to_string()));
        }
        Ok(Self::parse(s))
    }
}

fn parse_custom(rest: &str) -> Option<VulnerabilityThreshold> {
    let parts: Vec<&str> = rest.split(',').collect();
    if parts.len() != 4 {
        return None;
    }
    let mut nums = [0u32; 4];
    for (i, p) in parts.iter().enumerate() {
        nums[i] = p.trim().parse().ok()?;
    }
    Some(VulnerabilityThreshold::new(
        nums[0], nums[1], nums[2], nums[3],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, severity: Severity) -> CveItem {
        CveItem {
            id: id.to_string(),
            description: String::new(),
            severity,
            cvss: None,
            published: None,
            modified: None,
            references: Vec::new(),
        }
    }

    #[test]
    fn severity_from_cvss_bands() {
        assert_eq!(Severity::from_cvss(9.8), Severity::Critical);
        assert_eq!(Severity::from_cvss(7.5), Severity::High);
        assert_eq!(Severity::from_cvss(4.0), Severity::Medium);
        assert_eq!(Severity::from_cvss(0.1), Severity::Low);
        assert_eq!(Severity::from_cvss(0.0), Severity::None);
    }

    #[test]
    fn high_threshold_allows_zero_critical_and_high() {
        let list = VulnerabilityList::new(vec![item("CVE-1", Severity::Medium)]);
        assert!(VulnerabilityThreshold::HIGH.passes(&list));

        let list = VulnerabilityList::new(vec![item("CVE-2", Severity::High)]);
        assert!(!VulnerabilityThreshold::HIGH.passes(&list));
    }

    #[test]
    fn custom_threshold_parses_all_four_atomically() {
        let t = VulnerabilityThreshold::parse("CUSTOM:1,2,3,4").unwrap();
        assert_eq!(t, VulnerabilityThreshold::new(1, 2, 3, 4));
        assert_eq!(VulnerabilityThreshold::parse("CUSTOM:1,2,3"), None);
        assert_eq!(VulnerabilityThreshold::parse("CUSTOM:1,2,3,x"), None);
    }

    #[test]
    fn unknown_string_disables_threshold() {
        assert_eq!(VulnerabilityThreshold::parse("NOPE"), None);
    }

    #[test]
    fn parse_strict_errors_on_malformed_custom() {
        assert!(VulnerabilityThreshold::parse_strict("CUSTOM:1,2,3").is_err());
        assert!(VulnerabilityThreshold::parse_strict("NOPE").unwrap().is_none());
    }
}
