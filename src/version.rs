//! Concrete package versions.
//!
//! A [`Version`] is a triple of non-negative integers. Unlike the `semver`
//! crate's `Version`, parsing here tolerates the shapes package registries
//! actually emit: a leading `v`, one or two missing trailing components, and
//! a `-prerelease`/`+build` suffix that is stripped before comparison.

use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a version string, tolerating a leading `v` and missing
    /// trailing components (`"1"` -> `1.0.0`, `"1.2"` -> `1.2.0`).
    /// A `-prerelease` or `+build` suffix is trimmed before the numeric
    /// components are read.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s.strip_prefix('v').or(s.strip_prefix('V')).unwrap_or(s);

        // Trim build metadata first (it may itself contain a hyphen), then
        // prerelease.
        let s = s.split('+').next().unwrap_or(s);
        let s = s.split('-').next().unwrap_or(s);

        let mut parts = s.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().map(|p| p.parse().ok()).unwrap_or(Some(0))?;
        let patch = parts.next().map(|p| p.parse().ok()).unwrap_or(Some(0))?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(major, minor, patch))
    }

    pub fn as_tuple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_tuple().cmp(&other.as_tuple())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
