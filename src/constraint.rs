//! Small value types shared by [`crate::state`] and [`crate::mcts`]: the
//! dependency-type tag, pending work items, and the constraints accumulated
//! against a package name.

use crate::version::Version;
use std::fmt;

/// The sentinel range string marking a known-unsatisfiable constraint. A
/// constraint carrying this range makes the owning state terminal-invalid
/// regardless of what `resolved` otherwise looks like.
pub const INVALID: &str = "INVALID";

/// Which dependency map a resolution run walks. The accumulation rules in
/// `state::step` differ only for `Peer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyType {
    Runtime,
    Dev,
    Peer,
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyType::Runtime => "runtime",
            DependencyType::Dev => "dev",
            DependencyType::Peer => "peer",
        };
        write!(f, "{}", s)
    }
}

/// A `(name, range, required_by_version?)` triple attached to a package
/// name, recording who imposed a version requirement on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub range: String,
    pub required_by_package: String,
    pub required_by_version: Option<Version>,
}

impl Constraint {
    pub fn new(
        range: impl Into<String>,
        required_by_package: impl Into<String>,
        required_by_version: Option<Version>,
    ) -> Self {
        Self {
            range: range.into(),
            required_by_package: required_by_package.into(),
            required_by_version,
        }
    }

    pub fn invalid(required_by_package: impl Into<String>, required_by_version: Version) -> Self {
        Self::new(INVALID, required_by_package, Some(required_by_version))
    }

    pub fn is_invalid(&self) -> bool {
        self.range == INVALID
    }
}

/// A `(name, range, required_by)` triple queued for future resolution.
/// FIFO order across the queue it lives in defines the search's decision
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDependency {
    pub package_name: String,
    pub range_string: String,
    pub required_by: Option<String>,
}

impl PendingDependency {
    pub fn new(
        package_name: impl Into<String>,
        range_string: impl Into<String>,
        required_by: Option<String>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            range_string: range_string.into(),
            required_by,
        }
    }

    pub fn root(package_name: impl Into<String>, range_string: impl Into<String>) -> Self {
        Self::new(package_name, range_string, None)
    }
}
