use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A package reported by a manifest scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    /// Declared licenses; free-text names and SPDX expressions are both accepted.
    #[serde(default)]
    pub licenses: Vec<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    /// Dependency groups the package belongs to (e.g. `development`, `test`).
    #[serde(default)]
    pub groups: Vec<String>,
}

/// A package after the decisions have been applied to it.
#[derive(Debug, Clone, Serialize)]
pub struct CheckedDependency {
    pub name: String,
    pub version: Option<String>,
    pub licenses: BTreeSet<String>,
    pub homepage: Option<String>,
    pub verdict: PolicyVerdict,
    pub reason: VerdictReason,
    /// Added with `add_package` rather than reported by a scanner.
    pub manual: bool,
}

impl CheckedDependency {
    pub fn license_label(&self) -> String {
        if self.licenses.is_empty() {
            "unknown".to_string()
        } else {
            self.licenses.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyVerdict {
    Pass,
    Warn,
    Error,
}

impl std::fmt::Display for PolicyVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyVerdict::Pass => write!(f, "pass"),
            PolicyVerdict::Warn => write!(f, "warn"),
            PolicyVerdict::Error => write!(f, "error"),
        }
    }
}

/// Why a package received its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictReason {
    ManuallyApproved,
    PermittedLicense,
    RestrictedLicense,
    Undecided,
}

impl std::fmt::Display for VerdictReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerdictReason::ManuallyApproved => write!(f, "manually approved"),
            VerdictReason::PermittedLicense => write!(f, "permitted license"),
            VerdictReason::RestrictedLicense => write!(f, "restricted license"),
            VerdictReason::Undecided => write!(f, "undecided"),
        }
    }
}
