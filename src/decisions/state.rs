use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record::{Decision, Txn};
use crate::license::spdx::normalize;

/// A manual approval of a package, possibly limited to specific versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Approval {
    pub who: Option<String>,
    pub why: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    /// Empty means every version is approved.
    pub safe_versions: BTreeSet<String>,
}

impl Approval {
    pub fn is_unrestricted(&self) -> bool {
        self.safe_versions.is_empty()
    }

    fn covers(&self, version: &str) -> bool {
        self.is_unrestricted() || self.safe_versions.contains(version)
    }
}

/// Outcome of an approval lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApprovalStatus {
    /// No approval was ever recorded for the package.
    Unknown,
    Approved,
    /// An approval exists but does not cover the requested version.
    NotApproved,
}

/// Queryable state derived by folding the decision log.
///
/// Mutated only by the decision store as it applies records, so it always equals a
/// replay of the log it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecisionState {
    packages: BTreeMap<String, Option<String>>,
    licenses: BTreeMap<String, BTreeSet<String>>,
    homepages: BTreeMap<String, String>,
    approvals: BTreeMap<String, Approval>,
    permitted: BTreeSet<String>,
    restricted: BTreeSet<String>,
    ignored: BTreeSet<String>,
    ignored_groups: BTreeSet<String>,
    project_name: Option<String>,
    inherited_sources: BTreeSet<String>,
}

impl DecisionState {
    /// Apply the effect of one decision.
    ///
    /// `InheritFrom` only registers the source here; fetching and replaying the
    /// inherited log is the store's job.
    pub(super) fn apply(&mut self, decision: &Decision) {
        match decision {
            Decision::AddPackage { name, version, .. } => {
                self.packages.insert(name.clone(), version.clone());
            }
            Decision::RemovePackage { name, .. } => {
                self.packages.remove(name);
            }
            Decision::License { name, license, .. } => {
                self.licenses
                    .entry(name.clone())
                    .or_default()
                    .insert(normalize(license));
            }
            Decision::Unlicense { name, license, .. } => {
                if let Some(set) = self.licenses.get_mut(name) {
                    set.remove(&normalize(license));
                    if set.is_empty() {
                        self.licenses.remove(name);
                    }
                }
            }
            Decision::Homepage { name, url, .. } => {
                self.homepages.insert(name.clone(), url.clone());
            }
            Decision::Approve {
                name,
                versions,
                txn,
            } => self.approve(name, versions, txn),
            Decision::Unapprove { name, .. } => {
                self.approvals.remove(name);
            }
            Decision::Permit { license, .. } => {
                self.permitted.insert(normalize(license));
            }
            Decision::Unpermit { license, .. } => {
                self.permitted.remove(&normalize(license));
            }
            Decision::Restrict { license, .. } => {
                self.restricted.insert(normalize(license));
            }
            Decision::Unrestrict { license, .. } => {
                self.restricted.remove(&normalize(license));
            }
            Decision::Ignore { name, .. } => {
                self.ignored.insert(name.clone());
            }
            Decision::Heed { name, .. } => {
                self.ignored.remove(name);
            }
            Decision::IgnoreGroup { name, .. } => {
                self.ignored_groups.insert(name.clone());
            }
            Decision::HeedGroup { name, .. } => {
                self.ignored_groups.remove(name);
            }
            Decision::NameProject { name, .. } => {
                self.project_name = Some(name.clone());
            }
            Decision::UnnameProject { .. } => {
                self.project_name = None;
            }
            Decision::InheritFrom { location, .. } => {
                self.inherited_sources.insert(location.clone());
            }
        }
    }

    /// Re-approval merges with the previous approval: an unrestricted approval
    /// is never narrowed, a restricted one only gains versions.
    fn approve(&mut self, name: &str, versions: &[String], txn: &Txn) {
        let safe_versions = match self.approvals.get(name) {
            Some(prev) if prev.is_unrestricted() => BTreeSet::new(),
            Some(prev) => {
                let mut merged = prev.safe_versions.clone();
                merged.extend(versions.iter().cloned());
                merged
            }
            None => versions.iter().cloned().collect(),
        };

        self.approvals.insert(
            name.to_string(),
            Approval {
                who: txn.who.clone(),
                why: txn.why.clone(),
                approved_at: txn.when,
                safe_versions,
            },
        );
    }

    pub(super) fn forget_source(&mut self, location: &str) {
        self.inherited_sources.remove(location);
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// The approval for `name` if it covers `version`.
    ///
    /// Without a version only an unrestricted approval is returned.
    pub fn approval_of(&self, name: &str, version: Option<&str>) -> Option<&Approval> {
        let approval = self.approvals.get(name)?;
        let matches = match version {
            Some(v) => approval.covers(v),
            None => approval.is_unrestricted(),
        };
        matches.then_some(approval)
    }

    /// Approval lookup.
    ///
    /// Known quirk: without a version any recorded approval counts, even one
    /// restricted to specific versions. With a version the restriction applies.
    pub fn approved(&self, name: &str, version: Option<&str>) -> ApprovalStatus {
        let Some(approval) = self.approvals.get(name) else {
            return ApprovalStatus::Unknown;
        };
        match version {
            Some(v) if !approval.covers(v) => ApprovalStatus::NotApproved,
            _ => ApprovalStatus::Approved,
        }
    }

    pub fn approvals(&self) -> &BTreeMap<String, Approval> {
        &self.approvals
    }

    pub fn is_permitted(&self, license: &str) -> bool {
        self.permitted.contains(&normalize(license))
    }

    pub fn is_restricted(&self, license: &str) -> bool {
        self.restricted.contains(&normalize(license))
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored.contains(name)
    }

    pub fn is_ignored_group(&self, name: &str) -> bool {
        self.ignored_groups.contains(name)
    }

    pub fn licenses_of(&self, name: &str) -> BTreeSet<String> {
        self.licenses.get(name).cloned().unwrap_or_default()
    }

    pub fn homepage_of(&self, name: &str) -> Option<&str> {
        self.homepages.get(name).map(String::as_str)
    }

    /// Manually added packages as `(name, version)` pairs.
    pub fn packages(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.packages
            .iter()
            .map(|(name, version)| (name.as_str(), version.as_deref()))
    }

    pub fn permitted(&self) -> &BTreeSet<String> {
        &self.permitted
    }

    pub fn restricted(&self) -> &BTreeSet<String> {
        &self.restricted
    }

    pub fn ignored(&self) -> &BTreeSet<String> {
        &self.ignored
    }

    pub fn ignored_groups(&self) -> &BTreeSet<String> {
        &self.ignored_groups
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    pub fn inherited_sources(&self) -> &BTreeSet<String> {
        &self.inherited_sources
    }
}
