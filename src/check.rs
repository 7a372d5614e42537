use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::decisions::{ApprovalStatus, DecisionState};
use crate::license::expression::{evaluate, verdict_or};
use crate::license::spdx::normalize;
use crate::models::{CheckedDependency, Dependency, PolicyVerdict, VerdictReason};

/// Read scanner output: a JSON array of [`Dependency`] objects.
pub fn load_dependencies(path: &Path) -> Result<Vec<Dependency>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let deps = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a list of dependencies", path.display()))?;
    Ok(deps)
}

/// Apply the decisions to the scanned packages plus every manually added one.
///
/// Ignored packages and packages in an ignored group are left out. The result
/// is sorted by name, then version.
pub fn check(state: &DecisionState, scanned: &[Dependency]) -> Vec<CheckedDependency> {
    let manual: Vec<Dependency> = state
        .packages()
        .map(|(name, version)| Dependency {
            name: name.to_string(),
            version: version.map(str::to_string),
            licenses: Vec::new(),
            homepage: None,
            groups: Vec::new(),
        })
        .collect();

    let mut results: Vec<CheckedDependency> = manual
        .iter()
        .map(|dep| (dep, true))
        .chain(scanned.iter().map(|dep| (dep, false)))
        .filter(|(dep, _)| !is_skipped(state, dep))
        .map(|(dep, is_manual)| evaluate_dependency(state, dep, is_manual))
        .collect();

    results.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.version.cmp(&b.version)));
    results
}

fn is_skipped(state: &DecisionState, dep: &Dependency) -> bool {
    state.is_ignored(&dep.name) || dep.groups.iter().any(|g| state.is_ignored_group(g))
}

fn evaluate_dependency(state: &DecisionState, dep: &Dependency, manual: bool) -> CheckedDependency {
    let decided = state.licenses_of(&dep.name);
    let licenses: BTreeSet<String> = if decided.is_empty() {
        dep.licenses.iter().map(|l| normalize(l)).collect()
    } else {
        decided
    };

    let homepage = state
        .homepage_of(&dep.name)
        .map(str::to_string)
        .or_else(|| dep.homepage.clone());

    let (verdict, reason) = verdict_for(state, &dep.name, dep.version.as_deref(), &licenses);

    CheckedDependency {
        name: dep.name.clone(),
        version: dep.version.clone(),
        licenses,
        homepage,
        verdict,
        reason,
        manual,
    }
}

fn verdict_for(
    state: &DecisionState,
    name: &str,
    version: Option<&str>,
    licenses: &BTreeSet<String>,
) -> (PolicyVerdict, VerdictReason) {
    if state.approved(name, version) == ApprovalStatus::Approved {
        return (PolicyVerdict::Pass, VerdictReason::ManuallyApproved);
    }
    if licenses.is_empty() {
        return (PolicyVerdict::Warn, VerdictReason::Undecided);
    }

    // Several declared licenses mean the package may be used under any of them
    let verdict = licenses
        .iter()
        .map(|l| evaluate(state, l))
        .reduce(verdict_or)
        .unwrap_or(PolicyVerdict::Warn);

    match verdict {
        PolicyVerdict::Pass => (PolicyVerdict::Pass, VerdictReason::PermittedLicense),
        PolicyVerdict::Error => (PolicyVerdict::Error, VerdictReason::RestrictedLicense),
        PolicyVerdict::Warn => (PolicyVerdict::Warn, VerdictReason::Undecided),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decisions::{Decisions, FetchError, Fetcher, Txn};
    use std::io;
    use std::io::Write;

    struct NoFetch;

    impl Fetcher for NoFetch {
        fn fetch(&self, location: &str) -> Result<String, FetchError> {
            Err(FetchError::Read {
                location: location.to_string(),
                source: io::ErrorKind::NotFound.into(),
            })
        }
    }

    fn dep(name: &str, version: &str, licenses: &[&str]) -> Dependency {
        Dependency {
            name: name.into(),
            version: Some(version.into()),
            licenses: licenses.iter().map(|l| l.to_string()).collect(),
            homepage: None,
            groups: Vec::new(),
        }
    }

    fn decisions() -> Decisions<NoFetch> {
        let mut d = Decisions::new(NoFetch);
        d.permit("MIT", Txn::default())
            .restrict("GPL-3.0", Txn::default());
        d
    }

    fn find<'a>(results: &'a [CheckedDependency], name: &str) -> &'a CheckedDependency {
        results.iter().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn test_verdicts() {
        let d = decisions();
        let scanned = vec![
            dep("permitted", "1.0", &["MIT License"]),
            dep("restricted", "1.0", &["GPL-3.0"]),
            dep("undecided", "1.0", &["MPL-2.0"]),
            dep("unlicensed", "1.0", &[]),
            dep("dual", "1.0", &["GPL-3.0", "MIT"]),
        ];
        let results = check(d.state(), &scanned);

        assert_eq!(find(&results, "permitted").reason, VerdictReason::PermittedLicense);
        assert_eq!(find(&results, "restricted").verdict, PolicyVerdict::Error);
        assert_eq!(find(&results, "undecided").verdict, PolicyVerdict::Warn);
        assert_eq!(find(&results, "unlicensed").reason, VerdictReason::Undecided);
        assert_eq!(find(&results, "dual").verdict, PolicyVerdict::Pass);
    }

    #[test]
    fn test_manual_approval_respects_versions() {
        let mut d = decisions();
        d.approve("gpl-thing", &["1.0".to_string()], Txn::default());

        let scanned = vec![
            dep("gpl-thing", "1.0", &["GPL-3.0"]),
            dep("gpl-thing", "2.0", &["GPL-3.0"]),
        ];
        let results = check(d.state(), &scanned);

        assert_eq!(results[0].version.as_deref(), Some("1.0"));
        assert_eq!(results[0].reason, VerdictReason::ManuallyApproved);
        assert_eq!(results[1].reason, VerdictReason::RestrictedLicense);
    }

    #[test]
    fn test_ignored_packages_and_groups_are_skipped() {
        let mut d = decisions();
        d.ignore("dev-tool", Txn::default())
            .ignore_group("test", Txn::default());

        let mut in_test_group = dep("fixture", "1.0", &["GPL-3.0"]);
        in_test_group.groups = vec!["test".into()];
        let scanned = vec![
            dep("dev-tool", "1.0", &["GPL-3.0"]),
            in_test_group,
            dep("kept", "1.0", &["MIT"]),
        ];

        let results = check(d.state(), &scanned);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "kept");
    }

    #[test]
    fn test_decided_licenses_and_homepage_override_scanned() {
        let mut d = decisions();
        d.license("relicensed", "MIT", Txn::default())
            .homepage("relicensed", "https://example.com", Txn::default());

        let mut scanned = dep("relicensed", "1.0", &["GPL-3.0"]);
        scanned.homepage = Some("https://old.example.com".into());

        let results = check(d.state(), &[scanned]);
        assert_eq!(results[0].verdict, PolicyVerdict::Pass);
        assert_eq!(results[0].homepage.as_deref(), Some("https://example.com"));
        assert_eq!(results[0].license_label(), "MIT");
    }

    #[test]
    fn test_manual_packages_are_checked() {
        let mut d = decisions();
        d.add_package("vendored", Some("0.3"), Txn::default())
            .license("vendored", "MIT", Txn::default());

        let results = check(d.state(), &[]);
        assert_eq!(results.len(), 1);
        assert!(results[0].manual);
        assert_eq!(results[0].verdict, PolicyVerdict::Pass);
    }

    #[test]
    fn test_load_dependencies() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "serde", "version": "1.0.0", "licenses": ["MIT OR Apache-2.0"]}},
                {{"name": "rspec", "groups": ["test"]}}]"#
        )
        .unwrap();

        let deps = load_dependencies(file.path()).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].licenses, vec!["MIT OR Apache-2.0"]);
        assert!(deps[1].version.is_none());
        assert_eq!(deps[1].groups, vec!["test"]);
    }
}
