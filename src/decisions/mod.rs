//! The decision store: an append-only log of policy decisions and the state
//! derived by replaying it.
//!
//! - [`record`] — the [`Decision`] variants and their [`Txn`] audit metadata.
//! - [`state`] — the [`DecisionState`] projection and approval lookups.
//! - [`codec`] — the versioned persisted format.
//! - [`inherit`] — fetching inherited decision logs from paths or URLs.
//!
//! Every decision goes through [`Decisions::apply`], which updates the
//! projection and, under [`ApplyContext::LOCAL`], appends the record to the log.
//! Records replayed from an inherited log affect the projection only.
//!
//! Inheritance has no cycle guard: a source that (transitively) inherits from
//! itself is fetched again and again until a fetch fails or the stack runs out.

pub mod codec;
pub mod error;
pub mod inherit;
pub mod record;
pub mod state;

use std::collections::BTreeSet;
use std::path::Path;

pub use error::{DecisionError, DecodeError, FetchError};
pub use inherit::{Fetcher, SourceFetcher};
pub use record::{Decision, Txn};
pub use state::{Approval, ApprovalStatus, DecisionState};

/// Whether an applied decision is recorded in this store's own log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyContext {
    pub record: bool,
}

impl ApplyContext {
    /// Decisions made for this project.
    pub const LOCAL: ApplyContext = ApplyContext { record: true };
    /// Decisions replayed from an inherited log.
    pub const INHERITED: ApplyContext = ApplyContext { record: false };
}

/// A decision log, its projection, and the fetcher used to resolve inheritance.
///
/// Not synchronized; use one store per caller.
pub struct Decisions<F: Fetcher> {
    log: Vec<Decision>,
    state: DecisionState,
    fetcher: F,
}

impl<F: Fetcher> Decisions<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            log: Vec::new(),
            state: DecisionState::default(),
            fetcher,
        }
    }

    // ---------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------

    /// Rebuild a store by replaying a persisted log.
    pub fn restore(text: &str, fetcher: F) -> Result<Self, DecisionError> {
        Self::restore_from("input", text, fetcher)
    }

    /// Load the decisions file at `path`. A missing file is an empty store.
    pub fn fetch_saved(path: &Path, fetcher: F) -> Result<Self, DecisionError> {
        if !path.exists() {
            return Ok(Self::new(fetcher));
        }
        let text = std::fs::read_to_string(path).map_err(|source| DecisionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::restore_from(&path.display().to_string(), &text, fetcher)
    }

    fn restore_from(origin: &str, text: &str, fetcher: F) -> Result<Self, DecisionError> {
        let log = codec::decode(text).map_err(|source| DecisionError::Decode {
            origin: origin.to_string(),
            source,
        })?;
        let mut decisions = Self::new(fetcher);
        decisions.replay(log, ApplyContext::LOCAL)?;
        Ok(decisions)
    }

    /// The log in its persisted form.
    pub fn persist(&self) -> Result<String, DecisionError> {
        Ok(codec::encode(&self.log)?)
    }

    /// Write the log to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), DecisionError> {
        let io_err = |source| DecisionError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(path, self.persist()?).map_err(io_err)
    }

    // ---------------------------------------------------------------------
    // Applying decisions
    // ---------------------------------------------------------------------

    /// Apply one decision to the projection and, in a recording context,
    /// append it to the log.
    pub fn apply(&mut self, decision: Decision, ctx: ApplyContext) -> Result<(), DecisionError> {
        if let Decision::InheritFrom { location, .. } = &decision {
            let location = location.clone();
            return self.inherit(decision, &location, ctx);
        }
        self.commit(decision, ctx);
        Ok(())
    }

    /// Apply every decision in order.
    pub fn replay(&mut self, log: Vec<Decision>, ctx: ApplyContext) -> Result<(), DecisionError> {
        for decision in log {
            self.apply(decision, ctx)?;
        }
        Ok(())
    }

    fn commit(&mut self, decision: Decision, ctx: ApplyContext) {
        self.state.apply(&decision);
        if ctx.record {
            self.log.push(decision);
        }
    }

    /// Fetch and decode, then record and replay the foreign log depth-first.
    ///
    /// If any source in the tree cannot be fetched or decoded, the log and the
    /// projection are put back as they were before this record.
    fn inherit(
        &mut self,
        decision: Decision,
        location: &str,
        ctx: ApplyContext,
    ) -> Result<(), DecisionError> {
        let text = self.fetcher.fetch(location)?;
        let foreign = codec::decode(&text).map_err(|source| DecisionError::Decode {
            origin: location.to_string(),
            source,
        })?;

        let log_len = self.log.len();
        let before = self.state.clone();
        self.commit(decision, ctx);
        if let Err(err) = self.replay(foreign, ApplyContext::INHERITED) {
            tracing::debug!(location, error = %err, "rolling back unresolved inheritance");
            self.log.truncate(log_len);
            self.state = before;
            return Err(err);
        }
        Ok(())
    }

    /// Record a decision that has no side effects beyond the projection.
    fn decide(&mut self, decision: Decision) -> &mut Self {
        self.commit(decision, ApplyContext::LOCAL);
        self
    }

    pub fn add_package(&mut self, name: &str, version: Option<&str>, txn: Txn) -> &mut Self {
        self.decide(Decision::AddPackage {
            name: name.to_string(),
            version: version.map(str::to_string),
            txn,
        })
    }

    pub fn remove_package(&mut self, name: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::RemovePackage {
            name: name.to_string(),
            txn,
        })
    }

    pub fn license(&mut self, name: &str, license: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::License {
            name: name.to_string(),
            license: license.to_string(),
            txn,
        })
    }

    pub fn unlicense(&mut self, name: &str, license: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::Unlicense {
            name: name.to_string(),
            license: license.to_string(),
            txn,
        })
    }

    pub fn homepage(&mut self, name: &str, url: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::Homepage {
            name: name.to_string(),
            url: url.to_string(),
            txn,
        })
    }

    /// Approve `name`, for every version when `versions` is empty.
    pub fn approve(&mut self, name: &str, versions: &[String], txn: Txn) -> &mut Self {
        self.decide(Decision::Approve {
            name: name.to_string(),
            versions: versions.to_vec(),
            txn,
        })
    }

    pub fn unapprove(&mut self, name: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::Unapprove {
            name: name.to_string(),
            txn,
        })
    }

    pub fn permit(&mut self, license: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::Permit {
            license: license.to_string(),
            txn,
        })
    }

    pub fn unpermit(&mut self, license: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::Unpermit {
            license: license.to_string(),
            txn,
        })
    }

    pub fn restrict(&mut self, license: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::Restrict {
            license: license.to_string(),
            txn,
        })
    }

    pub fn unrestrict(&mut self, license: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::Unrestrict {
            license: license.to_string(),
            txn,
        })
    }

    pub fn ignore(&mut self, name: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::Ignore {
            name: name.to_string(),
            txn,
        })
    }

    pub fn heed(&mut self, name: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::Heed {
            name: name.to_string(),
            txn,
        })
    }

    pub fn ignore_group(&mut self, name: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::IgnoreGroup {
            name: name.to_string(),
            txn,
        })
    }

    pub fn heed_group(&mut self, name: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::HeedGroup {
            name: name.to_string(),
            txn,
        })
    }

    pub fn name_project(&mut self, name: &str, txn: Txn) -> &mut Self {
        self.decide(Decision::NameProject {
            name: name.to_string(),
            txn,
        })
    }

    pub fn unname_project(&mut self, txn: Txn) -> &mut Self {
        self.decide(Decision::UnnameProject { txn })
    }

    /// Inherit every decision recorded at `location` (a path or an
    /// `http(s)://` URL). Only the `inherit_from` record joins this log.
    pub fn inherit_from(&mut self, location: &str, txn: Txn) -> Result<&mut Self, DecisionError> {
        self.apply(
            Decision::InheritFrom {
                location: location.to_string(),
                txn,
            },
            ApplyContext::LOCAL,
        )?;
        Ok(self)
    }

    /// Drop the `inherit_from` record for `location` from the log.
    ///
    /// Effects already replayed from that source stay in the projection until
    /// the trimmed log is saved and loaded again.
    pub fn remove_inheritance(&mut self, location: &str) -> &mut Self {
        self.log.retain(
            |d| !matches!(d, Decision::InheritFrom { location: l, .. } if l == location),
        );
        self.state.forget_source(location);
        self
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// The recorded log, in order.
    pub fn decisions(&self) -> &[Decision] {
        &self.log
    }

    pub fn state(&self) -> &DecisionState {
        &self.state
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn approval_of(&self, name: &str, version: Option<&str>) -> Option<&Approval> {
        self.state.approval_of(name, version)
    }

    pub fn approved(&self, name: &str, version: Option<&str>) -> ApprovalStatus {
        self.state.approved(name, version)
    }

    pub fn is_permitted(&self, license: &str) -> bool {
        self.state.is_permitted(license)
    }

    pub fn is_restricted(&self, license: &str) -> bool {
        self.state.is_restricted(license)
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.state.is_ignored(name)
    }

    pub fn is_ignored_group(&self, name: &str) -> bool {
        self.state.is_ignored_group(name)
    }

    pub fn licenses_of(&self, name: &str) -> BTreeSet<String> {
        self.state.licenses_of(name)
    }

    pub fn homepage_of(&self, name: &str) -> Option<&str> {
        self.state.homepage_of(name)
    }

    pub fn project_name(&self) -> Option<&str> {
        self.state.project_name()
    }

    pub fn inherited_sources(&self) -> &BTreeSet<String> {
        self.state.inherited_sources()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io;

    /// Serves documents from memory and remembers every requested location.
    #[derive(Default)]
    struct MemoryFetcher {
        docs: HashMap<String, String>,
        requests: RefCell<Vec<String>>,
        limit: Option<usize>,
    }

    impl MemoryFetcher {
        fn with(mut self, location: &str, log: &[Decision]) -> Self {
            self.docs
                .insert(location.to_string(), codec::encode(log).unwrap());
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.borrow().clone()
        }
    }

    impl Fetcher for MemoryFetcher {
        fn fetch(&self, location: &str) -> Result<String, FetchError> {
            let mut requests = self.requests.borrow_mut();
            if self.limit.is_some_and(|limit| requests.len() >= limit) {
                return Err(not_found(location));
            }
            requests.push(location.to_string());
            self.docs
                .get(location)
                .cloned()
                .ok_or_else(|| not_found(location))
        }
    }

    fn not_found(location: &str) -> FetchError {
        FetchError::Read {
            location: location.to_string(),
            source: io::ErrorKind::NotFound.into(),
        }
    }

    fn txn() -> Txn {
        Txn::default()
    }

    fn restrict(license: &str) -> Decision {
        Decision::Restrict {
            license: license.into(),
            txn: txn(),
        }
    }

    fn inherit(location: &str) -> Decision {
        Decision::InheritFrom {
            location: location.into(),
            txn: txn(),
        }
    }

    #[test]
    fn test_group_and_permit_scenario() {
        let mut d = Decisions::new(MemoryFetcher::default());

        d.ignore_group("test", txn());
        assert!(d.is_ignored_group("test"));
        d.heed_group("test", txn());
        assert!(!d.is_ignored_group("test"));

        d.permit("MIT", txn());
        assert!(d.is_permitted("MIT"));
        d.unpermit("MIT", txn());
        assert!(!d.is_permitted("MIT"));

        // removals are recorded too
        assert_eq!(d.decisions().len(), 4);
    }

    #[test]
    fn test_ignore_and_heed() {
        let mut d = Decisions::new(MemoryFetcher::default());
        d.ignore("dev-tool", txn());
        assert!(d.is_ignored("dev-tool"));
        d.heed("dev-tool", txn());
        assert!(!d.is_ignored("dev-tool"));
    }

    #[test]
    fn test_approval_quirk_is_preserved() {
        let mut d = Decisions::new(MemoryFetcher::default());
        d.approve("x", &[], txn())
            .approve("x", &["1.0".to_string()], txn());

        assert_eq!(d.approved("x", None), ApprovalStatus::Approved);
        assert_eq!(d.approved("x", Some("2.0")), ApprovalStatus::Approved);
        assert_eq!(d.approved("y", None), ApprovalStatus::Unknown);

        d.unapprove("x", txn());
        assert_eq!(d.approved("x", None), ApprovalStatus::Unknown);
    }

    #[test]
    fn test_approve_merges_versions() {
        let mut d = Decisions::new(MemoryFetcher::default());
        d.approve("x", &["1.0".to_string()], txn())
            .approve("x", &["2.0".to_string()], txn());

        let approval = d.approval_of("x", Some("1.0")).unwrap();
        assert!(approval.safe_versions.contains("1.0"));
        assert!(approval.safe_versions.contains("2.0"));
        assert_eq!(d.approved("x", Some("3.0")), ApprovalStatus::NotApproved);
    }

    #[test]
    fn test_replay_twice_does_not_drift() {
        let mut d = Decisions::new(MemoryFetcher::default());
        d.add_package("vendored", Some("1.0"), txn())
            .license("vendored", "MIT", txn())
            .homepage("vendored", "https://example.com", txn())
            .approve("x", &["1.0".to_string()], txn())
            .approve("x", &["2.0".to_string()], txn())
            .permit("MIT", txn())
            .restrict("GPL-3.0", txn())
            .ignore("dev-tool", txn())
            .ignore_group("test", txn())
            .name_project("demo", txn());

        let log = d.decisions().to_vec();
        let mut once = Decisions::new(MemoryFetcher::default());
        once.replay(log.clone(), ApplyContext::INHERITED).unwrap();
        let mut twice = Decisions::new(MemoryFetcher::default());
        twice.replay(log.clone(), ApplyContext::INHERITED).unwrap();
        twice.replay(log, ApplyContext::INHERITED).unwrap();

        assert_eq!(once.state(), twice.state());
        assert_eq!(once.state(), d.state());
        assert!(once.decisions().is_empty());
    }

    #[test]
    fn test_restore_rebuilds_state() {
        let mut d = Decisions::new(MemoryFetcher::default());
        d.permit("MIT", txn())
            .approve("x", &["1.0".to_string()], txn())
            .name_project("demo", txn())
            .unname_project(txn())
            .add_package("vendored", None, txn())
            .remove_package("vendored", txn());

        let restored = Decisions::restore(&d.persist().unwrap(), MemoryFetcher::default()).unwrap();
        assert_eq!(restored.decisions(), d.decisions());
        assert_eq!(restored.state(), d.state());
        assert_eq!(restored.project_name(), None);
    }

    #[test]
    fn test_inherited_records_are_not_recorded() {
        let fetcher = MemoryFetcher::default().with(
            "parent.json",
            &[
                restrict("GPL-3.0"),
                Decision::Ignore {
                    name: "dev-tool".into(),
                    txn: txn(),
                },
            ],
        );
        let mut d = Decisions::new(fetcher);
        d.inherit_from("parent.json", txn()).unwrap();

        assert!(d.is_restricted("GPL-3.0"));
        assert!(d.is_ignored("dev-tool"));
        assert_eq!(d.decisions(), &[inherit("parent.json")]);

        let persisted: serde_json::Value = serde_json::from_str(&d.persist().unwrap()).unwrap();
        assert_eq!(persisted["decisions"].as_array().unwrap().len(), 1);
        assert_eq!(persisted["decisions"][0][0], "inherit_from");
    }

    #[test]
    fn test_local_decisions_override_inherited() {
        let fetcher = MemoryFetcher::default().with("parent.json", &[restrict("GPL")]);
        let mut d = Decisions::new(fetcher);
        d.inherit_from("parent.json", txn())
            .unwrap()
            .permit("GPL", txn());

        assert!(d.is_permitted("GPL"));
        assert!(d.is_restricted("GPL"));

        d.unrestrict("GPL", txn());
        assert!(!d.is_restricted("GPL"));
    }

    #[test]
    fn test_transitive_inheritance_is_depth_first() {
        let fetcher = MemoryFetcher::default()
            .with("root.json", &[inherit("a.json"), inherit("b.json")])
            .with(
                "a.json",
                &[
                    inherit("c.json"),
                    Decision::NameProject {
                        name: "from-a".into(),
                        txn: txn(),
                    },
                ],
            )
            .with(
                "b.json",
                &[Decision::NameProject {
                    name: "from-b".into(),
                    txn: txn(),
                }],
            )
            .with(
                "c.json",
                &[Decision::NameProject {
                    name: "from-c".into(),
                    txn: txn(),
                }],
            );

        let mut d = Decisions::new(fetcher);
        d.inherit_from("root.json", txn()).unwrap();

        assert_eq!(
            d.fetcher().requests(),
            vec!["root.json", "a.json", "c.json", "b.json"]
        );
        assert_eq!(d.project_name(), Some("from-b"));
        // nested sources are tracked but never recorded locally
        assert_eq!(d.inherited_sources().len(), 4);
        assert_eq!(d.decisions(), &[inherit("root.json")]);
    }

    #[test]
    fn test_failed_fetch_leaves_store_untouched() {
        let mut d = Decisions::new(MemoryFetcher::default());
        d.permit("MIT", txn());
        let before = d.state().clone();

        let err = d.inherit_from("missing.json", txn()).err().unwrap();
        assert!(matches!(err, DecisionError::Fetch(_)));
        assert_eq!(d.decisions().len(), 1);
        assert_eq!(d.state(), &before);
    }

    #[test]
    fn test_failed_nested_inheritance_rolls_back() {
        let fetcher = MemoryFetcher::default()
            .with("root.json", &[restrict("GPL-3.0"), inherit("missing.json")]);
        let mut d = Decisions::new(&fetcher);
        d.permit("MIT", txn());
        let before = d.state().clone();

        let err = d.inherit_from("root.json", txn()).err().unwrap();
        assert!(matches!(err, DecisionError::Fetch(FetchError::Read { .. })));
        assert_eq!(fetcher.requests(), vec!["root.json", "missing.json"]);

        assert_eq!(d.decisions().len(), 1);
        assert_eq!(d.state(), &before);
        assert!(!d.is_restricted("GPL-3.0"));
        assert!(d.inherited_sources().is_empty());

        // nothing unresolvable was recorded, so the saved log still loads
        let reloaded = Decisions::restore(&d.persist().unwrap(), &fetcher).unwrap();
        assert!(reloaded.is_permitted("MIT"));
    }

    #[test]
    fn test_malformed_inherited_log_is_rejected() {
        let mut fetcher = MemoryFetcher::default();
        fetcher.docs.insert(
            "bad.json".into(),
            r#"{"version": 1, "decisions": [["bless", "x"]]}"#.into(),
        );
        let mut d = Decisions::new(fetcher);

        match d.inherit_from("bad.json", txn()) {
            Err(DecisionError::Decode { origin, source }) => {
                assert_eq!(origin, "bad.json");
                assert!(matches!(source, DecodeError::Entry { index: 0, .. }));
            }
            other => panic!("expected decode error, got {:?}", other.err()),
        }
        assert!(d.decisions().is_empty());
        assert!(d.inherited_sources().is_empty());
    }

    #[test]
    fn test_remove_inheritance_stops_refetch_on_reload() {
        let fetcher = MemoryFetcher::default().with("parent.json", &[restrict("GPL-3.0")]);
        let mut d = Decisions::new(&fetcher);
        d.inherit_from("parent.json", txn())
            .unwrap()
            .permit("MIT", txn())
            .remove_inheritance("parent.json");

        assert!(!d.inherited_sources().contains("parent.json"));
        // projection is not rolled back in place
        assert!(d.is_restricted("GPL-3.0"));

        let persisted = d.persist().unwrap();
        let reloaded = Decisions::restore(&persisted, &fetcher).unwrap();

        assert_eq!(fetcher.requests(), vec!["parent.json"]);
        assert!(!reloaded.is_restricted("GPL-3.0"));
        assert!(reloaded.is_permitted("MIT"));
        assert!(reloaded.inherited_sources().is_empty());
    }

    #[test]
    fn test_reload_refetches_inherited_sources() {
        let fetcher = MemoryFetcher::default().with("parent.json", &[restrict("GPL-3.0")]);
        let mut d = Decisions::new(&fetcher);
        d.inherit_from("parent.json", txn()).unwrap();

        let reloaded = Decisions::restore(&d.persist().unwrap(), &fetcher).unwrap();
        assert_eq!(fetcher.requests().len(), 2);
        assert!(reloaded.is_restricted("GPL-3.0"));
        assert_eq!(reloaded.decisions(), d.decisions());
    }

    #[test]
    fn test_inheritance_cycle_refetches_until_failure() {
        // no cycle guard: a self-inheriting source is fetched until the fetcher gives up
        let fetcher = MemoryFetcher {
            limit: Some(5),
            ..MemoryFetcher::default()
        }
        .with("loop.json", &[inherit("loop.json")]);
        let mut d = Decisions::new(&fetcher);

        assert!(d.inherit_from("loop.json", txn()).is_err());
        assert_eq!(fetcher.requests().len(), 5);
    }

    #[test]
    fn test_save_and_fetch_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc").join("dependency_decisions.json");

        let empty = Decisions::fetch_saved(&path, MemoryFetcher::default()).unwrap();
        assert!(empty.decisions().is_empty());

        let mut d = Decisions::new(MemoryFetcher::default());
        d.permit("MIT", txn()).ignore("dev-tool", txn());
        d.save(&path).unwrap();

        let loaded = Decisions::fetch_saved(&path, MemoryFetcher::default()).unwrap();
        assert_eq!(loaded.decisions(), d.decisions());
        assert!(loaded.is_permitted("MIT"));
        assert!(loaded.is_ignored("dev-tool"));
    }

    #[test]
    fn test_fetch_saved_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.json");
        std::fs::write(&path, r#"{"version": 1, "decisions": [["permit"]]}"#).unwrap();

        let err = Decisions::fetch_saved(&path, MemoryFetcher::default()).err().unwrap();
        assert!(matches!(err, DecisionError::Decode { .. }));
    }
}
