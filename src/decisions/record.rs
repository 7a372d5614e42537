use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit metadata attached to a decision by whoever made it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Txn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub why: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<DateTime<Utc>>,
}

impl Txn {
    /// Metadata stamped with the current time.
    pub fn now(who: Option<String>, why: Option<String>) -> Self {
        Txn {
            who,
            why,
            when: Some(Utc::now()),
        }
    }
}

/// A single recorded policy decision.
///
/// Records are immutable once appended to the log. The persisted tag of each
/// variant is returned by [`Decision::kind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    AddPackage {
        name: String,
        version: Option<String>,
        txn: Txn,
    },
    RemovePackage {
        name: String,
        txn: Txn,
    },
    License {
        name: String,
        license: String,
        txn: Txn,
    },
    Unlicense {
        name: String,
        license: String,
        txn: Txn,
    },
    Homepage {
        name: String,
        url: String,
        txn: Txn,
    },
    Approve {
        name: String,
        versions: Vec<String>,
        txn: Txn,
    },
    Unapprove {
        name: String,
        txn: Txn,
    },
    Permit {
        license: String,
        txn: Txn,
    },
    Unpermit {
        license: String,
        txn: Txn,
    },
    Restrict {
        license: String,
        txn: Txn,
    },
    Unrestrict {
        license: String,
        txn: Txn,
    },
    Ignore {
        name: String,
        txn: Txn,
    },
    Heed {
        name: String,
        txn: Txn,
    },
    IgnoreGroup {
        name: String,
        txn: Txn,
    },
    HeedGroup {
        name: String,
        txn: Txn,
    },
    NameProject {
        name: String,
        txn: Txn,
    },
    UnnameProject {
        txn: Txn,
    },
    InheritFrom {
        location: String,
        txn: Txn,
    },
}

impl Decision {
    /// The tag this decision is persisted under.
    pub fn kind(&self) -> &'static str {
        match self {
            Decision::AddPackage { .. } => "add_package",
            Decision::RemovePackage { .. } => "remove_package",
            Decision::License { .. } => "license",
            Decision::Unlicense { .. } => "unlicense",
            Decision::Homepage { .. } => "homepage",
            Decision::Approve { .. } => "approve",
            Decision::Unapprove { .. } => "unapprove",
            Decision::Permit { .. } => "permit",
            Decision::Unpermit { .. } => "unpermit",
            Decision::Restrict { .. } => "restrict",
            Decision::Unrestrict { .. } => "unrestrict",
            Decision::Ignore { .. } => "ignore",
            Decision::Heed { .. } => "heed",
            Decision::IgnoreGroup { .. } => "ignore_group",
            Decision::HeedGroup { .. } => "heed_group",
            Decision::NameProject { .. } => "name_project",
            Decision::UnnameProject { .. } => "unname_project",
            Decision::InheritFrom { .. } => "inherit_from",
        }
    }

    pub fn txn(&self) -> &Txn {
        match self {
            Decision::AddPackage { txn, .. }
            | Decision::RemovePackage { txn, .. }
            | Decision::License { txn, .. }
            | Decision::Unlicense { txn, .. }
            | Decision::Homepage { txn, .. }
            | Decision::Approve { txn, .. }
            | Decision::Unapprove { txn, .. }
            | Decision::Permit { txn, .. }
            | Decision::Unpermit { txn, .. }
            | Decision::Restrict { txn, .. }
            | Decision::Unrestrict { txn, .. }
            | Decision::Ignore { txn, .. }
            | Decision::Heed { txn, .. }
            | Decision::IgnoreGroup { txn, .. }
            | Decision::HeedGroup { txn, .. }
            | Decision::NameProject { txn, .. }
            | Decision::UnnameProject { txn }
            | Decision::InheritFrom { txn, .. } => txn,
        }
    }
}
