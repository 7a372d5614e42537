//! Persisted decisions format.
//!
//! A versioned JSON document whose `decisions` array holds one positional entry
//! per record: `[kind, arg1, arg2, ..., metadata]`.
//!
//! ```json
//! {
//!   "version": 1,
//!   "decisions": [
//!     ["permit", "MIT", {"who": "ops"}],
//!     ["approve", "left-pad", ["1.3.0"], {}]
//!   ]
//! }
//! ```

use serde::Serialize;
use serde_json::Value;

use super::error::DecodeError;
use super::record::{Decision, Txn};

pub const FORMAT_VERSION: u64 = 1;

#[derive(Serialize)]
struct Document {
    version: u64,
    decisions: Vec<Value>,
}

/// Serialize a decision log, preserving record order.
pub fn encode(log: &[Decision]) -> Result<String, serde_json::Error> {
    let decisions = log.iter().map(to_entry).collect::<Result<Vec<_>, _>>()?;
    let mut out = serde_json::to_string_pretty(&Document {
        version: FORMAT_VERSION,
        decisions,
    })?;
    out.push('\n');
    Ok(out)
}

/// Parse a persisted decision log. Blank input is an empty log.
pub fn decode(text: &str) -> Result<Vec<Decision>, DecodeError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let doc: Value = serde_json::from_str(text)?;
    let doc = doc.as_object().ok_or(DecodeError::NotADocument)?;

    let version = doc
        .get("version")
        .and_then(Value::as_u64)
        .ok_or(DecodeError::NotADocument)?;
    if version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        });
    }

    let entries = doc
        .get("decisions")
        .and_then(Value::as_array)
        .ok_or(DecodeError::NotADocument)?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| from_entry(entry).map_err(|reason| DecodeError::Entry { index, reason }))
        .collect()
}

fn to_entry(decision: &Decision) -> Result<Value, serde_json::Error> {
    let mut entry = vec![Value::from(decision.kind())];

    match decision {
        Decision::AddPackage { name, version, .. } => {
            entry.push(Value::from(name.as_str()));
            entry.push(version.as_deref().map_or(Value::Null, Value::from));
        }
        Decision::License { name, license, .. } | Decision::Unlicense { name, license, .. } => {
            entry.push(Value::from(name.as_str()));
            entry.push(Value::from(license.as_str()));
        }
        Decision::Homepage { name, url, .. } => {
            entry.push(Value::from(name.as_str()));
            entry.push(Value::from(url.as_str()));
        }
        Decision::Approve { name, versions, .. } => {
            entry.push(Value::from(name.as_str()));
            entry.push(Value::from(versions.clone()));
        }
        Decision::RemovePackage { name, .. }
        | Decision::Unapprove { name, .. }
        | Decision::Ignore { name, .. }
        | Decision::Heed { name, .. }
        | Decision::IgnoreGroup { name, .. }
        | Decision::HeedGroup { name, .. }
        | Decision::NameProject { name, .. } => {
            entry.push(Value::from(name.as_str()));
        }
        Decision::Permit { license, .. }
        | Decision::Unpermit { license, .. }
        | Decision::Restrict { license, .. }
        | Decision::Unrestrict { license, .. } => {
            entry.push(Value::from(license.as_str()));
        }
        Decision::InheritFrom { location, .. } => {
            entry.push(Value::from(location.as_str()));
        }
        Decision::UnnameProject { .. } => {}
    }

    entry.push(serde_json::to_value(decision.txn())?);
    Ok(Value::Array(entry))
}

/// Number of positional arguments each kind takes, excluding metadata.
fn arity(kind: &str) -> Option<usize> {
    match kind {
        "unname_project" => Some(0),
        "remove_package" | "unapprove" | "permit" | "unpermit" | "restrict" | "unrestrict"
        | "ignore" | "heed" | "ignore_group" | "heed_group" | "name_project" | "inherit_from" => {
            Some(1)
        }
        "add_package" | "license" | "unlicense" | "homepage" | "approve" => Some(2),
        _ => None,
    }
}

fn from_entry(entry: &Value) -> Result<Decision, String> {
    let items = entry
        .as_array()
        .ok_or_else(|| "expected an array".to_string())?;
    let (tag, rest) = items
        .split_first()
        .ok_or_else(|| "empty entry".to_string())?;
    let kind = tag
        .as_str()
        .ok_or_else(|| "kind tag must be a string".to_string())?;
    let expected = arity(kind).ok_or_else(|| format!("unknown decision kind `{kind}`"))?;

    let (args, txn) = if rest.len() == expected {
        (rest, Txn::default())
    } else if rest.len() == expected + 1 {
        let txn = serde_json::from_value::<Txn>(rest[expected].clone())
            .map_err(|e| format!("`{kind}` has invalid metadata: {e}"))?;
        (&rest[..expected], txn)
    } else {
        return Err(format!(
            "`{kind}` expects {expected} argument(s), found {}",
            rest.len()
        ));
    };

    let string = |i: usize| -> Result<String, String> {
        args[i]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| format!("`{kind}` argument {} must be a string", i + 1))
    };

    let decision = match kind {
        "add_package" => {
            let version = match &args[1] {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                _ => return Err(format!("`{kind}` version must be a string or null")),
            };
            Decision::AddPackage {
                name: string(0)?,
                version,
                txn,
            }
        }
        "remove_package" => Decision::RemovePackage {
            name: string(0)?,
            txn,
        },
        "license" => Decision::License {
            name: string(0)?,
            license: string(1)?,
            txn,
        },
        "unlicense" => Decision::Unlicense {
            name: string(0)?,
            license: string(1)?,
            txn,
        },
        "homepage" => Decision::Homepage {
            name: string(0)?,
            url: string(1)?,
            txn,
        },
        "approve" => {
            let versions = args[1]
                .as_array()
                .and_then(|vs| {
                    vs.iter()
                        .map(|v| v.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| format!("`{kind}` versions must be an array of strings"))?;
            Decision::Approve {
                name: string(0)?,
                versions,
                txn,
            }
        }
        "unapprove" => Decision::Unapprove {
            name: string(0)?,
            txn,
        },
        "permit" => Decision::Permit {
            license: string(0)?,
            txn,
        },
        "unpermit" => Decision::Unpermit {
            license: string(0)?,
            txn,
        },
        "restrict" => Decision::Restrict {
            license: string(0)?,
            txn,
        },
        "unrestrict" => Decision::Unrestrict {
            license: string(0)?,
            txn,
        },
        "ignore" => Decision::Ignore {
            name: string(0)?,
            txn,
        },
        "heed" => Decision::Heed {
            name: string(0)?,
            txn,
        },
        "ignore_group" => Decision::IgnoreGroup {
            name: string(0)?,
            txn,
        },
        "heed_group" => Decision::HeedGroup {
            name: string(0)?,
            txn,
        },
        "name_project" => Decision::NameProject {
            name: string(0)?,
            txn,
        },
        "unname_project" => Decision::UnnameProject { txn },
        "inherit_from" => Decision::InheritFrom {
            location: string(0)?,
            txn,
        },
        other => return Err(format!("unknown decision kind `{other}`")),
    };

    Ok(decision)
}
