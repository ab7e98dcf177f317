//! Core data model types: records, rule documents and flattened sign-in entries.
//!
//! Records are plain JSON objects ([`Record`]); JSON values themselves are the tagged union
//! [`serde_json::Value`], so every traversal matches on `Object` / `Array` / scalars exhaustively.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IngestionError, IngestionResult};

/// A JSON object: one raw input record, or one mapped output record.
pub type Record = serde_json::Map<String, Value>;

/// Target key under which the nested sign-in structure is produced by the default rules.
pub const SIGN_IN_ACTIVITY_KEY: &str = "sign_in_activity";

/// Identifying field kept on every user record and used to cross-reference sign-in entries.
pub const ID_KEY: &str = "id";

/// One entry of a [`RuleDocument`].
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Dot-separated path resolved against the record root.
    Path(String),
    /// Nested output object; each value is a full path from the record root.
    Nested(BTreeMap<String, String>),
    /// Any other JSON shape. Ignored when mapping, but its key still guides record discovery.
    Unsupported(Value),
}

/// Declarative mapping from target field name to source path(s).
///
/// Loaded once per run and shared read-only between workers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleDocument {
    rules: BTreeMap<String, Rule>,
}

impl RuleDocument {
    /// The built-in mapping used when no rule file is supplied.
    pub fn default_rules() -> Self {
        let flat = [
            ("id", "id"),
            ("external_id", "userPrincipalName"),
            ("mail", "mail"),
            ("type", "userType"),
            ("location", "usageLocation"),
            ("is_enabled", "accountEnabled"),
            ("first_name", "givenName"),
            ("last_name", "surname"),
        ];
        let sign_in = [
            "lastSignInDateTime",
            "lastSignInRequestId",
            "lastNonInteractiveSignInDateTime",
            "lastNonInteractiveSignInRequestId",
            "lastSuccessfulSignInDateTime",
            "lastSuccessfulSignInRequestId",
        ];

        let mut rules: BTreeMap<String, Rule> = flat
            .into_iter()
            .map(|(target, source)| (target.to_string(), Rule::Path(source.to_string())))
            .collect();
        rules.insert(
            SIGN_IN_ACTIVITY_KEY.to_string(),
            Rule::Nested(
                sign_in
                    .into_iter()
                    .map(|k| (k.to_string(), format!("signInActivity.{k}")))
                    .collect(),
            ),
        );
        Self { rules }
    }

    /// Read and parse a rule file.
    pub fn from_path(path: impl AsRef<Path>) -> IngestionResult<Self> {
        let bytes = fs::read(path)?;
        Self::from_json_slice(&bytes)
    }

    /// Parse a rule document from raw JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> IngestionResult<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Convert a parsed JSON value into a validated rule document.
    ///
    /// The top level must be an object. Source paths must be non-empty; nested entries whose value
    /// is not a string are dropped.
    pub fn from_value(value: Value) -> IngestionResult<Self> {
        let Value::Object(map) = value else {
            return Err(IngestionError::InvalidRules {
                message: "rule document must be a json object".to_string(),
            });
        };

        let mut rules = BTreeMap::new();
        for (target, v) in map {
            let rule = match v {
                Value::String(path) => Rule::Path(validate_path(&target, path)?),
                Value::Object(nested) => {
                    let mut out = BTreeMap::new();
                    for (nested_target, nv) in nested {
                        if let Value::String(path) = nv {
                            let path = validate_path(&nested_target, path)?;
                            out.insert(nested_target, path);
                        }
                    }
                    Rule::Nested(out)
                }
                other => Rule::Unsupported(other),
            };
            rules.insert(target, rule);
        }
        Ok(Self { rules })
    }

    /// Iterate `(target, rule)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate target field names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn get(&self, target: &str) -> Option<&Rule> {
        self.rules.get(target)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn validate_path(target: &str, path: String) -> IngestionResult<String> {
    if path.is_empty() {
        return Err(IngestionError::InvalidRules {
            message: format!("rule '{target}' has an empty source path"),
        });
    }
    Ok(path)
}

/// One flattened sign-in event, cross-referenced to its user by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInEntry {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
    #[serde(rename = "requestId")]
    pub request_id: String,
    /// Name of the timestamp field this entry came from (e.g. `lastSignInDateTime`).
    #[serde(rename = "type")]
    pub kind: String,
}
