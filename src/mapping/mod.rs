//! Rule-driven field mapping.
//!
//! - [`resolve()`]: dot-path lookup inside a nested JSON object
//! - [`map_record()`]: apply a [`crate::types::RuleDocument`] to one record
//!
//! ```rust
//! use rule_ingest::mapping::map_record;
//! use rule_ingest::types::RuleDocument;
//!
//! let rules = RuleDocument::from_json_slice(br#"{"name":"user.name"}"#).unwrap();
//! let record = serde_json::json!({"user": {"name": "Ada"}});
//! let out = map_record(record.as_object().unwrap(), &rules).unwrap();
//! assert_eq!(out["name"], "Ada");
//! ```

pub mod mapper;
pub mod path;

pub use mapper::{find_mapped_key, map_record};
pub use path::resolve;
