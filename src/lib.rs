//! `rule-ingest` maps JSON user records through a declarative rule document and splits their
//! sign-in activity into a separate, id-referenced collection.
//!
//! A rule document maps each *target* field name either to a dot-separated *source path*
//! (`"external_id": "userPrincipalName"`) or to a nested object of source paths, which produces a
//! nested output object:
//!
//! ```json
//! {
//!   "id": "id",
//!   "mail": "mail",
//!   "sign_in_activity": {
//!     "lastSignInDateTime": "signInActivity.lastSignInDateTime",
//!     "lastSignInRequestId": "signInActivity.lastSignInRequestId"
//!   }
//! }
//! ```
//!
//! Nested paths are always resolved from the record root. Missing fields are skipped; a record
//! where nothing resolves is dropped.
//!
//! ## What you can ingest
//!
//! Each source file may hold a single object, an array of objects, an object wrapping its records
//! under one of the rule keys, or an envelope such as `{"value": [...]}`. Directories contribute
//! their `*.json` children (non-recursive).
//!
//! ## Quick example: map one record
//!
//! ```rust
//! use rule_ingest::mapping::map_record;
//! use rule_ingest::types::RuleDocument;
//!
//! let record = serde_json::json!({
//!     "id": "123",
//!     "userPrincipalName": "user@example.com",
//!     "signInActivity": {"lastSignInDateTime": "1995-04-28T13:22:24"}
//! });
//! let mapped = map_record(record.as_object().unwrap(), &RuleDocument::default_rules()).unwrap();
//! assert_eq!(mapped["external_id"], "user@example.com");
//! assert_eq!(mapped["sign_in_activity"]["lastSignInDateTime"], "1995-04-28T13:22:24");
//! ```
//!
//! ## Modules
//!
//! - [`mapping`]: dot-path resolution and rule application
//! - [`ingestion`]: record loading, source enumeration, observers
//! - [`execution`]: worker pool options, the shared concurrency bound, metrics
//! - [`pipeline`]: the concurrent end-to-end run
//! - [`sink`]: persistence of the user and sign-in collections
//! - [`types`]: records, rule documents, sign-in entries
//! - [`error`]: error types used across the crate

pub mod error;
pub mod execution;
pub mod ingestion;
pub mod mapping;
pub mod pipeline;
pub mod sink;
pub mod types;

pub use error::{IngestionError, IngestionResult};
