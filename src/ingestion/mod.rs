//! Record loading and source discovery.
//!
//! - [`json`]: parse payloads into raw records ([`load`], [`load_by_property`], [`locate_records`])
//! - [`sources`]: expand input paths (files and directories) into source files
//! - [`observability`]: observer hooks for success/failure/alerts

pub mod json;
pub mod observability;
pub mod sources;

pub use json::{load, load_by_property, load_from_path, locate_records, top_level_keys};
pub use observability::{
    CompositeObserver, FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStage,
    IngestionStats, TracingObserver, severity_for_error,
};
pub use sources::{SourceListing, enumerate_sources};
