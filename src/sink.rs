//! Persistence of the two result collections.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::IngestionResult;
use crate::types::{Record, SignInEntry};

/// Destination for the collections produced by a pipeline run.
pub trait ResultSink: Send + Sync {
    /// Persist the flattened user records (sign-in activity already removed).
    fn save_users(&self, users: &[Record]) -> IngestionResult<()>;

    /// Persist the flattened sign-in entries.
    fn save_sign_ins(&self, entries: &[SignInEntry]) -> IngestionResult<()>;
}

/// Which output artifact a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Users,
    SignIns,
}

impl OutputKind {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Users => "users.json",
            Self::SignIns => "signin.json",
        }
    }
}

/// Path of the `kind` artifact inside `dir`.
pub fn output_file_path(dir: impl AsRef<Path>, kind: OutputKind) -> PathBuf {
    dir.as_ref().join(kind.file_name())
}

/// Writes pretty-printed JSON arrays into an output directory.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    /// The directory must already exist.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn write<T: serde::Serialize + ?Sized>(&self, kind: OutputKind, value: &T) -> IngestionResult<()> {
        let data = serde_json::to_vec_pretty(value)?;
        fs::write(output_file_path(&self.dir, kind), data)?;
        Ok(())
    }
}

impl ResultSink for JsonFileSink {
    fn save_users(&self, users: &[Record]) -> IngestionResult<()> {
        self.write(OutputKind::Users, users)
    }

    fn save_sign_ins(&self, entries: &[SignInEntry]) -> IngestionResult<()> {
        self.write(OutputKind::SignIns, entries)
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonFileSink, OutputKind, ResultSink, output_file_path};
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    use serde_json::{Value, json};

    use crate::error::IngestionError;
    use crate::types::SignInEntry;

    #[test]
    fn writes_users_and_sign_ins_as_json_arrays() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("rule-ingest-sink-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        let sink = JsonFileSink::new(&dir);

        let user = json!({"id": "user-123", "mail": "user@example.com", "is_enabled": true});
        sink.save_users(&[user.as_object().unwrap().clone()]).unwrap();
        sink.save_sign_ins(&[SignInEntry {
            user_id: "user-123".to_string(),
            time_stamp: "2025-03-15T08:00:00Z".to_string(),
            request_id: "abcd-1234".to_string(),
            kind: "lastSignInDateTime".to_string(),
        }])
        .unwrap();

        let users: Value =
            serde_json::from_slice(&fs::read(output_file_path(&dir, OutputKind::Users)).unwrap()).unwrap();
        assert_eq!(users, json!([user]));

        let text = fs::read_to_string(dir.join("signin.json")).unwrap();
        assert!(text.contains("\n  {"), "expected pretty-printed output");
        let sign_ins: Vec<SignInEntry> = serde_json::from_str(&text).unwrap();
        assert_eq!(sign_ins.len(), 1);
        assert_eq!(sign_ins[0].request_id, "abcd-1234");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let sink = JsonFileSink::new(std::env::temp_dir().join("rule-ingest-sink-missing/nested"));
        let err = sink.save_users(&[]).unwrap_err();
        assert!(matches!(err, IngestionError::Io(_)));
    }
}
