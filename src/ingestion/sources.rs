//! Input source enumeration.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IngestionError, IngestionResult};

/// Files discovered from a list of input paths, plus the paths that could not be used.
#[derive(Debug, Default)]
pub struct SourceListing {
    /// Files to process, in discovery order.
    pub files: Vec<PathBuf>,
    /// Inputs that were skipped, with the reason.
    pub failures: Vec<(PathBuf, IngestionError)>,
}

/// Expand `inputs` into source files.
///
/// - A file is used as-is (whatever its extension).
/// - A directory contributes its direct children whose extension is one of `extensions`
///   (non-recursive).
/// - A path that cannot be inspected or listed is recorded in [`SourceListing::failures`].
pub fn enumerate_sources<P: AsRef<Path>>(inputs: &[P], extensions: &[String]) -> SourceListing {
    let mut listing = SourceListing::default();

    for input in inputs {
        let input = input.as_ref();
        let result = fs::metadata(input).map_err(IngestionError::from).and_then(|meta| {
            if meta.is_dir() {
                list_directory(input, extensions)
            } else {
                Ok(vec![input.to_path_buf()])
            }
        });

        match result {
            Ok(files) => listing.files.extend(files),
            Err(e) => listing.failures.push((input.to_path_buf(), e)),
        }
    }

    listing
}

fn list_directory(dir: &Path, extensions: &[String]) -> IngestionResult<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());
    let mut files = Vec::new();

    for ext in extensions {
        let pattern = format!("{escaped}/*.{ext}");
        for entry in glob::glob(&pattern)? {
            let path = entry.map_err(|e| IngestionError::Io(e.into_error()))?;
            if path.is_file() {
                files.push(path);
            }
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::enumerate_sources;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn tmp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("rule-ingest-sources-{tag}-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn directories_expand_to_json_children_only() {
        let dir = tmp_dir("dir");
        fs::write(dir.join("a.json"), "{}").unwrap();
        fs::write(dir.join("b.json"), "{}").unwrap();
        fs::write(dir.join("notes.txt"), "x").unwrap();
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::write(dir.join("sub").join("c.json"), "{}").unwrap();

        let listing = enumerate_sources(&[&dir], &["json".to_string()]);
        let mut names: Vec<String> = listing
            .files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();

        assert_eq!(names, vec!["a.json".to_string(), "b.json".to_string()]);
        assert!(listing.failures.is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn files_are_used_as_is_and_missing_paths_are_reported() {
        let dir = tmp_dir("file");
        let file = dir.join("input.txt");
        fs::write(&file, "{}").unwrap();
        let missing = dir.join("does_not_exist.json");

        let listing = enumerate_sources(&[file.clone(), missing.clone()], &["json".to_string()]);
        assert_eq!(listing.files, vec![file]);
        assert_eq!(listing.failures.len(), 1);
        assert_eq!(listing.failures[0].0, missing);
        fs::remove_dir_all(&dir).unwrap();
    }
}
