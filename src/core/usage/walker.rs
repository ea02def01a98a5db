use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

use crate::core::usage::lines::{BoundedLines, MAX_LINE_BYTES};

const LOG_EXTENSION: &str = "jsonl";

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("Failed to access log directory: {path}")]
    RootInaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Log directory is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

fn is_log_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(LOG_EXTENSION)
}

/// Lazy, recursive listing of every `*.jsonl` file under a root directory.
///
/// A missing root yields nothing. Entries that cannot be read while walking
/// (permission denied on a subtree, files vanishing mid-walk) are counted and
/// skipped.
pub struct LogFiles {
    walker: Option<walkdir::IntoIter>,
    skipped_entries: usize,
}

impl LogFiles {
    pub fn discover(root: &Path) -> Result<Self, CollectError> {
        let metadata = match std::fs::metadata(root) {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(root = %root.display(), "Log directory does not exist yet");
                return Ok(Self {
                    walker: None,
                    skipped_entries: 0,
                });
            }
            Err(source) => {
                return Err(CollectError::RootInaccessible {
                    path: root.to_path_buf(),
                    source,
                })
            }
        };

        if !metadata.is_dir() {
            return Err(CollectError::NotADirectory {
                path: root.to_path_buf(),
            });
        }

        // Listing the root up front turns "exists but unreadable" into an error
        // instead of a silently empty walk.
        std::fs::read_dir(root).map_err(|source| CollectError::RootInaccessible {
            path: root.to_path_buf(),
            source,
        })?;

        Ok(Self {
            walker: Some(WalkDir::new(root).into_iter()),
            skipped_entries: 0,
        })
    }

    /// Directory entries skipped so far because of traversal errors.
    pub fn skipped_entries(&self) -> usize {
        self.skipped_entries
    }
}

impl Iterator for LogFiles {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        let walker = self.walker.as_mut()?;
        loop {
            match walker.next()? {
                Ok(entry) => {
                    if entry.file_type().is_dir() || !is_log_file(entry.path()) {
                        continue;
                    }
                    return Some(entry.into_path());
                }
                Err(err) => {
                    self.skipped_entries += 1;
                    debug!(error = %err, "Skipping unreadable directory entry");
                }
            }
        }
    }
}

/// Open a log file for bounded line-by-line reading.
pub fn open_lines(path: &Path) -> io::Result<BoundedLines<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(BoundedLines::new(BufReader::new(file), MAX_LINE_BYTES))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn names(files: Vec<PathBuf>) -> Vec<String> {
        let mut names: Vec<String> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn missing_root_yields_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = LogFiles::discover(&dir.path().join("nope")).unwrap().collect();
        assert!(files.is_empty());
    }

    #[test]
    fn finds_jsonl_files_at_any_depth() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("proj-abc");
        let subagents = project.join("aaaa-bbbb").join("subagents");
        fs::create_dir_all(&subagents).unwrap();

        fs::write(dir.path().join("top.jsonl"), "").unwrap();
        fs::write(project.join("aaaa-bbbb.jsonl"), "").unwrap();
        fs::write(subagents.join("cccc-dddd.jsonl"), "").unwrap();
        fs::write(project.join("memory.md"), "").unwrap();
        fs::write(project.join("notes.jsonl.bak"), "").unwrap();

        let files: Vec<PathBuf> = LogFiles::discover(dir.path()).unwrap().collect();
        assert_eq!(
            names(files),
            vec!["aaaa-bbbb.jsonl", "cccc-dddd.jsonl", "top.jsonl"]
        );
    }

    #[test]
    fn directory_named_like_a_log_is_not_yielded() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("weird.jsonl")).unwrap();
        fs::write(dir.path().join("weird.jsonl").join("inner.jsonl"), "").unwrap();

        let files: Vec<PathBuf> = LogFiles::discover(dir.path()).unwrap().collect();
        assert_eq!(names(files), vec!["inner.jsonl"]);
    }

    #[test]
    fn root_that_is_a_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("projects");
        fs::write(&file, "").unwrap();
        assert!(matches!(
            LogFiles::discover(&file),
            Err(CollectError::NotADirectory { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subtree_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("hidden.jsonl"), "").unwrap();
        fs::write(dir.path().join("visible.jsonl"), "").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Root bypasses permission bits; only assert when they are enforced.
        let enforced = fs::read_dir(&locked).is_err();

        let mut walker = LogFiles::discover(dir.path()).unwrap();
        let files: Vec<PathBuf> = walker.by_ref().collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(names(files.clone()).contains(&"visible.jsonl".to_string()));
        if enforced {
            assert_eq!(names(files), vec!["visible.jsonl"]);
            assert_eq!(walker.skipped_entries(), 1);
        }
    }

    #[test]
    fn open_lines_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jsonl");
        fs::write(&path, "one\ntwo\n").unwrap();
        let count = open_lines(&path).unwrap().count();
        assert_eq!(count, 2);
    }

    #[test]
    fn open_lines_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_lines(&dir.path().join("gone.jsonl")).is_err());
    }
}
