//! Discovery of training runs on disk.

use crate::error::LaunchResult;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A training run found on disk.
#[derive(Debug, Clone, Serialize)]
pub struct RunEntry {
    /// Versioned output directory of the run.
    pub output_dir: PathBuf,
    pub log_file: PathBuf,
    pub modified: DateTime<Local>,
}

impl RunEntry {
    #[must_use]
    pub fn name(&self) -> String {
        self.output_dir
            .file_name()
            .map_or_else(|| self.output_dir.display().to_string(), |n| n.to_string_lossy().to_string())
    }
}

fn run_at(dir: &Path) -> LaunchResult<Option<RunEntry>> {
    let log_file = dir.join("runs").join("run.log");
    if !log_file.is_file() {
        return Ok(None);
    }
    let modified = std::fs::metadata(&log_file)?.modified()?;
    Ok(Some(RunEntry { output_dir: dir.to_path_buf(), log_file, modified: modified.into() }))
}

/// Discover runs by scanning `<root>/*/runs/run.log` (and `root` itself), newest first.
pub fn discover_runs(root: &Path) -> LaunchResult<Vec<RunEntry>> {
    let mut out = Vec::new();
    if let Some(entry) = run_at(root)? {
        out.push(entry);
    }

    let dir = match std::fs::read_dir(root) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
        Err(e) => return Err(e.into()),
    };

    for entry in dir {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(run) = run_at(&path)? {
            out.push(run);
        }
    }

    out.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.output_dir.cmp(&a.output_dir)));
    Ok(out)
}

/// Last `max_lines` lines of a run's log.
pub fn tail_log(log_file: &Path, max_lines: usize) -> LaunchResult<Vec<String>> {
    let contents = std::fs::read_to_string(log_file)?;
    let lines: Vec<&str> = contents.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    Ok(lines[start..].iter().map(|l| (*l).to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_run(root: &Path, name: &str, log: &str) {
        let runs = root.join(name).join("runs");
        std::fs::create_dir_all(&runs).unwrap();
        std::fs::write(runs.join("run.log"), log).unwrap();
    }

    #[test]
    fn test_discover_runs() {
        let temp = TempDir::new().unwrap();
        make_run(temp.path(), "v0-20240101-000000", "a\n");
        make_run(temp.path(), "v1-20240102-000000", "b\n");
        std::fs::create_dir_all(temp.path().join("not-a-run")).unwrap();

        let runs = discover_runs(temp.path()).unwrap();
        assert_eq!(runs.len(), 2);
        let names: Vec<_> = runs.iter().map(RunEntry::name).collect();
        assert!(names.contains(&"v0-20240101-000000".to_string()));
        assert!(names.contains(&"v1-20240102-000000".to_string()));
    }

    #[test]
    fn test_missing_root_is_empty() {
        let temp = TempDir::new().unwrap();
        assert!(discover_runs(&temp.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_tail_log() {
        let temp = TempDir::new().unwrap();
        make_run(temp.path(), "v0", "1\n2\n3\n");
        let tail = tail_log(&temp.path().join("v0/runs/run.log"), 2).unwrap();
        assert_eq!(tail, vec!["2", "3"]);
    }
}
