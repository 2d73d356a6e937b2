//! Working directory layout and directory helpers.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PipelineError;

/// Prefix of the supplementary-document folders under `output_data/`.
pub const SUPPLEMENT_DIR_PREFIX: &str = "peopleinput";

/// The directories of one pipeline run, resolved from a single root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectorySet {
    /// The root everything else is resolved against.
    pub root: PathBuf,
    /// Filings, one subfolder per group (`company/`).
    pub company: PathBuf,
    /// Wage-statement corpus (`W2/`).
    pub w2: PathBuf,
    /// Page-Stripper output (`federal/`).
    pub federal: PathBuf,
    /// Identity Matcher output, Batch Combiner input (`state/`).
    pub state: PathBuf,
    /// Batch Combiner output (`combined/`).
    pub combined: PathBuf,
    /// Parent of the `peopleinput*/docs` folders (`output_data/`).
    pub output_data: PathBuf,
    /// Envelope Assembler output (`envelopes/`).
    pub envelopes: PathBuf,
}

impl WorkingDirectorySet {
    /// Resolve the standard layout under `root`.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            company: root.join("company"),
            w2: root.join("W2"),
            federal: root.join("federal"),
            state: root.join("state"),
            combined: root.join("combined"),
            output_data: root.join("output_data"),
            envelopes: root.join("envelopes"),
            root,
        }
    }

    /// The `output_data/peopleinput*/docs` folders in sorted order.
    ///
    /// A missing `output_data/` yields no folders.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ListDir`] if `output_data/` exists but cannot
    /// be listed.
    pub fn supplement_dirs(&self) -> Result<Vec<PathBuf>, PipelineError> {
        if !self.output_data.is_dir() {
            debug!(path = %self.output_data.display(), "no supplementary document root");
            return Ok(Vec::new());
        }
        Ok(list_subdirs(&self.output_data)?
            .into_iter()
            .filter(|dir| {
                dir.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(SUPPLEMENT_DIR_PREFIX))
            })
            .map(|dir| dir.join("docs"))
            .filter(|docs| docs.is_dir())
            .collect())
    }
}

/// Create `path` and its parents if needed.
///
/// # Errors
///
/// Returns [`PipelineError::CreateDir`] on failure.
pub fn ensure_dir(path: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(path).map_err(|source| PipelineError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Subdirectories of `dir`, sorted by name. Other entries are ignored.
///
/// # Errors
///
/// Returns [`PipelineError::ListDir`] if `dir` cannot be read.
pub fn list_subdirs(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut dirs: Vec<PathBuf> = read_entries(dir)?
        .into_iter()
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Regular files in `dir` whose name starts with `prefix` and has extension
/// `ext` (case-insensitive), sorted by name.
///
/// # Errors
///
/// Returns [`PipelineError::ListDir`] if `dir` cannot be read.
pub fn list_files(dir: &Path, prefix: &str, ext: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files: Vec<PathBuf> = read_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file())
        .filter(|p| {
            let name_ok = p
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix));
            name_ok && has_extension(p, ext)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Whether `path` has extension `ext` (no dot, case-insensitive).
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// File name of `path` as UTF-8, lossily.
pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_entries(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let list_err = |source| PipelineError::ListDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(list_err)? {
        entries.push(entry.map_err(list_err)?.path());
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn layout_is_resolved_from_root() {
        let dirs = WorkingDirectorySet::from_root("/work");
        assert_eq!(dirs.company, PathBuf::from("/work/company"));
        assert_eq!(dirs.w2, PathBuf::from("/work/W2"));
        assert_eq!(dirs.federal, PathBuf::from("/work/federal"));
        assert_eq!(dirs.state, PathBuf::from("/work/state"));
        assert_eq!(dirs.combined, PathBuf::from("/work/combined"));
        assert_eq!(dirs.output_data, PathBuf::from("/work/output_data"));
        assert_eq!(dirs.envelopes, PathBuf::from("/work/envelopes"));
    }

    #[test]
    fn list_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["STFCS_b.pdf", "STFCS_a.PDF", "FTFCS_a.pdf", "STFCS_c.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("STFCS_dir.pdf")).unwrap();
        let files = list_files(dir.path(), "STFCS", "pdf").unwrap();
        let names: Vec<String> = files.iter().map(|p| file_name_of(p)).collect();
        assert_eq!(names, vec!["STFCS_a.PDF", "STFCS_b.pdf"]);
    }

    #[test]
    fn list_subdirs_ignores_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("loose.pdf"), b"x").unwrap();
        let subdirs = list_subdirs(dir.path()).unwrap();
        let names: Vec<String> = subdirs.iter().map(|p| file_name_of(p)).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn missing_dir_is_list_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_subdirs(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, PipelineError::ListDir { .. }));
    }

    #[test]
    fn supplement_dirs_are_sorted_and_need_docs() {
        let root = tempfile::tempdir().unwrap();
        let dirs = WorkingDirectorySet::from_root(root.path());
        fs::create_dir_all(dirs.output_data.join("peopleinput2/docs")).unwrap();
        fs::create_dir_all(dirs.output_data.join("peopleinput1/docs")).unwrap();
        fs::create_dir_all(dirs.output_data.join("peopleinput3")).unwrap();
        fs::create_dir_all(dirs.output_data.join("other/docs")).unwrap();
        let found = dirs.supplement_dirs().unwrap();
        assert_eq!(
            found,
            vec![
                dirs.output_data.join("peopleinput1/docs"),
                dirs.output_data.join("peopleinput2/docs"),
            ]
        );
    }

    #[test]
    fn missing_output_data_means_no_supplements() {
        let root = tempfile::tempdir().unwrap();
        let dirs = WorkingDirectorySet::from_root(root.path());
        assert!(dirs.supplement_dirs().unwrap().is_empty());
    }
}
