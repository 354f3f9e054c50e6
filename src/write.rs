//! Persists rendered [`Page`]s and the stylesheet under the output root.

use crate::render::{Page, STYLESHEET_FILE};
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Writes pages to disk beneath `output_directory`.
pub struct Writer<'a> {
    /// The output root. Page paths are joined onto it.
    pub output_directory: &'a Path,
}

impl Writer<'_> {
    /// Writes every page and then the stylesheet. A failed file doesn't stop
    /// the others; every failure is returned once all writes have been
    /// attempted. Pages sharing a path overwrite each other in order.
    pub fn write_all(&self, pages: &[Page], stylesheet: &str) -> Vec<WriteFailure> {
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        let mut failures = Vec::new();

        let files = pages
            .iter()
            .map(|page| (page.path.as_path(), page.contents.as_str()))
            .chain(std::iter::once((Path::new(STYLESHEET_FILE), stylesheet)));
        for (relative_path, contents) in files {
            let path = self.output_directory.join(relative_path);
            if let Err(err) = write_file(&path, contents, &mut seen_dirs) {
                warn!("writing `{}`: {}", path.display(), err);
                failures.push(WriteFailure { path, err });
            }
        }
        failures
    }
}

fn write_file(path: &Path, contents: &str, seen_dirs: &mut HashSet<PathBuf>) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        if seen_dirs.insert(dir.to_owned()) {
            std::fs::create_dir_all(dir)?;
        }
    }
    std::fs::write(path, contents)?;
    debug!("wrote `{}`", path.display());
    Ok(())
}

/// A file that couldn't be written.
#[derive(Debug)]
pub struct WriteFailure {
    pub path: PathBuf,
    pub err: io::Error,
}

impl fmt::Display for WriteFailure {
    /// Displays a [`WriteFailure`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "writing `{}`: {}", self.path.display(), self.err)
    }
}

impl std::error::Error for WriteFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}
