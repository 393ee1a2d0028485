//! Per-job output file allocation
//!
//! Each job owns a [`FileStash`]: a private directory that is removed when the
//! stash is dropped or closed. File names carry a random suffix and are
//! reserved with an exclusive create, so concurrent jobs sharing a root never
//! hand out the same path.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::Result;

const MAX_ATTEMPTS: usize = 16;
const JOB_DIR_PREFIX: &str = "tool-job-";

/// Scoped allocator of uniquely named files inside a job directory
#[derive(Debug)]
pub struct FileStash {
    dir: TempDir,
}

impl FileStash {
    /// Create a job directory under the system temp directory
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(JOB_DIR_PREFIX).tempdir()?;
        log::debug!("Created job directory {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Create a job directory under `root`
    pub fn in_dir(root: impl AsRef<Path>) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(JOB_DIR_PREFIX)
            .tempdir_in(root)?;
        log::debug!("Created job directory {}", dir.path().display());
        Ok(Self { dir })
    }

    /// The job directory
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Reserve a fresh file named `<base>_<random>.<extension>`
    ///
    /// The file is created empty; the tool is expected to overwrite it.
    pub fn allocate(&self, base: &str, extension: &str) -> Result<PathBuf> {
        let base = sanitize(base);
        let extension = extension.trim_start_matches('.');

        for _ in 0..MAX_ATTEMPTS {
            let mut name = format!("{}_{}", base, uuid::Uuid::new_v4().simple());
            if !extension.is_empty() {
                name.push('.');
                name.push_str(extension);
            }
            let path = self.dir.path().join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(path),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    log::debug!("Stash name collision on {}, retrying", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("could not reserve a unique file for '{}'", base),
        )
        .into())
    }

    /// Reserve `count` fresh files sharing a base name and extension
    pub fn allocate_many(&self, base: &str, extension: &str, count: usize) -> Result<Vec<PathBuf>> {
        (0..count).map(|_| self.allocate(base, extension)).collect()
    }

    /// Remove the job directory, reporting failures
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        log::debug!("Removed job directory {}", path.display());
        Ok(())
    }
}

/// Last dotted segment of `base`, restricted to file-name-safe characters
fn sanitize(base: &str) -> String {
    let last = base.rsplit('.').next().unwrap_or(base);
    let cleaned: String = last
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
