//! File-backed store of best-known and start fields.
//!
//! A store is a directory holding two record files:
//!
//! - `best.txt`: the best field found so far, overwritten on every new best
//! - `starts.txt`: winners of past searches, one record appended per winner
//!
//! Missing files read as "nothing stored". Stored scores are never trusted;
//! every field read back is re-evaluated against the caller's workspace.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::field::{parse_records, Dimensions, Field, FieldError, Workspace};

/// File holding the single best field.
pub const BEST_FILE: &str = "best.txt";

/// File holding appended start fields.
pub const STARTS_FILE: &str = "starts.txt";

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed record in {path}: {source}")]
    Record {
        path: PathBuf,
        #[source]
        source: FieldError,
    },

    #[error("field extent {found_width}x{found_height} does not match store extent {width}x{height}")]
    Extent {
        width: usize,
        height: usize,
        found_width: usize,
        found_height: usize,
    },
}

/// Record files of one grid extent inside a directory.
#[derive(Debug, Clone)]
pub struct FieldStore {
    dims: Dimensions,
    best_path: PathBuf,
    starts_path: PathBuf,
}

impl FieldStore {
    /// Opens (and creates if needed) the store directory `dir`.
    pub fn open<P: AsRef<Path>>(dir: P, dims: Dimensions) -> Result<Self, ArchiveError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            dims,
            best_path: dir.join(BEST_FILE),
            starts_path: dir.join(STARTS_FILE),
        })
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn best_path(&self) -> &Path {
        &self.best_path
    }

    pub fn starts_path(&self) -> &Path {
        &self.starts_path
    }

    /// Reads and evaluates the stored best field.
    ///
    /// If the file holds several records, the highest-scoring one wins.
    pub fn read_best(&self, workspace: &mut Workspace) -> Result<Option<Field>, ArchiveError> {
        let fields = self.read_all(&self.best_path, workspace)?;
        Ok(fields.into_iter().max_by_key(Field::score))
    }

    /// Reads and evaluates every stored start field, in file order.
    pub fn read_starts(&self, workspace: &mut Workspace) -> Result<Vec<Field>, ArchiveError> {
        self.read_all(&self.starts_path, workspace)
    }

    /// Replaces the stored best field.
    pub fn write_best(&self, field: &Field) -> Result<(), ArchiveError> {
        self.check_extent(field)?;
        fs::write(&self.best_path, field.to_record())?;
        debug!("wrote best field ({}) to {}", field.score(), self.best_path.display());
        Ok(())
    }

    /// Appends one start field.
    pub fn append_start(&self, field: &Field) -> Result<(), ArchiveError> {
        self.check_extent(field)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.starts_path)?;
        file.write_all(field.to_record().as_bytes())?;
        debug!("appended start ({}) to {}", field.score(), self.starts_path.display());
        Ok(())
    }

    /// Writes `field` as the best field if it beats the stored one.
    /// Returns whether it was written.
    pub fn offer_best(&self, field: &Field, workspace: &mut Workspace) -> Result<bool, ArchiveError> {
        let stored = self.read_best(workspace)?;
        if stored.is_some_and(|best| !field.is_better_than(&best)) {
            return Ok(false);
        }
        self.write_best(field)?;
        Ok(true)
    }

    fn read_all(&self, path: &Path, workspace: &mut Workspace) -> Result<Vec<Field>, ArchiveError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut fields = parse_records(self.dims, &text).map_err(|source| ArchiveError::Record {
            path: path.to_path_buf(),
            source,
        })?;
        for field in &mut fields {
            workspace.evaluate(field);
        }
        Ok(fields)
    }

    fn check_extent(&self, field: &Field) -> Result<(), ArchiveError> {
        let found = field.dims();
        if found != self.dims {
            return Err(ArchiveError::Extent {
                width: self.dims.width(),
                height: self.dims.height(),
                found_width: found.width(),
                found_height: found.height(),
            });
        }
        Ok(())
    }
}
