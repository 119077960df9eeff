//! Record sources: one file's lazy, forward-only record stream

use crate::core::record::{Record, RecordFilter};
use crate::error::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

/// A single file's record stream
///
/// Sources are finite and not restartable. Once `next_record` has returned
/// `Ok(None)` it keeps returning `Ok(None)`.
pub trait RecordSource {
    /// Human-readable name, derived from the file path
    fn name(&self) -> &str;

    /// Pull the next record, `Ok(None)` at end of stream
    fn next_record(&mut self) -> Result<Option<Record>>;
}

/// Owned, type-erased source as held by a [`RecordSourceChain`](super::RecordSourceChain)
pub type BoxedSource = Box<dyn RecordSource>;

/// Opens the source for one input file
///
/// This is the only I/O boundary of the chain. Implementations carry the
/// decoder configuration and record filter.
#[cfg_attr(test, mockall::automock)]
pub trait SourceOpener {
    fn open(&self, path: &Path) -> Result<BoxedSource>;
}

/// In-memory source, for tests and embedders that decode elsewhere
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    records: VecDeque<Record>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            records: records.into(),
        }
    }
}

impl RecordSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        Ok(self.records.pop_front())
    }
}

/// Opener serving [`MemorySource`]s keyed by path
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener {
    files: HashMap<PathBuf, Vec<Record>>,
    filter: RecordFilter,
}

impl MemoryOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the records of one file
    pub fn with_file(mut self, path: impl Into<PathBuf>, records: Vec<Record>) -> Self {
        self.files.insert(path.into(), records);
        self
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl SourceOpener for MemoryOpener {
    fn open(&self, path: &Path) -> Result<BoxedSource> {
        let records = self.files.get(path).ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such in-memory file",
            ))
        })?;
        let records = records
            .iter()
            .filter(|r| self.filter.accepts(r))
            .cloned()
            .collect();
        Ok(Box::new(MemorySource::new(
            path.display().to_string(),
            records,
        )))
    }
}
