//! RecordSourceChain: ordered concatenation of per-file sources
//!
//! The chain is the single forward cursor of a run. It opens files lazily,
//! one at a time, and drops the previous source before opening the next so
//! at most one file handle is live.

use crate::core::record::Record;
use crate::error::{Error, Result};
use crate::storage::source::{BoxedSource, RecordSource, SourceOpener};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Outcome of one pull from the chain
#[derive(Debug, Clone, PartialEq)]
pub enum Pull {
    /// The next record of the current source
    Record(Record),
    /// The current source is done (or none is open) and files remain
    EndOfSource,
    /// Nothing is open and no files remain
    EndOfAll,
}

/// Ordered list of input files read through one forward-only cursor
pub struct RecordSourceChain {
    pending: VecDeque<PathBuf>,
    opener: Box<dyn SourceOpener>,
    current: Option<BoxedSource>,
    current_path: Option<PathBuf>,
    opened: usize,
}

impl RecordSourceChain {
    /// Create a chain over `files`, in order
    pub fn new<I, O>(files: I, opener: O) -> Self
    where
        I: IntoIterator<Item = PathBuf>,
        O: SourceOpener + 'static,
    {
        Self {
            pending: files.into_iter().collect(),
            opener: Box::new(opener),
            current: None,
            current_path: None,
            opened: 0,
        }
    }

    /// Release the current source and open the next file
    ///
    /// Returns `Ok(None)` once every file has been consumed. A file that
    /// fails to open is consumed too; the error names it and the chain can
    /// continue with the following file.
    pub fn advance(&mut self) -> Result<Option<&mut BoxedSource>> {
        if let Some(previous) = self.current.take() {
            debug!(source = previous.name(), "closing source");
        }
        self.current_path = None;

        let Some(path) = self.pending.pop_front() else {
            debug!("no more input files");
            return Ok(None);
        };

        match self.opener.open(&path) {
            Ok(source) => {
                self.opened += 1;
                info!(source = source.name(), remaining = self.pending.len(), "reading file");
                self.current_path = Some(path);
                self.current = Some(source);
                Ok(self.current.as_mut())
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "cannot open input file");
                Err(Error::Open {
                    path,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// The most recently opened source, without advancing
    pub fn current(&self) -> Option<&dyn RecordSource> {
        self.current.as_deref()
    }

    /// Path of the current source
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// Path the chain is positioned at: the open file, else the next pending one
    pub fn head_path(&self) -> Option<&Path> {
        self.current_path
            .as_deref()
            .or_else(|| self.pending.front().map(PathBuf::as_path))
    }

    /// Pull one record from the current source without crossing files
    ///
    /// A read error discards the current source: its remaining records can
    /// no longer be trusted to be in order.
    pub fn pull_current(&mut self) -> Result<Pull> {
        let Some(source) = self.current.as_mut() else {
            return Ok(if self.pending.is_empty() {
                Pull::EndOfAll
            } else {
                Pull::EndOfSource
            });
        };

        match source.next_record() {
            Ok(Some(record)) => Ok(Pull::Record(record)),
            Ok(None) => Ok(Pull::EndOfSource),
            Err(e) => {
                warn!(source = source.name(), error = %e, "discarding unreadable source");
                self.current = None;
                self.current_path = None;
                Err(e)
            }
        }
    }

    /// No source is open and no files remain
    pub fn is_exhausted(&self) -> bool {
        self.current.is_none() && self.pending.is_empty()
    }

    /// Files not yet opened
    pub fn pending(&self) -> impl Iterator<Item = &Path> {
        self.pending.iter().map(PathBuf::as_path)
    }

    /// Number of files opened so far
    pub fn opened(&self) -> usize {
        self.opened
    }
}
