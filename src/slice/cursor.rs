//! SegmentCursor: the records of one time window

use crate::core::record::Record;
use crate::core::segment::{build_segment_name, Segment, UNBOUNDED_NAME};
use crate::error::Result;
use crate::storage::{Pull, RecordSource, RecordSourceChain};
use std::iter::FusedIterator;
use std::path::Path;
use tracing::debug;

/// Why a cursor stopped producing records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A record later than the window was read (and dropped)
    PastEnd,
    /// The single source the cursor was bound to ran out
    EndOfSource,
    /// The chain has no more files
    EndOfAll,
}

enum CursorInput<'a> {
    /// Reads across file boundaries, advancing the shared chain
    Spanning(&'a mut RecordSourceChain),
    /// One-off cursor over a single known source
    Single(&'a mut dyn RecordSource),
}

/// Iterator over the records of one [`Segment`]
///
/// Records before the window are skipped. The first record after the window
/// ends the cursor and is consumed: it is not handed to the next segment, so
/// segments sharing a chain must be requested in time order.
pub struct SegmentCursor<'a> {
    segment: Segment,
    name: String,
    input: CursorInput<'a>,
    termination: Option<Termination>,
    yielded: u64,
    skipped: u64,
}

impl<'a> SegmentCursor<'a> {
    /// Cursor that may span files, advancing `chain` as sources run dry
    pub fn spanning(segment: Segment, chain: &'a mut RecordSourceChain) -> Self {
        let first = chain.head_path().unwrap_or_else(|| Path::new(""));
        let name = build_segment_name(first, segment.name())
            .to_string_lossy()
            .into_owned();
        Self::with_input(segment, name, CursorInput::Spanning(chain))
    }

    /// Unbounded cursor over the whole chain, named plainly [`UNBOUNDED_NAME`]
    pub fn identity(chain: &'a mut RecordSourceChain) -> Self {
        Self::with_input(
            Segment::unbounded(),
            UNBOUNDED_NAME.to_string(),
            CursorInput::Spanning(chain),
        )
    }

    /// Cursor confined to one source
    pub fn single(segment: Segment, source: &'a mut dyn RecordSource) -> Self {
        let name = build_segment_name(Path::new(source.name()), segment.name())
            .to_string_lossy()
            .into_owned();
        Self::with_input(segment, name, CursorInput::Single(source))
    }

    fn with_input(segment: Segment, name: String, input: CursorInput<'a>) -> Self {
        debug!(segment = %segment, name = %name, "segment cursor created");
        Self {
            segment,
            name,
            input,
            termination: None,
            yielded: 0,
            skipped: 0,
        }
    }

    /// Output name: directory of the first file read, joined with the segment name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// How the cursor ended, `None` while it may still yield
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Records yielded so far
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    /// Records skipped because they came before the window
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Next raw record, crossing into the next file when the current one ends
    fn pull(&mut self) -> Result<Pull> {
        match &mut self.input {
            CursorInput::Single(source) => Ok(match source.next_record()? {
                Some(record) => Pull::Record(record),
                None => Pull::EndOfSource,
            }),
            CursorInput::Spanning(chain) => loop {
                match chain.pull_current()? {
                    Pull::EndOfSource => {
                        if chain.advance()?.is_none() {
                            return Ok(Pull::EndOfAll);
                        }
                    }
                    other => return Ok(other),
                }
            },
        }
    }

    fn finish(&mut self, termination: Termination) {
        debug!(
            name = %self.name,
            ?termination,
            yielded = self.yielded,
            skipped = self.skipped,
            "segment cursor finished"
        );
        self.termination = Some(termination);
    }
}

impl Iterator for SegmentCursor<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.termination.is_some() {
            return None;
        }

        loop {
            let record = match self.pull() {
                Ok(Pull::Record(record)) => record,
                Ok(Pull::EndOfSource) => {
                    self.finish(Termination::EndOfSource);
                    return None;
                }
                Ok(Pull::EndOfAll) => {
                    self.finish(Termination::EndOfAll);
                    return None;
                }
                Err(e) => {
                    // A spanning cursor moves on to the next file; a single
                    // source has nothing left to offer.
                    if matches!(self.input, CursorInput::Single(_)) {
                        self.finish(Termination::EndOfSource);
                    }
                    return Some(Err(e));
                }
            };

            let ts = record.timestamp();
            if self.segment.is_before(ts) {
                self.skipped += 1;
                continue;
            }
            if self.segment.is_after(ts) {
                self.finish(Termination::PastEnd);
                return None;
            }

            self.yielded += 1;
            return Some(Ok(record));
        }
    }
}

impl FusedIterator for SegmentCursor<'_> {}
