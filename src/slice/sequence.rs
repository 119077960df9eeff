//! SegmentSequence: one cursor per requested window, all sharing one chain

use crate::core::segment::Segment;
use crate::error::Result;
use crate::slice::cursor::SegmentCursor;
use crate::storage::RecordSourceChain;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Why a sequence stopped producing cursors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceEnd {
    /// Every requested segment was handed out
    SegmentsExhausted,
    /// The input ran out before the segment list did
    DataExhausted,
}

/// Produces a [`SegmentCursor`] for each segment, in the order given
///
/// Cursors borrow the sequence mutably, so only one can read the chain at a
/// time and records are never read twice.
pub struct SegmentSequence {
    segments: VecDeque<Segment>,
    chain: RecordSourceChain,
    primed: bool,
    produced: usize,
    end: Option<SequenceEnd>,
}

impl SegmentSequence {
    pub fn new(segments: Vec<Segment>, chain: RecordSourceChain) -> Self {
        Self {
            segments: segments.into(),
            chain,
            primed: false,
            produced: 0,
            end: None,
        }
    }

    /// Cursor for the next segment, `Ok(None)` when the sequence is over
    ///
    /// The first call opens the first file. If that fails the error is
    /// returned; calling again continues with the next file and the same
    /// segment.
    pub fn next_cursor(&mut self) -> Result<Option<SegmentCursor<'_>>> {
        if self.end.is_some() {
            return Ok(None);
        }

        if !self.primed {
            self.primed = true;
            info!(segments = self.segments.len(), "reading {} segment(s)", self.segments.len());
            self.chain.advance()?;
        }

        if self.chain.is_exhausted() {
            self.finish(SequenceEnd::DataExhausted);
            return Ok(None);
        }

        let Some(segment) = self.segments.pop_front() else {
            self.finish(SequenceEnd::SegmentsExhausted);
            return Ok(None);
        };

        self.produced += 1;
        Ok(Some(SegmentCursor::spanning(segment, &mut self.chain)))
    }

    fn finish(&mut self, end: SequenceEnd) {
        debug!(
            ?end,
            produced = self.produced,
            unused = self.segments.len(),
            files_opened = self.chain.opened(),
            "segment sequence finished"
        );
        self.end = Some(end);
    }

    /// Why the sequence ended, for diagnostics
    pub fn end_reason(&self) -> Option<SequenceEnd> {
        self.end
    }

    /// Cursors handed out so far
    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Segments not yet handed out
    pub fn remaining(&self) -> &VecDeque<Segment> {
        &self.segments
    }

    pub fn chain(&self) -> &RecordSourceChain {
        &self.chain
    }

    /// Give back the chain, positioned where the last cursor stopped
    pub fn into_chain(self) -> RecordSourceChain {
        self.chain
    }
}
