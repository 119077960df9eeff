//! Selection policy: everything, or only the requested segments

use crate::core::record::Record;
use crate::core::segment::{parse_segment_args, Segment};
use crate::error::{Error, Result};
use crate::slice::cursor::SegmentCursor;
use crate::slice::sequence::SegmentSequence;
use crate::storage::{RecordSourceChain, SourceOpener};
use std::path::PathBuf;
use tracing::{error, info};

/// What a run iterates over
pub enum Selection {
    /// No windows requested: one identity stream over every file
    All(RecordSourceChain),
    /// One stream per requested window
    Segments(SegmentSequence),
}

/// Totals of a [`Selection::for_each_stream`] run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Streams handed to the consumer
    pub streams: usize,
    /// Failures that were reported and skipped (unopenable or damaged files)
    pub failures: Vec<Error>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Selection {
    /// Build the selection for `files` and the raw `--keep` specifications
    ///
    /// Malformed specifications are dropped with a warning. Asking for
    /// segments and having none survive parsing is [`Error::NoInput`], as is
    /// an empty file list.
    pub fn choose<O, S>(files: Vec<PathBuf>, opener: O, keep: &[S]) -> Result<Self>
    where
        O: SourceOpener + 'static,
        S: AsRef<str>,
    {
        if files.is_empty() {
            return Err(Error::NoInput("no input files".to_string()));
        }
        info!(files = files.len(), "processing {} file(s)", files.len());

        let chain = RecordSourceChain::new(files, opener);
        if keep.is_empty() {
            return Ok(Selection::All(chain));
        }

        let segments = parse_segment_args(keep);
        if segments.is_empty() {
            return Err(Error::NoInput(format!(
                "none of the {} segment specification(s) are usable",
                keep.len()
            )));
        }
        Ok(Selection::from_segments(segments, chain))
    }

    /// Selection over already-parsed segments; an empty list means everything
    pub fn from_segments(segments: Vec<Segment>, chain: RecordSourceChain) -> Self {
        if segments.is_empty() {
            Selection::All(chain)
        } else {
            Selection::Segments(SegmentSequence::new(segments, chain))
        }
    }

    pub fn is_segmented(&self) -> bool {
        matches!(self, Selection::Segments(_))
    }

    /// Hand each stream to `consume`, in order
    ///
    /// Errors from `consume` abort the run. Files that cannot be opened or
    /// read are logged, collected in the report and skipped.
    pub fn for_each_stream<F>(self, mut consume: F) -> Result<RunReport>
    where
        F: FnMut(&mut dyn Iterator<Item = Result<Record>>, &str) -> Result<()>,
    {
        let mut report = RunReport::default();
        match self {
            Selection::All(mut chain) => {
                let mut cursor = SegmentCursor::identity(&mut chain);
                let name = cursor.name().to_string();
                let mut stream = ReportingStream::new(&mut cursor, &mut report.failures);
                consume(&mut stream, &name)?;
                report.streams += 1;
            }
            Selection::Segments(mut sequence) => loop {
                match sequence.next_cursor() {
                    Ok(Some(mut cursor)) => {
                        let name = cursor.name().to_string();
                        let mut stream = ReportingStream::new(&mut cursor, &mut report.failures);
                        consume(&mut stream, &name)?;
                        report.streams += 1;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!(error = %e, "skipping input");
                        report.failures.push(e);
                    }
                }
            },
        }
        Ok(report)
    }
}

/// Passes records through and diverts per-file errors into the report
struct ReportingStream<'c, 'a> {
    cursor: &'c mut SegmentCursor<'a>,
    failures: &'c mut Vec<Error>,
}

impl<'c, 'a> ReportingStream<'c, 'a> {
    fn new(cursor: &'c mut SegmentCursor<'a>, failures: &'c mut Vec<Error>) -> Self {
        Self { cursor, failures }
    }
}

impl Iterator for ReportingStream<'_, '_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.cursor.next()? {
                Ok(record) => return Some(Ok(record)),
                Err(e) => {
                    error!(stream = self.cursor.name(), error = %e, "skipping unreadable input");
                    self.failures.push(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryOpener;

    fn opener() -> MemoryOpener {
        MemoryOpener::new()
            .with_file(
                "a.lsr",
                vec![Record::at("T", 1.0e9), Record::at("T", 1.0e9 + 10.0)],
            )
            .with_file(
                "b.lsr",
                vec![Record::at("T", 1.0e9 + 20.0), Record::at("T", 1.0e9 + 30.0)],
            )
    }

    fn files() -> Vec<PathBuf> {
        vec![PathBuf::from("a.lsr"), PathBuf::from("b.lsr")]
    }

    fn run(selection: Selection) -> (Vec<(String, usize)>, RunReport) {
        let mut streams = Vec::new();
        let report = selection
            .for_each_stream(|records, name| {
                let count = records.filter(|r| r.is_ok()).count();
                streams.push((name.to_string(), count));
                Ok(())
            })
            .unwrap();
        (streams, report)
    }

    #[test]
    fn test_no_segments_is_identity() {
        let none: [&str; 0] = [];
        let selection = Selection::choose(files(), opener(), &none).unwrap();
        assert!(!selection.is_segmented());

        let (streams, report) = run(selection);
        assert_eq!(streams, vec![("all".to_string(), 4)]);
        assert!(report.is_clean());
    }

    #[test]
    fn test_segments_selected() {
        let keep = ["1000000005,1000000025,middle", "500,600"];
        let selection = Selection::choose(files(), opener(), &keep).unwrap();
        assert!(selection.is_segmented());

        let (streams, report) = run(selection);
        assert_eq!(streams, vec![("middle".to_string(), 2)]);
        assert_eq!(report.streams, 1);
    }

    #[test]
    fn test_no_input_conditions() {
        let keep = ["1000000005,1000000025"];
        assert!(matches!(
            Selection::choose(Vec::new(), opener(), &keep),
            Err(Error::NoInput(_))
        ));

        let bad = ["500,600", "nonsense"];
        assert!(matches!(
            Selection::choose(files(), opener(), &bad),
            Err(Error::NoInput(_))
        ));
    }

    #[test]
    fn test_failures_are_collected_not_fatal() {
        let files = vec![
            PathBuf::from("missing.lsr"),
            PathBuf::from("a.lsr"),
            PathBuf::from("gone.lsr"),
            PathBuf::from("b.lsr"),
        ];
        let keep = ["1000000000,1000000100,whole"];
        let selection = Selection::choose(files, opener(), &keep).unwrap();

        let (streams, report) = run(selection);
        assert_eq!(streams, vec![("whole".to_string(), 4)]);
        assert_eq!(report.failures.len(), 2);
        assert!(report
            .failures
            .iter()
            .all(|e| matches!(e, Error::Open { .. })));
    }

    #[test]
    fn test_consumer_error_aborts() {
        let selection = Selection::from_segments(Vec::new(), RecordSourceChain::new(files(), opener()));
        let result = selection.for_each_stream(|_, _| Err(Error::Storage("disk full".to_string())));
        assert!(result.is_err());
    }
}
