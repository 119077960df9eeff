//! Segments: named, closed time windows over a record stream

use crate::core::temporal::Timestamp;
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Window bounds below this are "time since start" offsets, which are not
/// supported; absolute timestamps are always larger.
pub const MIN_ABSOLUTE_TIMESTAMP: f64 = 1e7;

/// Name of the unbounded window used for the identity stream
pub const UNBOUNDED_NAME: &str = "all";

/// A time window `[start, end]` with a display name
///
/// `start <= end` is not checked here: an inverted window simply matches
/// nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    start: Timestamp,
    end: Timestamp,
    name: String,
}

impl Segment {
    /// Create a segment. Without a name, one is generated from the bounds;
    /// it has no dots so it can be used as a file stem.
    pub fn new(start: Timestamp, end: Timestamp, name: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| {
            format!("{:.0}_{:.0}", start.as_secs_f64(), end.as_secs_f64())
        });
        Self { start, end, name }
    }

    /// Window covering every possible timestamp
    pub fn unbounded() -> Self {
        Self::new(Timestamp::MIN, Timestamp::MAX, Some(UNBOUNDED_NAME.to_string()))
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `ts` lies before the window
    pub fn is_before(&self, ts: Timestamp) -> bool {
        ts < self.start
    }

    /// `ts` lies after the window
    pub fn is_after(&self, ts: Timestamp) -> bool {
        ts > self.end
    }

    /// Check if a timestamp is within `[start, end]`
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.start && ts <= self.end
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{start={}, end={}, name={}}}",
            self.start.as_secs_f64(),
            self.end.as_secs_f64(),
            self.name
        )
    }
}

impl FromStr for Segment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        parse_segment(s)
    }
}

fn parse_bound(field: &str) -> Result<f64> {
    let value: f64 = field.trim().parse().map_err(|_| {
        Error::MalformedSpecification(format!("{} must be a number", field))
    })?;
    if value.is_nan() {
        return Err(Error::MalformedSpecification(format!(
            "{} must be a number",
            field
        )));
    }
    Ok(value)
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::MalformedSpecification(format!(
            "segment name {:?} is not a usable file name",
            name
        )));
    }
    if name.contains(['/', '\\']) || name.contains(std::path::MAIN_SEPARATOR) {
        return Err(Error::MalformedSpecification(format!(
            "segment name {:?} must not contain a path separator",
            name
        )));
    }
    Ok(())
}

/// Parse a `start,end` or `start,end,name` window specification
pub fn parse_segment(spec: &str) -> Result<Segment> {
    let fields: Vec<&str> = spec.split(',').collect();
    let (start, end, name) = match fields.as_slice() {
        [start, end] => (*start, *end, None),
        [start, end, name] => (*start, *end, Some(*name)),
        _ => {
            return Err(Error::MalformedSpecification(format!(
                "{} must be \"start,end\" or \"start,end,name\"",
                spec
            )))
        }
    };

    let start = parse_bound(start)?;
    let end = parse_bound(end)?;

    if start < MIN_ABSOLUTE_TIMESTAMP || end < MIN_ABSOLUTE_TIMESTAMP {
        return Err(Error::MalformedSpecification(format!(
            "{}: time-since-start windows are not supported, bounds must be at least {:e}",
            spec, MIN_ABSOLUTE_TIMESTAMP
        )));
    }

    if let Some(name) = name {
        validate_name(name)?;
    }

    if start > end {
        warn!(spec, "segment starts after it ends and will match nothing");
    }

    Ok(Segment::new(
        Timestamp::from_secs_f64(start),
        Timestamp::from_secs_f64(end),
        name.map(str::to_string),
    ))
}

/// Parse every `--keep` argument, dropping malformed ones with a warning
pub fn parse_segment_args<S: AsRef<str>>(specs: &[S]) -> Vec<Segment> {
    let segments: Vec<Segment> = specs
        .iter()
        .filter_map(|spec| match parse_segment(spec.as_ref()) {
            Ok(segment) => Some(segment),
            Err(e) => {
                warn!(spec = spec.as_ref(), error = %e, "dropping segment specification");
                None
            }
        })
        .collect();
    warn_if_unordered(&segments);
    segments
}

/// Segments share one forward-only cursor, so a window that starts before
/// the previous one ends loses records. Report it; the order is kept as given.
pub fn warn_if_unordered(segments: &[Segment]) -> bool {
    let mut ordered = true;
    for pair in segments.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.start() <= prev.end() {
            warn!(
                previous = %prev,
                next = %next,
                "segments overlap or are out of order; records will be lost"
            );
            ordered = false;
        }
    }
    ordered
}

/// Output name for a segment: the directory of the first file it reads,
/// joined with the segment name.
///
/// `./2023_09_15/foo.lsr` and `transect1` give `./2023_09_15/transect1`.
pub fn build_segment_name(first_path: &Path, segment_name: &str) -> PathBuf {
    match first_path.parent() {
        Some(dir) => dir.join(segment_name),
        None => PathBuf::from(segment_name),
    }
}
