// Property-based tests for segment slicing
//
// Properties tested:
// 1. Identity: with no segments every record comes out once, in input order
// 2. Window containment: every record of a segment stream lies in its window
// 3. Forward only: the concatenated streams are a strictly increasing
//    subsequence of the input, so no record is produced twice

use logslice::prelude::*;
use proptest::prelude::*;
use std::path::PathBuf;

// Files of records with non-decreasing timestamps across the whole set.
// Each record's type carries its position in the input.
fn build_files(deltas: &[Vec<u32>]) -> (Vec<PathBuf>, MemoryOpener) {
    let mut opener = MemoryOpener::new();
    let mut paths = Vec::new();
    let mut clock = 0.0;
    let mut position = 0usize;

    for (i, file_deltas) in deltas.iter().enumerate() {
        let mut records = Vec::new();
        for delta in file_deltas {
            clock += f64::from(*delta);
            records.push(Record::at(format!("{}", position), clock));
            position += 1;
        }
        let path = PathBuf::from(format!("logs/part{:03}.lsr", i));
        opener = opener.with_file(path.clone(), records);
        paths.push(path);
    }
    (paths, opener)
}

fn position(record: &Record) -> usize {
    record.record_type().parse().unwrap()
}

fn total(deltas: &[Vec<u32>]) -> usize {
    deltas.iter().map(Vec::len).sum()
}

fn files_strategy() -> impl Strategy<Value = Vec<Vec<u32>>> {
    prop::collection::vec(prop::collection::vec(0u32..50, 0..20), 1..6)
}

fn windows_strategy() -> impl Strategy<Value = Vec<(u32, u32)>> {
    prop::collection::vec((0u32..2000, 0u32..400), 1..6)
}

proptest! {
    #[test]
    fn prop_identity_yields_every_record_in_order(deltas in files_strategy()) {
        let (paths, opener) = build_files(&deltas);
        let selection = Selection::from_segments(Vec::new(), RecordSourceChain::new(paths, opener));

        let mut seen = Vec::new();
        let report = selection
            .for_each_stream(|records, name| {
                assert_eq!(name, "all");
                for record in records {
                    seen.push(position(&record?));
                }
                Ok(())
            })
            .unwrap();

        prop_assert_eq!(report.streams, 1);
        prop_assert!(report.is_clean());
        prop_assert_eq!(seen, (0..total(&deltas)).collect::<Vec<_>>());
    }

    #[test]
    fn prop_segments_are_forward_and_contained(
        deltas in files_strategy(),
        windows in windows_strategy(),
    ) {
        let (paths, opener) = build_files(&deltas);
        let segments: Vec<Segment> = windows
            .iter()
            .enumerate()
            .map(|(i, (start, len))| {
                Segment::new(
                    Timestamp::from_secs_f64(f64::from(*start)),
                    Timestamp::from_secs_f64(f64::from(start + len)),
                    Some(format!("w{}", i)),
                )
            })
            .collect();
        let expected_windows = segments.clone();
        let selection = Selection::from_segments(segments, RecordSourceChain::new(paths, opener));

        let mut streams: Vec<(String, Vec<Record>)> = Vec::new();
        let report = selection
            .for_each_stream(|records, name| {
                let records = records.collect::<Result<Vec<_>>>()?;
                streams.push((name.to_string(), records));
                Ok(())
            })
            .unwrap();

        prop_assert!(report.is_clean());
        prop_assert!(streams.len() <= expected_windows.len());
        prop_assert_eq!(report.streams, streams.len());

        let mut last_position = None;
        for ((name, records), segment) in streams.iter().zip(&expected_windows) {
            prop_assert!(name.ends_with(segment.name()));
            for record in records {
                prop_assert!(segment.contains(record.timestamp()));
                let pos = position(record);
                if let Some(last) = last_position {
                    prop_assert!(pos > last, "record {} produced after {}", pos, last);
                }
                last_position = Some(pos);
            }
        }
    }

    #[test]
    fn prop_disjoint_ordered_windows_lose_at_most_boundary_records(
        deltas in files_strategy(),
        cuts in prop::collection::btree_set(0u32..1000, 2..8),
    ) {
        // Back to back windows [c0, c1 - 0.5], [c1, c2 - 0.5], ...
        let cuts: Vec<u32> = cuts.into_iter().collect();
        let segments: Vec<Segment> = cuts
            .windows(2)
            .map(|pair| {
                Segment::new(
                    Timestamp::from_secs_f64(f64::from(pair[0])),
                    Timestamp::from_secs_f64(f64::from(pair[1]) - 0.5),
                    None,
                )
            })
            .collect();
        let (paths, opener) = build_files(&deltas);
        let selection = Selection::from_segments(segments.clone(), RecordSourceChain::new(paths, opener));

        let mut produced = 0usize;
        selection
            .for_each_stream(|records, _| {
                produced += records.filter(|r| r.is_ok()).count();
                Ok(())
            })
            .unwrap();

        let mut clock = 0.0;
        let mut covered = 0usize;
        for delta in deltas.iter().flatten() {
            clock += f64::from(*delta);
            if segments.iter().any(|s| s.contains(Timestamp::from_secs_f64(clock))) {
                covered += 1;
            }
        }

        // Closing a window consumes one record, which may belong to the next
        prop_assert!(produced <= covered);
        prop_assert!(produced + (segments.len() - 1) >= covered);
    }
}
