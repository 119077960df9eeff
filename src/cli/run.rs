//! Command handlers

use crate::cli::commands::{Commands, SelectionArgs};
use crate::config::{Config, DEFAULT_EXTENSION};
use crate::core::record::{Record, RecordFilter, RecordPayload};
use crate::core::temporal::Timestamp;
use crate::error::{Error, Result};
use crate::slice::{RunReport, Selection};
use crate::storage::{select_inputs, Encoding, RecordFileOpener, RecordFileWriter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Execute one command, writing results to `out`
pub fn run<W: Write>(command: Commands, out: &mut W) -> Result<()> {
    match command {
        Commands::Summary { selection, json } => summary(&selection, json, out),
        Commands::Dump { selection } => dump(&selection, out),
        Commands::Extract {
            selection,
            out_dir,
            compress,
        } => extract(&selection, out_dir.as_deref(), encoding(compress), out),
        Commands::Import {
            input,
            output,
            compress,
        } => import(&input, &output, encoding(compress), out),
    }
}

fn encoding(compress: bool) -> Encoding {
    if compress {
        Encoding::Zstd
    } else {
        Encoding::Plain
    }
}

/// Resolve configuration, inputs and windows into a [`Selection`]
pub fn build_selection(args: &SelectionArgs) -> Result<Selection> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    }
    .with_overrides(&args.extensions, &args.types, args.no_verify);
    config.validate()?;

    let files = select_inputs(&args.paths, &config.extensions);
    let opener = RecordFileOpener::new(
        config.decoder,
        RecordFilter::from_option(config.types.as_deref()),
    );
    Selection::choose(files, opener, &args.keep)
}

fn finish_report(report: RunReport) {
    if report.is_clean() {
        info!(streams = report.streams, "done");
    } else {
        warn!(
            streams = report.streams,
            failures = report.failures.len(),
            "done, some inputs could not be read"
        );
    }
}

/// Per-stream statistics printed by `summary`
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct StreamSummary {
    pub name: String,
    pub records: u64,
    pub first: Option<f64>,
    pub last: Option<f64>,
    pub types: BTreeMap<String, u64>,
}

impl StreamSummary {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn add(&mut self, record: &Record) {
        let ts = record.timestamp().as_secs_f64();
        self.records += 1;
        self.first.get_or_insert(ts);
        self.last = Some(ts);
        *self.types.entry(record.record_type().to_string()).or_insert(0) += 1;
    }

    fn write_text<W: Write>(&self, out: &mut W) -> Result<()> {
        let bound = |ts: Option<f64>| {
            ts.map(|t| Timestamp::from_secs_f64(t).to_string())
                .unwrap_or_else(|| "-".to_string())
        };
        writeln!(
            out,
            "{}: {} record(s), {} .. {}",
            self.name,
            self.records,
            bound(self.first),
            bound(self.last)
        )?;
        for (record_type, count) in &self.types {
            writeln!(out, "  {:<24} {}", record_type, count)?;
        }
        Ok(())
    }
}

fn summary<W: Write>(args: &SelectionArgs, json: bool, out: &mut W) -> Result<()> {
    let report = build_selection(args)?.for_each_stream(|records, name| {
        let mut stats = StreamSummary::new(name);
        for record in records {
            stats.add(&record?);
        }
        if json {
            serde_json::to_writer(&mut *out, &stats)?;
            writeln!(out)?;
        } else {
            stats.write_text(&mut *out)?;
        }
        Ok(())
    })?;
    finish_report(report);
    Ok(())
}

fn dump<W: Write>(args: &SelectionArgs, out: &mut W) -> Result<()> {
    let report = build_selection(args)?.for_each_stream(|records, name| {
        for record in records {
            let record = record?;
            let line = serde_json::json!({
                "stream": name,
                "type": record.record_type(),
                "timestamp": record.timestamp.map(|t| t.as_secs_f64()),
                "payload": record.payload().to_json_value(),
            });
            serde_json::to_writer(&mut *out, &line)?;
            writeln!(out)?;
        }
        Ok(())
    })?;
    finish_report(report);
    Ok(())
}

/// Where `extract` writes a stream
pub fn output_path(stream_name: &str, out_dir: Option<&Path>) -> PathBuf {
    let stream_path = Path::new(stream_name);
    let path = match (out_dir, stream_path.file_name()) {
        (Some(dir), Some(file_name)) => dir.join(file_name),
        _ => stream_path.to_path_buf(),
    };
    path.with_extension(DEFAULT_EXTENSION)
}

fn extract<W: Write>(
    args: &SelectionArgs,
    out_dir: Option<&Path>,
    encoding: Encoding,
    out: &mut W,
) -> Result<()> {
    let report = build_selection(args)?.for_each_stream(|records, name| {
        let path = output_path(name, out_dir);
        let mut writer: Option<RecordFileWriter> = None;
        for record in records {
            let record = record?;
            if writer.is_none() {
                writer = Some(RecordFileWriter::create(&path, encoding)?);
            }
            if let Some(writer) = writer.as_mut() {
                writer.append(&record)?;
            }
        }

        match writer {
            Some(writer) => {
                let header = writer.finalize()?;
                info!(path = %path.display(), records = header.record_count, "wrote stream");
                writeln!(out, "{}\t{}", path.display(), header.record_count)?;
            }
            None => {
                warn!(stream = name, "nothing to write");
            }
        }
        Ok(())
    })?;
    finish_report(report);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ImportLine {
    #[serde(rename = "type")]
    record_type: String,
    #[serde(default)]
    timestamp: Option<f64>,
    #[serde(default)]
    payload: serde_json::Value,
}

fn import<W: Write>(input: &Path, output: &Path, encoding: Encoding, out: &mut W) -> Result<()> {
    let reader = BufReader::new(File::open(input)?);
    let mut writer = RecordFileWriter::create(output, encoding)?;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: ImportLine = serde_json::from_str(&line).map_err(|e| {
            Error::Serialization(format!("{} line {}: {}", input.display(), index + 1, e))
        })?;
        let record = Record::new(
            parsed.record_type,
            parsed.timestamp.map(Timestamp::from_secs_f64),
            RecordPayload::from_json(&parsed.payload)?,
        );
        writer.append(&record)?;
    }

    let header = writer.finalize()?;
    info!(path = %output.display(), records = header.record_count, "imported");
    writeln!(out, "{}\t{}", output.display(), header.record_count)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecoderConfig;
    use crate::storage::{RecordFileReader, RecordSource};
    use tempfile::TempDir;

    fn selection_args(paths: Vec<PathBuf>, keep: &[&str]) -> SelectionArgs {
        SelectionArgs {
            paths,
            keep: keep.iter().map(|s| s.to_string()).collect(),
            types: Vec::new(),
            extensions: Vec::new(),
            config: None,
            no_verify: false,
        }
    }

    fn import_fixture(dir: &Path, name: &str, stamps: &[f64]) -> PathBuf {
        let jsonl = dir.join(format!("{}.jsonl", name));
        let mut text = String::new();
        for (i, t) in stamps.iter().enumerate() {
            let kind = if i % 2 == 0 { "HEARTBEAT" } else { "PARAM_VALUE" };
            text.push_str(&format!(
                "{{\"type\": \"{}\", \"timestamp\": {}, \"payload\": {{\"seq\": {}}}}}\n",
                kind, t, i
            ));
        }
        std::fs::write(&jsonl, text).unwrap();

        let output = dir.join(format!("{}.lsr", name));
        let mut sink = Vec::new();
        import(&jsonl, &output, Encoding::Plain, &mut sink).unwrap();
        output
    }

    #[test]
    fn test_import_creates_record_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = import_fixture(temp_dir.path(), "flight", &[1.0e9, 1.0e9 + 1.0]);

        let mut reader =
            RecordFileReader::open(&path, DecoderConfig::default(), RecordFilter::all()).unwrap();
        assert_eq!(reader.header().record_count, 2);
        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.record_type(), "HEARTBEAT");
        let payload: serde_json::Value = first.payload().to_json().unwrap();
        assert_eq!(payload["seq"], 0);
    }

    #[test]
    fn test_import_reports_bad_line() {
        let temp_dir = TempDir::new().unwrap();
        let jsonl = temp_dir.path().join("bad.jsonl");
        std::fs::write(&jsonl, "{\"type\": \"A\"}\nnot json\n").unwrap();
        let err = import(&jsonl, &temp_dir.path().join("bad.lsr"), Encoding::Plain, &mut Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_summary_json_per_segment() {
        let temp_dir = TempDir::new().unwrap();
        let a = import_fixture(temp_dir.path(), "a", &[1.0e9, 1.0e9 + 10.0]);
        let b = import_fixture(temp_dir.path(), "b", &[1.0e9 + 20.0, 1.0e9 + 30.0]);

        let args = selection_args(vec![a, b], &["1000000005,1000000025,middle"]);
        let mut out = Vec::new();
        summary(&args, true, &mut out).unwrap();

        let line: serde_json::Value =
            serde_json::from_slice(out.split(|b| *b == b'\n').next().unwrap()).unwrap();
        assert_eq!(line["records"], 2);
        assert_eq!(line["first"], 1.0e9 + 10.0);
        assert_eq!(line["last"], 1.0e9 + 20.0);
        assert!(line["name"].as_str().unwrap().ends_with("middle"));
    }

    #[test]
    fn test_summary_text_identity() {
        let temp_dir = TempDir::new().unwrap();
        let a = import_fixture(temp_dir.path(), "a", &[1.0e9, 1.0e9 + 10.0, 1.0e9 + 20.0]);

        let mut out = Vec::new();
        summary(&selection_args(vec![a], &[]), false, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("3 record(s)"));
        assert!(text.contains("HEARTBEAT"));
        assert!(text.contains("2001-09-09T01:46:40+00:00"));
    }

    #[test]
    fn test_dump_filters_types() {
        let temp_dir = TempDir::new().unwrap();
        let a = import_fixture(temp_dir.path(), "a", &[1.0e9, 1.0e9 + 1.0, 1.0e9 + 2.0]);

        let mut args = selection_args(vec![a], &[]);
        args.types = vec!["PARAM_VALUE".to_string()];
        let mut out = Vec::new();
        dump(&args, &mut out).unwrap();

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["type"], "PARAM_VALUE");
        assert_eq!(lines[0]["payload"]["seq"], 1);
        assert_eq!(lines[0]["stream"], "all");
    }

    #[test]
    fn test_extract_writes_one_file_per_segment() {
        let temp_dir = TempDir::new().unwrap();
        let a = import_fixture(temp_dir.path(), "a", &[1.0e9, 1.0e9 + 10.0]);
        let b = import_fixture(temp_dir.path(), "b", &[1.0e9 + 20.0, 1.0e9 + 30.0, 1.0e9 + 40.0]);
        let out_dir = temp_dir.path().join("out");

        let args = selection_args(
            vec![a, b],
            &["1000000005,1000000025,first", "1000000035,1000000045,second", "1000000100,1000000200,empty"],
        );
        let mut out = Vec::new();
        extract(&args, Some(&out_dir), Encoding::Zstd, &mut out).unwrap();

        let count = |name: &str| {
            let reader = RecordFileReader::open(
                out_dir.join(name),
                DecoderConfig::default(),
                RecordFilter::all(),
            )
            .unwrap();
            reader.header().record_count
        };
        assert_eq!(count("first.lsr"), 2);
        assert_eq!(count("second.lsr"), 1);
        assert!(!out_dir.join("empty.lsr").exists());
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path("logs/2023_09_15/transect1", None),
            PathBuf::from("logs/2023_09_15/transect1.lsr")
        );
        assert_eq!(
            output_path("logs/2023_09_15/transect1", Some(Path::new("out"))),
            PathBuf::from("out/transect1.lsr")
        );
    }

    #[test]
    fn test_no_valid_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let args = selection_args(vec![temp_dir.path().join("missing.lsr")], &[]);
        assert!(matches!(
            summary(&args, false, &mut Vec::new()),
            Err(Error::NoInput(_))
        ));
    }
}
