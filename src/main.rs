//! logslice: main entry point

use anyhow::Context;
use clap::Parser;
use logslice::cli::{self, Cli};
use std::io::{self, Write};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

fn init_tracing(cli: &Cli) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries command output, logs go to stderr
    let console = if cli.log_json {
        fmt::layer().json().with_writer(io::stderr).boxed()
    } else {
        fmt::layer().with_writer(io::stderr).boxed()
    };

    let (file_layer, guard) = match &cli.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("invalid log file path {}", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("failed to install the tracing subscriber")?;
    Ok(guard)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(&cli)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    cli::run(cli.command, &mut out)?;
    out.flush()?;
    Ok(())
}
