mod audit;
mod cli;
mod compare;
mod digest;
mod output;
mod queue;
mod reference;
mod registry;
mod stats;
mod util;
mod worker;

use anyhow::Context;
use audit::{AuditOptions, run_audit};
use cli::{Cli, LogLevel};
use digest::DigestAlgorithm;
use output::OutputSink;
use reference::ReferenceMap;
use std::fmt as stdfmt;
use std::io::{IsTerminal, stderr};
use std::path::Path;
use std::process::ExitCode;
use tracing::{Event, Level, Subscriber, error, info, warn};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

struct PhantomExitCode;

impl PhantomExitCode {
    /// Exit code used when a comparison found differences.
    fn differences_found() -> ExitCode {
        ExitCode::from(1)
    }

    /// Exit code used for other errors (I/O errors, invalid reference, etc.).
    fn any_error() -> ExitCode {
        ExitCode::from(255)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_level);

    match handle_audit(cli) {
        Ok(exit_code) => exit_code,
        Err(err) => {
            error!("{err:#}");
            PhantomExitCode::any_error()
        }
    }
}

fn handle_audit(cli: Cli) -> anyhow::Result<ExitCode> {
    let reference = cli
        .compare
        .as_deref()
        .map(|path| load_reference(path, cli.digest))
        .transpose()?;

    let options = AuditOptions {
        root: cli.root,
        workers: cli.num_threads,
        algorithm: cli.digest,
        reference,
        collect_stats: cli.collect_stats,
    };
    let comparing = options.reference.is_some();

    let sink = OutputSink::stdout();
    let summary = run_audit(options, &sink)?;

    // Stdout may be redirected into a reference file; the report must not
    // end up in it.
    if let Some(report) = &summary.stats {
        OutputSink::stderr().emit_block(report);
    }

    info!("Hashed {} files", summary.files_hashed);
    if summary.skipped > 0 {
        warn!("Skipped {} unreadable entries", summary.skipped);
    }

    if comparing && summary.has_divergence() {
        info!(
            "Found {} differing, {} extra and {} disappeared files",
            summary.mismatched, summary.extra, summary.disappeared
        );
        return Ok(PhantomExitCode::differences_found());
    }

    Ok(ExitCode::SUCCESS)
}

/// Loads the reference file, failing when it is missing or unparsable.
///
/// `ReferenceMap::load` returns an empty map for both a failed load and an
/// empty file, so an empty result is re-checked here to tell them apart.
fn load_reference(path: &Path, algorithm: DigestAlgorithm) -> anyhow::Result<ReferenceMap> {
    let reference = ReferenceMap::load(path);

    if reference.is_empty() {
        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read reference file {}", path.display()))?;
        ReferenceMap::parse(&content)
            .with_context(|| format!("Failed to parse reference file {}", path.display()))?;
        warn!(
            "Reference file {} has no records; every file will be reported as extra",
            path.display()
        );
    }

    if let Some(other) = reference
        .algorithms()
        .iter()
        .find(|name| name.as_str() != algorithm.name())
    {
        warn!(
            "Reference file {} was recorded with {}, but this run uses {}",
            path.display(),
            other,
            algorithm
        );
    }

    info!(
        "Loaded {} reference digests from {}",
        reference.len(),
        path.display()
    );
    Ok(reference)
}

fn init_tracing(verbose: u8, log_level: Option<LogLevel>) {
    let stderr_is_terminal = stderr().is_terminal();
    let formatter = EmojiFormatter { stderr_is_terminal };

    let filter = match (log_level, verbose) {
        (Some(level), _) => EnvFilter::new(level.as_filter()),
        (None, 0) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        (None, 1) => EnvFilter::new("info"),
        (None, _) => EnvFilter::new("debug"),
    };

    let fmt_layer = tracing_fmt::layer()
        .event_format(formatter)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

struct EmojiFormatter {
    stderr_is_terminal: bool,
}

impl<S, N> FormatEvent<S, N> for EmojiFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        if self.stderr_is_terminal {
            match *event.metadata().level() {
                Level::DEBUG => write!(writer, "🔍 ")?,
                Level::INFO => write!(writer, "ℹ️ ")?,
                Level::WARN => write!(writer, "⚠️  ")?,
                Level::ERROR => write!(writer, "❌️ ")?,
                _ => {}
            }
        } else {
            match *event.metadata().level() {
                Level::DEBUG => writer.write_str("DEBUG: ")?,
                Level::INFO => writer.write_str("INFO: ")?,
                Level::WARN => writer.write_str("WARN: ")?,
                Level::ERROR => writer.write_str("ERROR: ")?,
                _ => {}
            }
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
