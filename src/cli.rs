mod help_text;

use crate::digest::DigestAlgorithm;
use clap::{ArgAction, Parser, ValueEnum};
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Multithreaded file consistency checker
#[derive(Parser, Debug)]
#[command(
    name = "phantom",
    version,
    about,
    long_about = help_text::ROOT_LONG_ABOUT
)]
pub struct Cli {
    /// Root of the tree to audit
    #[arg(value_name = "PATH")]
    pub root: PathBuf,

    /// Number of parallel worker threads
    #[arg(short = 'n', long, value_name = "N", default_value = "1")]
    pub num_threads: NonZeroUsize,

    /// Compare against the output of a previous run instead of printing digests
    #[arg(short, long, value_name = "REFERENCE_FILE")]
    pub compare: Option<PathBuf>,

    /// Digest algorithm: md5, sha1, ripemd160 or sha256
    #[arg(short, long, value_name = "NAME", default_value = "md5")]
    pub digest: DigestAlgorithm,

    /// Collect file and data statistics and print them at the end
    #[arg(short = 's', long)]
    pub collect_stats: bool,

    /// Increase log verbosity (-v for info, -vv for debug). Takes precedence over RUST_LOG.
    #[arg(short, long, action = ArgAction::Count, global = true, conflicts_with = "log_level")]
    pub verbose: u8,

    /// Set the log level explicitly. Takes precedence over RUST_LOG.
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
