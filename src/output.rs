//! Result lines and the sink that serializes them.
//!
//! Each finding is written as one complete line under the sink's lock, so
//! lines from concurrent workers never interleave. Warnings do not go through
//! the sink: they are `tracing` events on stderr, which the subscriber also
//! writes a whole line at a time.

use crate::digest::DigestAlgorithm;
use crate::util::paths::path_bytes;
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::warn;

/// One reportable outcome of the audit.
///
/// A successful comparison against the reference has no variant: matches
/// are silent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// No reference comparison requested.
    NewHash {
        algorithm: DigestAlgorithm,
        path: PathBuf,
        digest: String,
    },
    Mismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },
    Extra {
        path: PathBuf,
        digest: String,
    },
    Disappeared {
        path: PathBuf,
    },
}

impl Finding {
    /// The result line, newline included, with the path as raw bytes.
    pub fn to_line(&self) -> Vec<u8> {
        let (head, path, tail) = match self {
            Finding::NewHash {
                algorithm,
                path,
                digest,
            } => (format!("{algorithm} , "), path, format!(" , {digest}")),
            Finding::Mismatch {
                path,
                found,
                expected,
            } => (
                "hash differs : ".to_string(),
                path,
                format!(" found({found}) expected({expected})"),
            ),
            Finding::Extra { path, digest } => (
                "extra file : ".to_string(),
                path,
                format!(" with hash({digest})"),
            ),
            Finding::Disappeared { path } => {
                ("file disappeared: ".to_string(), path, String::new())
            }
        };

        let path = path_bytes(path);
        let mut line = Vec::with_capacity(head.len() + path.len() + tail.len() + 1);
        line.extend_from_slice(head.as_bytes());
        line.extend_from_slice(&path);
        line.extend_from_slice(tail.as_bytes());
        line.push(b'\n');
        line
    }
}

/// Lossy rendering without the trailing newline, for messages and tests.
impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self.to_line();
        f.write_str(String::from_utf8_lossy(&line).trim_end_matches('\n'))
    }
}

pub struct OutputSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl OutputSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        OutputSink {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Sink for reports that must not end up in a reference file.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Writes `finding` as a single line.
    ///
    /// A failing writer (for example a closed pipe) is logged and otherwise
    /// ignored; workers keep going.
    pub fn emit(&self, finding: &Finding) {
        let line = finding.to_line();
        let mut writer = self.writer.lock();
        if let Err(e) = writer.write_all(&line).and_then(|()| writer.flush()) {
            warn!("Failed to write result line: {}", e);
        }
    }

    /// Writes a free-form block, such as the statistics report.
    pub fn emit_block(&self, block: &dyn fmt::Display) {
        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "\n{block}").and_then(|()| writer.flush()) {
            warn!("Failed to write report: {}", e);
        }
    }
}

/// In-memory writer shared between a sink and the test reading it back.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct CapturedOutput(std::sync::Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl CapturedOutput {
    pub(crate) fn sink(&self) -> OutputSink {
        OutputSink::new(self.clone())
    }

    pub(crate) fn bytes(&self) -> Vec<u8> {
        self.0.lock().clone()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        String::from_utf8(self.bytes())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
