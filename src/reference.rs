//! Loader for reference digests recorded by a previous run.
//!
//! A reference file is the new-hash output of an earlier run: one record per
//! line of the form `<algorithm>, <path>, <digest>`, with commas and/or spaces
//! as delimiters.
//!
//! `ReferenceMap::load` deliberately folds every failure (missing file,
//! unreadable file, a single malformed line) into an empty map, which is
//! indistinguishable from a legitimately empty reference file. Callers that
//! need to tell these apart must re-check the file themselves.

use crate::util::paths::path_from_bytes;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Separator written between the fields of a new-hash line.
const SEPARATOR: &[u8] = b" , ";

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Malformed reference record on line {line}: {content:?}")]
    Malformed { line: usize, content: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceMap {
    digests: HashMap<PathBuf, String>,
    algorithms: BTreeSet<String>,
}

impl ReferenceMap {
    /// Loads the reference file at `path`, returning an empty map on any
    /// failure.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(map) => map,
            Err(e) => {
                debug!("Discarding reference file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self, ReferenceError> {
        let content = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                ReferenceError::PermissionDenied(path.to_path_buf())
            } else {
                ReferenceError::Io(e)
            }
        })?;

        Self::parse(content)
    }

    /// Parses reference records. Blank lines are skipped; any other line that
    /// is not a three-field record fails the whole parse.
    ///
    /// Paths are taken as raw bytes, so a reference written by a run over
    /// non-UTF-8 names reads back to the same paths.
    pub fn parse(content: impl AsRef<[u8]>) -> Result<Self, ReferenceError> {
        let mut map = Self::default();

        for (index, line) in content.as_ref().split(|&b| b == b'\n').enumerate() {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.trim_ascii().is_empty() {
                continue;
            }

            let (algorithm, path, digest) =
                split_record(line).ok_or_else(|| ReferenceError::Malformed {
                    line: index + 1,
                    content: String::from_utf8_lossy(line).into_owned(),
                })?;

            map.algorithms.insert(algorithm.to_string());
            map.digests.insert(path_from_bytes(path), digest.to_string());
        }

        Ok(map)
    }

    pub fn expected(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.digests.get(path.as_ref()).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.digests.keys().map(PathBuf::as_path)
    }

    /// Algorithm names that appear in the reference records.
    pub fn algorithms(&self) -> &BTreeSet<String> {
        &self.algorithms
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

/// Splits a record into algorithm, path and digest.
///
/// Lines in the exact new-hash format are split on the first and last
/// `" , "`, which keeps every byte of the path, including leading or
/// trailing spaces and commas. Anything else goes through the looser
/// delimiter-based split.
fn split_record(line: &[u8]) -> Option<(&str, &[u8], &str)> {
    let first = find(line, SEPARATOR);
    let last = rfind(line, SEPARATOR);

    let (algorithm, path, digest) = match (first, last) {
        (Some(first), Some(last)) if first < last => (
            &line[..first],
            &line[first + SEPARATOR.len()..last],
            &line[last + SEPARATOR.len()..],
        ),
        _ => split_delimited(line)?,
    };

    let algorithm = std::str::from_utf8(algorithm.trim_ascii()).ok()?;
    let digest = std::str::from_utf8(digest.trim_ascii()).ok()?;
    if algorithm.is_empty() || digest.is_empty() || path.is_empty() {
        return None;
    }
    if algorithm.bytes().any(is_delimiter) || digest.bytes().any(is_delimiter) {
        return None;
    }

    Some((algorithm, path, digest))
}

/// Comma and/or space delimited fallback. The algorithm runs up to the first
/// delimiter and the digest starts after the last one. A line without any
/// comma falls back to plain whitespace splitting, so its path may not
/// contain spaces.
fn split_delimited(line: &[u8]) -> Option<(&[u8], &[u8], &[u8])> {
    let line = trim_delimiters(line);

    let algorithm_end = line.iter().position(|&b| is_delimiter(b))?;
    let digest_start = line.iter().rposition(|&b| is_delimiter(b))? + 1;
    if digest_start <= algorithm_end {
        return None;
    }

    let path = trim_delimiters(&line[algorithm_end..digest_start]);
    if !line.contains(&b',') && path.contains(&b' ') {
        return None;
    }

    Some((&line[..algorithm_end], path, &line[digest_start..]))
}

fn is_delimiter(b: u8) -> bool {
    b == b',' || b == b' '
}

fn trim_delimiters(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| !is_delimiter(b));
    let end = bytes.iter().rposition(|&b| !is_delimiter(b));
    match (start, end) {
        (Some(start), Some(end)) => &bytes[start..=end],
        _ => &[],
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn parses_new_hash_output_lines() {
        let map = ReferenceMap::parse(
            "md5 , /data/a.txt , d41d8cd98f00b204e9800998ecf8427e\n\
             md5 , /data/sub/b.bin , 5d41402abc4b2a76b9719d911017c592\n",
        )
        .unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(
            map.expected("/data/a.txt"),
            Some("d41d8cd98f00b204e9800998ecf8427e")
        );
        assert_eq!(
            map.expected("/data/sub/b.bin"),
            Some("5d41402abc4b2a76b9719d911017c592")
        );
        assert_eq!(
            map.algorithms().iter().collect::<Vec<_>>(),
            vec![&"md5".to_string()]
        );
    }

    #[test]
    fn accepts_compact_and_space_only_delimiters() {
        let map = ReferenceMap::parse("sha1,/x,aa\nsha1   /y   bb\n").unwrap();

        assert_eq!(map.expected("/x"), Some("aa"));
        assert_eq!(map.expected("/y"), Some("bb"));
    }

    #[test]
    fn keeps_spaces_inside_paths() {
        let map = ReferenceMap::parse("md5 , /data/my file.txt , abcd\n").unwrap();

        assert_eq!(map.expected("/data/my file.txt"), Some("abcd"));
    }

    #[test]
    fn exact_separators_keep_surrounding_spaces_and_commas_in_paths() {
        let map = ReferenceMap::parse(
            "md5 , /t/a  , 01\n\
             md5 , /t/ b , 02\n\
             md5 , /t/c , , 03\n\
             md5 , /t/x , y , 04\n",
        )
        .unwrap();

        assert_eq!(map.expected("/t/a "), Some("01"));
        assert_eq!(map.expected("/t/ b"), Some("02"));
        assert_eq!(map.expected("/t/c ,"), Some("03"));
        assert_eq!(map.expected("/t/x , y"), Some("04"));
        assert_eq!(map.expected("/t/a"), None);
    }

    #[test]
    fn tolerates_crlf_line_endings() {
        let map = ReferenceMap::parse("md5 , /a , 01\r\nmd5 , /b , 02\r\n").unwrap();

        assert_eq!(map.expected("/a"), Some("01"));
        assert_eq!(map.expected("/b"), Some("02"));
    }

    #[test]
    #[cfg(unix)]
    fn non_utf8_paths_are_read_as_raw_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let map = ReferenceMap::parse(b"md5 , /t/bad\xff/inner , 01\n").unwrap();

        assert_eq!(
            map.expected(Path::new(OsStr::from_bytes(b"/t/bad\xff/inner"))),
            Some("01")
        );
    }

    #[test]
    fn rejects_non_utf8_digest() {
        assert!(matches!(
            ReferenceMap::parse(b"md5 , /a , 0\xff\n"),
            Err(ReferenceError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn skips_blank_lines() {
        let map = ReferenceMap::parse("\nmd5 , /a , 01\n   \n").unwrap();

        assert_eq!(map.len(), 1);
    }

    #[test]
    fn later_records_win_for_duplicate_paths() {
        let map = ReferenceMap::parse("md5 , /a , 01\nmd5 , /a , 02\n").unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map.expected("/a"), Some("02"));
    }

    #[test]
    fn rejects_records_with_missing_fields() {
        for content in ["md5 , /a\n", "just-one-field\n", "md5 , /a , 01\n/b , 02\n"] {
            match ReferenceMap::parse(content) {
                Err(ReferenceError::Malformed { .. }) => {}
                other => panic!("Expected Malformed for {content:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn reports_malformed_line_number() {
        match ReferenceMap::parse("md5 , /a , 01\n\ngarbage\n") {
            Err(ReferenceError::Malformed { line, content }) => {
                assert_eq!(line, 3);
                assert_eq!(content, "garbage");
            }
            other => panic!("Expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn load_folds_failures_into_empty_map() {
        let temp_dir = TempDir::new().unwrap();

        let missing = temp_dir.path().join("missing.txt");
        assert!(ReferenceMap::load(&missing).is_empty());

        let malformed = temp_dir.path().join("malformed.txt");
        fs::write(&malformed, "md5 , /a , 01\nnot-a-record\n").unwrap();
        assert!(ReferenceMap::load(&malformed).is_empty());

        let empty = temp_dir.path().join("empty.txt");
        fs::write(&empty, "").unwrap();
        assert!(ReferenceMap::load(&empty).is_empty());

        let valid = temp_dir.path().join("valid.txt");
        fs::write(&valid, "md5 , /a , 01\n").unwrap();
        assert_eq!(ReferenceMap::load(&valid).expected("/a"), Some("01"));
    }
}
