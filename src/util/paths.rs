//! Path helpers for traversal tasks and result lines.
//!
//! Joining is done on the raw path bytes rather than through `Path::join`,
//! which would keep redundant separators. On Unix the bytes are the OS bytes,
//! so names that are not valid UTF-8 survive hashing, output and reference
//! parsing unchanged. Other platforms fall back to the lossy string form.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// The bytes of `path` as written to result lines.
pub(crate) fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Cow::Borrowed(path.as_os_str().as_bytes())
    }
    #[cfg(not(unix))]
    {
        match path.to_string_lossy() {
            Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
            Cow::Owned(s) => Cow::Owned(s.into_bytes()),
        }
    }
}

/// Inverse of [`path_bytes`], used when reading paths back from a reference.
pub(crate) fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        PathBuf::from(OsStr::from_bytes(bytes))
    }
    #[cfg(not(unix))]
    {
        PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Joins a directory path and an entry name with exactly one `/`.
///
/// Any trailing slashes on `parent` are collapsed into the single separator.
/// An empty `parent` yields an empty path: there is no directory to join
/// onto, and the caller's stat of the result fails cleanly.
pub(crate) fn join_path(parent: &Path, name: &OsStr) -> PathBuf {
    let parent = path_bytes(parent);
    if parent.is_empty() {
        return PathBuf::new();
    }

    let end = parent.iter().rposition(|&b| b != b'/').map_or(0, |i| i + 1);
    let name = path_bytes(Path::new(name));

    let mut joined = Vec::with_capacity(end + 1 + name.len());
    joined.extend_from_slice(&parent[..end]);
    joined.push(b'/');
    joined.extend_from_slice(&name);
    path_from_bytes(&joined)
}
