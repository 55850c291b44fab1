use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Sibling path an atomic write stages its bytes in before renaming them
/// over `path`.
///
/// `.part` is appended to the full file name, so files that only differ in
/// extension (`latest.log`, `latest.png`) never share a staging file.
pub fn part_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    path.with_file_name(name)
}
