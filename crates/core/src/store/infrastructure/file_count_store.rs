use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::shared::part_file::part_path;
use crate::store::domain::count_store::{CountStore, StoreError};

#[cfg(unix)]
const FILE_MODE: u32 = 0o644;

/// Count record kept in a plain-text file so other processes can inspect it.
///
/// Each write goes to a sibling `.part` file that is then renamed over the
/// target; readers see either the old or the new value, never a truncated
/// one.
pub struct FileCountStore {
    path: PathBuf,
}

impl FileCountStore {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }

    fn write_inner(&self, temp_path: &Path, text: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = open_for_write(temp_path)?;
        file.write_all(text.as_bytes())?;
        file.flush()?;
        drop(file);

        fs::rename(temp_path, &self.path)
    }
}

impl CountStore for FileCountStore {
    fn write(&self, count: usize) -> Result<(), StoreError> {
        let temp_path = part_path(&self.path);
        let result = self.write_inner(&temp_path, &count.to_string());

        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result.map_err(|e| self.write_error(e))
    }

    fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(unix)]
fn open_for_write(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(FILE_MODE)
        .open(path)
}

#[cfg(not(unix))]
fn open_for_write(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}
