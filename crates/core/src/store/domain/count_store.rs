use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("failed to write count to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read count from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("count store lock poisoned")]
    Poisoned,
}

/// Single-value record of the most recent face count.
///
/// Written by the count writer, read by the narration loop. Implementations
/// must never expose a partially written value to readers.
pub trait CountStore: Send + Sync {
    /// Replaces the stored value with the decimal text of `count`.
    fn write(&self, count: usize) -> Result<(), StoreError>;

    /// Returns the current content, or `None` before the first write.
    fn read(&self) -> Result<Option<String>, StoreError>;
}
