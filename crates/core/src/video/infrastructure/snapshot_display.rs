use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::shared::frame::Frame;
use crate::shared::part_file::part_path;
use crate::video::domain::display::Display;

/// Minimum time between two snapshot writes.
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_millis(500);

/// Presents frames by saving the latest annotated frame to an image file.
///
/// The file is replaced atomically, so a viewer polling it never sees a
/// half-written image. Writes are throttled to `interval`.
pub struct SnapshotDisplay {
    title: String,
    path: PathBuf,
    interval: Duration,
    last_write: Option<Instant>,
}

impl SnapshotDisplay {
    pub fn new(title: &str, path: &Path) -> Self {
        Self {
            title: title.to_string(),
            path: path.to_path_buf(),
            interval: DEFAULT_SNAPSHOT_INTERVAL,
            last_write: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    fn due(&self) -> bool {
        self.last_write
            .map_or(true, |last| last.elapsed() >= self.interval)
    }
}

impl Display for SnapshotDisplay {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if !self.due() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let format = image::ImageFormat::from_path(&self.path)?;
        let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("Failed to create image from frame data")?;

        let temp_path = part_path(&self.path);
        img.save_with_format(&temp_path, format)?;
        std::fs::rename(&temp_path, &self.path)?;

        if self.last_write.is_none() {
            log::info!("{}: writing snapshots to {}", self.title, self.path.display());
        }
        self.last_write = Some(Instant::now());
        Ok(())
    }

    fn poll_for_stop(&mut self) -> bool {
        false
    }
}
