use std::path::Path;

/// Plays an encoded audio file to completion.
pub trait AudioPlayer: Send {
    fn play(&mut self, path: &Path) -> Result<(), Box<dyn std::error::Error>>;
}
