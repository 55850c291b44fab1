use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::speech::domain::audio_player::AudioPlayer;

/// Plays audio files on the default output device through rodio.
///
/// The output stream is not `Send`, so it is opened per call.
#[derive(Default)]
pub struct RodioPlayer;

impl RodioPlayer {
    pub fn new() -> Self {
        Self
    }
}

impl AudioPlayer for RodioPlayer {
    fn play(&mut self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let (_stream, handle) = rodio::OutputStream::try_default()?;
        let sink = rodio::Sink::try_new(&handle)?;
        let source = rodio::Decoder::new(BufReader::new(File::open(path)?))?;
        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }
}
