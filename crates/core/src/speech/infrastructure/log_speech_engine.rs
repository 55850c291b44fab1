use crate::speech::domain::speech_engine::SpeechEngine;

/// Muted engine: logs each announcement instead of playing it.
#[derive(Default)]
pub struct LogSpeechEngine;

impl LogSpeechEngine {
    pub fn new() -> Self {
        Self
    }
}

impl SpeechEngine for LogSpeechEngine {
    fn speak(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error>> {
        log::info!("(muted) {text}");
        Ok(())
    }
}
