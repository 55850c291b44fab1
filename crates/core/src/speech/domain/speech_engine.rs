/// Turns a sentence into audible speech.
///
/// `speak` may block until playback finishes; the narration loop coalesces
/// any ticks missed meanwhile.
pub trait SpeechEngine: Send {
    fn speak(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error>>;
}
