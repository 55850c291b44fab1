/// Label drawn above every detected face.
pub const FACE_LABEL: &str = "Human";

/// Text considered "nobody in view" when read back from the count store.
pub const ZERO_COUNT: &str = "0";

/// Google Translate text-to-speech endpoint used by default.
pub const TRANSLATE_TTS_URL: &str = "https://translate.google.com/translate_tts";

/// BlazeFace short-range model expected next to the binary by default.
pub const DEFAULT_MODEL_FILE: &str = "face_detection_short_range.onnx";

pub const DEFAULT_COUNT_FILE: &str = "face_count.log";

pub const DEFAULT_AUDIO_DIR: &str = "audio";

pub const DEFAULT_LANGUAGE: &str = "en";

pub const DEFAULT_WINDOW_TITLE: &str = "Face Detection";

pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

/// Builds the sentence announced while faces are in view.
pub fn announcement(count_text: &str) -> String {
    format!("Human face {count_text} count detected")
}
