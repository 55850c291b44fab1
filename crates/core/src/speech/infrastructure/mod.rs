pub mod log_speech_engine;
pub mod rodio_player;
pub mod translate_tts_engine;
