pub mod audio_player;
pub mod speech_engine;
