pub mod display;
pub mod video_source;
