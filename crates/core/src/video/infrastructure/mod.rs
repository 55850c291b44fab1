pub mod ffmpeg_camera;
pub mod headless_display;
pub mod snapshot_display;
