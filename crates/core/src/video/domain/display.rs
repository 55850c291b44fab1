use crate::shared::frame::Frame;

/// Surface the annotated frames are presented on.
pub trait Display: Send {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Whether the operator asked, through this surface, to stop watching.
    fn poll_for_stop(&mut self) -> bool;

    fn close(&mut self) {}
}
