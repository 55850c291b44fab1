use crate::shared::frame::Frame;

/// Produces frames from a camera or stream, one at a time.
///
/// `Ok(None)` signals end of stream. An `Err` means the source itself can
/// no longer be read and the caller should stop asking. A frame for which
/// [`Frame::is_empty`] holds is a transient hiccup, not an error.
pub trait VideoSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the underlying device. Must be safe to call more than once.
    fn close(&mut self);
}
