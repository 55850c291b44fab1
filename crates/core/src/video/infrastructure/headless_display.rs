use crate::shared::frame::Frame;
use crate::video::domain::display::Display;

/// Discards frames. Used when no snapshot output is configured.
#[derive(Default)]
pub struct HeadlessDisplay;

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self
    }
}

impl Display for HeadlessDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }

    fn poll_for_stop(&mut self) -> bool {
        false
    }
}
