/// An axis-aligned face rectangle in frame pixel coordinates.
///
/// Detectors return these in no particular order; callers must not rely
/// on sorting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> i32 {
        self.x + self.width / 2
    }

    /// Intersects the box with a `frame_w x frame_h` frame.
    ///
    /// Returns `None` when nothing of the box is visible.
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Option<BoundingBox> {
        let x1 = self.x.clamp(0, frame_w as i32);
        let y1 = self.y.clamp(0, frame_h as i32);
        let x2 = self.right().clamp(0, frame_w as i32);
        let y2 = self.bottom().clamp(0, frame_h as i32);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some(BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// Top-left origin for a `text_w x text_h` label sitting just above the
    /// box, horizontally centred on it and kept inside the frame.
    pub fn label_origin(
        &self,
        text_w: u32,
        text_h: u32,
        frame_w: u32,
        gap: i32,
    ) -> (i32, i32) {
        let max_x = (frame_w as i32 - text_w as i32).max(0);
        let x = (self.center_x() - text_w as i32 / 2).clamp(0, max_x);
        let y = (self.y - gap - text_h as i32).max(0);
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_edges_and_center() {
        let b = BoundingBox::new(10, 20, 100, 50);
        assert_eq!(b.right(), 110);
        assert_eq!(b.bottom(), 70);
        assert_eq!(b.center_x(), 60);
    }

    #[rstest]
    #[case::inside(BoundingBox::new(10, 10, 20, 20), Some(BoundingBox::new(10, 10, 20, 20)))]
    #[case::left_overhang(BoundingBox::new(-10, 0, 30, 20), Some(BoundingBox::new(0, 0, 20, 20)))]
    #[case::bottom_right_overhang(
        BoundingBox::new(90, 90, 30, 30),
        Some(BoundingBox::new(90, 90, 10, 10))
    )]
    #[case::outside(BoundingBox::new(200, 200, 10, 10), None)]
    fn test_clamp_to(#[case] b: BoundingBox, #[case] expected: Option<BoundingBox>) {
        assert_eq!(b.clamp_to(100, 100), expected);
    }

    #[test]
    fn test_label_origin_centred_above_box() {
        let b = BoundingBox::new(100, 50, 80, 80);
        // centre 140, text 40 wide -> 120; 50 - 2 - 10
        assert_eq!(b.label_origin(40, 10, 640, 2), (120, 38));
    }

    #[test]
    fn test_label_origin_clamped_to_frame() {
        let top_left = BoundingBox::new(0, 0, 10, 10);
        assert_eq!(top_left.label_origin(40, 10, 640, 2), (0, 0));

        let right_edge = BoundingBox::new(620, 100, 20, 20);
        assert_eq!(right_edge.label_origin(40, 10, 640, 2), (600, 88));
    }
}
