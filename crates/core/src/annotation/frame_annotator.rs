//! Draws detection boxes and their labels onto camera frames.
use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::FACE_LABEL;
use crate::shared::frame::Frame;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const BOX_THICKNESS: i32 = 3;
pub const LABEL_SCALE: f32 = 16.0;

/// Gap between the top edge of a box and the bottom of its label.
const LABEL_GAP: i32 = 2;

#[derive(thiserror::Error, Debug)]
pub enum FontLoadError {
    #[error("failed to read font {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not a usable font")]
    Invalid(std::path::PathBuf),
}

/// Outlines every detected face and writes [`FACE_LABEL`] above it.
pub struct FrameAnnotator {
    font: Option<FontVec>,
    scale: PxScale,
}

impl FrameAnnotator {
    /// Annotator drawing rectangles only.
    pub fn boxes_only() -> Self {
        Self {
            font: None,
            scale: PxScale::from(LABEL_SCALE),
        }
    }

    pub fn with_font(font_path: &Path) -> Result<Self, FontLoadError> {
        let bytes = std::fs::read(font_path).map_err(|source| FontLoadError::Read {
            path: font_path.to_path_buf(),
            source,
        })?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|_| FontLoadError::Invalid(font_path.to_path_buf()))?;
        Ok(Self {
            font: Some(font),
            scale: PxScale::from(LABEL_SCALE),
        })
    }

    /// Loads the label font, falling back to rectangles only when it is
    /// unavailable.
    pub fn load(font_path: &Path) -> Self {
        match Self::with_font(font_path) {
            Ok(annotator) => annotator,
            Err(e) => {
                log::warn!("{e}; labels will not be drawn");
                Self::boxes_only()
            }
        }
    }

    /// Draws `boxes` into `frame` in place. Frames that are not RGB are
    /// left untouched.
    pub fn annotate(&self, frame: &mut Frame, boxes: &[BoundingBox]) {
        if boxes.is_empty() {
            return;
        }
        let drawn = frame.with_rgb_image(|img| {
            for bbox in boxes {
                self.draw_box(img, bbox);
            }
        });
        if drawn.is_none() {
            log::debug!("Frame {} is not RGB, skipping annotation", frame.index());
        }
    }

    fn draw_box(&self, img: &mut RgbImage, bbox: &BoundingBox) {
        let (fw, fh) = img.dimensions();
        let Some(visible) = bbox.clamp_to(fw, fh) else {
            return;
        };

        for inset in 0..BOX_THICKNESS {
            let w = visible.width - 2 * inset;
            let h = visible.height - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(visible.x + inset, visible.y + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(img, rect, BOX_COLOR);
        }

        if let Some(font) = &self.font {
            let (text_w, text_h) = text_size(self.scale, font, FACE_LABEL);
            let (x, y) = visible.label_origin(text_w, text_h, fw, LABEL_GAP);
            draw_text_mut(img, BOX_COLOR, x, y, self.scale, font, FACE_LABEL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn black_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![0u8; (width * height * 3) as usize], width, height, 3, 0)
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * frame.width() + x) * 3) as usize;
        [frame.data()[i], frame.data()[i + 1], frame.data()[i + 2]]
    }

    #[test]
    fn test_outline_is_three_pixels_thick() {
        let mut frame = black_frame(100, 100);
        FrameAnnotator::boxes_only().annotate(&mut frame, &[BoundingBox::new(20, 30, 40, 40)]);

        for offset in 0..3 {
            assert_eq!(pixel(&frame, 20 + offset, 50), BOX_COLOR.0);
        }
        assert_eq!(pixel(&frame, 23, 50), [0, 0, 0]);
        assert_eq!(pixel(&frame, 40, 50), [0, 0, 0]);
        assert_eq!(pixel(&frame, 59, 69), BOX_COLOR.0);
    }

    #[test]
    fn test_box_overhanging_frame_is_clipped() {
        let mut frame = black_frame(50, 50);
        FrameAnnotator::boxes_only().annotate(&mut frame, &[BoundingBox::new(-10, -10, 30, 30)]);
        assert_eq!(pixel(&frame, 0, 10), BOX_COLOR.0);
        assert_eq!(pixel(&frame, 19, 5), BOX_COLOR.0);
    }

    #[test]
    fn test_no_boxes_leaves_frame_untouched() {
        let mut frame = black_frame(20, 20);
        FrameAnnotator::boxes_only().annotate(&mut frame, &[]);
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_frame_is_ignored() {
        let mut frame = Frame::empty(3);
        FrameAnnotator::boxes_only().annotate(&mut frame, &[BoundingBox::new(0, 0, 5, 5)]);
        assert!(frame.is_empty());
    }

    #[test]
    fn test_missing_font_falls_back_to_boxes_only() {
        let annotator = FrameAnnotator::load(Path::new("/nonexistent/font.ttf"));
        assert!(annotator.font.is_none());
    }

    fn fixture_font() -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/DejaVuSans.ttf")
    }

    fn lit_pixels(frame: &Frame, rows: std::ops::Range<u32>, cols: std::ops::Range<u32>) -> usize {
        rows.flat_map(|y| cols.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| pixel(frame, x, y) != [0, 0, 0])
            .count()
    }

    #[test]
    fn test_label_is_drawn_above_the_box() {
        let annotator = FrameAnnotator::with_font(&fixture_font()).unwrap();
        let mut frame = black_frame(200, 200);
        annotator.annotate(&mut frame, &[BoundingBox::new(60, 80, 80, 60)]);

        // outline starts at row 80; the label sits just above it
        assert!(lit_pixels(&frame, 50..78, 40..160) > 20);
        assert_eq!(lit_pixels(&frame, 0..40, 0..200), 0);
        assert_eq!(lit_pixels(&frame, 50..78, 0..30), 0);
        assert_eq!(lit_pixels(&frame, 50..78, 170..200), 0);
    }

    #[test]
    fn test_boxes_only_leaves_label_band_black() {
        let mut frame = black_frame(200, 200);
        FrameAnnotator::boxes_only().annotate(&mut frame, &[BoundingBox::new(60, 80, 80, 60)]);
        assert_eq!(lit_pixels(&frame, 0..78, 0..200), 0);
    }

    #[test]
    fn test_invalid_font_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(matches!(
            FrameAnnotator::with_font(&path),
            Err(FontLoadError::Invalid(_))
        ));
    }
}
