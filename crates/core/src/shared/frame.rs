use image::RgbImage;
use ndarray::ArrayView3;

/// A single camera frame: contiguous RGB bytes in row-major order.
///
/// Owned by the detection loop for exactly one cycle. A frame without
/// pixel data is an *empty* frame and is skipped by the loop.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// A frame the source produced without any decodable pixels.
    pub fn empty(index: usize) -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            channels: 3,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.width == 0 || self.height == 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Lends the pixels to `f` as an [`RgbImage`] without copying.
    ///
    /// Returns `None` when the frame is not a well-formed RGB frame.
    pub fn with_rgb_image<R>(&mut self, f: impl FnOnce(&mut RgbImage) -> R) -> Option<R> {
        let expected = (self.width as usize) * (self.height as usize) * 3;
        if self.channels != 3 || self.data.len() != expected || expected == 0 {
            return None;
        }
        let data = std::mem::take(&mut self.data);
        let mut image = RgbImage::from_raw(self.width, self.height, data)?;
        let result = f(&mut image);
        self.data = image.into_raw();
        Some(result)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
