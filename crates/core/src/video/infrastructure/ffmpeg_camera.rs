use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::shared::frame::Frame;
use crate::video::domain::video_source::VideoSource;

/// Captures frames from a camera (or any ffmpeg-readable URL) via
/// ffmpeg-next, converting each decoded picture to RGB24.
///
/// With an explicit input format (e.g. `v4l2`) the device is opened through
/// libavdevice; without one, `device` is handed to libavformat as-is, which
/// also covers video files and network streams.
pub struct FfmpegCamera {
    stream: Option<CameraStream>,
}

// Safety: FfmpegCamera is only driven from the detection thread.
// The raw pointers inside ffmpeg types are never shared across threads.
unsafe impl Send for FfmpegCamera {}

struct CameraStream {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<(Pixel, u32, u32, scaling::Context)>,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
}

impl FfmpegCamera {
    pub fn open(
        device: &str,
        input_format: Option<&str>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = match input_format {
            Some(name) => open_device(device, name)?,
            None => ffmpeg_next::format::input(&device)?,
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        log::info!(
            "Camera {device} opened ({}x{}, {})",
            decoder.width(),
            decoder.height(),
            input_format.unwrap_or("auto")
        );

        Ok(Self {
            stream: Some(CameraStream {
                ictx,
                decoder,
                scaler: None,
                video_stream_index,
                frame_index: 0,
                flushing: false,
            }),
        })
    }
}

impl VideoSource for FfmpegCamera {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let Some(stream) = self.stream.as_mut() else {
            return Err("FfmpegCamera: device is closed".into());
        };
        stream.next_frame()
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("Camera closed");
        }
    }
}

impl CameraStream {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        loop {
            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
            if self.flushing {
                return Ok(None);
            }

            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => {
                    let _ = self.decoder.send_eof();
                    self.flushing = true;
                    continue;
                }
                Err(e) => return Err(Box::new(e)),
            }

            if packet.stream() != self.video_stream_index {
                continue;
            }

            // A packet the decoder rejects is a damaged frame, not a dead device.
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable packet: {e}");
                let index = self.frame_index;
                self.frame_index += 1;
                return Ok(Some(Frame::empty(index)));
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let index = self.frame_index;
        self.frame_index += 1;

        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Ok(Some(Frame::empty(index)));
        }

        let mut rgb_frame = Video::empty();
        self.scaler_for(&decoded)?.run(&decoded, &mut rgb_frame)?;

        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        Ok(Some(Frame::new(pixels, width, height, 3, index)))
    }

    /// Returns a scaler matching the decoded picture, rebuilding it when the
    /// camera switches pixel format or resolution mid-stream.
    fn scaler_for(&mut self, decoded: &Video) -> Result<&mut scaling::Context, ffmpeg_next::Error> {
        let key = (decoded.format(), decoded.width(), decoded.height());
        let stale = !matches!(
            &self.scaler,
            Some((format, width, height, _)) if (*format, *width, *height) == key
        );
        if stale {
            let context = scaling::Context::get(
                key.0,
                key.1,
                key.2,
                Pixel::RGB24,
                key.1,
                key.2,
                scaling::Flags::BILINEAR,
            )?;
            self.scaler = Some((key.0, key.1, key.2, context));
        }
        match self.scaler.as_mut() {
            Some((_, _, _, context)) => Ok(context),
            None => Err(ffmpeg_next::Error::Bug),
        }
    }
}

fn open_device(
    device: &str,
    format_name: &str,
) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == format_name)
        .ok_or_else(|| format!("Capture input format '{format_name}' is not available"))?;

    match ffmpeg_next::format::open_with(&device, &format, ffmpeg_next::Dictionary::new())? {
        ffmpeg_next::format::context::Context::Input(ictx) => Ok(ictx),
        ffmpeg_next::format::context::Context::Output(_) => {
            Err(format!("{format_name} opened {device} as an output").into())
        }
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// stripping the per-row stride padding.
fn extract_rgb_pixels(rgb_frame: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
