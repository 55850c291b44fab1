use std::time::Instant;

use thiserror::Error;

use crate::annotation::frame_annotator::FrameAnnotator;
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use crate::pipeline::stop_signal::StopSignal;
use crate::shared::frame::Frame;
use crate::store::count_writer::CountPublisher;
use crate::video::domain::display::Display;
use crate::video::domain::video_source::VideoSource;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionLoopError {
    #[error("frame acquisition failed: {0}")]
    Acquisition(String),
}

/// Why the detection loop ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionExit {
    EndOfStream,
    /// The display asked to stop; the shared stop signal has been triggered.
    DisplayStop,
    Stopped,
}

/// Acquire → detect → publish → annotate → show, once per frame.
pub struct DetectionLoop {
    source: Box<dyn VideoSource>,
    detector: Box<dyn FaceDetector>,
    annotator: FrameAnnotator,
    display: Box<dyn Display>,
    publisher: CountPublisher,
    stop: StopSignal,
    logger: Box<dyn PipelineLogger>,
}

impl DetectionLoop {
    pub fn new(
        source: Box<dyn VideoSource>,
        detector: Box<dyn FaceDetector>,
        annotator: FrameAnnotator,
        display: Box<dyn Display>,
        publisher: CountPublisher,
        stop: StopSignal,
    ) -> Self {
        Self {
            source,
            detector,
            annotator,
            display,
            publisher,
            stop,
            logger: Box::new(LogPipelineLogger::default()),
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Runs until end of stream, a stop request or an acquisition failure.
    ///
    /// The source and display are released on every exit path. Dropping the
    /// loop afterwards drops the count publisher, which lets the writer
    /// finish.
    pub fn run(mut self) -> Result<DetectionExit, DetectionLoopError> {
        let result = self.run_cycles();

        self.source.close();
        self.display.close();
        self.logger.summary();

        // Failures are reported once, by whoever joins this loop.
        if let Ok(exit) = &result {
            log::info!("Detection loop ended: {exit:?}");
        }
        result
    }

    fn run_cycles(&mut self) -> Result<DetectionExit, DetectionLoopError> {
        let mut processed: usize = 0;

        loop {
            if self.stop.is_triggered() {
                return Ok(DetectionExit::Stopped);
            }

            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(DetectionExit::EndOfStream),
                Err(e) => return Err(DetectionLoopError::Acquisition(e.to_string())),
            };
            if frame.is_empty() {
                log::trace!("Skipping empty frame {}", frame.index());
                continue;
            }

            self.process(frame);
            processed += 1;
            self.logger.progress(processed);

            if self.display.poll_for_stop() {
                self.logger.info("Stop requested from display");
                self.stop.trigger();
                return Ok(DetectionExit::DisplayStop);
            }
        }
    }

    fn process(&mut self, mut frame: Frame) {
        let t0 = Instant::now();
        let boxes = match self.detector.detect(&frame) {
            Ok(boxes) => boxes,
            Err(e) => {
                log::warn!("Detection failed on frame {}: {e}", frame.index());
                return;
            }
        };
        self.logger.timing("detect", elapsed_ms(t0));

        self.publisher.publish(boxes.len());
        self.logger.metric("faces", boxes.len() as f64);

        let t1 = Instant::now();
        self.annotator.annotate(&mut frame, &boxes);
        self.logger.timing("annotate", elapsed_ms(t1));

        let t2 = Instant::now();
        if let Err(e) = self.display.show(&frame) {
            log::warn!("Failed to display frame {}: {e}", frame.index());
        }
        self.logger.timing("display", elapsed_ms(t2));
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
