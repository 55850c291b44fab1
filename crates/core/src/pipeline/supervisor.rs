use std::thread::JoinHandle;

use thiserror::Error;

use crate::pipeline::detection_loop::{DetectionExit, DetectionLoop, DetectionLoopError};
use crate::pipeline::narration_loop::{NarrationError, NarrationLoop, NarrationReport};
use crate::pipeline::stop_signal::StopSignal;
use crate::store::count_writer::{CountWriter, WriterReport};

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error(transparent)]
    Detection(#[from] DetectionLoopError),
    #[error(transparent)]
    Narration(#[from] NarrationError),
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} thread panicked")]
    Panicked(&'static str),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorReport {
    pub detection: Option<DetectionExit>,
    pub writer: WriterReport,
    pub narration: NarrationReport,
}

/// Runs the detection loop, the count writer and the narration loop on
/// their own threads and joins them.
///
/// A failed detection loop does not stop narration: announcements continue
/// from the last stored count until the stop signal fires. A failed
/// narration loop triggers the stop signal.
pub struct Supervisor {
    stop: StopSignal,
    exit_with_detection: bool,
}

impl Supervisor {
    pub fn new(stop: StopSignal) -> Self {
        Self {
            stop,
            exit_with_detection: false,
        }
    }

    /// Trigger the stop signal as soon as the detection loop ends.
    pub fn with_exit_with_detection(mut self, exit_with_detection: bool) -> Self {
        self.exit_with_detection = exit_with_detection;
        self
    }

    pub fn run(
        &self,
        detection: DetectionLoop,
        writer: CountWriter,
        narration: NarrationLoop,
    ) -> Result<SupervisorReport, SupervisorError> {
        let writer_handle = spawn("count-writer", move || writer.run())?;
        let detection_handle = match spawn("detection", move || detection.run()) {
            Ok(handle) => handle,
            Err(e) => {
                // Dropping the closure dropped the publisher, so the writer exits.
                let _ = writer_handle.join();
                return Err(e);
            }
        };
        let narration_stop = self.stop.clone();
        let narration_handle = spawn("narration", move || {
            let result = narration.run();
            if result.is_err() {
                narration_stop.trigger();
            }
            result
        });
        let narration_handle = match narration_handle {
            Ok(handle) => handle,
            Err(e) => {
                self.stop.trigger();
                let _ = detection_handle.join();
                let _ = writer_handle.join();
                return Err(e);
            }
        };

        self.join_all(detection_handle, writer_handle, narration_handle)
    }

    /// Joins detection first so its failure is reported while narration is
    /// still running.
    fn join_all(
        &self,
        detection_handle: JoinHandle<Result<DetectionExit, DetectionLoopError>>,
        writer_handle: JoinHandle<WriterReport>,
        narration_handle: JoinHandle<Result<NarrationReport, NarrationError>>,
    ) -> Result<SupervisorReport, SupervisorError> {
        fn set_if_none(slot: &mut Option<SupervisorError>, err: SupervisorError) {
            if slot.is_none() {
                *slot = Some(err);
            }
        }

        let mut first_error = None;
        let mut report = SupervisorReport::default();

        match detection_handle.join() {
            Ok(Ok(exit)) => report.detection = Some(exit),
            Ok(Err(e)) => {
                log::error!("{e}; narration continues with the last stored count");
                set_if_none(&mut first_error, e.into());
            }
            Err(_) => {
                log::error!("Detection thread panicked");
                set_if_none(&mut first_error, SupervisorError::Panicked("detection"));
            }
        }
        if self.exit_with_detection {
            self.stop.trigger();
        }

        match writer_handle.join() {
            Ok(writer) => report.writer = writer,
            Err(_) => set_if_none(&mut first_error, SupervisorError::Panicked("count-writer")),
        }

        match narration_handle.join() {
            Ok(Ok(narration)) => report.narration = narration,
            Ok(Err(e)) => {
                log::error!("{e}");
                set_if_none(&mut first_error, e.into());
            }
            Err(_) => set_if_none(&mut first_error, SupervisorError::Panicked("narration")),
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

fn spawn<T, F>(name: &'static str, f: F) -> Result<JoinHandle<T>, SupervisorError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|source| SupervisorError::Spawn { name, source })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::annotation::frame_annotator::FrameAnnotator;
    use crate::pipeline::detection_loop::test_support::*;
    use crate::pipeline::narration_loop::test_support::RecordingSpeech;
    use crate::pipeline::narration_loop::{NarrationMode, NarrationSettings};
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::store::count_writer::count_channel;
    use crate::store::domain::count_store::{CountStore, StoreError};
    use crate::store::infrastructure::memory_count_store::MemoryCountStore;

    struct BrokenStore;

    impl CountStore for BrokenStore {
        fn write(&self, _count: usize) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }

        fn read(&self) -> Result<Option<String>, StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    struct Harness {
        stop: StopSignal,
        speech: RecordingSpeech,
        store: Arc<dyn CountStore>,
    }

    impl Harness {
        fn new(store: Arc<dyn CountStore>) -> Self {
            Self {
                stop: StopSignal::new(),
                speech: RecordingSpeech::default(),
                store,
            }
        }

        fn spawn(
            &self,
            source: ScriptedSource,
            detector: ScriptedDetector,
            display: RecordingDisplay,
            exit_with_detection: bool,
        ) -> JoinHandle<Result<SupervisorReport, SupervisorError>> {
            let (publisher, writer) = count_channel(self.store.clone(), Duration::ZERO);
            let detection = DetectionLoop::new(
                Box::new(source),
                Box::new(detector),
                FrameAnnotator::boxes_only(),
                Box::new(display),
                publisher,
                self.stop.clone(),
            )
            .with_logger(Box::new(NullPipelineLogger));
            let narration = NarrationLoop::new(
                self.store.clone(),
                Box::new(self.speech.clone()),
                self.stop.clone(),
                NarrationSettings {
                    period: Duration::from_millis(5),
                    mode: NarrationMode::Repeat,
                    max_read_failures: 2,
                },
            );
            let supervisor =
                Supervisor::new(self.stop.clone()).with_exit_with_detection(exit_with_detection);
            std::thread::spawn(move || supervisor.run(detection, writer, narration))
        }
    }

    fn wait_until(cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_two_faces_are_announced() {
        let harness = Harness::new(Arc::new(MemoryCountStore::new()));
        let handle = harness.spawn(
            ScriptedSource::frames(1),
            ScriptedDetector::counts(&[2]),
            RecordingDisplay::default(),
            false,
        );

        assert!(wait_until(|| !harness.speech.spoken().is_empty()));
        harness.stop.trigger();
        let report = handle.join().unwrap().unwrap();

        assert_eq!(report.detection, Some(DetectionExit::EndOfStream));
        assert_eq!(report.writer.writes, 1);
        assert_eq!(harness.speech.spoken()[0], "Human face 2 count detected");
        assert_eq!(harness.store.read().unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_zero_after_faces_goes_silent() {
        let harness = Harness::new(Arc::new(MemoryCountStore::new()));
        let handle = harness.spawn(
            ScriptedSource::frames(2),
            ScriptedDetector::counts(&[3, 0]),
            RecordingDisplay::default(),
            false,
        );

        assert!(wait_until(|| harness.store.read().unwrap().as_deref() == Some("0")));
        // let any tick that read "3" finish
        std::thread::sleep(Duration::from_millis(30));
        let spoken_before = harness.speech.spoken().len();
        std::thread::sleep(Duration::from_millis(50));
        harness.stop.trigger();
        handle.join().unwrap().unwrap();

        assert_eq!(harness.speech.spoken().len(), spoken_before);
    }

    #[test]
    fn test_narration_outlives_acquisition_failure() {
        let harness = Harness::new(Arc::new(MemoryCountStore::new()));
        let source = ScriptedSource::new(vec![
            Step::Frame(black_frame(0)),
            Step::Fail("camera unplugged"),
        ]);
        let closed = source.closed.clone();
        let handle = harness.spawn(
            source,
            ScriptedDetector::counts(&[1]),
            RecordingDisplay::default(),
            false,
        );

        assert!(wait_until(|| closed.load(std::sync::atomic::Ordering::SeqCst)));
        let spoken_at_failure = harness.speech.spoken().len();
        assert!(wait_until(|| harness.speech.spoken().len() >= spoken_at_failure + 3));
        assert!(!handle.is_finished());

        harness.stop.trigger();
        let result = handle.join().unwrap();
        assert!(matches!(
            result,
            Err(SupervisorError::Detection(DetectionLoopError::Acquisition(_)))
        ));
    }

    #[test]
    fn test_exit_with_detection_ends_run() {
        let harness = Harness::new(Arc::new(MemoryCountStore::new()));
        let handle = harness.spawn(
            ScriptedSource::frames(3),
            ScriptedDetector::counts(&[1, 1, 1]),
            RecordingDisplay::default(),
            true,
        );

        let report = handle.join().unwrap().unwrap();
        assert_eq!(report.detection, Some(DetectionExit::EndOfStream));
        assert!(harness.stop.is_triggered());
    }

    #[test]
    fn test_display_stop_ends_run() {
        let harness = Harness::new(Arc::new(MemoryCountStore::new()));
        let display = RecordingDisplay {
            stop_after: Some(1),
            ..Default::default()
        };
        let handle = harness.spawn(
            ScriptedSource::frames(100),
            ScriptedDetector::counts(&[1]),
            display,
            false,
        );

        let report = handle.join().unwrap().unwrap();
        assert_eq!(report.detection, Some(DetectionExit::DisplayStop));
    }

    #[test]
    fn test_unreadable_store_stops_everything() {
        let harness = Harness::new(Arc::new(BrokenStore));
        let handle = harness.spawn(
            ScriptedSource::frames(0),
            ScriptedDetector::counts(&[]),
            RecordingDisplay::default(),
            false,
        );

        let result = handle.join().unwrap();
        assert!(matches!(
            result,
            Err(SupervisorError::Narration(NarrationError::StoreUnavailable { .. }))
        ));
        assert!(harness.stop.is_triggered());
    }
}
