use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use facewatch_core::annotation::frame_annotator::FrameAnnotator;
use facewatch_core::config::Config;
use facewatch_core::detection::infrastructure::onnx_blazeface_detector::OnnxBlazefaceDetector;
use facewatch_core::pipeline::detection_loop::DetectionLoop;
use facewatch_core::pipeline::narration_loop::{NarrationLoop, NarrationMode};
use facewatch_core::pipeline::stop_signal::StopSignal;
use facewatch_core::pipeline::supervisor::Supervisor;
use facewatch_core::speech::domain::speech_engine::SpeechEngine;
use facewatch_core::speech::infrastructure::log_speech_engine::LogSpeechEngine;
use facewatch_core::speech::infrastructure::rodio_player::RodioPlayer;
use facewatch_core::speech::infrastructure::translate_tts_engine::TranslateTtsEngine;
use facewatch_core::store::count_writer::count_channel;
use facewatch_core::store::domain::count_store::CountStore;
use facewatch_core::store::infrastructure::file_count_store::FileCountStore;
use facewatch_core::store::infrastructure::memory_count_store::MemoryCountStore;
use facewatch_core::video::domain::display::Display;
use facewatch_core::video::infrastructure::ffmpeg_camera::FfmpegCamera;
use facewatch_core::video::infrastructure::headless_display::HeadlessDisplay;
use facewatch_core::video::infrastructure::snapshot_display::SnapshotDisplay;

/// Forced exit if shutdown hangs after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Watches a camera, counts faces and announces the count out loud.
#[derive(Parser)]
#[command(name = "facewatch")]
struct Cli {
    /// JSON config file (default: platform config dir, if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to this file and exit.
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Camera device or any ffmpeg-readable URL/file.
    #[arg(long)]
    device: Option<String>,

    /// Capture input format (e.g. v4l2, avfoundation, dshow).
    #[arg(long)]
    input_format: Option<String>,

    /// Open the device without a capture input format.
    #[arg(long, conflicts_with = "input_format")]
    no_input_format: bool,

    /// BlazeFace ONNX model file.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Save the latest annotated frame to this image file.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// TrueType font for the face labels.
    #[arg(long)]
    font: Option<PathBuf>,

    /// File holding the latest face count.
    #[arg(long)]
    count_file: Option<PathBuf>,

    /// Keep the face count in memory instead of a file.
    #[arg(long, conflicts_with = "count_file")]
    in_memory: bool,

    /// Delay before each count write, in milliseconds.
    #[arg(long)]
    settle_delay_ms: Option<u64>,

    /// Directory for downloaded speech audio.
    #[arg(long)]
    audio_dir: Option<PathBuf>,

    /// Speech language code.
    #[arg(long)]
    language: Option<String>,

    /// Log announcements instead of playing them.
    #[arg(long)]
    mute: bool,

    /// Narration interval in milliseconds.
    #[arg(long)]
    period_ms: Option<u64>,

    /// Narration mode: repeat or on-change.
    #[arg(long)]
    mode: Option<NarrationMode>,

    /// Consecutive count read failures tolerated before giving up.
    #[arg(long)]
    max_read_failures: Option<u32>,

    /// Stop narrating as soon as the camera stops.
    #[arg(long)]
    exit_with_detection: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = effective_config(&cli)?;
    config.validate()?;

    if let Some(path) = &cli.save_config {
        config.save(path)?;
        log::info!("Configuration written to {}", path.display());
        return Ok(());
    }

    let detector = OnnxBlazefaceDetector::new(&config.model_path, config.confidence)?;
    let camera = FfmpegCamera::open(&config.device, config.input_format.as_deref())?;
    let display: Box<dyn Display> = match &config.snapshot_path {
        Some(path) => Box::new(SnapshotDisplay::new(&config.window_title, path)),
        None => Box::new(HeadlessDisplay::new()),
    };
    let annotator = FrameAnnotator::load(&config.font_path);

    let store: Arc<dyn CountStore> = if cli.in_memory {
        Arc::new(MemoryCountStore::new())
    } else {
        let file_store = FileCountStore::new(&config.count_path);
        log::info!("Face count file: {}", file_store.path().display());
        Arc::new(file_store)
    };
    let speech = build_speech(&config)?;

    let stop = StopSignal::new();
    install_interrupt_handler(stop.clone())?;

    let (publisher, writer) = count_channel(store.clone(), config.settle_delay());
    let detection = DetectionLoop::new(
        Box::new(camera),
        Box::new(detector),
        annotator,
        display,
        publisher,
        stop.clone(),
    );
    let narration = NarrationLoop::new(store, speech, stop.clone(), config.narration_settings());

    let report = Supervisor::new(stop)
        .with_exit_with_detection(config.exit_with_detection)
        .run(detection, writer, narration)?;

    log::info!(
        "Done: {} counts written, {} announcements",
        report.writer.writes,
        report.narration.announcements
    );
    Ok(())
}

/// Config file values overlaid with any flags given on the command line.
fn effective_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::load(cli.config.as_deref())?;

    if let Some(device) = &cli.device {
        config.device = device.clone();
    }
    if let Some(format) = &cli.input_format {
        config.input_format = Some(format.clone());
    }
    if cli.no_input_format {
        config.input_format = None;
    }
    if let Some(model) = &cli.model {
        config.model_path = model.clone();
    }
    if let Some(confidence) = cli.confidence {
        config.confidence = confidence;
    }
    if let Some(snapshot) = &cli.snapshot {
        config.snapshot_path = Some(snapshot.clone());
    }
    if let Some(font) = &cli.font {
        config.font_path = font.clone();
    }
    if let Some(count_file) = &cli.count_file {
        config.count_path = count_file.clone();
    }
    if let Some(delay) = cli.settle_delay_ms {
        config.settle_delay_ms = delay;
    }
    if let Some(audio_dir) = &cli.audio_dir {
        config.audio_dir = audio_dir.clone();
    }
    if let Some(language) = &cli.language {
        config.language = language.clone();
    }
    if cli.mute {
        config.mute = true;
    }
    if let Some(period) = cli.period_ms {
        config.narration_period_ms = period;
    }
    if let Some(mode) = cli.mode {
        config.narration_mode = mode;
    }
    if let Some(max) = cli.max_read_failures {
        config.max_read_failures = max;
    }
    if cli.exit_with_detection {
        config.exit_with_detection = true;
    }
    Ok(config)
}

fn build_speech(config: &Config) -> Result<Box<dyn SpeechEngine>, Box<dyn std::error::Error>> {
    if config.mute {
        log::info!("Speech muted; announcements are logged only");
        return Ok(Box::new(LogSpeechEngine::new()));
    }
    Ok(Box::new(TranslateTtsEngine::new(
        &config.tts_endpoint,
        &config.language,
        &config.audio_dir,
        Box::new(RodioPlayer::new()),
    )?))
}

fn install_interrupt_handler(stop: StopSignal) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        if stop.is_triggered() {
            return;
        }
        log::info!("Interrupt received, shutting down...");
        stop.trigger();
        std::thread::spawn(|| {
            std::thread::sleep(SHUTDOWN_GRACE);
            log::warn!("Shutdown timed out, forcing exit");
            process::exit(1);
        });
    })
}
