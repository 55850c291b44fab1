use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::stop_signal::StopSignal;
use crate::shared::constants::{announcement, ZERO_COUNT};
use crate::speech::domain::speech_engine::SpeechEngine;
use crate::store::domain::count_store::CountStore;

pub const DEFAULT_NARRATION_PERIOD: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_READ_FAILURES: u32 = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NarrationError {
    #[error("count store unavailable after {failures} consecutive read failures: {last_error}")]
    StoreUnavailable { failures: u32, last_error: String },
}

/// When a non-zero count is announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NarrationMode {
    /// Every tick while the count is non-zero.
    #[default]
    Repeat,
    /// Only when the stored text differs from the last announcement.
    OnChange,
}

impl std::str::FromStr for NarrationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "repeat" => Ok(Self::Repeat),
            "on-change" => Ok(Self::OnChange),
            other => Err(format!(
                "unknown narration mode '{other}' (expected repeat or on-change)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NarrationSettings {
    pub period: Duration,
    pub mode: NarrationMode,
    pub max_read_failures: u32,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self {
            period: DEFAULT_NARRATION_PERIOD,
            mode: NarrationMode::default(),
            max_read_failures: DEFAULT_MAX_READ_FAILURES,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NarrationReport {
    pub ticks: usize,
    pub announcements: usize,
}

/// Periodically reads the stored count and announces it while non-zero.
pub struct NarrationLoop {
    store: Arc<dyn CountStore>,
    speech: Box<dyn SpeechEngine>,
    stop: StopSignal,
    settings: NarrationSettings,
    last_announced: Option<String>,
    consecutive_failures: u32,
    report: NarrationReport,
}

impl NarrationLoop {
    pub fn new(
        store: Arc<dyn CountStore>,
        speech: Box<dyn SpeechEngine>,
        stop: StopSignal,
        settings: NarrationSettings,
    ) -> Self {
        Self {
            store,
            speech,
            stop,
            settings,
            last_announced: None,
            consecutive_failures: 0,
            report: NarrationReport::default(),
        }
    }

    /// Ticks every `period` until the stop signal fires.
    ///
    /// Ticks missed while speech is playing are coalesced into one.
    pub fn run(mut self) -> Result<NarrationReport, NarrationError> {
        let ticker = crossbeam_channel::tick(self.settings.period);
        let stop_rx = self.stop.receiver().clone();
        log::info!(
            "Narration started (every {:?}, {:?} mode)",
            self.settings.period,
            self.settings.mode
        );

        loop {
            crossbeam_channel::select! {
                recv(stop_rx) -> _ => break,
                recv(ticker) -> _ => {
                    if self.stop.is_triggered() {
                        break;
                    }
                    self.tick()?;
                }
            }
        }

        log::info!(
            "Narration stopped after {} ticks, {} announcements",
            self.report.ticks,
            self.report.announcements
        );
        Ok(self.report)
    }

    /// One narration step. Returns the sentence spoken, if any.
    pub fn tick(&mut self) -> Result<Option<String>, NarrationError> {
        self.report.ticks += 1;

        let text = match self.store.read() {
            Ok(Some(text)) => {
                self.consecutive_failures = 0;
                text
            }
            Ok(None) => {
                self.consecutive_failures = 0;
                return Ok(None);
            }
            Err(e) => {
                self.consecutive_failures += 1;
                log::warn!(
                    "Failed to read face count ({}/{}): {e}",
                    self.consecutive_failures,
                    self.settings.max_read_failures
                );
                if self.consecutive_failures >= self.settings.max_read_failures.max(1) {
                    return Err(NarrationError::StoreUnavailable {
                        failures: self.consecutive_failures,
                        last_error: e.to_string(),
                    });
                }
                return Ok(None);
            }
        };

        if text.eq_ignore_ascii_case(ZERO_COUNT) {
            self.last_announced = None;
            return Ok(None);
        }
        if self.settings.mode == NarrationMode::OnChange
            && self.last_announced.as_deref() == Some(text.as_str())
        {
            return Ok(None);
        }

        let sentence = announcement(&text);
        match self.speech.speak(&sentence) {
            Ok(()) => {
                self.report.announcements += 1;
                self.last_announced = Some(text);
                Ok(Some(sentence))
            }
            Err(e) => {
                log::warn!("Speech synthesis failed for {sentence:?}: {e}");
                Ok(None)
            }
        }
    }
}
