//! Speech through a Google-Translate-style TTS endpoint.
//!
//! Each distinct sentence is downloaded once as MP3 into the audio directory
//! and replayed from there afterwards.
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::shared::part_file::part_path;
use crate::speech::domain::audio_player::AudioPlayer;
use crate::speech::domain::speech_engine::SpeechEngine;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest file stem used for a cached sentence.
const MAX_STEM_LEN: usize = 120;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("failed to create audio directory {path}: {source}")]
    AudioDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("speech download failed for {text:?}: {source}")]
    Download {
        text: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("speech service returned no audio for {0:?}")]
    EmptyAudio(String),
    #[error("failed to write audio to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("playback of {path} failed: {message}")]
    Playback { path: PathBuf, message: String },
}

pub struct TranslateTtsEngine {
    endpoint: String,
    language: String,
    audio_dir: PathBuf,
    client: reqwest::blocking::Client,
    player: Box<dyn AudioPlayer>,
}

impl TranslateTtsEngine {
    pub fn new(
        endpoint: &str,
        language: &str,
        audio_dir: &Path,
        player: Box<dyn AudioPlayer>,
    ) -> Result<Self, SpeechError> {
        fs::create_dir_all(audio_dir).map_err(|source| SpeechError::AudioDir {
            path: audio_dir.to_path_buf(),
            source,
        })?;
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(SpeechError::Client)?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            language: language.to_string(),
            audio_dir: audio_dir.to_path_buf(),
            client,
            player,
        })
    }

    /// Cache location of the MP3 for `text`.
    pub fn audio_path(&self, text: &str) -> PathBuf {
        self.audio_dir
            .join(format!("{}_{}.mp3", self.language, file_stem(text)))
    }

    fn fetch(&self, text: &str, dest: &Path) -> Result<(), SpeechError> {
        let temp_path = part_path(dest);
        let result = self.fetch_inner(text, dest, &temp_path);

        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    fn fetch_inner(&self, text: &str, dest: &Path, temp_path: &Path) -> Result<(), SpeechError> {
        let textlen = text.chars().count().to_string();
        let download_error = |source| SpeechError::Download {
            text: text.to_string(),
            source,
        };

        let mut response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("total", "1"),
                ("idx", "0"),
                ("textlen", textlen.as_str()),
                ("client", "tw-ob"),
                ("q", text),
                ("tl", self.language.as_str()),
            ])
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(download_error)?;

        let write_error = |source| SpeechError::Write {
            path: temp_path.to_path_buf(),
            source,
        };
        let mut file = fs::File::create(temp_path).map_err(write_error)?;

        let mut written: u64 = 0;
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = response.read(&mut buf).map_err(write_error)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).map_err(write_error)?;
            written += n as u64;
        }
        file.flush().map_err(write_error)?;
        drop(file);

        if written == 0 {
            return Err(SpeechError::EmptyAudio(text.to_string()));
        }

        fs::rename(temp_path, dest).map_err(|source| SpeechError::Write {
            path: dest.to_path_buf(),
            source,
        })?;
        log::debug!("Cached speech for {text:?} at {}", dest.display());
        Ok(())
    }
}

impl SpeechEngine for TranslateTtsEngine {
    fn speak(&mut self, text: &str) -> Result<(), Box<dyn std::error::Error>> {
        let path = self.audio_path(text);
        if !path.exists() {
            self.fetch(text, &path)?;
        }
        self.player.play(&path).map_err(|e| SpeechError::Playback {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

/// File-system safe stem for a sentence: ASCII alphanumerics kept, runs of
/// anything else collapsed to `_`.
fn file_stem(text: &str) -> String {
    let mut stem = String::with_capacity(text.len().min(MAX_STEM_LEN));
    for c in text.chars() {
        if stem.len() >= MAX_STEM_LEN {
            break;
        }
        if c.is_ascii_alphanumeric() {
            stem.push(c);
        } else if !stem.ends_with('_') {
            stem.push('_');
        }
    }
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "speech".to_string()
    } else {
        stem.to_string()
    }
}
