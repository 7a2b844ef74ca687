//! Chime, settle, then speak or play.
//!
//! Every announcement follows the same sequence. Nothing here returns an
//! error to the caller: a blocked chime, a missing fragment file or an absent
//! speech engine degrade to silence and the sequence carries on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nidaa_core::models::{Announcement, AnnouncementKind, AppSettings, AudioMode, Document};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::fragments::{fragment_url, ticket_playlist, RESET};
use crate::phrases::{
    ticket_speech, CLINIC_FALLBACK_NAME, RESET_SPEECH, SPEECH_LANG, SPEECH_PITCH,
    VOICE_LANG_MATCH,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Playback blocked: {0}")]
    Blocked(String),

    #[error("Media not found: {0}")]
    NotFound(String),

    #[error("Output device unavailable: {0}")]
    Device(String),

    #[error("Speech synthesis unavailable")]
    SpeechUnavailable,
}

pub type PlaybackResult<T> = Result<T, PlaybackError>;

/// Plays audio to completion.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Play the announcement chime.
    async fn play_chime(&self, chime: &Chime) -> PlaybackResult<()>;

    /// Play a media URL, resolving when it ends.
    async fn play(&self, url: &str) -> PlaybackResult<()>;
}

/// An installed speech voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

/// One request to the speech engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub lang: String,
    pub rate: f64,
    pub pitch: f64,
    pub voice: Option<Voice>,
}

/// Speech engine. `speak` queues and returns; at most one utterance should be
/// audible, so callers cancel first.
pub trait SpeechSynthesizer: Send + Sync {
    fn voices(&self) -> Vec<Voice>;

    fn cancel(&self);

    fn speak(&self, utterance: Utterance) -> PlaybackResult<()>;
}

/// First voice whose language tag mentions Arabic.
pub fn pick_voice(voices: &[Voice]) -> Option<Voice> {
    voices
        .iter()
        .find(|v| v.lang.contains(VOICE_LANG_MATCH))
        .cloned()
}

/// Attention sound played before every announcement.
#[derive(Debug, Clone, PartialEq)]
pub struct Chime {
    pub url: String,
    pub volume: f32,
}

impl Default for Chime {
    fn default() -> Self {
        Self {
            url: "https://cdn.freesound.org/previews/265/265549_4486188-lq.mp3".to_string(),
            volume: 0.6,
        }
    }
}

/// Settling delays between the chime and the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTiming {
    pub ticket_delay: Duration,
    pub default_delay: Duration,
}

impl Default for PipelineTiming {
    fn default() -> Self {
        Self {
            ticket_delay: Duration::from_millis(800),
            default_delay: Duration::from_millis(500),
        }
    }
}

/// Renders announcements through injected audio and speech backends.
///
/// Overlapping announcements are not serialized; only speech preempts itself.
pub struct AnnouncementPipeline {
    audio: Arc<dyn AudioOutput>,
    speech: Arc<dyn SpeechSynthesizer>,
    timing: PipelineTiming,
    chime: Chime,
}

impl AnnouncementPipeline {
    pub fn new(audio: Arc<dyn AudioOutput>, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            audio,
            speech,
            timing: PipelineTiming::default(),
            chime: Chime::default(),
        }
    }

    pub fn with_timing(mut self, timing: PipelineTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_chime(mut self, chime: Chime) -> Self {
        self.chime = chime;
        self
    }

    pub fn timing(&self) -> PipelineTiming {
        self.timing
    }

    /// Call a ticket number to a clinic.
    pub async fn announce_ticket(&self, number: u32, clinic_name: &str, settings: &AppSettings) {
        self.chime_then_settle(self.timing.ticket_delay).await;

        match settings.audio_mode {
            AudioMode::Tts => self.speak(&ticket_speech(number, clinic_name), settings),
            AudioMode::Files => {
                let playlist = ticket_playlist(number, clinic_name);
                self.play_sequence(&playlist, settings).await;
            }
        }
    }

    /// Speak free text. There is no fragment rendition of arbitrary text.
    pub async fn announce_custom(&self, text: &str, settings: &AppSettings) {
        self.chime_then_settle(self.timing.default_delay).await;
        self.speak(text, settings);
    }

    /// Play a captured clip.
    pub async fn announce_recording(&self, audio_blob_url: &str) {
        self.chime_then_settle(self.timing.default_delay).await;
        if let Err(e) = self.audio.play(audio_blob_url).await {
            warn!(error = %e, "recording playback failed");
        }
    }

    pub async fn announce_reset(&self, settings: &AppSettings) {
        self.chime_then_settle(self.timing.default_delay).await;

        match settings.audio_mode {
            AudioMode::Tts => self.speak(RESET_SPEECH, settings),
            AudioMode::Files => self.play_sequence(&[RESET.to_string()], settings).await,
        }
    }

    /// Render an announcement using the settings and clinic names of `doc`.
    ///
    /// Custom text and recordings with an empty payload are skipped.
    pub async fn dispatch(&self, announcement: &Announcement, doc: &Document) {
        let settings = &doc.settings;
        match &announcement.kind {
            AnnouncementKind::Ticket {
                clinic_id,
                ticket_number,
            } => {
                let name = doc
                    .clinic(clinic_id)
                    .map(|c| c.name.as_str())
                    .unwrap_or(CLINIC_FALLBACK_NAME);
                self.announce_ticket(*ticket_number, name, settings).await;
            }
            AnnouncementKind::Custom { text } if !text.is_empty() => {
                self.announce_custom(text, settings).await;
            }
            AnnouncementKind::Recording { audio_blob_url } if !audio_blob_url.is_empty() => {
                self.announce_recording(audio_blob_url).await;
            }
            AnnouncementKind::Reset { .. } => self.announce_reset(settings).await,
            _ => debug!(kind = announcement.type_name(), "empty announcement skipped"),
        }
    }

    /// Run [`dispatch`](Self::dispatch) in the background.
    pub fn spawn(
        self: &Arc<Self>,
        handle: &Handle,
        announcement: Announcement,
        doc: Document,
    ) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        handle.spawn(async move { pipeline.dispatch(&announcement, &doc).await })
    }

    async fn chime_then_settle(&self, delay: Duration) {
        if let Err(e) = self.audio.play_chime(&self.chime).await {
            debug!(error = %e, "chime failed, continuing");
        }
        tokio::time::sleep(delay).await;
    }

    fn speak(&self, text: &str, settings: &AppSettings) {
        self.speech.cancel();
        let utterance = Utterance {
            text: text.to_string(),
            lang: SPEECH_LANG.to_string(),
            rate: settings.clamped_speech_rate(),
            pitch: SPEECH_PITCH,
            voice: pick_voice(&self.speech.voices()),
        };
        if let Err(e) = self.speech.speak(utterance) {
            warn!(error = %e, "speech failed");
        }
    }

    async fn play_sequence(&self, keys: &[String], settings: &AppSettings) {
        let base = settings.normalized_base_path();
        debug!(base = %base, fragments = keys.len(), "playing fragment sequence");
        for key in keys {
            let url = fragment_url(&base, key);
            if let Err(e) = self.audio.play(&url).await {
                warn!(url = %url, error = %e, "fragment skipped");
            }
        }
    }
}
