//! Application-wide settings.

use serde::{Deserialize, Serialize};

/// How ticket calls are voiced on the display.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AudioMode {
    /// Speech synthesis
    #[default]
    #[serde(rename = "TTS")]
    Tts,
    /// Pre-recorded MP3 fragments
    #[serde(rename = "FILES")]
    Files,
}

/// Global configuration, a singleton inside the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    pub center_name: String,
    /// Scrolling ticker text on the display
    pub news_ticker: String,
    pub audio_mode: AudioMode,
    /// Speech rate, 0.5 to 2.0. Stored `null` (a non-finite rate) reads as 1.0.
    #[serde(deserialize_with = "rate_or_default")]
    pub speech_rate: f64,
    pub admin_password: String,
    /// Directory holding the fragment MP3 files
    pub audio_base_path: String,
    /// Background media for the display
    pub video_url: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            center_name: "المركز الطبي التخصصي".into(),
            news_ticker: "أهلاً وسهلاً بكم في مركزنا الطبي.. نتمنى لكم دوام الصحة والعافية.. يرجى الانتظار في الصالة حتى يتم النداء على رقمكم..".into(),
            audio_mode: AudioMode::Tts,
            speech_rate: 1.0,
            admin_password: "admin".into(),
            audio_base_path: "/assets/audio/".into(),
            video_url: "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4".into(),
        }
    }
}

impl AppSettings {
    pub const MIN_SPEECH_RATE: f64 = 0.5;
    pub const MAX_SPEECH_RATE: f64 = 2.0;

    /// Base path guaranteed to end in a path separator.
    pub fn normalized_base_path(&self) -> String {
        if self.audio_base_path.ends_with('/') {
            self.audio_base_path.clone()
        } else {
            format!("{}/", self.audio_base_path)
        }
    }

    /// Speech rate clamped to the supported range.
    pub fn clamped_speech_rate(&self) -> f64 {
        if self.speech_rate.is_nan() {
            return 1.0;
        }
        self.speech_rate
            .clamp(Self::MIN_SPEECH_RATE, Self::MAX_SPEECH_RATE)
    }
}

/// Partial settings update; present fields overwrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub center_name: Option<String>,
    pub news_ticker: Option<String>,
    pub audio_mode: Option<AudioMode>,
    pub speech_rate: Option<f64>,
    pub admin_password: Option<String>,
    pub audio_base_path: Option<String>,
    pub video_url: Option<String>,
}

impl SettingsPatch {
    /// Merge this patch into existing settings.
    pub fn apply(self, settings: &mut AppSettings) {
        if let Some(v) = self.center_name {
            settings.center_name = v;
        }
        if let Some(v) = self.news_ticker {
            settings.news_ticker = v;
        }
        if let Some(v) = self.audio_mode {
            settings.audio_mode = v;
        }
        if let Some(v) = self.speech_rate {
            // Non-finite rates serialize as null and would poison the document
            if v.is_finite() {
                settings.speech_rate = v.clamp(AppSettings::MIN_SPEECH_RATE, AppSettings::MAX_SPEECH_RATE);
            } else {
                tracing::warn!(rate = v, "ignoring non-finite speech rate");
            }
        }
        if let Some(v) = self.admin_password {
            settings.admin_password = v;
        }
        if let Some(v) = self.audio_base_path {
            settings.audio_base_path = v;
        }
        if let Some(v) = self.video_url {
            settings.video_url = v;
        }
    }
}

fn rate_or_default<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?
        .filter(|r| r.is_finite())
        .unwrap_or(1.0))
}

impl From<AppSettings> for SettingsPatch {
    fn from(s: AppSettings) -> Self {
        Self {
            center_name: Some(s.center_name),
            news_ticker: Some(s.news_ticker),
            audio_mode: Some(s.audio_mode),
            speech_rate: Some(s.speech_rate),
            admin_password: Some(s.admin_password),
            audio_base_path: Some(s.audio_base_path),
            video_url: Some(s.video_url),
        }
    }
}
