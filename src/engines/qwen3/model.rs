use serde::Serialize;

use super::speakers::{Language, Speaker};

/// Hugging Face identifier of the CustomVoice checkpoint.
pub const MODEL_ID: &str = "Qwen/Qwen3-TTS-12Hz-1.7B-CustomVoice";

#[derive(thiserror::Error, Debug)]
pub enum Qwen3Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Python interpreter '{0}' not found. Install Python 3 with the qwen-tts package.")]
    PythonNotFound(String),
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    #[error("Engine unavailable after failed load: {0}")]
    EngineUnavailable(String),
    /// Raised by the model itself; the message is passed through untouched.
    #[error("{0}")]
    Generation(String),
    #[error("Malformed response from model worker: {0}")]
    Protocol(String),
    #[error("Model returned no audio")]
    NoAudio,
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),
    #[error("Unknown speaker '{0}'")]
    UnknownSpeaker(String),
    #[error("Unknown language '{0}'")]
    UnknownLanguage(String),
    #[error("Model lock poisoned by an earlier failed generation")]
    Poisoned,
}

/// Arguments of one CustomVoice generation call.
///
/// Only enumeration members can be expressed here; `language` and `instruct`
/// are left out of the serialized call when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomVoiceRequest {
    pub text: String,
    pub speaker: Speaker,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instruct: Option<String>,
}

/// Raw model output: one or more candidate waveforms sharing a sample rate.
#[derive(Debug, Clone, Default)]
pub struct GeneratedSpeech {
    pub wavs: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

/// A loaded speech model able to render CustomVoice requests.
///
/// Implementations are called under the engine's lock, one request at a time.
pub trait SpeechModel: Send {
    fn generate_custom_voice(
        &mut self,
        request: &CustomVoiceRequest,
    ) -> Result<GeneratedSpeech, Qwen3Error>;
}
