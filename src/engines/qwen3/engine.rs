use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use derive_builder::Builder;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::{round_millis, SynthesisResult};

use super::bridge::PythonBridge;
use super::model::{CustomVoiceRequest, Qwen3Error, SpeechModel, MODEL_ID};
use super::speakers::{
    language_names, speaker_descriptions, Language, Speaker, DEFAULT_LANGUAGE, DEFAULT_SPEAKER,
};

/// Parameters for configuring Qwen3-TTS model loading.
#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct Qwen3ModelParams {
    /// Hugging Face model identifier or local checkpoint directory.
    #[builder(setter(into))]
    pub model_id: String,
    /// Device placement passed as `device_map` (e.g. `"cuda:0"`, `"cpu"`).
    #[builder(setter(into))]
    pub device_map: String,
    /// Name of a `torch` dtype attribute (e.g. `"bfloat16"`, `"float16"`).
    #[builder(setter(into))]
    pub dtype: String,
    /// Attention backend (e.g. `"flash_attention_2"`, `"sdpa"`, `"eager"`).
    #[builder(setter(into))]
    pub attn_implementation: String,
    /// Python interpreter with `qwen-tts` installed.
    #[builder(setter(into))]
    pub python: String,
    /// Run this worker script instead of the embedded one.
    #[builder(setter(into, strip_option))]
    pub bridge_script: Option<PathBuf>,
    /// Reject unknown speakers and languages instead of falling back to defaults.
    pub strict: bool,
}

impl Default for Qwen3ModelParams {
    fn default() -> Self {
        Self {
            model_id: MODEL_ID.to_string(),
            device_map: "cuda:0".to_string(),
            dtype: "bfloat16".to_string(),
            attn_implementation: "flash_attention_2".to_string(),
            python: "python3".to_string(),
            bridge_script: None,
            strict: false,
        }
    }
}

impl Qwen3ModelParams {
    /// Defaults overridden by `QWEN_TTS_*` environment variables.
    ///
    /// Unset or empty variables keep the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            model_id: get("QWEN_TTS_MODEL_ID").unwrap_or(defaults.model_id),
            device_map: get("QWEN_TTS_DEVICE_MAP").unwrap_or(defaults.device_map),
            dtype: get("QWEN_TTS_DTYPE").unwrap_or(defaults.dtype),
            attn_implementation: get("QWEN_TTS_ATTN_IMPL").unwrap_or(defaults.attn_implementation),
            python: get("QWEN_TTS_PYTHON").unwrap_or(defaults.python),
            bridge_script: get("QWEN_TTS_BRIDGE_SCRIPT").map(PathBuf::from),
            strict: get("QWEN_TTS_STRICT")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.strict),
        }
    }
}

/// Result of one synthesis, in the shape returned to job callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOutput {
    /// Base64 of a mono 16-bit PCM WAV container
    pub audio_base64: String,
    pub sample_rate: u32,
    /// Sample count / sample rate, rounded to three decimals
    pub duration_seconds: f64,
}

/// Qwen3-TTS CustomVoice engine.
///
/// Wraps a loaded [`SpeechModel`], normalizes speaker and language against the
/// fixed enumerations, and encodes the first returned waveform as base64 WAV.
/// Generation calls are serialized through an internal lock.
pub struct TtsEngine<M = PythonBridge> {
    model: Mutex<M>,
    strict: bool,
}

impl TtsEngine<PythonBridge> {
    /// Start the Python worker and load the model. Blocks until loading completes.
    pub fn load(params: &Qwen3ModelParams) -> Result<Self, Qwen3Error> {
        log::info!(
            "Loading {} (device_map={}, dtype={}, attn={})",
            params.model_id,
            params.device_map,
            params.dtype,
            params.attn_implementation
        );
        let bridge = PythonBridge::spawn(params)?;
        log::info!("Model loaded: {}", params.model_id);
        Ok(Self::new(bridge).with_strict_validation(params.strict))
    }
}

impl<M: SpeechModel> TtsEngine<M> {
    pub fn new(model: M) -> Self {
        Self {
            model: Mutex::new(model),
            strict: false,
        }
    }

    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Map a speaker id onto the enumeration, falling back to `Ryan` unless strict.
    pub fn resolve_speaker(&self, speaker: &str) -> Result<Speaker, Qwen3Error> {
        match speaker.parse::<Speaker>() {
            Ok(s) => Ok(s),
            Err(err) if self.strict => Err(err),
            Err(_) => {
                log::warn!("Unknown speaker {speaker:?}, using {DEFAULT_SPEAKER}");
                Ok(DEFAULT_SPEAKER)
            }
        }
    }

    /// Map a language name onto the enumeration, falling back to `Auto` unless strict.
    pub fn resolve_language(&self, language: &str) -> Result<Language, Qwen3Error> {
        match language.parse::<Language>() {
            Ok(l) => Ok(l),
            Err(err) if self.strict => Err(err),
            Err(_) => {
                log::warn!("Unknown language {language:?}, using {DEFAULT_LANGUAGE}");
                Ok(DEFAULT_LANGUAGE)
            }
        }
    }

    /// Build the exact call forwarded to the model.
    pub fn build_request(
        &self,
        text: &str,
        speaker: &str,
        instruction: Option<&str>,
        language: &str,
    ) -> Result<CustomVoiceRequest, Qwen3Error> {
        Ok(CustomVoiceRequest {
            text: text.to_string(),
            speaker: self.resolve_speaker(speaker)?,
            language: self.resolve_language(language)?.for_model(),
            instruct: instruction
                .filter(|i| !i.is_empty())
                .map(str::to_string),
        })
    }

    /// Synthesize `text` and return the first waveform the model produced.
    ///
    /// Faults raised by the model are returned unchanged.
    pub fn synthesize(
        &self,
        text: &str,
        speaker: &str,
        instruction: Option<&str>,
        language: &str,
    ) -> Result<SynthesisResult, Qwen3Error> {
        let request = self.build_request(text, speaker, instruction, language)?;
        log::debug!(
            "Generating {} chars with speaker={} language={:?} instruct={}",
            request.text.chars().count(),
            request.speaker,
            request.language,
            request.instruct.is_some()
        );

        let speech = {
            let mut model = self.model.lock().map_err(|_| Qwen3Error::Poisoned)?;
            model.generate_custom_voice(&request)?
        };

        if speech.sample_rate == 0 {
            return Err(Qwen3Error::InvalidSampleRate(speech.sample_rate));
        }
        let samples = speech.wavs.into_iter().next().ok_or(Qwen3Error::NoAudio)?;
        Ok(SynthesisResult {
            samples,
            sample_rate: speech.sample_rate,
        })
    }

    /// Synthesize `text` and return base64 WAV with its sample rate and duration.
    pub fn generate(
        &self,
        text: &str,
        speaker: &str,
        instruction: Option<&str>,
        language: &str,
    ) -> Result<SynthesisOutput, Qwen3Error> {
        let result = self.synthesize(text, speaker, instruction, language)?;
        Ok(SynthesisOutput {
            audio_base64: result.to_base64_wav()?,
            sample_rate: result.sample_rate,
            duration_seconds: round_millis(result.duration_secs()),
        })
    }

    /// Available speakers with descriptions.
    pub fn speakers(&self) -> BTreeMap<String, String> {
        speaker_descriptions()
    }

    /// Available languages, sorted.
    pub fn languages(&self) -> Vec<&'static str> {
        language_names()
    }
}

/// One-time holder for a process's engine.
///
/// The first successful or failed load is final: later calls get the same
/// engine, or [`Qwen3Error::EngineUnavailable`] if loading failed.
pub struct EngineCell<M = PythonBridge> {
    cell: OnceCell<Result<TtsEngine<M>, String>>,
}

impl<M: SpeechModel> EngineCell<M> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn get_or_load<F>(&self, load: F) -> Result<&TtsEngine<M>, Qwen3Error>
    where
        F: FnOnce() -> Result<TtsEngine<M>, Qwen3Error>,
    {
        let mut first_error = None;
        let slot = self.cell.get_or_init(|| {
            load().map_err(|err| {
                let message = err.to_string();
                log::error!("Engine load failed: {message}");
                first_error = Some(err);
                message
            })
        });
        match slot {
            Ok(engine) => Ok(engine),
            Err(message) => {
                Err(first_error.unwrap_or_else(|| Qwen3Error::EngineUnavailable(message.clone())))
            }
        }
    }

    /// The engine, if it has been loaded successfully.
    pub fn get(&self) -> Option<&TtsEngine<M>> {
        self.cell.get().and_then(|slot| slot.as_ref().ok())
    }
}

impl<M: SpeechModel> Default for EngineCell<M> {
    fn default() -> Self {
        Self::new()
    }
}

static ENGINE: EngineCell<PythonBridge> = EngineCell::new();

/// The process-wide engine, loaded from [`Qwen3ModelParams::from_env`] on first use.
pub fn get_engine() -> Result<&'static TtsEngine<PythonBridge>, Qwen3Error> {
    ENGINE.get_or_load(|| TtsEngine::load(&Qwen3ModelParams::from_env()))
}
