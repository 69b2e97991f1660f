//! Job handler: adapts one serverless job into one engine call.
//!
//! Faults from loading or generation are returned as `{"error": "..."}`; the
//! handler never hands a fault back to the runtime.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::engines::qwen3::{
    get_engine, Qwen3Error, SpeechModel, SynthesisOutput, TtsEngine, DEFAULT_LANGUAGE,
    DEFAULT_SPEAKER,
};

/// Error returned when a job carries no usable `text`.
pub const MISSING_TEXT: &str = "Missing required field: text";

/// Fields read from a job's `input` mapping.
///
/// Values of the wrong JSON type are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobInput {
    #[serde(default, deserialize_with = "string_or_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub speaker: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub instruction: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub language: Option<String>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

impl JobInput {
    /// Extract the `input` mapping of a job; a missing or non-object `input` is empty.
    pub fn from_job(job: &Value) -> Self {
        match job.get("input") {
            Some(input) if input.is_object() => Self::deserialize(input).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

/// Response body handed back to the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutput {
    Success(SynthesisOutput),
    Error { error: String },
}

impl JobOutput {
    pub fn error(message: impl Into<String>) -> Self {
        JobOutput::Error {
            error: message.into(),
        }
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(&self).unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
    }
}

/// Run one job against the engine returned by `engine`.
///
/// `engine` is only called once `text` has been validated, so a rejected job
/// never triggers a model load.
pub fn handle_job<'e, M, F>(job: &Value, engine: F) -> JobOutput
where
    M: SpeechModel + 'e,
    F: FnOnce() -> Result<&'e TtsEngine<M>, Qwen3Error>,
{
    let input = JobInput::from_job(job);

    let text = match input.text.as_deref() {
        Some(text) if !text.is_empty() => text,
        _ => return JobOutput::error(MISSING_TEXT),
    };
    let speaker = input.speaker.as_deref().unwrap_or(DEFAULT_SPEAKER.as_str());
    let language = input.language.as_deref().unwrap_or(DEFAULT_LANGUAGE.as_str());

    log::info!("Generating audio ({} chars)", text.chars().count());
    let result = engine().and_then(|engine| {
        engine.generate(text, speaker, input.instruction.as_deref(), language)
    });

    match result {
        Ok(output) => {
            log::info!("Generation complete ({:.3}s)", output.duration_seconds);
            JobOutput::Success(output)
        }
        Err(err) => {
            log::error!("Generation failed: {err}");
            JobOutput::error(err.to_string())
        }
    }
}

/// Entry point registered with the job runtime, backed by the process-wide engine.
pub fn handler(job: &Value) -> Value {
    handle_job(job, get_engine).into_value()
}
