//! Qwen3-TTS 12Hz 1.7B CustomVoice engine.
//!
//! The model ships as the `qwen-tts` Python package. This engine starts one
//! persistent Python worker per process, loads the checkpoint there, and
//! exchanges newline-delimited JSON with it for every generation.
//!
//! # System Requirements
//!
//! - Python 3 with `qwen-tts`, `torch` and `numpy` installed
//! - `flash-attn` when using the default `flash_attention_2` attention backend
//! - A CUDA device for the default `cuda:0` placement
//!
//! # Configuration
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `QWEN_TTS_MODEL_ID` | `Qwen/Qwen3-TTS-12Hz-1.7B-CustomVoice` | Checkpoint id or path |
//! | `QWEN_TTS_DEVICE_MAP` | `cuda:0` | Device placement |
//! | `QWEN_TTS_DTYPE` | `bfloat16` | Numeric precision |
//! | `QWEN_TTS_ATTN_IMPL` | `flash_attention_2` | Attention implementation |
//! | `QWEN_TTS_PYTHON` | `python3` | Interpreter |
//! | `QWEN_TTS_BRIDGE_SCRIPT` | embedded | Worker script override |
//! | `QWEN_TTS_STRICT` | off | Reject unknown speakers/languages |
//!
//! # Speakers
//!
//! | Id | Voice |
//! |---|---|
//! | `Vivian`, `Serena`, `Uncle_Fu` | Chinese |
//! | `Dylan` | Chinese (Beijing) |
//! | `Eric` | Chinese (Sichuan) |
//! | `Ryan` (default), `Aiden` | English |
//! | `Ono_Anna` | Japanese |
//! | `Sohee` | Korean |
//!
//! Languages: Chinese, English, Japanese, Korean, German, French, Russian,
//! Portuguese, Spanish, Italian, and `Auto` (default, model-side detection).
//!
//! # Examples
//!
//! ```rust,no_run
//! use qwen_tts_worker::engines::qwen3::{Qwen3ModelParamsBuilder, TtsEngine};
//!
//! let params = Qwen3ModelParamsBuilder::default()
//!     .device_map("cpu")
//!     .attn_implementation("sdpa")
//!     .build()?;
//! let engine = TtsEngine::load(&params)?;
//!
//! let output = engine.generate("Hello!", "Aiden", Some("Cheerful"), "English")?;
//! println!("{} bytes of base64 audio", output.audio_base64.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bridge;
pub mod engine;
pub mod model;
pub mod speakers;

pub use bridge::PythonBridge;
pub use engine::{
    get_engine, EngineCell, Qwen3ModelParams, Qwen3ModelParamsBuilder, SynthesisOutput, TtsEngine,
};
pub use model::{CustomVoiceRequest, GeneratedSpeech, Qwen3Error, SpeechModel, MODEL_ID};
pub use speakers::{Language, Speaker, DEFAULT_LANGUAGE, DEFAULT_SPEAKER};
