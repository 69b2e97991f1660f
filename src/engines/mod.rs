//! Speech synthesis engines.
//!
//! This module contains the engine wrappers exposed by the worker.
//!
//! # Available Engines
//!
//! - `qwen3` - Qwen3-TTS 12Hz CustomVoice, driven through a persistent Python worker

pub mod qwen3;
