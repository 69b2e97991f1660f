//! # qwen-tts-worker
//!
//! A serverless job worker that serves the Qwen3-TTS CustomVoice model and
//! returns synthesized speech as base64-encoded WAV.
//!
//! ## Features
//!
//! - **Single model per process**: the engine is loaded once (eagerly at warmup or
//!   lazily on the first job) and shared by every job
//! - **Lenient parameters**: unknown speakers and languages fall back to `Ryan` and `Auto`
//! - **Job envelopes**: `{"input": {...}}` in, `{"audio_base64", "sample_rate",
//!   "duration_seconds"}` or `{"error"}` out
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qwen_tts_worker::engines::qwen3::get_engine;
//!
//! let engine = get_engine()?;
//! let output = engine.generate("Hello, world!", "Ryan", None, "English")?;
//! println!("{} s at {} Hz", output.duration_seconds, output.sample_rate);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engines;
pub mod handler;
pub mod serverless;

use std::io::Cursor;
use std::path::Path;

use base64::Engine as _;

/// A single synthesized waveform.
///
/// Contains raw f32 audio samples and the sample rate reported by the model.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    /// Raw mono audio samples, nominally in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate of the audio (24000 for Qwen3-TTS 12Hz)
    pub sample_rate: u32,
}

impl SynthesisResult {
    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    fn write_samples<W>(&self, writer: &mut hound::WavWriter<W>) -> Result<(), hound::Error>
    where
        W: std::io::Write + std::io::Seek,
    {
        for &sample in &self.samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * i16::MAX as f32) as i16)?;
        }
        Ok(())
    }

    /// Write the audio to a 16-bit PCM WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let mut writer = hound::WavWriter::create(path, self.wav_spec())?;
        self.write_samples(&mut writer)?;
        writer.finalize()
    }

    /// Encode the audio as an in-memory 16-bit PCM WAV container.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, hound::Error> {
        let mut cursor = Cursor::new(Vec::with_capacity(44 + self.samples.len() * 2));
        {
            let mut writer = hound::WavWriter::new(&mut cursor, self.wav_spec())?;
            self.write_samples(&mut writer)?;
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    /// Encode the audio as a WAV container, then as standard base64 text.
    pub fn to_base64_wav(&self) -> Result<String, hound::Error> {
        let wav = self.to_wav_bytes()?;
        Ok(base64::engine::general_purpose::STANDARD.encode(wav))
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Round to three decimal places, as reported in `duration_seconds`.
///
/// Rounds the exact binary value through decimal formatting; scaling by 1000
/// first would push values like 1.0005 (24012 samples at 24 kHz) over the tie.
pub fn round_millis(secs: f64) -> f64 {
    format!("{secs:.3}").parse().unwrap_or(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn decode(b64: &str) -> Vec<u8> {
        base64::engine::general_purpose::STANDARD
            .decode(b64)
            .expect("valid base64")
    }

    #[test]
    fn one_second_at_24khz() {
        let result = SynthesisResult {
            samples: vec![0.0; 24_000],
            sample_rate: 24_000,
        };
        assert_eq!(round_millis(result.duration_secs()), 1.0);
    }

    #[test]
    fn duration_rounds_to_three_decimals() {
        let result = SynthesisResult {
            samples: vec![0.0; 12_345],
            sample_rate: 24_000,
        };
        // 12345 / 24000 = 0.514375
        assert_eq!(round_millis(result.duration_secs()), 0.514);
        assert_eq!(round_millis(2.0 / 3.0), 0.667);
    }

    #[test]
    fn rounding_uses_exact_value_near_ties() {
        let at = |samples: usize| {
            round_millis(
                SynthesisResult {
                    samples: vec![0.0; samples],
                    sample_rate: 24_000,
                }
                .duration_secs(),
            )
        };
        assert_eq!(at(24_012), 1.0);
        assert_eq!(at(24_036), 1.002);
        assert_eq!(at(12), 0.001);
    }

    #[test]
    fn zero_sample_rate_has_zero_duration() {
        let result = SynthesisResult {
            samples: vec![0.5; 10],
            sample_rate: 0,
        };
        assert_eq!(result.duration_secs(), 0.0);
    }

    #[test]
    fn base64_wav_carries_sample_rate_and_length() {
        let result = SynthesisResult {
            samples: vec![0.25, -0.25, 1.5, -3.0, 0.0],
            sample_rate: 16_000,
        };
        let bytes = decode(&result.to_base64_wav().unwrap());
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 5);
        // out-of-range input is clipped rather than wrapped
        assert_eq!(samples[2], i16::MAX);
        assert_eq!(samples[3], -i16::MAX);
        assert_eq!(samples[4], 0);
    }

    #[test]
    fn encoding_is_deterministic() {
        let result = SynthesisResult {
            samples: (0..480).map(|i| (i as f32 / 480.0).sin()).collect(),
            sample_rate: 24_000,
        };
        assert_eq!(result.to_base64_wav().unwrap(), result.to_base64_wav().unwrap());
    }

    #[test]
    fn write_wav_matches_in_memory_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let result = SynthesisResult {
            samples: vec![0.1; 240],
            sample_rate: 24_000,
        };
        result.write_wav(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), result.to_wav_bytes().unwrap());
    }
}
