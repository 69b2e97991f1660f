use std::path::PathBuf;
use std::time::Instant;

use qwen_tts_worker::engines::qwen3::{Qwen3ModelParams, TtsEngine};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let params = Qwen3ModelParams::from_env();

    let load_start = Instant::now();
    let engine = TtsEngine::load(&params)?;
    println!("Model loaded in {:.2?}", load_start.elapsed());

    println!("Available speakers:");
    for (id, description) in engine.speakers() {
        println!("  {id:<10} {description}");
    }
    println!("Available languages: {:?}", engine.languages());

    let text = "Hello! This is Qwen3 text to speech, speaking with one of nine built-in voices. \
                It supports Chinese, English, Japanese, Korean, German, French, Russian, \
                Portuguese, Spanish, and Italian.";

    let synth_start = Instant::now();
    let result = engine.synthesize(text, "Ryan", Some("Warm and upbeat"), "English")?;
    let synth_dur = synth_start.elapsed();

    let audio_dur = result.duration_secs();
    let speedup = audio_dur / synth_dur.as_secs_f64();
    println!(
        "Synthesized {:.3}s audio at {} Hz in {:.2?} ({:.1}x real-time)",
        audio_dur, result.sample_rate, synth_dur, speedup
    );

    let path = PathBuf::from("output.wav");
    result.write_wav(&path)?;
    println!("Saved to {}", path.display());

    Ok(())
}
