use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use qwen_tts_worker::engines::qwen3::{get_engine, speakers};
use qwen_tts_worker::{handler, serverless};

/// Serverless worker for Qwen3-TTS CustomVoice.
///
/// Reads jobs as JSON lines on stdin and writes one result line per job on
/// stdout. Model settings come from QWEN_TTS_* environment variables.
#[derive(Parser, Debug)]
#[command(name = "qwen-tts-worker", version, about)]
struct Cli {
    /// Run a single job from this file and print the result
    #[arg(long, value_name = "PATH")]
    test_input: Option<PathBuf>,

    /// Load the model on the first job instead of at startup
    #[arg(long)]
    no_warmup: bool,

    /// Print the available speakers and exit
    #[arg(long)]
    list_speakers: bool,

    /// Print the supported languages and exit
    #[arg(long)]
    list_languages: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.list_speakers {
        for (id, description) in speakers::speaker_descriptions() {
            println!("{id:<10} {description}");
        }
        return Ok(());
    }
    if cli.list_languages {
        for language in speakers::language_names() {
            println!("{language}");
        }
        return Ok(());
    }

    if !cli.no_warmup {
        log::info!("Warming up engine...");
        let start = Instant::now();
        if let Err(e) = get_engine() {
            log::error!("Warmup failed: {e}");
            return Err(e.into());
        }
        log::info!("Engine ready in {:.2?}", start.elapsed());
    }

    match cli.test_input {
        Some(path) => {
            let output = serverless::run_test_input(&path, handler::handler)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        None => serverless::start(handler::handler)?,
    }
    Ok(())
}
