//! Local job runtime adapter.
//!
//! Jobs are JSON objects `{"id": ..., "input": {...}}`, one per line, and each
//! result is written back as `{"id": ..., "output": {...}}` on its own line.
//! Delivery, retries and concurrency belong to whatever process feeds the
//! worker; this adapter only forwards jobs to the registered handler in order.

use std::io::{BufRead, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct JobResult {
    id: Value,
    output: Value,
}

/// Answer every job line read from `reader`, writing one result line per job.
///
/// Blank lines are skipped. Returns the number of jobs answered.
pub fn run_jobs<R, W, H>(reader: R, mut writer: W, handler: H) -> std::io::Result<usize>
where
    R: BufRead,
    W: Write,
    H: Fn(&Value) -> Value,
{
    let mut answered = 0;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (id, output) = match serde_json::from_str::<Value>(line) {
            Ok(job) => {
                let output = handler(&job);
                (job.get("id").cloned().unwrap_or(Value::Null), output)
            }
            Err(e) => {
                log::warn!("Rejecting malformed job line: {e}");
                (
                    Value::Null,
                    serde_json::json!({ "error": format!("Invalid job JSON: {e}") }),
                )
            }
        };

        let result = JobResult { id, output };
        serde_json::to_writer(&mut writer, &result)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        answered += 1;
    }
    Ok(answered)
}

/// Register `handler` and serve jobs from stdin until it closes.
pub fn start<H>(handler: H) -> std::io::Result<()>
where
    H: Fn(&Value) -> Value,
{
    log::info!("Waiting for jobs on stdin");
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let answered = run_jobs(stdin.lock(), stdout.lock(), handler)?;
    log::info!("Input closed after {answered} job(s)");
    Ok(())
}

/// Run the single job stored in a `test_input.json` file.
pub fn run_test_input<H>(path: &Path, handler: H) -> Result<Value, Box<dyn std::error::Error>>
where
    H: Fn(&Value) -> Value,
{
    log::info!("Running test input from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    let job: Value = serde_json::from_str(&content)?;
    Ok(handler(&job))
}
