use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use base64::Engine as _;
use serde::Deserialize;

use super::engine::Qwen3ModelParams;
use super::model::{CustomVoiceRequest, GeneratedSpeech, Qwen3Error, SpeechModel};

/// Worker script run by the Python interpreter when no override path is configured.
const BRIDGE_SCRIPT: &str = include_str!("../../../scripts/qwen3_bridge.py");

/// How long a worker gets to exit on its own after its input closes.
const SHUTDOWN_POLLS: u32 = 20;
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One protocol line from the Python worker.
#[derive(Debug, Deserialize)]
struct BridgeResponse {
    status: Option<String>,
    wavs: Option<Vec<String>>,
    sample_rate: Option<u32>,
    error: Option<String>,
}

/// Qwen3-TTS loaded inside a persistent Python worker process.
///
/// The worker is started once, loads the model with the configured device,
/// dtype and attention implementation, then answers one JSON request line
/// with one JSON response line for the lifetime of the process.
pub struct PythonBridge {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl PythonBridge {
    /// Spawn the worker and block until the model reports ready.
    pub fn spawn(params: &Qwen3ModelParams) -> Result<Self, Qwen3Error> {
        let mut command = Command::new(&params.python);
        command.arg("-u");
        match &params.bridge_script {
            Some(path) => {
                log::info!("Using bridge script {}", path.display());
                command.arg(path);
            }
            None => {
                command.arg("-c").arg(BRIDGE_SCRIPT);
            }
        }
        command
            .arg("--model-id")
            .arg(&params.model_id)
            .arg("--device-map")
            .arg(&params.device_map)
            .arg("--dtype")
            .arg(&params.dtype)
            .arg("--attn-implementation")
            .arg(&params.attn_implementation)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Qwen3Error::PythonNotFound(params.python.clone())
            } else {
                Qwen3Error::Io(e)
            }
        })?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Qwen3Error::ModelLoad("worker stdout unavailable".to_string()))?;

        let mut bridge = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        };

        let ready = bridge
            .read_response()
            .map_err(|e| Qwen3Error::ModelLoad(e.to_string()))?;
        if let Some(error) = ready.error {
            return Err(Qwen3Error::ModelLoad(error));
        }
        if ready.status.as_deref() != Some("ready") {
            return Err(Qwen3Error::ModelLoad(format!(
                "unexpected handshake status {:?}",
                ready.status
            )));
        }

        Ok(bridge)
    }

    /// Read the next JSON line, skipping anything the worker printed that is not protocol.
    fn read_response(&mut self) -> Result<BridgeResponse, Qwen3Error> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                let status = self.child.try_wait().ok().flatten();
                return Err(Qwen3Error::Protocol(format!(
                    "worker closed its output (exit status: {status:?})"
                )));
            }
            let trimmed = line.trim();
            if trimmed.starts_with('{') {
                return Ok(serde_json::from_str(trimmed)?);
            }
            if !trimmed.is_empty() {
                log::debug!("Ignoring non-protocol worker output: {trimmed}");
            }
        }
    }
}

impl SpeechModel for PythonBridge {
    fn generate_custom_voice(
        &mut self,
        request: &CustomVoiceRequest,
    ) -> Result<GeneratedSpeech, Qwen3Error> {
        let mut payload = serde_json::to_string(request)?;
        payload.push('\n');

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| Qwen3Error::Protocol("worker input already closed".to_string()))?;
        stdin.write_all(payload.as_bytes())?;
        stdin.flush()?;

        let response = self.read_response()?;
        parse_generation(response)
    }
}

impl Drop for PythonBridge {
    fn drop(&mut self) {
        // Closing stdin ends the worker's request loop.
        self.stdin.take();
        for _ in 0..SHUTDOWN_POLLS {
            match self.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => std::thread::sleep(SHUTDOWN_POLL_INTERVAL),
                Err(_) => break,
            }
        }
        log::warn!("Python worker still running after its input closed, killing it");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn parse_generation(response: BridgeResponse) -> Result<GeneratedSpeech, Qwen3Error> {
    if let Some(error) = response.error {
        return Err(Qwen3Error::Generation(error));
    }
    let wavs = response
        .wavs
        .ok_or_else(|| Qwen3Error::Protocol("response has neither wavs nor error".to_string()))?;
    let sample_rate = response
        .sample_rate
        .ok_or_else(|| Qwen3Error::Protocol("response is missing sample_rate".to_string()))?;

    let wavs = wavs
        .iter()
        .map(|encoded| decode_f32_le(encoded))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GeneratedSpeech { wavs, sample_rate })
}

/// Decode base64 little-endian float32 PCM.
fn decode_f32_le(encoded: &str) -> Result<Vec<f32>, Qwen3Error> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
    if bytes.len() % 4 != 0 {
        return Err(Qwen3Error::Protocol(format!(
            "waveform byte length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn encode(samples: &[f32]) -> String {
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn response(json: &str) -> BridgeResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn decodes_all_candidate_waveforms() {
        let json = format!(
            r#"{{"wavs": ["{}", "{}"], "sample_rate": 24000}}"#,
            encode(&[0.5, -0.25]),
            encode(&[1.0])
        );
        let speech = parse_generation(response(&json)).unwrap();
        assert_eq!(speech.sample_rate, 24_000);
        assert_eq!(speech.wavs, vec![vec![0.5, -0.25], vec![1.0]]);
    }

    #[test]
    fn worker_error_becomes_generation_fault() {
        let err = parse_generation(response(r#"{"error": "text too long"}"#)).unwrap_err();
        match err {
            Qwen3Error::Generation(msg) => assert_eq!(msg, "text too long"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_sample_rate_is_a_protocol_error() {
        let json = format!(r#"{{"wavs": ["{}"]}}"#, encode(&[0.0]));
        assert!(matches!(
            parse_generation(response(&json)),
            Err(Qwen3Error::Protocol(_))
        ));
    }

    #[test]
    fn rejects_truncated_pcm() {
        let truncated = base64::engine::general_purpose::STANDARD.encode([0u8, 0, 128]);
        assert!(matches!(
            decode_f32_le(&truncated),
            Err(Qwen3Error::Protocol(_))
        ));
    }

    #[test]
    fn embedded_script_speaks_the_protocol() {
        assert!(BRIDGE_SCRIPT.contains("generate_custom_voice"));
        assert!(BRIDGE_SCRIPT.contains("\"ready\""));
    }

    #[test]
    fn missing_interpreter_is_reported() {
        let params = Qwen3ModelParams {
            python: "definitely-not-a-python-interpreter".to_string(),
            ..Default::default()
        };
        match PythonBridge::spawn(&params) {
            Err(Qwen3Error::PythonNotFound(cmd)) => {
                assert_eq!(cmd, "definitely-not-a-python-interpreter")
            }
            Err(other) => panic!("unexpected: {other:?}"),
            Ok(_) => panic!("spawn should fail"),
        }
    }

    const STUB_WORKER: &str = r#"
import base64, json, struct, sys

args = dict(zip(sys.argv[1::2], sys.argv[2::2]))
model_id = args["--model-id"]
if model_id == "missing":
    print(json.dumps({"error": "no such model"}))
    sys.exit(1)
if model_id == "loading":
    print(json.dumps({"status": "loading"}))
    sys.exit(0)

print("weights loaded from cache")
print(json.dumps({"status": "ready"}))
for line in sys.stdin:
    request = json.loads(line)
    if request["text"] == "echo":
        print(json.dumps({"error": json.dumps(request, sort_keys=True)}))
    elif request["text"] == "fail":
        print(json.dumps({"error": "boom happened"}))
    else:
        pcm = base64.b64encode(struct.pack("<2f", 0.5, -0.5)).decode()
        print(json.dumps({"wavs": [pcm], "sample_rate": 24000}))

with open(model_id, "w") as marker:
    marker.write("input closed")
"#;

    fn stub_params(dir: &std::path::Path, model_id: &str) -> Qwen3ModelParams {
        let script = dir.join("stub_worker.py");
        std::fs::write(&script, STUB_WORKER).unwrap();
        Qwen3ModelParams {
            model_id: model_id.to_string(),
            python: "python3".to_string(),
            bridge_script: Some(script),
            ..Default::default()
        }
    }

    fn python_available() -> bool {
        Command::new("python3").arg("--version").output().is_ok()
    }

    fn forwarded(err: Qwen3Error) -> serde_json::Value {
        match err {
            Qwen3Error::Generation(msg) => serde_json::from_str(&msg).unwrap(),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn handshake_failures_are_load_errors() {
        if !python_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();

        match PythonBridge::spawn(&stub_params(dir.path(), "missing")) {
            Err(Qwen3Error::ModelLoad(msg)) => assert_eq!(msg, "no such model"),
            Err(other) => panic!("unexpected: {other:?}"),
            Ok(_) => panic!("spawn should fail"),
        }
        match PythonBridge::spawn(&stub_params(dir.path(), "loading")) {
            Err(Qwen3Error::ModelLoad(msg)) => {
                assert_eq!(msg, r#"unexpected handshake status Some("loading")"#)
            }
            Err(other) => panic!("unexpected: {other:?}"),
            Ok(_) => panic!("spawn should fail"),
        }
    }

    #[test]
    fn worker_round_trip_over_pipes() {
        if !python_available() {
            eprintln!("python3 not found, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("closed.txt");
        let bridge = PythonBridge::spawn(&stub_params(dir.path(), marker.to_str().unwrap())).unwrap();
        let engine = crate::engines::qwen3::TtsEngine::new(bridge);

        // Auto and a missing instruction leave their keys out of the request line
        let sent = forwarded(engine.generate("echo", "Nobody", None, "Auto").unwrap_err());
        assert_eq!(sent, serde_json::json!({"speaker": "Ryan", "text": "echo"}));

        let sent = forwarded(
            engine
                .generate("echo", "Uncle_Fu", Some("loud"), "German")
                .unwrap_err(),
        );
        assert_eq!(
            sent,
            serde_json::json!({
                "instruct": "loud",
                "language": "German",
                "speaker": "Uncle_Fu",
                "text": "echo"
            })
        );

        match engine.generate("fail", "Ryan", None, "Auto") {
            Err(Qwen3Error::Generation(msg)) => assert_eq!(msg, "boom happened"),
            other => panic!("unexpected: {other:?}"),
        }

        // the worker keeps serving after reporting an error
        let result = engine.synthesize("hello", "Ryan", None, "English").unwrap();
        assert_eq!(result.sample_rate, 24_000);
        assert_eq!(result.samples, vec![0.5, -0.5]);

        drop(engine);
        assert_eq!(std::fs::read_to_string(&marker).unwrap(), "input closed");
    }
}
