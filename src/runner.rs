//! External protocol scripts
//!
//! Some tests are scored by standalone scripts maintained outside this crate.
//! A script receives `{"testId", "inputs", "meta"}` as JSON on stdin and writes
//! its result to stdout. The result is stored verbatim as the record's
//! `protocolOutput` and never interpreted here.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::inputs::RawInputs;
use crate::models::TestType;

/// Runs protocol scripts through a configured interpreter
#[derive(Debug, Clone)]
pub struct ProtocolRunner {
    interpreter: String,
    script_dir: PathBuf,
    timeout: Duration,
}

impl ProtocolRunner {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            script_dir: config.script_dir.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Conventional location of the script for a test: `<dir>/<category>/<slug>.py`
    pub fn script_for(&self, test_type: TestType) -> PathBuf {
        self.script_dir
            .join(test_type.category().as_str())
            .join(format!("{}.py", test_type.slug()))
    }

    /// Run the conventional script for `test_type`
    pub async fn run(
        &self,
        test_type: TestType,
        inputs: &RawInputs,
        meta: Option<Value>,
    ) -> Result<Value, RunnerError> {
        self.run_script(&self.script_for(test_type), &payload(test_type, inputs, meta))
            .await
    }

    /// Run an arbitrary script with `payload` on stdin.
    ///
    /// The child is killed if the timeout elapses or the returned future is dropped.
    #[instrument(skip(self, payload), fields(script = %script.display()))]
    pub async fn run_script(&self, script: &Path, payload: &Value) -> Result<Value, RunnerError> {
        if !script.is_file() {
            return Err(RunnerError::ScriptNotFound {
                path: script.to_path_buf(),
            });
        }

        let body = serde_json::to_vec(payload)?;
        let mut child = Command::new(&self.interpreter)
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: self.interpreter.clone(),
                source,
            })?;

        let stdin = child.stdin.take();
        let exchange = async move {
            if let Some(mut stdin) = stdin {
                // A script may exit without reading its input
                match stdin.write_all(&body).await {
                    Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            child.wait_with_output().await
        };

        let output = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(timeout = ?self.timeout, "Protocol script timed out");
                return Err(RunnerError::Timeout {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            return Err(RunnerError::NonZeroExit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!(bytes = output.stdout.len(), "Protocol script finished");
        Ok(parse_output(&stdout))
    }
}

/// Document a protocol script reads from stdin
pub fn payload(test_type: TestType, inputs: &RawInputs, meta: Option<Value>) -> Value {
    json!({
        "testId": test_type.slug(),
        "inputs": inputs,
        "meta": meta.unwrap_or(Value::Null),
    })
}

/// JSON when stdout parses, otherwise the trimmed text
fn parse_output(stdout: &str) -> Value {
    serde_json::from_str(stdout).unwrap_or_else(|_| Value::String(stdout.trim().to_string()))
}
