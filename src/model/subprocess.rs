//! Backend that delegates each forward pass to an external process.
//!
//! The process is started as `program [args...] <model path>`. It receives one
//! JSON request on stdin:
//!
//! ```json
//! {"shape": [1, 3, 224, 224], "input": [0.12, -1.7, ...]}
//! ```
//!
//! and must answer with a single JSON object on stdout, either
//! `{"logit": 1.25}` or `{"error": "message"}`, then exit. The input is the
//! already normalized tensor in row-major NCHW order.
//!
//! Every call is an independent process, so no serialization is needed.
//! `scripts/run_model.py` is a runner for the exported ONNX artifact.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use ndarray::ArrayView4;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::backend::{LoadedModel, Logit, ModelBackend};

const BACKEND_NAME: &str = "subprocess";

/// Runs an interpreter or helper binary per request.
#[derive(Debug, Clone)]
pub struct SubprocessBackend {
    program: PathBuf,
    args: Vec<String>,
}

impl SubprocessBackend {
    /// Create a backend invoking `program` with `args`; the model path is
    /// appended as the final argument.
    #[must_use]
    pub const fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

impl ModelBackend for SubprocessBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn load(&self, path: &Path) -> Result<Box<dyn LoadedModel>> {
        // The helper owns the weights; all that can be checked up front is
        // that the artifact is still there.
        if !path.is_file() {
            return Err(Error::ModelLoad {
                path: path.to_path_buf(),
                reason: "artifact disappeared before load".to_string(),
            });
        }

        tracing::debug!(
            "using external model runner {} for {}",
            self.program.display(),
            path.display()
        );

        Ok(Box::new(SubprocessModel {
            program: self.program.clone(),
            args: self.args.clone(),
            model_path: path.to_path_buf(),
        }))
    }
}

struct SubprocessModel {
    program: PathBuf,
    args: Vec<String>,
    model_path: PathBuf,
}

#[derive(Serialize)]
struct Request<'a> {
    shape: &'a [usize],
    input: Vec<f32>,
}

#[derive(Deserialize)]
struct Response {
    logit: Option<f32>,
    error: Option<String>,
}

fn backend_error(reason: impl Into<String>) -> Error {
    Error::Backend {
        backend: BACKEND_NAME,
        reason: reason.into(),
    }
}

/// Serialize the batch in logical NCHW order, whatever its memory layout.
fn encode_request(input: ArrayView4<'_, f32>) -> Result<Vec<u8>> {
    let request = Request {
        shape: input.shape(),
        input: input.iter().copied().collect(),
    };
    serde_json::to_vec(&request)
        .map_err(|err| backend_error(format!("failed to encode request: {err}")))
}

impl LoadedModel for SubprocessModel {
    fn forward(&self, input: ArrayView4<'_, f32>) -> Result<Logit> {
        let payload = encode_request(input)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.model_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                backend_error(format!("failed to spawn {}: {err}", self.program.display()))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| backend_error("child stdin unavailable"))?;

        // Write from another thread so a chatty child cannot deadlock us on a
        // full stdout pipe.
        let writer = thread::spawn(move || stdin.write_all(&payload));

        let output = child
            .wait_with_output()
            .map_err(|err| backend_error(format!("failed to wait for child: {err}")))?;

        let write_result = writer
            .join()
            .map_err(|_| backend_error("stdin writer panicked"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            // The runner reports its own failures as JSON on stdout before exiting.
            let detail = serde_json::from_str::<Response>(stdout.trim())
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| stderr.trim().to_string());
            return Err(backend_error(format!("runner exited with {}: {detail}", output.status)));
        }

        // A runner may answer without draining stdin; a broken pipe only
        // matters when no usable response came back.
        let response: Response = match (serde_json::from_slice(&output.stdout), write_result) {
            (Ok(response), _) => response,
            (Err(_), Err(err)) => {
                return Err(backend_error(format!("failed to write request: {err}")));
            }
            (Err(err), Ok(())) => {
                return Err(backend_error(format!("malformed runner response: {err}")));
            }
        };

        match (response.logit, response.error) {
            (_, Some(error)) => Err(backend_error(error)),
            (Some(logit), None) => Ok(logit),
            (None, None) => Err(backend_error("runner response has neither logit nor error")),
        }
    }
}
