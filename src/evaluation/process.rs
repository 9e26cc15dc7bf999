//! Subprocess-backed evaluation and inference
//!
//! Each call spawns the configured command once, bounded by a timeout. The
//! child is killed if the call is dropped or times out.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::evaluation::output::{parse_stdout, truncate_output};
use crate::evaluation::{DispatchError, ExternalEvaluator, MeasuredMetrics};
use crate::types::config::CommandSpec;

/// Captured result of a finished child process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
}

/// Run `command` with extra `args`, optionally feeding `stdin`
pub async fn run_command(
    command: &CommandSpec,
    args: &[String],
    stdin_input: Option<&[u8]>,
    limit: Duration,
) -> Result<ProcessOutput, DispatchError> {
    if command.is_empty() {
        return Err(DispatchError::Spawn("no command configured".to_string()));
    }

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args).args(args);

    if stdin_input.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    tracing::debug!("Running {} {:?}", command, args);

    let result = timeout(limit, async {
        let mut child = cmd
            .spawn()
            .map_err(|e| DispatchError::Spawn(format!("{}: {}", command.program, e)))?;

        // Feed stdin while the output is drained, so a child that writes
        // before it finishes reading cannot block on a full pipe
        let writer = match (stdin_input, child.stdin.take()) {
            (Some(input), Some(mut stdin)) => {
                let input = input.to_vec();
                Some(tokio::spawn(async move {
                    // A child that exits without reading stdin is not an error here
                    let _ = stdin.write_all(&input).await;
                }))
            }
            _ => None,
        };

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DispatchError::Spawn(e.to_string()));
        if let Some(writer) = writer {
            writer.abort();
        }
        output
    })
    .await;

    match result {
        Ok(Ok(output)) => Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            success: output.status.success(),
        }),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(DispatchError::Timeout(limit)),
    }
}

fn exit_error(output: &ProcessOutput) -> DispatchError {
    let detail = if output.stderr.trim().is_empty() {
        output.stdout.trim()
    } else {
        output.stderr.trim()
    };
    DispatchError::NonZeroExit {
        code: output.exit_code,
        stderr: truncate_output(detail, 2000),
    }
}

/// Evaluates models by running an evaluation script
///
/// Invoked as `<command> --model <path> --dataset <path> --target <column>`.
pub struct ProcessEvaluator {
    command: CommandSpec,
    limit: Duration,
}

impl ProcessEvaluator {
    pub fn new(command: CommandSpec, limit: Duration) -> Self {
        Self { command, limit }
    }
}

#[async_trait]
impl ExternalEvaluator for ProcessEvaluator {
    fn name(&self) -> &str {
        "process"
    }

    async fn evaluate(
        &self,
        model: &Path,
        dataset: &Path,
        target: &str,
    ) -> Result<MeasuredMetrics, DispatchError> {
        let args = vec![
            "--model".to_string(),
            model.display().to_string(),
            "--dataset".to_string(),
            dataset.display().to_string(),
            "--target".to_string(),
            target.to_string(),
        ];

        let output = run_command(&self.command, &args, None, self.limit).await?;
        if !output.success {
            return Err(exit_error(&output));
        }
        parse_stdout(&output.stdout)
    }
}

/// Single-shot inference on a stored model
///
/// Invoked as `<command> --model <path>` with the input JSON on stdin. A JSON
/// stdout is returned as-is; anything else comes back as a string.
pub struct InferenceRunner {
    command: CommandSpec,
    limit: Duration,
}

impl InferenceRunner {
    pub fn new(command: CommandSpec, limit: Duration) -> Self {
        Self { command, limit }
    }

    pub async fn run(&self, model: &Path, input: &Value) -> Result<Value, DispatchError> {
        let args = vec!["--model".to_string(), model.display().to_string()];
        let payload =
            serde_json::to_vec(input).map_err(|e| DispatchError::InvalidOutput(e.to_string()))?;

        let output = run_command(&self.command, &args, Some(&payload), self.limit).await?;
        if !output.success {
            return Err(exit_error(&output));
        }

        let stdout = output.stdout.trim();
        Ok(serde_json::from_str(stdout).unwrap_or_else(|_| Value::String(stdout.to_string())))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        // `sh -c <script> <$0>` then our flags land in $1..
        CommandSpec::new("sh", &["-c", script, "evaluator"])
    }

    #[tokio::test]
    async fn test_process_evaluator_success() {
        let script = r#"echo "evaluating $2 on $4 target $6"; echo '{"status": "success", "metrics": {"accuracy": 0.9, "precision": 0.9, "recall": 0.9, "f1_score": 0.9}, "predictions": [1, 0]}'"#;
        let evaluator = ProcessEvaluator::new(sh(script), Duration::from_secs(10));

        let measured = evaluator
            .evaluate(Path::new("m.pkl"), Path::new("d.csv"), "species")
            .await
            .unwrap();
        assert_eq!(measured.accuracy, 0.9);
        assert_eq!(measured.predictions, 2);
    }

    #[tokio::test]
    async fn test_process_evaluator_nonzero_exit() {
        let evaluator =
            ProcessEvaluator::new(sh("echo 'model load failed' >&2; exit 3"), Duration::from_secs(10));
        let err = evaluator
            .evaluate(Path::new("m.pkl"), Path::new("d.csv"), "y")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DispatchError::NonZeroExit {
                code: 3,
                stderr: "model load failed".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_process_evaluator_timeout() {
        let evaluator = ProcessEvaluator::new(sh("sleep 5"), Duration::from_millis(200));
        let err = evaluator
            .evaluate(Path::new("m.pkl"), Path::new("d.csv"), "y")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let evaluator = ProcessEvaluator::new(
            CommandSpec::new("definitely-not-a-real-evaluator", &[]),
            Duration::from_secs(1),
        );
        let err = evaluator
            .evaluate(Path::new("m.pkl"), Path::new("d.csv"), "y")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Spawn(_)));
    }

    #[tokio::test]
    async fn test_inference_echoes_stdin() {
        let runner = InferenceRunner::new(sh("cat"), Duration::from_secs(10));
        let input = serde_json::json!({"features": [5.1, 3.5, 1.4, 0.2]});
        let result = runner.run(Path::new("m.pkl"), &input).await.unwrap();
        assert_eq!(result, input);
    }

    #[tokio::test]
    async fn test_inference_large_payload_does_not_block() {
        let runner = InferenceRunner::new(sh("cat"), Duration::from_secs(10));
        let input = serde_json::json!({"blob": "x".repeat(1024 * 1024)});
        let result = runner.run(Path::new("m.pkl"), &input).await.unwrap();
        assert_eq!(result, input);
    }

    #[tokio::test]
    async fn test_inference_plain_text() {
        let runner = InferenceRunner::new(sh("echo setosa"), Duration::from_secs(10));
        let result = runner
            .run(Path::new("m.pkl"), &serde_json::json!([1, 2]))
            .await
            .unwrap();
        assert_eq!(result, Value::String("setosa".to_string()));
    }
}
