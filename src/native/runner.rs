use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{Duration, Instant};

use crate::constants::{
    DRAIN_GRACE, OUTPUT_LIMIT_ERROR, STDERR_TRUNCATED_MARKER, STDOUT_TRUNCATED_MARKER,
    TIMEOUT_ERROR,
};
use crate::core::domain::ExecutionResult;
use crate::core::traits::runner::{CommandSpec, Runner};

#[derive(Clone, Debug)]
pub struct NativeRunner {
    home: PathBuf,
    output_limit: usize,
}

impl NativeRunner {
    /// `home` becomes the child's HOME; `output_limit` caps each stream in chars.
    pub fn new<T: AsRef<Path>>(home: T, output_limit: usize) -> Self {
        NativeRunner {
            home: home.as_ref().into(),
            output_limit,
        }
    }
}

enum Resolution {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Overflowed,
}

/// Bytes read from one pipe, cut off after `limit` characters.
#[derive(Debug, Default)]
struct StreamCapture {
    bytes: Vec<u8>,
    chars: usize,
    truncated: bool,
}

impl StreamCapture {
    /// Returns true on the chunk that crosses the limit.
    fn push(&mut self, chunk: &[u8], limit: usize) -> bool {
        if self.truncated {
            return false;
        }
        for &b in chunk {
            // UTF-8 continuation bytes do not start a new character
            if b & 0xC0 != 0x80 {
                if self.chars == limit {
                    self.truncated = true;
                    return true;
                }
                self.chars += 1;
            }
            self.bytes.push(b);
        }
        false
    }

    fn finish(&self, limit: usize, marker: &str) -> String {
        let text = String::from_utf8_lossy(&self.bytes);
        let mut text: String = if text.chars().count() > limit {
            text.chars().take(limit).collect()
        } else {
            text.into_owned()
        };
        if self.truncated {
            text.push_str(marker);
        }
        text
    }
}

async fn capture<R>(
    mut reader: R,
    buffer: Arc<Mutex<StreamCapture>>,
    limit: usize,
    overflow_tx: mpsc::Sender<()>,
) where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let overflowed = buffer.lock().await.push(&chunk[..n], limit);
                if overflowed {
                    let _ = overflow_tx.send(()).await;
                    break;
                }
            }
        }
    }
}

fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

#[async_trait::async_trait]
impl Runner for NativeRunner {
    #[tracing::instrument(skip(self, command), fields(program = %command.program))]
    async fn run(&self, command: &CommandSpec) -> ExecutionResult {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .env_clear()
            .env("PATH", std::env::var_os("PATH").unwrap_or_default())
            .env("HOME", &self.home)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }

        let start_time = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let msg = format!("{}: {}", command.program, e);
                tracing::warn!(error = %msg, "Failed to spawn process");
                return ExecutionResult::spawn_failure(
                    &msg,
                    start_time.elapsed().as_millis() as u64,
                );
            }
        };

        // Written in the background so a child that never reads cannot block us.
        if let (Some(input), Some(mut stdin)) = (command.stdin.clone(), child.stdin.take()) {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    tracing::debug!("Failed to write stdin: {}", e);
                }
            });
        }

        let (overflow_tx, mut overflow_rx) = mpsc::channel::<()>(2);
        let stdout_buf = Arc::new(Mutex::new(StreamCapture::default()));
        let stderr_buf = Arc::new(Mutex::new(StreamCapture::default()));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(capture(
                stdout,
                stdout_buf.clone(),
                self.output_limit,
                overflow_tx.clone(),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(capture(
                stderr,
                stderr_buf.clone(),
                self.output_limit,
                overflow_tx.clone(),
            )));
        }
        drop(overflow_tx);

        // First event wins; the losing branches are dropped unobserved.
        let resolution = tokio::select! {
            status = child.wait() => Resolution::Exited(status),
            _ = tokio::time::sleep(Duration::from_millis(command.time_limit_ms)) => Resolution::TimedOut,
            Some(()) = overflow_rx.recv() => Resolution::Overflowed,
        };
        let execution_time_ms = start_time.elapsed().as_millis() as u64;

        if matches!(resolution, Resolution::TimedOut | Resolution::Overflowed) {
            if let Err(e) = child.start_kill() {
                tracing::debug!("Failed to kill process: {}", e);
            }
            let _ = child.wait().await;
        }

        // Grandchildren may hold the pipes open; don't wait for them forever.
        if tokio::time::timeout(DRAIN_GRACE, futures::future::join_all(readers.iter_mut()))
            .await
            .is_err()
        {
            readers.iter().for_each(|r| r.abort());
        }

        let (stdout, stdout_truncated) = {
            let buf = stdout_buf.lock().await;
            (
                buf.finish(self.output_limit, STDOUT_TRUNCATED_MARKER),
                buf.truncated,
            )
        };
        let (stderr, stderr_truncated) = {
            let buf = stderr_buf.lock().await;
            (
                buf.finish(self.output_limit, STDERR_TRUNCATED_MARKER),
                buf.truncated,
            )
        };

        let result = match resolution {
            Resolution::TimedOut => ExecutionResult {
                success: false,
                stdout,
                stderr: format!("{}\n{}", stderr, TIMEOUT_ERROR),
                exit_code: -1,
                execution_time_ms,
                error: Some(TIMEOUT_ERROR.to_string()),
                system_error: None,
            },
            Resolution::Overflowed => ExecutionResult {
                success: false,
                stdout,
                stderr,
                exit_code: -1,
                execution_time_ms,
                error: Some(OUTPUT_LIMIT_ERROR.to_string()),
                system_error: None,
            },
            Resolution::Exited(Err(e)) => {
                let msg = format!("Failed to wait for process: {}", e);
                ExecutionResult {
                    success: false,
                    stdout,
                    stderr: format!("{}\n{}", stderr, msg),
                    exit_code: -1,
                    execution_time_ms,
                    error: Some(msg.clone()),
                    system_error: Some(msg),
                }
            }
            Resolution::Exited(Ok(status)) => {
                let truncated = stdout_truncated || stderr_truncated;
                ExecutionResult {
                    success: !truncated && status.success(),
                    stdout,
                    stderr,
                    exit_code: exit_code(&status),
                    execution_time_ms,
                    error: truncated.then(|| OUTPUT_LIMIT_ERROR.to_string()),
                    system_error: None,
                }
            }
        };

        tracing::debug!(
            success = result.success,
            exit_code = result.exit_code,
            execution_time_ms = result.execution_time_ms,
            "Process resolved"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 100;

    fn runner() -> NativeRunner {
        NativeRunner::new(std::env::temp_dir(), LIMIT)
    }

    fn sh(script: &str, time_limit_ms: u64) -> CommandSpec {
        CommandSpec::new("sh", time_limit_ms).arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_successful_run() {
        let result = runner().run(&sh("echo hello", 5000)).await;

        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "hello\n");
        assert!(result.stderr.is_empty());
        assert_eq!(result.error, None);
        assert_eq!(result.system_error, None);
    }

    #[tokio::test]
    async fn test_stdin_is_piped_and_closed() {
        let command = CommandSpec::new("cat", 5000).stdin("5 3\n7");
        let result = runner().run(&command).await;

        assert!(result.success);
        assert_eq!(result.stdout, "5 3\n7");
    }

    #[tokio::test]
    async fn test_missing_stdin_reads_eof() {
        // Would hang forever if stdin were an open pipe
        let result = runner().run(&CommandSpec::new("cat", 5000)).await;

        assert!(result.success);
        assert!(result.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_preserved() {
        let result = runner().run(&sh("echo oops >&2; exit 3", 5000)).await;

        assert!(!result.success);
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stderr.trim(), "oops");
        assert_eq!(result.error, None);
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let started = std::time::Instant::now();
        let result = runner().run(&sh("echo partial; sleep 10", 300)).await;

        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert!(!result.success);
        assert_eq!(result.exit_code, -1);
        assert_eq!(result.error.as_deref(), Some(TIMEOUT_ERROR));
        assert_eq!(result.verdict(), crate::core::domain::Verdict::TimeLimitExceeded);
        assert!(result.stderr.ends_with(TIMEOUT_ERROR));
    }

    #[tokio::test]
    async fn test_stdout_overflow_is_truncated_and_killed() {
        let started = std::time::Instant::now();
        let result = runner().run(&CommandSpec::new("yes", 10_000)).await;

        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(OUTPUT_LIMIT_ERROR));
        assert!(result.stdout.ends_with(STDOUT_TRUNCATED_MARKER));
        assert!(
            result.stdout.chars().count() <= LIMIT + STDOUT_TRUNCATED_MARKER.chars().count()
        );
    }

    #[tokio::test]
    async fn test_stderr_overflow_is_truncated_and_killed() {
        let result = runner().run(&sh("yes >&2", 10_000)).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(OUTPUT_LIMIT_ERROR));
        assert!(result.stderr.ends_with(STDERR_TRUNCATED_MARKER));
        assert!(
            result.stderr.chars().count() <= LIMIT + STDERR_TRUNCATED_MARKER.chars().count()
        );
    }

    #[tokio::test]
    async fn test_truncation_respects_char_boundaries() {
        let result = runner().run(&sh("yes 'é'", 10_000)).await;

        assert_eq!(result.error.as_deref(), Some(OUTPUT_LIMIT_ERROR));
        assert!(!result.stdout.contains('\u{FFFD}'));
        assert!(
            result.stdout.chars().count() <= LIMIT + STDOUT_TRUNCATED_MARKER.chars().count()
        );
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported_as_data() {
        let result = runner()
            .run(&CommandSpec::new("/nonexistent/coderunner-binary", 1000))
            .await;

        assert!(!result.success);
        assert_eq!(result.exit_code, -1);
        assert!(result.system_error.is_some());
        assert!(result.stderr.contains("/nonexistent/coderunner-binary"));
        assert_eq!(result.error, result.system_error);
    }

    #[tokio::test]
    async fn test_environment_is_minimal() {
        let home = tempfile::tempdir().unwrap();
        let runner = NativeRunner::new(home.path(), 10_000);
        let result = runner.run(&sh("env", 5000)).await;

        assert!(result.success);
        assert!(
            result
                .stdout
                .lines()
                .any(|l| l == format!("HOME={}", home.path().display()))
        );
        assert!(!result.stdout.contains("CARGO_PKG_NAME"));
    }

    #[tokio::test]
    async fn test_working_dir_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let result = runner()
            .run(&CommandSpec::new("pwd", 5000).working_dir(dir.path()))
            .await;

        let expected = dir.path().canonicalize().unwrap();
        let actual = PathBuf::from(result.stdout.trim());
        assert_eq!(actual.canonicalize().unwrap_or(actual), expected);
    }

    #[test]
    fn test_stream_capture_limit() {
        let mut capture = StreamCapture::default();
        assert!(!capture.push(b"abc", 5));
        assert!(capture.push(b"defg", 5));
        assert!(capture.truncated);
        assert_eq!(capture.finish(5, "!"), "abcde!");
        assert!(!capture.push(b"more", 5));
    }
}
