//! Runs one compile+run pipeline inside a throwaway directory.
//!
//! Isolation is process-level only: a unique temp dir, a hard wall-clock
//! timeout, and a cap on captured output. The directory is removed on
//! every exit path by `TempDir`'s drop.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command as TokioCommand;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::ExecError;
use crate::language::{LanguageProfile, ToolCommand};
use crate::metrics::MemorySampler;

/// Compile stage budget, independent of the per-case run limit
const COMPILE_TIMEOUT: Duration = Duration::from_secs(10);

const READ_CHUNK: usize = 8 * 1024;

/// How long to keep reading child output after a timeout kill
const DRAIN_GRACE: Duration = Duration::from_secs(1);

pub struct RunRequest<'a> {
    pub profile: &'a LanguageProfile,
    pub source_code: &'a str,
    /// Already-normalized bytes for the child's stdin
    pub stdin: &'a str,
    pub time_limit: Duration,
    pub max_output_bytes: usize,
}

#[derive(Debug)]
pub struct RunOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_success: bool,
    pub timed_out: bool,
    /// Best-effort peak RSS in MiB, 0 when unavailable
    pub memory_usage_mb: u64,
}

/// Materialize the source, run the compile stage if the profile has
/// one, then the run stage with the given input and time limit.
pub async fn run(request: RunRequest<'_>) -> Result<RunOutput, ExecError> {
    let dir = tempfile::Builder::new().prefix("judge-").tempdir()?;

    fs::write(
        dir.path().join(&request.profile.source_filename),
        request.source_code,
    )
    .await?;
    for (name, contents) in &request.profile.extra_files {
        fs::write(dir.path().join(name), contents).await?;
    }

    if let Some(build) = &request.profile.build {
        compile(build, dir.path()).await?;
        debug!(program = %build.program, "compile stage succeeded");
    }

    let run = &request.profile.run;
    let mut child = TokioCommand::new(&run.program)
        .args(&run.args)
        .current_dir(dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ExecError::Spawn)?;

    // Feed the input from a task so a child that never reads stdin (or
    // fills stdout before reading) cannot stall the timed section
    // below. The handle drops when the task ends, so the child sees
    // EOF; a broken pipe from an early-exiting child is not an engine
    // failure.
    let stdin_task = child.stdin.take().map(|mut stdin| {
        let bytes = request.stdin.as_bytes().to_vec();
        tokio::spawn(async move {
            let _ = stdin.write_all(&bytes).await;
        })
    });

    let sampler = child.id().map(MemorySampler::spawn);
    let stdout_task = capped_reader(child.stdout.take(), request.max_output_bytes);
    let stderr_task = capped_reader(child.stderr.take(), request.max_output_bytes);

    let wait_result = timeout(request.time_limit, child.wait()).await;

    let (exit_success, timed_out) = match wait_result {
        Ok(status) => (status?.success(), false),
        Err(_) => {
            warn!(limit_ms = request.time_limit.as_millis() as u64, "run timed out, killing child");
            let _ = child.kill().await;
            let _ = child.wait().await;
            (false, true)
        }
    };

    // The child is gone either way; aborting the writer closes its end
    // of the stdin pipe.
    if let Some(task) = stdin_task {
        task.abort();
    }

    // After a clean exit the pipes are closed and the readers finish on
    // their own. After a kill, a grandchild may still hold the write
    // end, so give the readers a bounded grace period.
    let grace = timed_out.then_some(DRAIN_GRACE);
    let stdout = drain(stdout_task, grace).await;
    let stderr = drain(stderr_task, grace).await;
    let memory_usage_mb = match sampler {
        Some(sampler) => sampler.finish().await,
        None => 0,
    };

    Ok(RunOutput {
        stdout,
        stderr,
        exit_success,
        timed_out,
        memory_usage_mb,
    })
}

async fn compile(build: &ToolCommand, dir: &Path) -> Result<(), ExecError> {
    let output = timeout(
        COMPILE_TIMEOUT,
        TokioCommand::new(&build.program)
            .args(&build.args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .map_err(|_| ExecError::Compilation(format!("{} timed out", build.program)))?
    .map_err(ExecError::Spawn)?;

    if !output.status.success() {
        // dotnet reports build errors on stdout
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(ExecError::Compilation(message));
    }
    Ok(())
}

/// Drain a child stream to completion, keeping at most `cap` bytes.
/// Reading past the cap (and discarding) keeps a chatty child from
/// blocking on a full pipe.
fn capped_reader<R>(stream: Option<R>, cap: usize) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        let Some(mut stream) = stream else {
            return buf;
        };
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if buf.len() < cap {
                        let keep = n.min(cap - buf.len());
                        buf.extend_from_slice(&chunk[..keep]);
                    }
                }
            }
        }
        buf
    })
}

async fn drain(task: JoinHandle<Vec<u8>>, grace: Option<Duration>) -> String {
    let bytes = match grace {
        None => task.await.unwrap_or_default(),
        Some(grace) => match timeout(grace, task).await {
            Ok(joined) => joined.unwrap_or_default(),
            Err(_) => Vec::new(),
        },
    };
    String::from_utf8_lossy(&bytes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{LanguageProfile, ToolCommand};

    fn shell_profile(script: &str) -> LanguageProfile {
        LanguageProfile {
            source_filename: "solution.txt".into(),
            extra_files: Vec::new(),
            build: None,
            run: ToolCommand {
                program: "sh".into(),
                args: vec!["-c".into(), script.into()],
            },
        }
    }

    fn request<'a>(profile: &'a LanguageProfile, stdin: &'a str, limit_ms: u64) -> RunRequest<'a> {
        RunRequest {
            profile,
            source_code: "placeholder",
            stdin,
            time_limit: Duration::from_millis(limit_ms),
            max_output_bytes: 1024 * 1024,
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdin_is_closed_so_readers_see_eof() {
        // cat only terminates once its stdin reaches end-of-input
        let profile = shell_profile("cat");
        let out = run(request(&profile, "hello\nworld\n", 5_000)).await.unwrap();
        assert!(out.exit_success);
        assert!(!out.timed_out);
        assert_eq!(out.stdout, "hello\nworld\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sandbox_dir_is_removed_after_success() {
        let profile = shell_profile("pwd");
        let out = run(request(&profile, "", 5_000)).await.unwrap();
        let dir = out.stdout.trim().to_string();
        assert!(!dir.is_empty());
        assert!(!Path::new(&dir).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_child_and_removes_dir() {
        let profile = shell_profile("pwd; exec sleep 30");
        let started = std::time::Instant::now();
        let out = run(request(&profile, "", 200)).await.unwrap();
        assert!(out.timed_out);
        assert!(!out.exit_success);
        assert!(started.elapsed() < Duration::from_secs(5));
        let dir = out.stdout.trim().to_string();
        assert!(!Path::new(&dir).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_fires_even_when_stdin_is_never_read() {
        // Input larger than an OS pipe buffer, fed to a child that
        // never reads it. The limit must still govern the run.
        let profile = shell_profile("exec sleep 30");
        let big_input = "x".repeat(256 * 1024);
        let started = std::time::Instant::now();
        let out = run(request(&profile, &big_input, 300)).await.unwrap();
        assert!(out.timed_out);
        assert!(!out.exit_success);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn large_io_round_trips_without_deadlock() {
        // cat echoes everything back; input and output both exceed the
        // pipe buffer, so this only completes if the writer and the
        // readers run concurrently.
        let profile = shell_profile("cat");
        let big_input = format!("{}\n", "y".repeat(256 * 1024));
        let out = run(request(&profile, &big_input, 10_000)).await.unwrap();
        assert!(out.exit_success);
        assert!(!out.timed_out);
        assert_eq!(out.stdout, big_input);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captured_output_is_capped() {
        let profile = shell_profile("i=0; while [ $i -lt 500 ]; do echo aaaaaaaaaaaaaaaa; i=$((i+1)); done");
        let mut req = request(&profile, "", 5_000);
        req.max_output_bytes = 64;
        let out = run(req).await.unwrap();
        assert!(out.exit_success);
        assert_eq!(out.stdout.len(), 64);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_not_a_success() {
        let profile = shell_profile("echo boom >&2; exit 3");
        let out = run(request(&profile, "", 5_000)).await.unwrap();
        assert!(!out.exit_success);
        assert!(!out.timed_out);
        assert_eq!(out.stderr.trim(), "boom");
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let profile = LanguageProfile {
            source_filename: "solution.txt".into(),
            extra_files: Vec::new(),
            build: None,
            run: ToolCommand {
                program: "definitely-not-on-path-xyz".into(),
                args: Vec::new(),
            },
        };
        let err = run(request(&profile, "", 1_000)).await.unwrap_err();
        assert!(matches!(err, ExecError::Spawn(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_build_surfaces_compiler_stderr() {
        let profile = LanguageProfile {
            source_filename: "solution.txt".into(),
            extra_files: Vec::new(),
            build: Some(ToolCommand {
                program: "sh".into(),
                args: vec![
                    "-c".into(),
                    "pwd >&2; echo 'syntax error near line 1' >&2; exit 1".into(),
                ],
            }),
            run: ToolCommand {
                program: "sh".into(),
                args: vec!["-c".into(), "true".into()],
            },
        };
        let err = run(request(&profile, "", 1_000)).await.unwrap_err();
        match err {
            ExecError::Compilation(message) => {
                assert!(message.contains("syntax error"));
                // First stderr line is the sandbox dir; it must be gone
                // after the failed build too
                let dir = message.lines().next().unwrap().trim();
                assert!(dir.starts_with('/'));
                assert!(!Path::new(dir).exists());
            }
            other => panic!("expected compilation error, got {other:?}"),
        }
    }
}
