//! Running user commands inside feature worktrees
//!
//! This module provides:
//! - Command execution with optional timeout and bounded output capture
//! - Project type detection from marker files

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use glob::glob;
use wait_timeout::ChildExt;

/// Timeout for collecting output from child process pipes
const OUTPUT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum captured output per stream (10MB)
const MAX_OUTPUT_SIZE: usize = 10 * 1024 * 1024;

/// What a finished (or killed) command produced
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
}

/// Run `argv` in `dir`, killing it after `timeout` if one is given.
///
/// A single argument containing whitespace is treated as a shell command line
/// (`sh -c` on Unix, `cmd /C` on Windows); anything else is executed directly.
pub fn run_in_dir(argv: &[String], dir: &Path, timeout: Option<Duration>) -> Result<CommandOutcome> {
    let start = Instant::now();
    let display = argv.join(" ");
    let mut child = spawn(argv, dir)?;

    // Drain both pipes while waiting so a chatty child cannot block on a full pipe
    let stdout_rx = drain(child.stdout.take());
    let stderr_rx = drain(child.stderr.take());

    let status: Option<ExitStatus> = match timeout {
        Some(limit) => child
            .wait_timeout(limit)
            .with_context(|| format!("Failed to wait for command: {display}"))?,
        None => Some(
            child
                .wait()
                .with_context(|| format!("Failed to wait for command: {display}"))?,
        ),
    };

    if status.is_none() {
        kill_child_process(&mut child);
    }

    let stdout = stdout_rx
        .recv_timeout(OUTPUT_COLLECTION_TIMEOUT)
        .unwrap_or_else(|_| "[output collection timed out]".to_string());
    let mut stderr = stderr_rx
        .recv_timeout(OUTPUT_COLLECTION_TIMEOUT)
        .unwrap_or_else(|_| "[output collection timed out]".to_string());

    let duration = start.elapsed();
    match status {
        Some(status) => Ok(CommandOutcome {
            success: status.success(),
            exit_code: status.code(),
            stdout,
            stderr,
            duration,
            timed_out: false,
        }),
        None => {
            let secs = timeout.map(|t| t.as_secs()).unwrap_or_default();
            stderr.push_str(&format!("\n[Process killed after {secs}s timeout]"));
            Ok(CommandOutcome {
                success: false,
                exit_code: None,
                stdout,
                stderr,
                duration,
                timed_out: true,
            })
        }
    }
}

fn spawn(argv: &[String], dir: &Path) -> Result<Child> {
    let Some((program, args)) = argv.split_first() else {
        bail!("No command given");
    };

    let mut cmd = if args.is_empty() && program.contains(char::is_whitespace) {
        shell_command(program)
    } else {
        let mut c = Command::new(program);
        c.args(args);
        c
    };

    cmd.current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    cmd.spawn()
        .with_context(|| format!("Failed to spawn '{}' in {}", argv.join(" "), dir.display()))
}

fn shell_command(line: &str) -> Command {
    if cfg!(target_family = "unix") {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    } else {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    }
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    match stream {
        Some(stream) => {
            thread::spawn(move || {
                let _ = tx.send(read_stream_to_string(stream));
            });
        }
        None => {
            let _ = tx.send(String::new());
        }
    }
    rx
}

/// Read a stream to string, keeping at most MAX_OUTPUT_SIZE bytes
fn read_stream_to_string<R: Read>(mut stream: R) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                let to_copy = n.min(MAX_OUTPUT_SIZE.saturating_sub(buf.len()));
                buf.extend_from_slice(&chunk[..to_copy]);
                if to_copy < n {
                    // Keep draining so the child never sees a broken pipe
                    let mut discard = [0u8; 8192];
                    while stream.read(&mut discard).unwrap_or(0) > 0 {}
                    buf.extend_from_slice(b"\n[output truncated at 10MB]");
                    break;
                }
            }
            Err(_) => {
                if buf.is_empty() {
                    return "[error reading output]".to_string();
                }
                break;
            }
        }
    }

    String::from_utf8_lossy(&buf).to_string()
}

fn kill_child_process(child: &mut Child) {
    // The process may already have exited
    let _ = child.kill();
    let _ = child.wait();
}

/// Marker files identifying a project's toolchain, most specific first
const PROJECT_KINDS: &[(&str, &[&str])] = &[
    ("Node.js", &["package.json"]),
    ("SQL Server Database", &["*.sqlproj"]),
    (".NET/C#", &["*.csproj", "*.fsproj", "*.vbproj", "*.sln"]),
    ("Python", &["requirements.txt", "setup.py", "pyproject.toml", "Pipfile"]),
    ("Java", &["pom.xml", "build.gradle", "build.gradle.kts"]),
    ("Go", &["go.mod", "go.sum"]),
    ("Rust", &["Cargo.toml"]),
    ("Ruby", &["Gemfile", "Rakefile"]),
    ("PHP", &["composer.json"]),
    ("Docker", &["Dockerfile", "docker-compose.yml"]),
];

/// Name of the first project kind whose marker files exist in `dir`
pub fn detect_project_type(dir: &Path) -> &'static str {
    PROJECT_KINDS
        .iter()
        .find(|(_, markers)| markers.iter().any(|marker| has_marker(dir, marker)))
        .map(|(name, _)| *name)
        .unwrap_or("Unknown")
}

fn has_marker(dir: &Path, marker: &str) -> bool {
    if !marker.contains('*') {
        return dir.join(marker).exists();
    }
    let pattern = dir.join(marker);
    glob(&pattern.to_string_lossy())
        .map(|mut paths| paths.any(|p| p.is_ok()))
        .unwrap_or(false)
}
