//! Child process execution with captured output streams

use std::io::Read;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use nix::sys::signal::{Signal, killpg};
use nix::unistd::Pid;
use shellfn_core::{Result, ShellfnError};

use crate::process::CancelToken;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Everything a finished child produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub status: u32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// How a captured run ended
#[derive(Debug)]
pub enum RunResult {
    Exited(Captured),
    /// The child was killed after cancellation
    Cancelled,
}

/// Run `executable` with `argv` in `cwd`, capturing both streams as bytes.
///
/// The child leads its own process group and is polled until it exits. A cancelled
/// token kills the whole group, so commands that fork cannot keep the run alive.
pub fn run_captured(
    executable: &Path,
    argv: &[String],
    cwd: &Path,
    cancel: &CancelToken,
) -> Result<RunResult> {
    let mut child = Command::new(executable)
        .args(argv)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .spawn()?;
    debug!("Spawned {} (pid {})", executable.display(), child.id());

    let stdout = spawn_reader(child.stdout.take());
    let stderr = spawn_reader(child.stderr.take());

    let status = match wait(&mut child, cancel)? {
        Some(status) => status,
        None => {
            kill_group(&mut child)?;
            child.wait()?;
            // Readers finish once the last holder of the pipes is gone.
            drop(stdout);
            drop(stderr);
            return Ok(RunResult::Cancelled);
        }
    };

    Ok(RunResult::Exited(Captured {
        status: status_code(status),
        stdout: join_reader(stdout, "stdout")?,
        stderr: join_reader(stderr, "stderr")?,
    }))
}

fn wait(child: &mut Child, cancel: &CancelToken) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if cancel.is_cancelled() {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn kill_group(child: &mut Child) -> Result<()> {
    let pgid = Pid::from_raw(child.id() as i32);
    warn!("Killing process group {} after cancellation", pgid);
    if let Err(errno) = killpg(pgid, Signal::SIGKILL) {
        debug!("killpg({}) failed: {}, killing the child only", pgid, errno);
        child.kill()?;
    }
    Ok(())
}

/// Exit status as a number; signal deaths report `128 + signal`
fn status_code(status: ExitStatus) -> u32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code as u32,
        (None, Some(signal)) => 128 + signal as u32,
        (None, None) => 1,
    }
}

fn spawn_reader<R>(stream: Option<R>) -> thread::JoinHandle<std::io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut stream) = stream {
            stream.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    })
}

fn join_reader(
    handle: thread::JoinHandle<std::io::Result<Vec<u8>>>,
    name: &str,
) -> Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| ShellfnError::Io(std::io::Error::other(format!("{} reader panicked", name))))?
        .map_err(ShellfnError::from)
}
