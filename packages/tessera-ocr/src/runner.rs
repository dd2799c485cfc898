//! Launching the engine and waiting for it under a wall-clock budget.

use std::ffi::OsString;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::engine::{OcrError, Result};

/// Exit status recorded for a process killed after its timeout.
pub const TIMEOUT_STATUS: i32 = -1;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const GRACE_PERIOD: Duration = Duration::from_secs(1);

/// How a launched process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    Completed(i32),
    TimedOut,
}

impl ProcessExit {
    pub fn status(self) -> i32 {
        match self {
            ProcessExit::Completed(status) => status,
            ProcessExit::TimedOut => TIMEOUT_STATUS,
        }
    }
}

/// Runs the engine with `args` (program first) and returns its stdout, which
/// is empty unless `capture_stdout` is set.
///
/// A zero `timeout` waits indefinitely. Nonzero exits become
/// [`OcrError::EngineError`] carrying the engine's stderr.
pub fn run_engine(args: &[OsString], capture_stdout: bool, timeout: Duration) -> Result<Vec<u8>> {
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| OcrError::InvalidInput("empty argument vector".to_string()))?;
    log::debug!("{:?}", args);

    let mut command = Command::new(program);
    command
        .args(rest)
        .stdin(Stdio::piped())
        .stderr(Stdio::piped())
        .stdout(if capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        });
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(|e| spawn_error(e, program))?;

    // No input is ever fed to the engine.
    drop(child.stdin.take());
    let stderr = child.stderr.take().map(drain);
    let stdout = child.stdout.take().map(drain);

    let exit = match wait(&mut child, timeout) {
        Ok(exit) => exit,
        Err(e) => {
            force_kill(&mut child);
            if let Err(e) = child.wait() {
                log::debug!("reap after failed wait: {}", e);
            }
            reap_readers([stderr, stdout], GRACE_PERIOD);
            return Err(e.into());
        }
    };
    if exit == ProcessExit::TimedOut {
        log::info!(
            "engine timed out after {:?}, status set to {}",
            timeout,
            exit.status()
        );
        reap_readers([stderr, stdout], GRACE_PERIOD);
        return Err(OcrError::Timeout(timeout));
    }

    let stderr = collect(stderr)?;
    let stdout = collect(stdout)?;
    match exit.status() {
        0 => Ok(stdout),
        status => Err(OcrError::EngineError {
            status,
            message: join_errors(&stderr),
        }),
    }
}

/// Runs a short query such as `--version`. Returns the exit status and
/// stdout followed by stderr.
pub fn run_query(args: &[OsString]) -> Result<(i32, Vec<u8>)> {
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| OcrError::InvalidInput("empty argument vector".to_string()))?;
    log::debug!("{:?}", args);

    let output = Command::new(program)
        .args(rest)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(e, program))?;

    let mut combined = output.stdout;
    combined.extend_from_slice(&output.stderr);
    Ok((exit_code(output.status), combined))
}

/// Joins stderr lines with single spaces.
pub fn join_errors(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn spawn_error(e: io::Error, program: &OsString) -> OcrError {
    if e.kind() == io::ErrorKind::NotFound {
        OcrError::EngineNotFound(program.to_string_lossy().into_owned())
    } else {
        OcrError::Io(e)
    }
}

type Reader = JoinHandle<io::Result<Vec<u8>>>;

fn drain<R: Read + Send + 'static>(mut reader: R) -> Reader {
    thread::spawn(move || {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(handle: Option<Reader>) -> io::Result<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| io::Error::other("output reader thread panicked"))?,
        None => Ok(Vec::new()),
    }
}

/// Joins the output readers of a killed engine. A reader still blocked once
/// `grace` has passed reads a pipe that a descendant outside the process
/// group holds open; it is detached and ends when that pipe closes. Returns
/// the number of detached readers.
fn reap_readers(readers: [Option<Reader>; 2], grace: Duration) -> usize {
    let deadline = Instant::now() + grace;
    let mut detached = 0;
    for reader in readers.into_iter().flatten() {
        while !reader.is_finished() && Instant::now() < deadline {
            thread::sleep(POLL_INTERVAL);
        }
        if reader.is_finished() {
            if let Ok(Err(e)) = reader.join() {
                log::debug!("output reader of killed engine: {}", e);
            }
        } else {
            log::warn!("engine output still held open after kill, detaching reader");
            detached += 1;
        }
    }
    detached
}

fn wait(child: &mut Child, timeout: Duration) -> io::Result<ProcessExit> {
    if timeout.is_zero() {
        return Ok(ProcessExit::Completed(exit_code(child.wait()?)));
    }

    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(ProcessExit::Completed(exit_code(status)));
        }
        let now = Instant::now();
        if now >= deadline {
            kill(child)?;
            return Ok(ProcessExit::TimedOut);
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}

/// Asks the process group to stop, then force-kills it after the grace
/// period and reaps the child.
fn kill(child: &mut Child) -> io::Result<()> {
    terminate(child);

    let grace = Instant::now() + GRACE_PERIOD;
    while Instant::now() < grace {
        if child.try_wait()?.is_some() {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    force_kill(child);
    child.wait()?;
    Ok(())
}

#[cfg(unix)]
fn terminate(child: &Child) {
    signal_group(child, libc::SIGTERM);
}

#[cfg(unix)]
fn force_kill(child: &mut Child) {
    signal_group(child, libc::SIGKILL);
    if let Err(e) = child.kill() {
        log::debug!("kill after group signal: {}", e);
    }
}

#[cfg(unix)]
fn signal_group(child: &Child, signal: libc::c_int) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created for this child.
    let rc = unsafe { libc::killpg(pgid, signal) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            log::warn!("failed to signal process group {}: {}", pgid, err);
        }
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("terminate: {}", e);
    }
}

#[cfg(not(unix))]
fn force_kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("kill: {}", e);
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(TIMEOUT_STATUS)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(TIMEOUT_STATUS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<OsString> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[test]
    fn test_join_errors() {
        let stderr = b"  Error opening data file\nPlease make sure the TESSDATA_PREFIX\n\n";
        assert_eq!(
            join_errors(stderr),
            "Error opening data file Please make sure the TESSDATA_PREFIX"
        );
    }

    #[test]
    fn test_missing_binary() {
        let args = vec![OsString::from("tessera-no-such-engine-binary")];
        let err = run_engine(&args, false, Duration::ZERO).unwrap_err();
        assert!(matches!(err, OcrError::EngineNotFound(ref name) if name == "tessera-no-such-engine-binary"));
    }

    #[test]
    fn test_empty_args() {
        assert!(matches!(
            run_engine(&[], false, Duration::ZERO),
            Err(OcrError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_timeout_status_sentinel() {
        assert_eq!(ProcessExit::TimedOut.status(), -1);
        assert_eq!(ProcessExit::Completed(3).status(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout() {
        let out = run_engine(&sh("printf 'hello'"), true, Duration::ZERO).unwrap();
        assert_eq!(out, b"hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_discards_stdout() {
        let out = run_engine(&sh("printf 'hello'"), false, Duration::ZERO).unwrap();
        assert!(out.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit() {
        let err = run_engine(&sh("echo 'bad thing' >&2; echo 'happened' >&2; exit 3"), false, Duration::ZERO)
            .unwrap_err();
        match err {
            OcrError::EngineError { status, message } => {
                assert_eq!(status, 3);
                assert_eq!(message, "bad thing happened");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let started = Instant::now();
        let err = run_engine(&sh("sleep 30"), false, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, OcrError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_reap_readers_joins_finished_and_detaches_blocked() {
        let finished: Reader = thread::spawn(|| Ok(b"partial".to_vec()));
        let blocked: Reader = thread::spawn(|| {
            thread::sleep(Duration::from_secs(3));
            Ok(Vec::new())
        });

        let started = Instant::now();
        assert_eq!(reap_readers([Some(finished), None], Duration::from_secs(5)), 0);
        assert_eq!(reap_readers([Some(blocked), None], Duration::from_millis(100)), 1);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_timeout_returns_while_escaped_child_holds_pipes() {
        let started = Instant::now();
        let err = run_engine(
            &sh("setsid sleep 4 & sleep 30"),
            true,
            Duration::from_millis(200),
        )
        .unwrap_err();
        assert!(matches!(err, OcrError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_stdin_is_closed() {
        let out = run_engine(&sh("cat; printf done"), true, Duration::from_secs(10)).unwrap();
        assert_eq!(out, b"done");
    }

    #[cfg(unix)]
    #[test]
    fn test_query_merges_streams() {
        let (status, out) = run_query(&sh("printf out; printf err >&2; exit 1")).unwrap();
        assert_eq!(status, 1);
        assert_eq!(out, b"outerr");
    }
}
