//! Engine subprocess execution.
//!
//! Spawns one ffmpeg process per export with piped stdio, forwards output
//! as an ordered event stream, and supports cooperative cancellation: `q`
//! on stdin first, a kill after a grace period if the process lingers.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::warn;

use super::events::{derive_status, ExportEvent, ExportOutcome};
use crate::command::format_tokens_pretty;
use crate::logging::ExportLogger;

const CANCEL_GRACE: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// ffmpeg's exit code after catching `q` or a termination signal.
const CANCEL_EXIT_CODE: i32 = 255;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("an export is already running")]
    AlreadyRunning,
    #[error("failed to launch engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("engine exited with code {exit_code}")]
    EngineFailed {
        exit_code: i32,
        log: String,
        command: String,
    },
}

/// Handle for cancelling a running export.
#[derive(Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The runner sends `q` to the engine, waits out
    /// a grace period, then kills the process.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Runs engine subprocesses, one export at a time.
pub struct ExportRunner {
    binary: PathBuf,
    active: Mutex<()>,
}

impl ExportRunner {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            active: Mutex::new(()),
        }
    }

    /// Run one export to completion.
    ///
    /// Blocks the calling thread; a second call while one is in flight
    /// returns [`ExportError::AlreadyRunning`] instead of queueing.
    pub fn run(
        &self,
        tokens: &[String],
        output_path: &Path,
        logger: &ExportLogger,
        events: &Sender<ExportEvent>,
        cancel: &CancelHandle,
    ) -> Result<ExportOutcome, ExportError> {
        let _guard = self.active.try_lock().ok_or(ExportError::AlreadyRunning)?;

        let pretty = format_tokens_pretty(&self.binary.to_string_lossy(), tokens);
        logger.command(&pretty);

        let mut child = Command::new(&self.binary)
            .args(tokens)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(ExportError::Spawn)?;

        let mut stdin = child.stdin.take();
        let (line_tx, line_rx) = mpsc::channel::<(bool, String)>();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, false, line_tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, true, line_tx.clone()));
        }
        drop(line_tx);

        let mut cancel_sent: Option<Instant> = None;
        loop {
            match line_rx.recv_timeout(POLL_INTERVAL) {
                Ok((stderr, line)) => {
                    logger.engine_line(&line, stderr);
                    let _ = events.send(ExportEvent::Log {
                        line: line.clone(),
                        stderr,
                    });
                    if let Some(status) = derive_status(&line) {
                        let _ = events.send(ExportEvent::Progress(line));
                        let _ = events.send(ExportEvent::Status(status));
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if cancel.is_cancelled() && cancel_sent.is_none() {
                logger.warn("cancel requested, asking engine to stop");
                if let Some(pipe) = stdin.as_mut() {
                    let _ = pipe.write_all(b"q\n");
                    let _ = pipe.flush();
                }
                cancel_sent = Some(Instant::now());
            }
            if let Some(sent) = cancel_sent {
                if sent.elapsed() >= CANCEL_GRACE && !process_exited(&mut child) {
                    warn!("engine ignored stop request, killing");
                    let _ = child.kill();
                }
            }
        }
        for handle in readers {
            let _ = handle.join();
        }
        drop(stdin);

        let status = child.wait()?;
        let exit_code = status.code().unwrap_or(-1);

        if cancel.is_cancelled() || looks_cancelled(exit_code, &logger.tail()) {
            if output_path.exists() {
                let _ = std::fs::remove_file(output_path);
            }
            logger.info("export cancelled, partial output removed");
            let outcome = ExportOutcome {
                success: true,
                cancelled: true,
                log: logger.transcript(),
                output: None,
            };
            let _ = events.send(ExportEvent::Complete(outcome.clone()));
            return Ok(outcome);
        }

        if status.success() {
            logger.info("export finished");
            let outcome = ExportOutcome {
                success: true,
                cancelled: false,
                log: logger.transcript(),
                output: Some(output_path.to_path_buf()),
            };
            let _ = events.send(ExportEvent::Complete(outcome.clone()));
            Ok(outcome)
        } else {
            logger.error(&format!("engine exited with code {}", exit_code));
            let outcome = ExportOutcome {
                success: false,
                cancelled: false,
                log: logger.transcript(),
                output: None,
            };
            let _ = events.send(ExportEvent::Complete(outcome));
            Err(ExportError::EngineFailed {
                exit_code,
                log: logger.transcript(),
                command: pretty,
            })
        }
    }
}

fn spawn_reader<R>(stream: R, stderr: bool, tx: Sender<(bool, String)>) -> thread::JoinHandle<()>
where
    R: std::io::Read + Send + 'static,
{
    thread::spawn(move || {
        for line in BufReader::new(stream).lines().map_while(Result::ok) {
            if tx.send((stderr, line)).is_err() {
                break;
            }
        }
    })
}

fn process_exited(child: &mut std::process::Child) -> bool {
    matches!(child.try_wait(), Ok(Some(_)))
}

/// An exit matching ffmpeg's reaction to `q` counts as a cancellation
/// even if the flag race lost, as long as the log agrees.
fn looks_cancelled(exit_code: i32, tail: &[String]) -> bool {
    exit_code == CANCEL_EXIT_CODE
        && tail
            .iter()
            .any(|l| l.contains("Exiting normally") || l.contains("received signal"))
}
