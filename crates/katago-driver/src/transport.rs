//! Engine process transport: owns the subprocess and its line-oriented pipes.
//!
//! No game semantics live here. Other components never touch the process
//! handle or streams directly.

use std::ffi::OsStr;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::debug;

use crate::error::EngineError;

type BoxedReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

pub struct Transport {
    child: Option<Child>,
    writer: BoxedWriter,
    reader: BoxedReader,
    /// Bytes of a line whose newline has not arrived yet. A timed-out read
    /// leaves them here so the next read resumes without loss.
    pending: Vec<u8>,
    closed: bool,
}

impl Transport {
    /// Spawn the engine process with piped stdio.
    pub fn spawn(path: impl AsRef<OsStr>, args: &[String]) -> Result<Self, EngineError> {
        let mut child = Command::new(path)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Process(format!("failed to spawn engine: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Process("engine stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Process("engine stdout unavailable".into()))?;

        Ok(Self {
            child: Some(child),
            writer: Box::new(stdin),
            reader: BufReader::new(Box::new(stdout)),
            pending: Vec::new(),
            closed: false,
        })
    }

    /// Run the protocol over arbitrary streams instead of a child process.
    /// Used by tests to talk to an in-memory engine stub.
    pub fn from_streams(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        Self {
            child: None,
            writer: Box::new(writer),
            reader: BufReader::new(Box::new(reader)),
            pending: Vec::new(),
            closed: false,
        }
    }

    pub async fn write_line(&mut self, line: &str) -> Result<(), EngineError> {
        debug!(line, "engine <");
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(|e| EngineError::Process(format!("failed to write to engine: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| EngineError::Process(format!("failed to flush engine stdin: {e}")))
    }

    /// Read one line, waiting at most `deadline`.
    pub async fn read_line(&mut self, deadline: Duration) -> Result<String, EngineError> {
        match timeout(deadline, self.reader.read_until(b'\n', &mut self.pending)).await {
            Err(_) => Err(EngineError::Timeout(deadline)),
            Ok(Err(e)) => Err(EngineError::Process(format!(
                "failed to read from engine: {e}"
            ))),
            Ok(Ok(0)) => Err(EngineError::Process("engine stdout closed".into())),
            Ok(Ok(_)) => {
                let line = String::from_utf8_lossy(&self.pending)
                    .trim_end()
                    .to_string();
                self.pending.clear();
                debug!(line = %line, "engine >");
                Ok(line)
            }
        }
    }

    /// Ask the engine to exit, wait up to `grace`, then force-kill.
    /// Safe to call more than once.
    pub async fn shutdown(&mut self, grace: Duration) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.write_line("quit").await;
        if let Some(mut child) = self.child.take() {
            if timeout(grace, child.wait()).await.is_err() {
                debug!("engine ignored quit, killing");
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}
