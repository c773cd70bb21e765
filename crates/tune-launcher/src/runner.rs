//! Process execution: detached launches and streaming log tails.

use crate::command::Platform;
use crate::error::{LaunchError, LaunchResult};
use crate::plot::{PlotCollector, PlotSeries};
use futures::stream::{self, Stream};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tracing::warn;

/// One refresh of the streamed log view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogUpdate {
    /// The buffered lines joined by newlines.
    pub text: String,
    /// Every metric seen since the stream started.
    pub plots: Vec<PlotSeries>,
    pub command: String,
}

fn shell(platform: Platform, command: &str) -> Command {
    match platform {
        Platform::Posix => {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
        Platform::Windows => {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        }
    }
}

/// Hand a command line to the OS shell and wait for the shell to return.
///
/// A detached command backgrounds itself, so this returns right away.
pub async fn run_detached(command: &str, platform: Platform) -> LaunchResult<ExitStatus> {
    shell(platform, command)
        .stdin(Stdio::null())
        .status()
        .await
        .map_err(|e| LaunchError::Process(format!("failed to run shell: {e}")))
}

struct Tail<R> {
    reader: BufReader<R>,
    buffer: VecDeque<String>,
    max_lines: usize,
    plots: PlotCollector,
    command: String,
    log: Option<File>,
    child: Option<Child>,
}

impl<R: AsyncRead> Tail<R> {
    fn new(reader: R, max_lines: usize, command: String) -> Self {
        let max_lines = max_lines.max(1);
        Self {
            reader: BufReader::new(reader),
            buffer: VecDeque::with_capacity(max_lines),
            max_lines,
            plots: PlotCollector::new(),
            command,
            log: None,
            child: None,
        }
    }

    fn push(&mut self, line: String) -> LogUpdate {
        if self.buffer.len() >= self.max_lines {
            self.buffer.pop_front();
        }
        self.plots.push(&line);
        self.buffer.push_back(line);
        let lines: Vec<&str> = self.buffer.iter().map(String::as_str).collect();
        LogUpdate {
            text: lines.join("\n"),
            plots: self.plots.series().to_vec(),
            command: self.command.clone(),
        }
    }

    /// Copy a raw line into the run log. A failed write stops logging, not the tail.
    async fn tee(&mut self, raw: &[u8]) {
        let Some(log) = self.log.as_mut() else {
            return;
        };
        if let Err(e) = write_line(log, raw).await {
            warn!(error = %e, "Failed to write run log, continuing without it");
            self.log = None;
        }
    }
}

async fn write_line(log: &mut File, raw: &[u8]) -> std::io::Result<()> {
    log.write_all(raw).await?;
    if !raw.ends_with(b"\n") {
        log.write_all(b"\n").await?;
    }
    log.flush().await
}

fn strip_line_ending(raw: &mut Vec<u8>) {
    if raw.last() == Some(&b'\n') {
        raw.pop();
        if raw.last() == Some(&b'\r') {
            raw.pop();
        }
    }
}

fn tail_stream<R>(tail: Tail<R>) -> impl Stream<Item = LaunchResult<LogUpdate>>
where
    R: AsyncRead + Unpin,
{
    stream::unfold(Some(tail), |state| async move {
        let Some(mut tail) = state else {
            return None;
        };
        // Output is not guaranteed to be UTF-8, so lines are read as bytes.
        let mut raw = Vec::new();
        match tail.reader.read_until(b'\n', &mut raw).await {
            Ok(0) => {
                if let Some(mut child) = tail.child.take() {
                    if let Err(e) = child.wait().await {
                        return Some((Err(e.into()), None));
                    }
                }
                None
            }
            Ok(_) => {
                tail.tee(&raw).await;
                strip_line_ending(&mut raw);
                let line = String::from_utf8_lossy(&raw).into_owned();
                let update = tail.push(line);
                Some((Ok(update), Some(tail)))
            }
            Err(e) => Some((Err(e.into()), None)),
        }
    })
}

/// Yield one update per line read from `reader`, keeping the last `max_lines`.
pub fn tail_lines<R>(reader: R, max_lines: usize, command: String) -> impl Stream<Item = LaunchResult<LogUpdate>>
where
    R: AsyncRead + Unpin,
{
    tail_stream(Tail::new(reader, max_lines, command))
}

/// Spawn `command` with stderr folded into stdout and tail its output.
///
/// When `log_file` is given the merged output is also appended to it,
/// creating its directory first.
pub fn stream_command(
    command: &str,
    platform: Platform,
    max_lines: usize,
    log_file: Option<&Path>,
) -> LaunchResult<impl Stream<Item = LaunchResult<LogUpdate>> + use<>> {
    let log = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            Some(File::from_std(file))
        }
        None => None,
    };

    let merged = match platform {
        Platform::Posix => format!("exec 2>&1; {command}"),
        Platform::Windows => format!("{command} 2>&1"),
    };
    let mut child = shell(platform, &merged)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .spawn()
        .map_err(|e| LaunchError::Process(format!("failed to spawn training process: {e}")))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| LaunchError::Process("failed to capture process output".to_string()))?;

    let mut tail = Tail::new(stdout, max_lines, command.to_string());
    tail.log = log;
    tail.child = Some(child);
    Ok(tail_stream(tail))
}
