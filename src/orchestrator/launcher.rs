//! Client process launching.
//!
//! # Responsibilities
//! - Spawn the client with the preference exported in its environment
//! - Feed the prompt file on stdin
//! - Read stdout and stderr concurrently, line by line, as they are produced
//! - Scan each line for rate-limit indicators
//! - Keep a bounded tail of output; optionally append everything to a file
//!
//! Lines longer than `MAX_SEGMENT_BYTES` are handled in segments, so a client
//! that never prints a newline cannot grow the read buffers.

use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::config::{CredentialsConfig, OrchestratorConfig};
use crate::observability::metrics;
use crate::orchestrator::detector::RateLimitDetector;
use crate::orchestrator::{OrchestratorError, ProviderPreference};

/// What one client run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOutcome {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub rate_limited: bool,
    /// Tail of the combined output.
    pub output: String,
}

impl ClientOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Starts one client run for a given provider preference.
pub trait ClientLauncher: Send + Sync {
    fn launch(
        &self,
        preference: ProviderPreference,
    ) -> impl Future<Output = Result<ClientOutcome, OrchestratorError>> + Send;
}

/// The external client invocation.
#[derive(Debug, Clone)]
pub struct ClientCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Piped to the client's stdin when set.
    pub prompt_file: Option<PathBuf>,
    /// Every output line is appended here when set.
    pub output_file: Option<PathBuf>,
}

/// Launches the client as a child process.
#[derive(Debug, Clone)]
pub struct ProcessLauncher<D> {
    command: ClientCommand,
    detector: D,
    preference_env: String,
    bedrock_token_env: String,
    tail_bytes: usize,
    echo: bool,
}

impl<D: RateLimitDetector> ProcessLauncher<D> {
    pub fn new(
        command: ClientCommand,
        detector: D,
        orchestrator: &OrchestratorConfig,
        credentials: &CredentialsConfig,
    ) -> Self {
        Self {
            command,
            detector,
            preference_env: orchestrator.preference_env.clone(),
            bedrock_token_env: credentials.bedrock_token_env.clone(),
            tail_bytes: orchestrator.output_tail_bytes,
            echo: true,
        }
    }

    /// Stop mirroring client output onto this process's stdout/stderr.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    fn build_command(&self, preference: ProviderPreference) -> Result<Command, OrchestratorError> {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .env(&self.preference_env, preference.as_str())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // The client must not see the primary credential when told to avoid it.
        if preference == ProviderPreference::Secondary {
            cmd.env_remove(&self.bedrock_token_env);
        }

        match &self.command.prompt_file {
            Some(path) => {
                let file = std::fs::File::open(path).map_err(|source| OrchestratorError::Prompt {
                    path: path.clone(),
                    source,
                })?;
                cmd.stdin(Stdio::from(file));
            }
            None => {
                cmd.stdin(Stdio::null());
            }
        }
        Ok(cmd)
    }

    async fn open_sink(&self) -> Option<File> {
        let path = self.command.output_file.as_ref()?;
        match OpenOptions::new().create(true).append(true).open(path).await {
            Ok(file) => Some(file),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot open output file; not capturing to disk");
                None
            }
        }
    }

    fn spawn_error(&self, source: std::io::Error) -> OrchestratorError {
        OrchestratorError::Spawn {
            program: self.command.program.clone(),
            source,
        }
    }
}

/// Largest piece of a single line held in memory at once.
const MAX_SEGMENT_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

impl<D: RateLimitDetector> ClientLauncher for ProcessLauncher<D> {
    async fn launch(&self, preference: ProviderPreference) -> Result<ClientOutcome, OrchestratorError> {
        let mut child = self
            .build_command(preference)?
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        metrics::record_spawn(preference);
        tracing::info!(program = %self.command.program, preference = %preference, pid = ?child.id(), "Client started");

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(self.spawn_error(std::io::Error::other("client output was not captured")));
        };
        let mut stdout = BufReader::new(stdout);
        let mut stderr = BufReader::new(stderr);
        let (mut out_buf, mut err_buf) = (Vec::new(), Vec::new());
        let (mut out_open, mut err_open) = (true, true);

        let mut sink = self.open_sink().await;
        let mut echo_out = tokio::io::stdout();
        let mut echo_err = tokio::io::stderr();
        let mut tail = OutputTail::new(self.tail_bytes);
        let mut rate_limited = false;
        // Stream whose unfinished line sits at the back of `tail`.
        let mut unfinished: Option<Stream> = None;

        while out_open || err_open {
            let (stream, read) = tokio::select! {
                read = read_segment(&mut stdout, &mut out_buf), if out_open => (Stream::Stdout, read),
                read = read_segment(&mut stderr, &mut err_buf), if err_open => (Stream::Stderr, read),
            };

            let (buf, open) = match stream {
                Stream::Stdout => (&mut out_buf, &mut out_open),
                Stream::Stderr => (&mut err_buf, &mut err_open),
            };
            match read {
                Ok(0) => *open = false,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(stream = ?stream, error = %e, "Failed reading client output");
                    *open = false;
                }
            }
            if buf.is_empty() {
                continue;
            }

            let line_end = buf.last() == Some(&b'\n') || !*open;
            let take = if line_end { buf.len() } else { complete_utf8_len(buf) };
            if take == 0 {
                continue;
            }
            let segment: Vec<u8> = buf.drain(..take).collect();
            let mut text = String::from_utf8_lossy(&segment).into_owned();
            if line_end {
                let trimmed = text.trim_end_matches(['\r', '\n']).len();
                text.truncate(trimmed);
            }

            if !rate_limited && self.detector.is_rate_limited(&text) {
                rate_limited = true;
                tracing::warn!(preference = %preference, line = %text, "Rate-limit indicator in client output");
            }

            let written = if line_end { format!("{}\n", text) } else { text.clone() };
            if self.echo {
                let echo = match stream {
                    Stream::Stdout => echo_out.write_all(written.as_bytes()).await,
                    Stream::Stderr => echo_err.write_all(written.as_bytes()).await,
                };
                if let Err(e) = echo {
                    tracing::debug!(error = %e, "Echo of client output failed");
                }
            }
            if let Some(file) = sink.as_mut() {
                if let Err(e) = file.write_all(written.as_bytes()).await {
                    tracing::warn!(error = %e, "Writing output file failed; disabling capture");
                    sink = None;
                }
            }

            if unfinished == Some(stream) {
                tail.extend_last(&text);
            } else {
                tail.push(&text);
            }
            unfinished = if line_end { None } else { Some(stream) };
        }

        let status = child.wait().await.map_err(|e| self.spawn_error(e))?;
        if let Some(mut file) = sink {
            let _ = file.flush().await;
        }
        let _ = echo_out.flush().await;

        tracing::info!(preference = %preference, status = %status, rate_limited, "Client exited");
        Ok(ClientOutcome {
            exit_code: status.code(),
            rate_limited,
            output: tail.into_string(),
        })
    }
}

/// Read up to the next newline, never letting `buf` exceed `MAX_SEGMENT_BYTES`.
///
/// Bytes already read stay in `buf` if the future is dropped, so this is safe
/// to race in `select!`.
async fn read_segment<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_SEGMENT_BYTES.saturating_sub(buf.len()) as u64;
    let mut limited = AsyncReadExt::take(&mut *reader, limit);
    limited.read_until(b'\n', buf).await
}

/// Length of the prefix of `bytes` that does not end inside a character.
fn complete_utf8_len(bytes: &[u8]) -> usize {
    match std::str::from_utf8(bytes) {
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        _ => bytes.len(),
    }
}

/// The last `cap` bytes of output, kept as lines.
#[derive(Debug)]
struct OutputTail {
    lines: VecDeque<String>,
    bytes: usize,
    cap: usize,
}

impl OutputTail {
    fn new(cap: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            bytes: 0,
            cap,
        }
    }

    fn push(&mut self, line: &str) {
        self.bytes += line.len() + 1;
        self.lines.push_back(line.to_string());
        self.trim();
    }

    /// Append to the most recent line, which is still being written.
    fn extend_last(&mut self, text: &str) {
        match self.lines.back_mut() {
            Some(last) => {
                last.push_str(text);
                self.bytes += text.len();
                self.trim();
            }
            None => self.push(text),
        }
    }

    /// Drop whole lines from the front, then cut into the oldest one.
    fn trim(&mut self) {
        while self.bytes > self.cap {
            let excess = self.bytes - self.cap;
            let Some(front) = self.lines.front_mut() else {
                break;
            };
            if front.len() + 1 <= excess {
                self.bytes -= front.len() + 1;
                self.lines.pop_front();
                continue;
            }
            let mut cut = excess;
            while !front.is_char_boundary(cut) {
                cut += 1;
            }
            front.drain(..cut);
            self.bytes -= cut;
        }
    }

    fn into_string(self) -> String {
        Vec::from(self.lines).join("\n")
    }
}
