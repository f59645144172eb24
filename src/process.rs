//! External command execution.
//!
//! Commands are given as a single whitespace-separated string (no shell quoting) or built argument by argument.
//! stderr is merged into stdout line by line; the merged stream is either captured or handed to a per-line callback.
//! An optional wall-clock timeout kills the child.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// How often a child that closed its output is polled for exit while a deadline runs.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("empty command")]
    Empty,

    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command '{command}' timed out after {}s", timeout.as_secs_f64())]
    Timeout {
        command: String,
        timeout: Duration,
        /// Output captured before the child was killed.
        output: String,
    },

    #[error("I/O error while running '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Split `command` on whitespace. Quoting is not interpreted.
    pub fn parse(command: &str) -> Result<Self, ProcessError> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or(ProcessError::Empty)?;
        Ok(Self {
            program: program.to_string(),
            args: parts.map(str::to_string).collect(),
        })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Per-invocation settings.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cwd: Option<PathBuf>,
    /// Suppress the exit-code log line.
    pub quiet: bool,
    pub timeout: Option<Duration>,
    /// Variables to set (`Some`) or remove (`None`) in the child.
    pub env: Vec<(String, Option<OsString>)>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), Some(value.into())));
        self
    }

    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env.push((key.into(), None));
        self
    }
}

/// Exit status and (when captured) the merged output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the child was terminated by a signal.
    pub code: Option<i32>,
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Run `command` and capture its merged output.
pub fn run_cmd(command: &ShellCommand, options: &RunOptions) -> Result<CommandOutput, ProcessError> {
    execute(command, options, None)
}

/// Run `command`, calling `on_line` with each trimmed output line as it arrives. Nothing is captured.
pub fn run_cmd_streaming(
    command: &ShellCommand,
    options: &RunOptions,
    on_line: &mut dyn FnMut(&str),
) -> Result<CommandOutput, ProcessError> {
    execute(command, options, Some(on_line))
}

#[tracing::instrument(skip_all, fields(command = %command))]
fn execute(
    command: &ShellCommand,
    options: &RunOptions,
    mut on_line: Option<&mut dyn FnMut(&str)>,
) -> Result<CommandOutput, ProcessError> {
    let rendered = command.to_string();
    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    for (key, value) in &options.env {
        match value {
            Some(value) => cmd.env(key, value),
            None => cmd.env_remove(key),
        };
    }

    let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        command: rendered.clone(),
        source,
    })?;

    let (tx, rx) = mpsc::channel::<String>();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_line_reader(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_line_reader(stderr, tx.clone()));
    }
    drop(tx);

    let deadline = options.timeout.map(|t| Instant::now() + t);
    let mut captured = String::new();
    let mut deliver = |line: String| match on_line.as_mut() {
        Some(callback) => callback(line.trim()),
        None => {
            captured.push_str(&line);
            captured.push('\n');
        }
    };

    loop {
        let next = match deadline {
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match next {
            Ok(line) => deliver(line),
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                kill(&mut child, &rendered);
                drop(rx);
                let timeout = options.timeout.unwrap_or_default();
                tracing::error!("Command '{rendered}' timed out!");
                return Err(ProcessError::Timeout {
                    command: rendered,
                    timeout,
                    output: captured,
                });
            }
        }
    }

    let status = match wait_until(&mut child, deadline).map_err(|source| ProcessError::Io {
        command: rendered.clone(),
        source,
    })? {
        Some(status) => status,
        None => {
            kill(&mut child, &rendered);
            tracing::error!("Command '{rendered}' timed out!");
            return Err(ProcessError::Timeout {
                command: rendered,
                timeout: options.timeout.unwrap_or_default(),
                output: captured,
            });
        }
    };
    for reader in readers {
        let _ = reader.join();
    }

    let code = status.code();
    if !options.quiet {
        match code {
            Some(code) => tracing::info!("Command '{rendered}' exited with code {code}"),
            None => tracing::info!("Command '{rendered}' was terminated by a signal"),
        }
    }
    Ok(CommandOutput { code, output: captured })
}

/// Forward each line of `pipe` to `tx`. Invalid UTF-8 is replaced rather than ending the stream.
fn spawn_line_reader<R: Read + Send + 'static>(pipe: R, tx: mpsc::Sender<String>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    while buf.last().is_some_and(|b| *b == b'\n' || *b == b'\r') {
                        buf.pop();
                    }
                    if tx.send(String::from_utf8_lossy(&buf).into_owned()).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Wait for exit, giving up at `deadline`.
fn wait_until(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}

fn kill(child: &mut Child, rendered: &str) {
    if let Err(error) = child.kill() {
        tracing::warn!(%error, "failed to kill '{rendered}'");
    }
    let _ = child.wait();
}
