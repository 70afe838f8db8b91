//! Command builder - turns an external program into an [`Action`]

use super::{ProcessHandle, ProcessMonitor, TrackedProcess};
use crate::console::Message;
use crate::core::{Action, Context, Failure, Outcome};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long output of a killed process is read before it is given up on
const OUTPUT_GRACE: Duration = Duration::from_millis(500);

/// Where the output of a process goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Redirect {
    /// Write each line to the console through the step context
    #[default]
    Print,
    /// Keep the output in the [`ProcessResult`] only
    Capture,
    /// Print and capture
    Both,
    /// Let the child write straight to the parent's stdout and stderr
    Inherit,
}

impl Redirect {
    fn prints(self) -> bool {
        matches!(self, Redirect::Print | Redirect::Both)
    }

    fn captures(self) -> bool {
        matches!(self, Redirect::Capture | Redirect::Both)
    }
}

/// Which exit codes count as success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitCodeCheck {
    #[default]
    Zero,
    Code(i32),
    /// Any exit, including termination by a signal
    Any,
}

impl ExitCodeCheck {
    pub fn accepts(self, code: Option<i32>) -> bool {
        match self {
            ExitCodeCheck::Zero => code == Some(0),
            ExitCodeCheck::Code(expected) => code == Some(expected),
            ExitCodeCheck::Any => true,
        }
    }
}

/// What a finished process left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// Captured stdout; empty unless the redirect captures
    pub stdout: String,
    /// Captured stderr; empty unless the redirect captures
    pub stderr: String,
}

/// An external command
///
/// ```no_run
/// use stagehand::process::Cmd;
/// use std::time::Duration;
///
/// let build = Cmd::new("cargo")
///     .args(["build", "--workspace"])
///     .timeout(Duration::from_secs(600))
///     .run();
/// ```
#[derive(Debug, Clone)]
pub struct Cmd {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
    redirect: Redirect,
    exit_code: ExitCodeCheck,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            timeout: None,
            redirect: Redirect::default(),
            exit_code: ExitCodeCheck::default(),
        }
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

    /// Working directory of the child
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Set an environment variable for the child
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Kill the process and fail with a recoverable error after `limit`
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn redirect(mut self, redirect: Redirect) -> Self {
        self.redirect = redirect;
        self
    }

    pub fn check_exit_code(mut self, check: ExitCodeCheck) -> Self {
        self.exit_code = check;
        self
    }

    /// Command line as shown to the user
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Action that runs the command and yields its [`ProcessResult`]
    pub fn result(&self) -> Action<ProcessResult> {
        let cmd = self.clone();
        Action::new(move |ctx| {
            let cmd = cmd.clone();
            async move { cmd.execute(&ctx).await }
        })
    }

    /// Action that runs the command for its side effects
    pub fn run(&self) -> Action<()> {
        self.result().ignore()
    }

    async fn execute(&self, ctx: &Context) -> Outcome<ProcessResult> {
        let command_line = self.display();
        ctx.write([Message::verbose("> ").text(command_line.clone())]);

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(self.env.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::null());
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        if self.redirect != Redirect::Inherit {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        // Own group, so a kill also reaches whatever the program spawned.
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| {
            warn!("failed to spawn {}: {}", command_line, e);
            Failure::recoverable(format!("Failed to start {}: {}", self.program, e))
        })?;
        let stdout = child.stdout.take().map(|out| self.read_lines(out, ctx));
        let stderr = child.stderr.take().map(|err| self.read_lines(err, ctx));

        let handle = ProcessHandle::watch_group(child);
        debug!("spawned process {}: {}", handle.id(), command_line);

        let monitor = ctx.process_monitor();
        let mut tracked = Tracked::new(handle.clone(), monitor.clone());
        monitor.add(&handle).await?;
        // Catches a cancellation that landed before the process was tracked.
        if ctx.cancellation().is_cancelled() {
            monitor.kill(&handle).await?;
        }

        let (exit_code, timed_out) = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, handle.wait()).await {
                Ok(code) => (code, false),
                Err(_) => {
                    warn!("{} timed out after {:?}, killing it", command_line, limit);
                    monitor.kill(&handle).await?;
                    (handle.wait().await, true)
                }
            },
            None => (handle.wait().await, false),
        };

        monitor.remove(&handle).await?;
        tracked.finish();
        let killed = monitor.is_killed(&handle).await?;
        // Output of a killed program may be held open by stragglers.
        let grace = (killed || timed_out).then_some(OUTPUT_GRACE);

        let result = ProcessResult {
            exit_code,
            stdout: collect(stdout, grace).await,
            stderr: collect(stderr, grace).await,
        };

        if killed && !timed_out {
            return Err(Failure::abort(format!("{} was killed", command_line)));
        }
        if timed_out {
            let limit = self.timeout.unwrap_or_default();
            return Err(Failure::recoverable(format!(
                "{} timed out after {:?}",
                command_line, limit
            )));
        }
        if !self.exit_code.accepts(exit_code) {
            let status = match exit_code {
                Some(code) => format!("exited with code {}", code),
                None => "was terminated by a signal".to_string(),
            };
            let mut messages = vec![format!("{} {}", command_line, status)];
            if self.redirect == Redirect::Capture {
                messages.extend(result.stderr.lines().map(str::to_string));
            }
            return Err(Failure::Recoverable(messages));
        }

        Ok(result)
    }

    fn read_lines<R>(&self, reader: R, ctx: &Context) -> JoinHandle<String>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let redirect = self.redirect;
        let ctx = ctx.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            let mut captured = String::new();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if redirect.captures() {
                            captured.push_str(&line);
                            captured.push('\n');
                        }
                        if redirect.prints() {
                            ctx.write([Message::info(line)]);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("stopped reading process output: {}", e);
                        break;
                    }
                }
            }
            captured
        })
    }
}

/// Kills and untracks the process if the running action is dropped
/// before the process was waited on
struct Tracked {
    handle: ProcessHandle,
    monitor: ProcessMonitor,
    finished: bool,
}

impl Tracked {
    fn new(handle: ProcessHandle, monitor: ProcessMonitor) -> Self {
        Self {
            handle,
            monitor,
            finished: false,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        debug!("abandoned process {}, killing it", self.handle.id());
        let _ = self.handle.kill();
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let handle = self.handle.clone();
            let monitor = self.monitor.clone();
            runtime.spawn(async move {
                let _ = monitor.remove(&handle).await;
            });
        }
    }
}

async fn collect(reader: Option<JoinHandle<String>>, grace: Option<Duration>) -> String {
    let Some(mut reader) = reader else {
        return String::new();
    };
    let joined = match grace {
        Some(grace) => match tokio::time::timeout(grace, &mut reader).await {
            Ok(joined) => joined,
            Err(_) => {
                debug!("output still open {:?} after kill, dropping it", grace);
                reader.abort();
                return String::new();
            }
        },
        None => reader.await,
    };
    match joined {
        Ok(output) => output,
        Err(e) => {
            warn!("process output reader failed: {}", e);
            String::new()
        }
    }
}
