//! The one place where commands run (or, in dry-run mode, get printed).

use std::io::{self, Write};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::warn;

use crate::commands::CommandLine;

/// Runs a command to completion and reports its exit code.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    async fn run(&mut self, command: &CommandLine) -> Result<i32>;
}

/// Spawns the real program with inherited stdio.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(&mut self, command: &CommandLine) -> Result<i32> {
        tracing::info!("Spawning: {}", command);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let status = cmd
            .status()
            .await
            .with_context(|| format!("Failed to execute {}", command.program))?;

        if !status.success() {
            tracing::debug!("{} finished with a non-zero status: {}", command.program, status);
        }
        Ok(exit_code(status))
    }
}

/// Exit code as a shell would report it; death by signal is `128 + signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Output and error streams for user-facing messages.
#[derive(Clone)]
pub struct Console {
    out: Arc<Mutex<dyn Write + Send>>,
    err: Arc<Mutex<dyn Write + Send>>,
}

impl Console {
    pub fn stdio() -> Self {
        Self {
            out: Arc::new(Mutex::new(io::stdout())),
            err: Arc::new(Mutex::new(io::stderr())),
        }
    }

    pub fn out(&self, line: impl AsRef<str>) {
        write_line(&self.out, line.as_ref());
    }

    pub fn err(&self, line: impl AsRef<str>) {
        write_line(&self.err, line.as_ref());
    }
}

fn write_line(stream: &Mutex<dyn Write + Send>, line: &str) {
    let Ok(mut stream) = stream.lock() else {
        warn!("Console stream is poisoned, dropped: {line}");
        return;
    };
    if let Err(err) = writeln!(stream, "{line}").and_then(|()| stream.flush()) {
        warn!("Failed to write console output: {err}");
    }
}

/// Echoes and runs commands, or only prints them in dry-run mode.
pub struct Executor<R> {
    runner: R,
    console: Console,
    dry_run: bool,
}

impl<R: CommandRunner> Executor<R> {
    pub fn new(runner: R, console: Console, dry_run: bool) -> Self {
        Self {
            runner,
            console,
            dry_run,
        }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub async fn execute(&mut self, command: &CommandLine) -> Result<i32> {
        if self.dry_run {
            self.console.out(command.to_string());
            return Ok(0);
        }

        self.console.err(format!("$ {command}"));
        self.console.err("");
        self.runner.run(command).await
    }

    #[cfg(test)]
    pub fn runner(&self) -> &R {
        &self.runner
    }
}
