//! Spawning the benchmarked command
//!
//! The [`Launcher`] trait is the seam between the run loop and the OS:
//! [`CommandLauncher`] spawns real child processes, tests plug in scripted ones.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use tracing::{debug, info, warn};

use crate::error::{BenchError, BenchResult, ProbeError};
use crate::monitor::{LiveProcess, Observation, ObservedProcess, ProcessState};
use crate::report::layout::OutputLayout;

/// Starts the attempts of a benchmark
pub trait Launcher {
    type Process: ObservedProcess;

    /// Start attempt `index` and attach an observer to it.
    fn launch(&mut self, index: usize) -> BenchResult<Self::Process>;

    /// Release attempt `index` once sampling has ended. `completed` is false
    /// when sampling was aborted and the process may still be running.
    fn finish(&mut self, index: usize, process: Self::Process, completed: bool);

    /// Run the post-run command after attempt `index`.
    ///
    /// Returns the exit code, or `None` when no post-run command is configured.
    fn post_run(&mut self, index: usize) -> BenchResult<Option<i32>>;
}

/// Program and arguments of a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Tokenize a command line, honouring quotes and backslash escapes
    pub fn parse(line: &str) -> BenchResult<Self> {
        let mut tokens = split_command(line)?.into_iter();
        let program = tokens
            .next()
            .ok_or_else(|| BenchError::InvalidCommand("empty command".into()))?;
        Ok(Self {
            program,
            args: tokens.collect(),
        })
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

/// Split a command line into tokens.
///
/// Whitespace separates tokens; single quotes keep everything literal;
/// double quotes keep whitespace and allow `\"` and `\\`; a backslash outside
/// quotes escapes the next character.
pub fn split_command(line: &str) -> BenchResult<Vec<String>> {
    #[derive(PartialEq)]
    enum Quote {
        None,
        Single,
        Double,
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote = Quote::None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match quote {
            Quote::Single => {
                if c == '\'' {
                    quote = Quote::None;
                } else {
                    current.push(c);
                }
            }
            Quote::Double => match c {
                '"' => quote = Quote::None,
                '\\' => match chars.next() {
                    Some(next @ ('"' | '\\')) => current.push(next),
                    Some(next) => {
                        current.push('\\');
                        current.push(next);
                    }
                    None => return Err(BenchError::InvalidCommand("trailing backslash".into())),
                },
                _ => current.push(c),
            },
            Quote::None => match c {
                '\'' => {
                    quote = Quote::Single;
                    in_token = true;
                }
                '"' => {
                    quote = Quote::Double;
                    in_token = true;
                }
                '\\' => {
                    let next = chars
                        .next()
                        .ok_or_else(|| BenchError::InvalidCommand("trailing backslash".into()))?;
                    current.push(next);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if quote != Quote::None {
        return Err(BenchError::InvalidCommand(format!("unterminated quote in `{}`", line)));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// A spawned child together with its observer
pub struct SpawnedRun {
    child: Child,
    process: LiveProcess,
}

impl ObservedProcess for SpawnedRun {
    fn pid(&self) -> u32 {
        self.process.pid()
    }

    fn observe(&mut self, capture_environ: bool) -> Result<Observation, ProbeError> {
        self.process.observe(capture_environ)
    }

    fn state(&mut self) -> Result<ProcessState, ProbeError> {
        self.process.state()
    }
}

/// Kill and reap a child no observer could be attached to
fn reap_unobserved(index: usize, mut child: Child) -> Option<ExitStatus> {
    if let Err(e) = child.kill() {
        debug!("Run {}: kill after failed attach failed: {}", index, e);
    }
    match child.wait() {
        Ok(status) => {
            debug!("Run {}: unobserved process exited with {}", index, status);
            Some(status)
        }
        Err(e) => {
            debug!("Run {}: could not reap unobserved process: {}", index, e);
            None
        }
    }
}

/// Launches the command as a child process per attempt
pub struct CommandLauncher {
    command: CommandSpec,
    post_command: Option<CommandSpec>,
    layout: OutputLayout,
}

impl CommandLauncher {
    pub fn new(command: CommandSpec, post_command: Option<CommandSpec>, layout: OutputLayout) -> Self {
        Self {
            command,
            post_command,
            layout,
        }
    }

    fn output_file(&self, index: usize) -> BenchResult<(PathBuf, File)> {
        let path = self.layout.run_output(index);
        let file = File::create(&path)?;
        Ok((path, file))
    }
}

impl Launcher for CommandLauncher {
    type Process = SpawnedRun;

    fn launch(&mut self, index: usize) -> BenchResult<SpawnedRun> {
        let (path, out) = self.output_file(index)?;
        let err = out.try_clone()?;

        let mut child = self
            .command
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::from(err))
            .spawn()
            .map_err(|source| BenchError::Spawn {
                program: self.command.program.clone(),
                source,
            })?;

        info!("Run {}: started process {} (output: {})", index, child.id(), path.display());

        match LiveProcess::attach(Some(child.id())) {
            Ok(process) => Ok(SpawnedRun { child, process }),
            Err(e) => {
                reap_unobserved(index, child);
                Err(e.into())
            }
        }
    }

    fn finish(&mut self, index: usize, mut run: SpawnedRun, completed: bool) {
        if !completed {
            if let Err(e) = run.child.kill() {
                debug!("Run {}: kill failed: {}", index, e);
            }
        }
        match run.child.wait() {
            Ok(status) => debug!("Run {}: process exited with {}", index, status),
            Err(e) => warn!("Run {}: could not reap process: {}", index, e),
        }
    }

    fn post_run(&mut self, index: usize) -> BenchResult<Option<i32>> {
        let Some(post) = &self.post_command else {
            return Ok(None);
        };

        let path = self.layout.run_output(index);
        let mut out = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(out, "{} POSTCMD {}", "=".repeat(39), "=".repeat(39))?;
        let err = out.try_clone()?;

        let status = post
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::from(err))
            .status()
            .map_err(|source| BenchError::Spawn {
                program: post.program.clone(),
                source,
            })?;

        // Killed by a signal: no exit code
        Ok(Some(status.code().unwrap_or(-1)))
    }
}
