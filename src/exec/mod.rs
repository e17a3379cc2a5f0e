//! Process execution: captured, uncaptured and background runs.

use std::fs::OpenOptions;
use std::io::{self, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio as PStdio};

use tracing::{debug, error, info, warn};

use crate::cmd::{EnvMap, RunOptions, StdinData, Stdio};
use crate::error::{CommandError, Result};
use crate::render::command_line;

mod task;

pub use task::{OutputStream, TaskHandle};

pub trait Executor {
    /// Blocking run capturing standard output as raw bytes.
    fn run_bytes<S: AsRef<str>>(&self, tokens: &[S], env: Option<&EnvMap>, options: RunOptions) -> Result<Vec<u8>>;

    /// Blocking run on the parent's standard streams.
    fn run_cmd<S: AsRef<str>>(&self, tokens: &[S], env: Option<&EnvMap>, options: RunOptions) -> Result<bool>;

    /// Spawn without waiting; the returned handle must be consumed with `wait`.
    fn async_run<S: AsRef<str>>(&self, tokens: &[S], env: Option<&EnvMap>, options: RunOptions) -> Result<TaskHandle>;

    /// Blocking run capturing standard output as text.
    fn run<S: AsRef<str>>(&self, tokens: &[S], env: Option<&EnvMap>, options: RunOptions) -> Result<String> {
        let binary = options.stdout_is_binary();
        self.run_bytes(tokens, env, options).map(|out| decode_output(out, binary))
    }
}

/// Executor backed by `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdExecutor;

pub fn run<S: AsRef<str>>(tokens: &[S], env: Option<&EnvMap>, options: RunOptions) -> Result<String> {
    StdExecutor.run(tokens, env, options)
}

pub fn run_bytes<S: AsRef<str>>(tokens: &[S], env: Option<&EnvMap>, options: RunOptions) -> Result<Vec<u8>> {
    StdExecutor.run_bytes(tokens, env, options)
}

pub fn run_cmd<S: AsRef<str>>(tokens: &[S], env: Option<&EnvMap>, options: RunOptions) -> Result<bool> {
    StdExecutor.run_cmd(tokens, env, options)
}

pub fn async_run<S: AsRef<str>>(tokens: &[S], env: Option<&EnvMap>, options: RunOptions) -> Result<TaskHandle> {
    StdExecutor.async_run(tokens, env, options)
}

impl Executor for StdExecutor {
    fn run_bytes<S: AsRef<str>>(&self, tokens: &[S], env: Option<&EnvMap>, options: RunOptions) -> Result<Vec<u8>> {
        let (mut cmd, line) = prepare(tokens, env, &options)?;
        let RunOptions { allow_failure, stdin_data, .. } = options;
        let stdin_binary = options.binmode || options.stdin_binmode;

        cmd.stdin(if stdin_data.is_some() { PStdio::piped() } else { PStdio::null() });
        let merged = wire_stdout(&mut cmd, &options.stderr, &line)?;

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) if allow_failure => {
                error!(command = %line, error = %source, "failed to spawn, continuing (allow_failure)");
                return Ok(Vec::new());
            }
            Err(source) => return Err(CommandError::SpawnFailed { command: line, source }),
        };
        drop(cmd);
        debug!(pid = child.id(), "spawned");

        let mut stream = OutputStream::take(&mut child, merged, &line)?;
        let stdin = child.stdin.take();
        let mut out = Vec::new();

        // stdin is fed from a helper thread so a chatty child cannot stall on a full stdout pipe
        let (read_result, write_result) = std::thread::scope(|s| {
            let writer = match (stdin, stdin_data) {
                (Some(pipe), Some(data)) => {
                    let line = line.as_str();
                    Some(s.spawn(move || feed_stdin(pipe, data, stdin_binary, line)))
                }
                _ => None,
            };
            let read = stream.read_to_end(&mut out);
            let write = match writer {
                Some(h) => h.join().unwrap_or_else(|p| std::panic::resume_unwind(p)),
                None => Ok(()),
            };
            (read, write)
        });
        drop(stream);

        let status = child.wait().map_err(|source| CommandError::Io { command: line.clone(), source })?;

        let failure = match (read_result, write_result) {
            (Err(source), _) => Some(CommandError::Io { command: line.clone(), source }),
            (_, Err(e)) => Some(e),
            _ if !status.success() => Some(CommandError::CommandFailed { command: line.clone(), code: status.code() }),
            _ => None,
        };
        match failure {
            None => Ok(out),
            Some(e) if allow_failure => {
                error!(command = %line, error = %e, "command failed, continuing (allow_failure)");
                Ok(out)
            }
            Some(e) => Err(e),
        }
    }

    fn run_cmd<S: AsRef<str>>(&self, tokens: &[S], env: Option<&EnvMap>, options: RunOptions) -> Result<bool> {
        let (mut cmd, line) = prepare(tokens, env, &options)?;
        let exception = !options.allow_failure;
        debug!(exception, "blocking run without capture");

        if options.stdin_data.is_some() {
            warn!(command = %line, "stdin_data is not supported by run_cmd, ignoring");
        }
        if options.stderr == Stdio::Stdout {
            cmd.stderr(dup_stdout().map_err(|source| CommandError::Io { command: line.clone(), source })?);
        }

        let status = cmd
            .status()
            .map_err(|source| CommandError::SpawnFailed { command: line.clone(), source })?;
        if status.success() {
            Ok(true)
        } else if exception {
            Err(CommandError::CommandFailed { command: line, code: status.code() })
        } else {
            error!(command = %line, code = ?status.code(), "command failed, continuing (allow_failure)");
            Ok(false)
        }
    }

    fn async_run<S: AsRef<str>>(&self, tokens: &[S], env: Option<&EnvMap>, options: RunOptions) -> Result<TaskHandle> {
        let (mut cmd, line) = prepare(tokens, env, &options)?;
        if options.allow_failure {
            warn!(command = %line, "allow_failure is not supported by async_run, ignoring");
        }
        let stdin_binary = options.stdin_is_binary();
        let stdout_binary = options.stdout_is_binary();

        cmd.stdin(PStdio::piped());
        let merged = wire_stdout(&mut cmd, &options.stderr, &line)?;

        let mut child = cmd
            .spawn()
            .map_err(|source| CommandError::SpawnFailed { command: line.clone(), source })?;
        drop(cmd);
        debug!(pid = child.id(), "spawned in background");

        let stream = OutputStream::take(&mut child, merged, &line)?;
        match (child.stdin.take(), options.stdin_data) {
            (Some(pipe), Some(data)) => {
                if let Err(e) = feed_stdin(pipe, data, stdin_binary, &line) {
                    reap(&mut child);
                    return Err(e);
                }
            }
            // dropping the pipe signals EOF
            (pipe, _) => drop(pipe),
        }

        Ok(TaskHandle::new(child, stream, line, stdout_binary))
    }
}

/// Build the `Command` for `tokens` and log the invocation.
fn prepare<S: AsRef<str>>(tokens: &[S], env: Option<&EnvMap>, options: &RunOptions) -> Result<(Command, String)> {
    let tokens: Vec<&str> = tokens.iter().map(|t| t.as_ref()).collect();
    let (program, args) = tokens.split_first().ok_or(CommandError::EmptyCommand)?;
    let line = command_line(&tokens);

    debug!(command = %line, "about to run");
    info!(?tokens, "running command");

    let mut cmd = Command::new(program);
    cmd.args(args);
    if options.clear_env {
        cmd.env_clear();
    }
    if let Some(vars) = normalize_env(env) {
        cmd.envs(vars);
    }
    if let Some(dir) = &options.chdir {
        cmd.current_dir(dir);
    }
    match &options.stderr {
        Stdio::Inherit => { cmd.stderr(PStdio::inherit()); }
        Stdio::Null => { cmd.stderr(PStdio::null()); }
        Stdio::File { path, append } => {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(*append)
                .truncate(!*append)
                .open(path)
                .map_err(|source| CommandError::Io { command: line.clone(), source })?;
            cmd.stderr(file);
        }
        // wired per mode
        Stdio::Stdout => {}
    }
    Ok((cmd, line))
}

/// `None` when there is nothing to override and the parent environment is inherited as is.
fn normalize_env(env: Option<&EnvMap>) -> Option<&EnvMap> {
    env.filter(|vars| !vars.is_empty())
}

/// Pipe stdout; with stderr merged both ends share one pipe and its reader is returned.
fn wire_stdout(cmd: &mut Command, stderr: &Stdio, line: &str) -> Result<Option<io::PipeReader>> {
    if *stderr != Stdio::Stdout {
        cmd.stdout(PStdio::piped());
        return Ok(None);
    }
    let io_err = |source| CommandError::Io { command: line.to_string(), source };
    let (reader, writer) = io::pipe().map_err(io_err)?;
    cmd.stdout(writer.try_clone().map_err(io_err)?);
    cmd.stderr(writer);
    Ok(Some(reader))
}

#[cfg(unix)]
fn dup_stdout() -> io::Result<PStdio> {
    use std::os::fd::AsFd;
    Ok(PStdio::from(io::stdout().as_fd().try_clone_to_owned()?))
}

#[cfg(windows)]
fn dup_stdout() -> io::Result<PStdio> {
    use std::os::windows::io::AsHandle;
    Ok(PStdio::from(io::stdout().as_handle().try_clone_to_owned()?))
}

/// Write `data` to the child and close its stdin. A child that stopped reading is not an error.
fn feed_stdin(mut pipe: ChildStdin, data: StdinData, binary: bool, command: &str) -> Result<()> {
    let written = match data {
        StdinData::Text(s) => pipe.write_all(&encode_input(s.into_bytes(), binary)),
        StdinData::Bytes(b) => pipe.write_all(&encode_input(b, binary)),
        StdinData::Reader(mut r) => io::copy(&mut r, &mut pipe).map(|n| debug!(bytes = n, "streamed stdin")),
    };
    drop(pipe);
    match written {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            warn!(command, "child closed stdin early, ignoring broken pipe");
            Ok(())
        }
        Err(source) => {
            error!(command, error = %source, "failed writing to child stdin");
            Err(CommandError::Io { command: command.to_string(), source })
        }
    }
}

fn reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(error = %e, "kill after failed stdin write");
    }
    if let Err(e) = child.wait() {
        debug!(error = %e, "wait after failed stdin write");
    }
}

/// Text-mode input uses the platform's line endings.
fn encode_input(bytes: Vec<u8>, binary: bool) -> Vec<u8> {
    if binary || !cfg!(windows) {
        return bytes;
    }
    let mut out = Vec::with_capacity(bytes.len());
    for b in bytes {
        if b == b'\n' { out.push(b'\r'); }
        out.push(b);
    }
    out
}

pub(crate) fn decode_output(bytes: Vec<u8>, binary: bool) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };
    if !binary && cfg!(windows) { text.replace("\r\n", "\n") } else { text }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_env_means_inherit() {
        let empty = EnvMap::new();
        assert!(normalize_env(None).is_none());
        assert!(normalize_env(Some(&empty)).is_none());

        let mut vars = EnvMap::new();
        vars.insert("A".into(), "1".into());
        assert_eq!(normalize_env(Some(&vars)).map(|m| m.len()), Some(1));
    }

    #[test]
    fn empty_tokens_are_rejected() {
        let none: [&str; 0] = [];
        assert!(matches!(run(&none, None, RunOptions::new()), Err(CommandError::EmptyCommand)));
        assert!(matches!(run_cmd(&none, None, RunOptions::new()), Err(CommandError::EmptyCommand)));
        assert!(matches!(async_run(&none, None, RunOptions::new()), Err(CommandError::EmptyCommand)));
    }

    #[test]
    fn decode_is_lossy() {
        assert_eq!(decode_output(b"ok\n".to_vec(), false), "ok\n");
        assert_eq!(decode_output(vec![b'a', 0xff, b'b'], true), "a\u{fffd}b");
    }

    #[cfg(not(windows))]
    #[test]
    fn text_input_is_untouched_off_windows() {
        assert_eq!(encode_input(b"a\nb\n".to_vec(), false), b"a\nb\n");
    }

    #[test]
    fn binary_input_is_untouched() {
        assert_eq!(encode_input(b"a\nb".to_vec(), true), b"a\nb");
    }
}
