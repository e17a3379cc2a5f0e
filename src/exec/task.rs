//! Handle for a background command and its output stream.

use std::io::{self, Read};
use std::process::{Child, ChildStdout, ExitStatus};

use tracing::debug;

use crate::error::{CommandError, Result};

use super::decode_output;

/// Readable end of a background child's output.
#[derive(Debug)]
pub enum OutputStream {
    Child(ChildStdout),
    /// Stdout and stderr sharing one pipe.
    Merged(io::PipeReader),
}

impl OutputStream {
    pub(super) fn take(child: &mut Child, merged: Option<io::PipeReader>, command: &str) -> Result<Self> {
        if let Some(reader) = merged {
            return Ok(OutputStream::Merged(reader));
        }
        child.stdout.take().map(OutputStream::Child).ok_or_else(|| CommandError::Io {
            command: command.to_string(),
            source: io::Error::other("child stdout was not piped"),
        })
    }
}

impl Read for OutputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            OutputStream::Child(s) => s.read(buf),
            OutputStream::Merged(r) => r.read(buf),
        }
    }
}

/// A running background command.
///
/// The handle owns the child's output pipe and the child itself. It is
/// consumed by [`TaskHandle::wait`] (or [`TaskHandle::wait_bytes`]), which is
/// the only way to get the exit status. Dropping it without waiting leaves
/// the child unreaped.
#[derive(Debug)]
#[must_use = "a TaskHandle must be waited on or the child is never reaped"]
pub struct TaskHandle {
    child: Child,
    stream: OutputStream,
    command: String,
    binary: bool,
}

impl TaskHandle {
    pub(super) fn new(child: Child, stream: OutputStream, command: String, binary: bool) -> Self {
        TaskHandle { child, stream, command, binary }
    }

    pub fn id(&self) -> u32 { self.child.id() }

    pub fn command(&self) -> &str { &self.command }

    /// Drain the output, then wait for the exit status.
    pub fn wait_bytes(mut self) -> Result<(Vec<u8>, ExitStatus)> {
        let mut out = Vec::new();
        let read = self.stream.read_to_end(&mut out);
        drop(self.stream);
        let status = self.child.wait();

        let command = self.command;
        read.map_err(|source| CommandError::Io { command: command.clone(), source })?;
        let status = status.map_err(|source| CommandError::Io { command: command.clone(), source })?;
        debug!(command = %command, code = ?status.code(), bytes = out.len(), "background command finished");
        Ok((out, status))
    }

    /// Like [`TaskHandle::wait_bytes`], with the output decoded as text.
    /// A non-zero status is returned, not raised.
    pub fn wait(self) -> Result<(String, ExitStatus)> {
        let binary = self.binary;
        let (out, status) = self.wait_bytes()?;
        Ok((decode_output(out, binary), status))
    }

    /// The raw `(stream, waiter)` pair; the caller takes over reaping.
    pub fn into_parts(self) -> (OutputStream, Child) {
        (self.stream, self.child)
    }
}
