use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CommandError>;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Invalid value for `{key}`: {kind} has no argument conversion")]
    InvalidValueKind { key: String, kind: &'static str },

    #[error("Malformed configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Empty command: no program given")]
    EmptyCommand,

    #[error("Failed to spawn `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Command `{command}` failed: {}", describe_exit(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("I/O error on `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl CommandError {
    pub fn is_command_failed(&self) -> bool {
        matches!(self, CommandError::CommandFailed { .. })
    }

    /// Exit code an outer script should terminate with for this error.
    /// Mirrors the child's code when there is one, `127` for a program that
    /// could not be spawned and `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::CommandFailed { code: Some(c), .. } if *c != 0 => *c,
            CommandError::SpawnFailed { .. } => 127,
            _ => 1,
        }
    }

    /// Rendered command line, when the error belongs to a process invocation.
    pub fn command(&self) -> Option<&str> {
        match self {
            CommandError::SpawnFailed { command, .. }
            | CommandError::CommandFailed { command, .. }
            | CommandError::Io { command, .. } => Some(command),
            _ => None,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit status {}", c),
        None => "terminated by signal".to_string(),
    }
}
