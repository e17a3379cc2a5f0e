//! Command modeling: tokens, environment and run options.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use indexmap::IndexMap;

use crate::args::{ArgConfig, FlagStyle};
use crate::render::{NativeRenderer, Renderer};

/// Environment overrides applied to a child, in insertion order.
pub type EnvMap = IndexMap<String, String>;

/// One process invocation.
#[derive(Debug, Default)]
pub struct CommandSpec {
    pub tokens: Vec<String>,
    pub env: EnvMap,
    pub options: RunOptions,
}

/// Where a child's standard error goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Stdio {
    #[default]
    Inherit,
    Null,
    File { path: PathBuf, append: bool },
    /// Same pipe or stream as standard output.
    Stdout,
}

/// Data fed to a child's standard input.
pub enum StdinData {
    Text(String),
    Bytes(Vec<u8>),
    /// Copied incrementally, never buffered whole.
    Reader(Box<dyn Read + Send>),
}

impl fmt::Debug for StdinData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StdinData::Text(s) => f.debug_tuple("Text").field(s).finish(),
            StdinData::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            StdinData::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<&str> for StdinData {
    fn from(s: &str) -> Self { StdinData::Text(s.to_string()) }
}

impl From<String> for StdinData {
    fn from(s: String) -> Self { StdinData::Text(s) }
}

impl From<Vec<u8>> for StdinData {
    fn from(b: Vec<u8>) -> Self { StdinData::Bytes(b) }
}

impl From<&[u8]> for StdinData {
    fn from(b: &[u8]) -> Self { StdinData::Bytes(b.to_vec()) }
}

impl From<File> for StdinData {
    fn from(f: File) -> Self { StdinData::Reader(Box::new(f)) }
}

/// Per-call options. `allow_failure`, `stdin_data` and the binmode flags are
/// consumed by the runner; the rest shape the spawned process.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub allow_failure: bool,
    pub stdin_data: Option<StdinData>,
    pub binmode: bool,
    pub stdin_binmode: bool,
    pub stdout_binmode: bool,
    pub chdir: Option<PathBuf>,
    pub stderr: Stdio,
    pub clear_env: bool,
}

impl RunOptions {
    pub fn new() -> Self { Self::default() }

    pub fn allow_failure(mut self) -> Self { self.allow_failure = true; self }

    pub fn stdin(mut self, data: impl Into<StdinData>) -> Self { self.stdin_data = Some(data.into()); self }

    pub fn stdin_reader(mut self, reader: impl Read + Send + 'static) -> Self {
        self.stdin_data = Some(StdinData::Reader(Box::new(reader)));
        self
    }

    pub fn binmode(mut self) -> Self { self.binmode = true; self }
    pub fn stdin_binmode(mut self) -> Self { self.stdin_binmode = true; self }
    pub fn stdout_binmode(mut self) -> Self { self.stdout_binmode = true; self }

    pub fn chdir(mut self, dir: impl Into<PathBuf>) -> Self { self.chdir = Some(dir.into()); self }

    pub fn stderr(mut self, target: Stdio) -> Self { self.stderr = target; self }

    /// Start the child with only the override environment.
    pub fn clear_env(mut self) -> Self { self.clear_env = true; self }

    pub fn stdin_is_binary(&self) -> bool { self.binmode || self.stdin_binmode }
    pub fn stdout_is_binary(&self) -> bool { self.binmode || self.stdout_binmode }
}

impl CommandSpec {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec { tokens: tokens.into_iter().map(Into::into).collect(), ..Default::default() }
    }

    /// Tokens built from a flag configuration; the program is its first entry.
    pub fn from_config(config: &ArgConfig, style: FlagStyle) -> Self {
        CommandSpec::new(config.to_args(style))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self { self.tokens.push(arg.into()); self }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens.extend(args.into_iter().map(Into::into));
        self
    }

    /// Key and value are stringified.
    pub fn env(mut self, key: impl fmt::Display, value: impl fmt::Display) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: fmt::Display,
        V: fmt::Display,
    {
        for (k, v) in vars { self.env.insert(k.to_string(), v.to_string()); }
        self
    }

    pub fn options(mut self, options: RunOptions) -> Self { self.options = options; self }

    pub fn program(&self) -> Option<&str> { self.tokens.first().map(String::as_str) }

    pub fn to_args(&self) -> Vec<String> { self.tokens.clone() }
}

#[cfg(feature = "exec")]
impl CommandSpec {
    /// Blocking run, returns captured stdout.
    pub fn run(self) -> crate::Result<String> {
        crate::exec::run(&self.tokens, Some(&self.env), self.options)
    }

    pub fn run_bytes(self) -> crate::Result<Vec<u8>> {
        crate::exec::run_bytes(&self.tokens, Some(&self.env), self.options)
    }

    /// Blocking run on the parent's streams.
    pub fn run_cmd(self) -> crate::Result<bool> {
        crate::exec::run_cmd(&self.tokens, Some(&self.env), self.options)
    }

    pub fn run_async(self) -> crate::Result<crate::exec::TaskHandle> {
        crate::exec::async_run(&self.tokens, Some(&self.env), self.options)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match NativeRenderer::default().render_cmd(self) {
            Ok(line) => f.write_str(&line),
            Err(_) => f.write_str("<empty command>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_config_puts_program_first() {
        let cfg = ArgConfig::new()
            .with("docker", ())
            .with("push", ())
            .with("all_tags", true)
            .with("registry/app", ());
        let cmd = CommandSpec::from_config(&cfg, FlagStyle::gnu());
        assert_eq!(cmd.program(), Some("docker"));
        assert_eq!(cmd.to_args(), vec!["docker", "push", "--all-tags", "registry/app"]);
    }

    #[test]
    fn env_values_are_stringified_in_order() {
        let cmd = CommandSpec::new(["make"])
            .env("JOBS", 8)
            .env("DEBUG", true)
            .envs([("B", 2.5), ("A", 1.0)]);
        let pairs: Vec<(&str, &str)> = cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(pairs, vec![("JOBS", "8"), ("DEBUG", "true"), ("B", "2.5"), ("A", "1")]);
    }

    #[test]
    fn builder_appends_tokens() {
        let cmd = CommandSpec::new(["tar"]).arg("-c").args(["-f", "out.tar", "dir"]);
        assert_eq!(cmd.tokens, vec!["tar", "-c", "-f", "out.tar", "dir"]);
    }

    #[test]
    fn binmode_implies_both_directions() {
        let o = RunOptions::new().binmode();
        assert!(o.stdin_is_binary() && o.stdout_is_binary());
        let o = RunOptions::new().stdout_binmode();
        assert!(!o.stdin_is_binary() && o.stdout_is_binary());
    }

    #[test]
    fn stdin_data_debug_hides_reader() {
        let o = RunOptions::new().stdin_reader(std::io::empty());
        assert_eq!(format!("{:?}", o.stdin_data), "Some(Reader(..))");
        assert_eq!(format!("{:?}", StdinData::from(&b"abc"[..])), "Bytes(3 bytes)");
    }

    #[cfg(unix)]
    #[test]
    fn display_renders_shell_line() {
        let cmd = CommandSpec::new(["ls", "-la"]).options(RunOptions::new().chdir("/var/tmp"));
        assert_eq!(cmd.to_string(), "cd /var/tmp && ls -la");
        assert_eq!(CommandSpec::default().to_string(), "<empty command>");
    }
}
