//! Printable command lines for logs and error messages.

use crate::cmd::CommandSpec;
use crate::error::{CommandError, Result};

pub trait Renderer {
    /// A single word, quoted only when the shell would otherwise split or expand it.
    fn quote_word(&self, word: &str) -> String;

    /// Environment, working directory and tokens as one shell line.
    fn render_cmd(&self, cmd: &CommandSpec) -> Result<String>;

    fn render_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> String {
        tokens.iter().map(|t| self.quote_word(t.as_ref())).collect::<Vec<_>>().join(" ")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PosixRenderer;

impl Renderer for PosixRenderer {
    fn quote_word(&self, word: &str) -> String {
        if plain_word(word, '/') {
            return word.to_string();
        }
        let mut out = String::with_capacity(word.len() + 2);
        out.push('\'');
        for c in word.chars() {
            // close, escaped quote, reopen
            if c == '\'' { out.push_str("'\\''"); } else { out.push(c); }
        }
        out.push('\'');
        out
    }

    fn render_cmd(&self, cmd: &CommandSpec) -> Result<String> {
        if cmd.tokens.is_empty() {
            return Err(CommandError::EmptyCommand);
        }

        let mut parts: Vec<String> = Vec::new();
        if let Some(dir) = &cmd.options.chdir {
            parts.push(format!("cd {} &&", self.quote_word(&dir.to_string_lossy())));
        }
        if cmd.options.clear_env {
            parts.push("env -i".to_string());
        }
        for (k, v) in &cmd.env {
            parts.push(format!("{}={}", k, self.quote_word(v)));
        }
        parts.push(self.render_tokens(&cmd.tokens));
        Ok(parts.join(" "))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WinRenderer;

impl Renderer for WinRenderer {
    fn quote_word(&self, word: &str) -> String {
        if plain_word(word, '\\') {
            return word.to_string();
        }
        format!("\"{}\"", word.replace('"', "\"\""))
    }

    fn render_cmd(&self, cmd: &CommandSpec) -> Result<String> {
        if cmd.tokens.is_empty() {
            return Err(CommandError::EmptyCommand);
        }

        let mut parts: Vec<String> = Vec::new();
        if let Some(dir) = &cmd.options.chdir {
            parts.push(format!("cd /d {} &&", self.quote_word(&dir.to_string_lossy())));
        }
        for (k, v) in &cmd.env {
            parts.push(format!("set \"{}={}\" &&", k, v));
        }
        parts.push(self.render_tokens(&cmd.tokens));
        Ok(parts.join(" "))
    }
}

#[cfg(windows)]
pub type NativeRenderer = WinRenderer;
#[cfg(not(windows))]
pub type NativeRenderer = PosixRenderer;

/// Token sequence joined for display with the host platform's quoting.
pub fn command_line<S: AsRef<str>>(tokens: &[S]) -> String {
    NativeRenderer::default().render_tokens(tokens)
}

/// Non-empty and free of anything a shell treats specially; `sep` is the path separator.
fn plain_word(s: &str, sep: char) -> bool {
    !s.is_empty()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == sep || "_-.:+%@=,".contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{CommandSpec, RunOptions};
    use pretty_assertions::assert_eq;

    #[test]
    fn posix_words() {
        let r = PosixRenderer;
        assert_eq!(r.quote_word(""), "''");
        assert_eq!(r.quote_word("v1.2:latest"), "v1.2:latest");
        assert_eq!(r.quote_word("$HOME"), "'$HOME'");
        assert_eq!(r.quote_word("it's"), "'it'\\''s'");
        assert_eq!(r.quote_word("C:\\dir"), "'C:\\dir'");
    }

    #[test]
    fn tokens_quote_only_when_needed() {
        assert_eq!(PosixRenderer.render_tokens(&["wc", "-m"]), "wc -m");
        assert_eq!(PosixRenderer.render_tokens(&["echo", "two words", ""]), "echo 'two words' ''");
    }

    #[test]
    fn render_cmd_env_cwd_args() {
        let cmd = CommandSpec::new(["echo", "hi"])
            .env("FOO", "bar baz")
            .options(RunOptions::default().chdir("/tmp"));
        let got = PosixRenderer.render_cmd(&cmd).unwrap();
        assert_eq!(got, "cd /tmp && FOO='bar baz' echo hi");
    }

    #[test]
    fn render_cmd_clear_env() {
        let cmd = CommandSpec::new(["printenv"])
            .env("ONLY", 1)
            .options(RunOptions::default().clear_env());
        let got = PosixRenderer.render_cmd(&cmd).unwrap();
        assert_eq!(got, "env -i ONLY=1 printenv");
    }

    #[test]
    fn render_cmd_rejects_empty() {
        let cmd = CommandSpec::new(Vec::<String>::new());
        assert!(matches!(PosixRenderer.render_cmd(&cmd), Err(CommandError::EmptyCommand)));
    }

    #[test]
    fn win_render_cmd_env_cwd_args() {
        let cmd = CommandSpec::new(["C:\\Program Files\\MyApp\\app.exe", "hello world", "a\"b"])
            .env("APPDATA", "C:\\Data\\App")
            .options(RunOptions::default().chdir("C:\\Work Dir"));
        let got = WinRenderer.render_cmd(&cmd).unwrap();
        assert_eq!(
            got,
            "cd /d \"C:\\Work Dir\" && set \"APPDATA=C:\\Data\\App\" && \"C:\\Program Files\\MyApp\\app.exe\" \"hello world\" \"a\"\"b\""
        );
    }
}
