//! Command lines and managed (tmux) session descriptions.

use std::path::PathBuf;

/// Session that hosts the streaming server.
pub const STREAMING_SESSION: &str = "sunshine";
/// Session that hosts the tunnel client.
pub const TUNNEL_SESSION: &str = "tunnel";

/// A program, its arguments, and extra environment bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandLine {
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    /// Render as a single shell command, env bindings first via `env`.
    #[must_use]
    pub fn to_shell(&self) -> String {
        let mut parts = Vec::new();
        if !self.env.is_empty() {
            parts.push("env".to_string());
            for (k, v) in &self.env {
                parts.push(shell_quote(&format!("{k}={v}")));
            }
        }
        parts.push(shell_quote(&self.program));
        parts.extend(self.args.iter().map(|a| shell_quote(a)));
        parts.join(" ")
    }
}

/// A detachable session wrapping one long-running command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSpec {
    /// Unique key; at most one live session per name.
    pub name: String,
    pub command: CommandLine,
    /// Combined stdout/stderr destination.
    pub log: Option<PathBuf>,
}

impl SessionSpec {
    /// The shell line the multiplexer runs inside the session.
    #[must_use]
    pub fn shell_line(&self) -> String {
        let cmd = self.command.to_shell();
        match &self.log {
            Some(log) => format!("{cmd} > {} 2>&1", shell_quote(&log.to_string_lossy())),
            None => cmd,
        }
    }
}

/// A background process started outside any session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedSpec {
    pub command: CommandLine,
    pub log: PathBuf,
    /// Run through `sudo`.
    pub privileged: bool,
}

/// Quote `s` for POSIX `sh` when it holds anything beyond a safe charset.
#[must_use]
pub fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}
