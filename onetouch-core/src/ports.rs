//! Port traits abstracting external processes away from the pipeline.

use camino::Utf8PathBuf;
use onetouch_types::StdioMode;
use thiserror::Error;

/// Runs external toolchain commands to completion.
pub trait ProcessPort {
    fn run(&self, invocation: &Invocation) -> Result<(), ProcessError>;
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Exit { program: String, status: String },
}

/// Spawn options. Unset fields fall back to the invocation defaults via [`merge_over`].
///
/// [`merge_over`]: SpawnOptions::merge_over
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnOptions {
    pub cwd: Option<Utf8PathBuf>,
    pub shell: Option<bool>,
    pub stdio: Option<StdioMode>,
    /// Keep arguments out of logs; they carry secrets.
    pub redact_args: bool,
}

impl SpawnOptions {
    /// Defaults shared by every invocation of one command.
    pub fn defaults(cwd: impl Into<Utf8PathBuf>, stdio: StdioMode) -> Self {
        Self {
            cwd: Some(cwd.into()),
            shell: Some(true),
            stdio: Some(stdio),
            redact_args: false,
        }
    }

    pub fn in_dir(cwd: impl Into<Utf8PathBuf>) -> Self {
        Self {
            cwd: Some(cwd.into()),
            ..Self::default()
        }
    }

    pub fn with_stdio(mut self, stdio: StdioMode) -> Self {
        self.stdio = Some(stdio);
        self
    }

    pub fn redacted(mut self) -> Self {
        self.redact_args = true;
        self
    }

    /// Fields set on `self` win over `base`.
    pub fn merge_over(&self, base: &SpawnOptions) -> SpawnOptions {
        SpawnOptions {
            cwd: self.cwd.clone().or_else(|| base.cwd.clone()),
            shell: self.shell.or(base.shell),
            stdio: self.stdio.or(base.stdio),
            redact_args: self.redact_args || base.redact_args,
        }
    }
}

/// One external command with its resolved options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub options: SpawnOptions,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            options: SpawnOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SpawnOptions) -> Self {
        self.options = options;
        self
    }

    /// The argument list as it may appear in logs.
    pub fn display_args(&self) -> String {
        if self.options.redact_args {
            format!("<{} args redacted>", self.args.len())
        } else {
            self.args.join(" ")
        }
    }
}
