//! Default port implementations.

use crate::ports::{Invocation, ProcessError, ProcessPort};
use onetouch_types::StdioMode;
use std::borrow::Cow;
use std::cell::RefCell;
use std::process::{Command, ExitStatus, Stdio};
use tracing::debug;

/// Runs invocations as child processes.
///
/// Shell invocations hand `sh -c` the program verbatim followed by the quoted arguments, so
/// a configured program may itself carry arguments (`sh ./gradlew`, `npx vite`).
#[derive(Debug, Clone, Default)]
pub struct ShellProcessPort;

impl ProcessPort for ShellProcessPort {
    fn run(&self, invocation: &Invocation) -> Result<(), ProcessError> {
        let program = invocation.program.as_str();
        let mut cmd = if invocation.options.shell.unwrap_or(true) {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(shell_line(program, &invocation.args));
            cmd
        } else {
            let mut cmd = Command::new(program);
            cmd.args(&invocation.args);
            cmd
        };
        if let Some(cwd) = &invocation.options.cwd {
            cmd.current_dir(cwd);
        }

        debug!(
            program,
            args = %invocation.display_args(),
            cwd = invocation.options.cwd.as_ref().map(|c| c.as_str()),
            "spawning"
        );

        let spawn_err = |source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        };
        let status = match invocation.options.stdio.unwrap_or_default() {
            StdioMode::Inherit => cmd.status().map_err(spawn_err)?,
            StdioMode::Ignore => cmd
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map_err(spawn_err)?,
            StdioMode::Pipe => {
                let output = cmd.stdin(Stdio::null()).output().map_err(spawn_err)?;
                debug!(
                    program,
                    stdout = %String::from_utf8_lossy(&output.stdout),
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "captured output"
                );
                output.status
            }
        };

        if status.success() {
            Ok(())
        } else {
            Err(ProcessError::Exit {
                program: program.to_string(),
                status: describe(status),
            })
        }
    }
}

fn describe(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

fn shell_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&shell_quote(arg));
    }
    line
}

fn shell_quote(arg: &str) -> Cow<'_, str> {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@,+%".contains(c));
    if plain {
        Cow::Borrowed(arg)
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    }
}

type Responder = Box<dyn Fn(&Invocation) -> Result<(), ProcessError>>;

/// Records invocations instead of spawning them. For embedding and testing.
///
/// Every call succeeds unless a responder registered for its program says otherwise.
/// Responders may also create the files a real tool would leave behind.
#[derive(Default)]
pub struct RecordingProcessPort {
    calls: RefCell<Vec<Invocation>>,
    responders: Vec<(String, Responder)>,
}

impl RecordingProcessPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(
        mut self,
        program: impl Into<String>,
        responder: impl Fn(&Invocation) -> Result<(), ProcessError> + 'static,
    ) -> Self {
        self.responders.push((program.into(), Box::new(responder)));
        self
    }

    /// Make every call to `program` exit with status 1.
    pub fn fail(self, program: impl Into<String>) -> Self {
        self.respond(program, |inv| {
            Err(ProcessError::Exit {
                program: inv.program.clone(),
                status: "exit code 1".to_string(),
            })
        })
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|c| c.program.clone())
            .collect()
    }

    /// Calls whose program is `program`.
    pub fn calls_to(&self, program: &str) -> Vec<Invocation> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.program == program)
            .cloned()
            .collect()
    }
}

impl ProcessPort for RecordingProcessPort {
    fn run(&self, invocation: &Invocation) -> Result<(), ProcessError> {
        debug!(
            program = %invocation.program,
            args = %invocation.display_args(),
            "recorded invocation"
        );
        self.calls.borrow_mut().push(invocation.clone());
        match self
            .responders
            .iter()
            .find(|(program, _)| *program == invocation.program)
        {
            Some((_, responder)) => responder(invocation),
            None => Ok(()),
        }
    }
}
