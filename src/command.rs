use crate::env::Environment;
use anyhow::Result;
use std::io::Write;
use std::process::Stdio;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// What a command reports back to the shell when it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSignal {
    /// Ordinary completion with an exit status.
    Status(ExitCode),
    /// Ask the shell to terminate with the given status. Only `exit` returns this.
    Terminate(ExitCode),
}

impl ExitSignal {
    pub fn code(self) -> ExitCode {
        match self {
            ExitSignal::Status(code) | ExitSignal::Terminate(code) => code,
        }
    }
}

impl From<ExitCode> for ExitSignal {
    fn from(code: ExitCode) -> Self {
        ExitSignal::Status(code)
    }
}

/// Abstraction over the output stream a command writes to.
///
/// Builtins write through [`Write`]. External processes either get a [`Stdio`] handle
/// to inherit, or, when [`Stdout::stdio`] returns `None`, have their output piped and
/// copied into the writer.
pub trait Stdout: Write {
    fn stdio(&self) -> Option<Stdio>;
}

impl Stdout for std::io::Stdout {
    fn stdio(&self) -> Option<Stdio> {
        Some(Stdio::inherit())
    }
}

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Executes the command.
    fn execute(self: Box<Self>, stdout: &mut dyn Stdout, env: &mut Environment)
    -> Result<ExitSignal>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>>;
}
