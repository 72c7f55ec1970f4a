use crate::command::{CommandFactory, ExitCode, ExitSignal, Stdout};
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::error::{ParseError, ShellError};
use crate::external::PathLookup;
use crate::parser::{self, ParsedCommand};
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate, see [`crate::builtin`].
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// What a line reader produced for one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C: the partial line is discarded.
    Interrupted,
    Eof,
}

/// Source of input lines for the read-eval loop.
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<ReadOutcome>;
}

impl LineReader for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<ReadOutcome> {
        match self.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.add_history_entry(line.as_str());
                }
                Ok(ReadOutcome::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(anyhow::anyhow!("{err}")),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LoopState {
    Reading,
    Executing(ParsedCommand),
    Terminated(ExitCode),
}

/// A minimal interactive shell: parses lines, runs builtins or files from the search path.
///
/// The interpreter owns an [`Environment`] and a list of [`CommandFactory`] objects that
/// are queried, in order, to create commands by name. Builtins come first, so a file on
/// the search path never shadows them.
///
/// Example
/// ```
/// use tinsh::{Environment, Interpreter, ShellConfig};
/// let mut sh = Interpreter::new(ShellConfig::default(), Environment::empty("/"));
/// let mut out = Vec::<u8>::new();
/// let mut err = Vec::<u8>::new();
/// assert_eq!(sh.run_line("echo hello world", &mut out, &mut err), 0);
/// assert_eq!(out, b"hello world\n");
/// ```
pub struct Interpreter {
    env: Environment,
    config: ShellConfig,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create an interpreter with the builtins (`exit`, `pwd`, `cd`, `echo`) followed by
    /// search path lookup.
    ///
    /// The shell-private path variable is seeded with the configured defaults when unset.
    pub fn new(config: ShellConfig, env: Environment) -> Self {
        use crate::builtin::*;
        let commands: Vec<Box<dyn CommandFactory>> = vec![
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Echo>::default()),
            Box::new(PathLookup::new(config.shell.clone())),
        ];
        Self::with_commands(config, env, commands)
    }

    /// Create an interpreter with a custom set of command factories.
    pub fn with_commands(
        config: ShellConfig,
        mut env: Environment,
        commands: Vec<Box<dyn CommandFactory>>,
    ) -> Self {
        let path_var = &config.shell.path_var;
        if !path_var.is_empty() {
            let defaults = config.shell.default_path_dirs(&env.home());
            if env.seed_path_var(path_var, &defaults) {
                log::debug!("seeded {path_var} with {defaults:?}");
            }
        }
        Self {
            env,
            config,
            commands,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Parse a raw line with the configured expansions.
    pub fn parse(&self, line: &str) -> Result<ParsedCommand, ParseError> {
        parser::parse_line(line, &self.env, &self.config.parse)
    }

    /// Run a parsed command. An empty command succeeds without doing anything.
    pub fn dispatch(
        &mut self,
        command: &ParsedCommand,
        stdout: &mut dyn Stdout,
    ) -> Result<ExitSignal, ShellError> {
        let Some(name) = command.name() else {
            return Ok(ExitSignal::Status(0));
        };
        let args: Vec<&str> = command.args().iter().map(String::as_str).collect();
        self.invoke(name, &args, stdout)
    }

    fn invoke(
        &mut self,
        name: &str,
        args: &[&str],
        stdout: &mut dyn Stdout,
    ) -> Result<ExitSignal, ShellError> {
        let command = self
            .commands
            .iter()
            .find_map(|factory| factory.try_create(&self.env, name, args))
            .ok_or_else(|| ShellError::CommandNotFound(name.to_string()))?;
        log::debug!("dispatching {name} {args:?}");
        let result = command.execute(stdout, &mut self.env);
        let _ = stdout.flush();
        result.map_err(|source| ShellError::Invocation {
            command: name.to_string(),
            source,
        })
    }

    /// Parse and run one line, as `tinsh -c` does. Errors are reported to `stderr`.
    ///
    /// Returns the command's status, or 1 when the line could not be parsed or run.
    pub fn run_line(
        &mut self,
        line: &str,
        stdout: &mut dyn Stdout,
        stderr: &mut dyn Write,
    ) -> ExitCode {
        let result = self
            .parse(line)
            .map_err(ShellError::from)
            .and_then(|command| self.dispatch(&command, stdout));
        match result {
            Ok(signal) => signal.code(),
            Err(err) => {
                report(stderr, &err);
                1
            }
        }
    }

    /// Interactive read-eval loop on the terminal, with in-memory history.
    pub fn repl(&mut self) -> anyhow::Result<ExitCode> {
        let mut editor =
            DefaultEditor::new().map_err(|e| anyhow::anyhow!("cannot start line editor: {e}"))?;
        self.run_loop(&mut editor, &mut std::io::stdout(), &mut std::io::stderr())
    }

    /// Drive the read-eval loop until a command asks to terminate or input ends.
    ///
    /// Returns the status the shell should exit with. Fails only when the working
    /// directory is gone and cannot be recovered.
    pub fn run_loop(
        &mut self,
        reader: &mut dyn LineReader,
        stdout: &mut dyn Stdout,
        stderr: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        let mut state = LoopState::Reading;
        loop {
            state = match state {
                LoopState::Reading => self.read(reader, stderr)?,
                LoopState::Executing(command) => self.execute(&command, stdout, stderr),
                LoopState::Terminated(code) => return Ok(code),
            };
        }
    }

    fn read(
        &mut self,
        reader: &mut dyn LineReader,
        stderr: &mut dyn Write,
    ) -> anyhow::Result<LoopState> {
        let cwd = self.working_dir(stderr)?;
        let prompt = self.prompt(&cwd);
        let line = match reader.read_line(&prompt) {
            Ok(ReadOutcome::Line(line)) => line,
            Ok(ReadOutcome::Interrupted) => return Ok(LoopState::Reading),
            Ok(ReadOutcome::Eof) => return Ok(LoopState::Terminated(0)),
            Err(err) => {
                log::warn!("stopped reading input: {err:#}");
                return Ok(LoopState::Terminated(0));
            }
        };
        Ok(match self.parse(&line) {
            Ok(command) if command.is_empty() => LoopState::Reading,
            Ok(command) => LoopState::Executing(command),
            Err(err) => {
                report(stderr, &err.into());
                LoopState::Reading
            }
        })
    }

    fn execute(
        &mut self,
        command: &ParsedCommand,
        stdout: &mut dyn Stdout,
        stderr: &mut dyn Write,
    ) -> LoopState {
        match self.dispatch(command, stdout) {
            Ok(ExitSignal::Terminate(code)) => LoopState::Terminated(code),
            Ok(ExitSignal::Status(code)) => {
                log::debug!("status {code}");
                LoopState::Reading
            }
            Err(err) => {
                report(stderr, &err);
                LoopState::Reading
            }
        }
    }

    /// The working directory as the OS sees it.
    ///
    /// When it has been removed underneath the shell, warn and return to the home directory.
    fn working_dir(&mut self, stderr: &mut dyn Write) -> anyhow::Result<PathBuf> {
        let cwd = match std::env::current_dir() {
            Ok(cwd) => cwd,
            Err(err) => {
                let _ = writeln!(
                    stderr,
                    "tinsh: failed to get current working directory, returning to home."
                );
                let err = ShellError::WorkingDirectoryUnavailable(err);
                report(stderr, &err);
                log::warn!("working directory unavailable: {err}");

                let home = self.env.home();
                std::env::set_current_dir(&home)
                    .with_context(|| format!("cannot return to home directory {home:?}"))?;
                std::env::current_dir().context("working directory still unavailable")?
            }
        };
        self.env.current_dir = cwd.clone();
        Ok(cwd)
    }

    fn prompt(&self, cwd: &Path) -> String {
        let home = self.env.home();
        let alt_home = self.config.shell.alt_home(&home);
        format!(
            "{} $ ",
            collapse_home(cwd, Path::new(&home), alt_home.as_deref())
        )
    }
}

impl Default for Interpreter {
    /// The embedded default configuration over the current process state.
    fn default() -> Self {
        Self::new(ShellConfig::default(), Environment::new())
    }
}

/// Rewrite `path` as `~` or `~/rest` when it lies under `home` or `alt_home`.
pub fn collapse_home(path: &Path, home: &Path, alt_home: Option<&Path>) -> String {
    let bases = std::iter::once(home)
        .chain(alt_home)
        .filter(|base| !base.as_os_str().is_empty());
    for base in bases {
        if let Ok(rest) = path.strip_prefix(base) {
            return if rest.as_os_str().is_empty() {
                "~".to_string()
            } else {
                format!("~/{}", rest.display())
            };
        }
    }
    path.display().to_string()
}

fn report(stderr: &mut dyn Write, err: &ShellError) {
    let _ = match err {
        ShellError::CommandNotFound(_) => writeln!(stderr, "tinsh: {err}"),
        _ => writeln!(stderr, "tinsh: {}: {err}", err.kind()),
    };
}
