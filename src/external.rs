use crate::command::{CommandFactory, ExecutableCommand, ExitCode, ExitSignal, Stdout};
use crate::config::ShellSettings;
use crate::env::Environment;
use anyhow::{Context, Result};
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

/// Command that is not a builtin: an executable file found on the search path.
pub struct ExternalCommand {
    path: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(path: PathBuf, args: Vec<OsString>) -> Self {
        Self { path, args }
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Stdout,
        env: &mut Environment,
    ) -> Result<ExitSignal> {
        let inherit = stdout.stdio();
        let capture = inherit.is_none();
        let mut child = std::process::Command::new(&self.path)
            .args(&self.args)
            .stdout(inherit.unwrap_or_else(Stdio::piped))
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir)
            .spawn()
            .with_context(|| format!("cannot execute {}", self.path.display()))?;

        if capture {
            if let Some(mut out) = child.stdout.take() {
                let mut buf = Vec::new();
                out.read_to_end(&mut buf)?;
                stdout.write_all(&buf)?;
            }
        }

        let exit_status = child.wait()?;
        let code = match exit_status.code() {
            Some(x) => x,
            None => terminated_by_signal(exit_status),
        };
        log::debug!("{} exited with {code}", self.path.display());
        Ok(ExitSignal::Status(code))
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> ExitCode {
    -1
}

/// Ordered list of directories consulted when resolving a command name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Assemble the search path for one dispatch.
    ///
    /// Order: the current directory (always, whatever the variables say), entries of the
    /// shell's own path variable, entries of `PATH`, then the configured extra directories.
    pub fn assemble(env: &Environment, settings: &ShellSettings) -> Self {
        let mut dirs = vec![PathBuf::from(".")];
        if !settings.path_var.is_empty() {
            dirs.extend(env.path_list(&settings.path_var));
        }
        dirs.extend(env.path_list("PATH"));
        dirs.extend(settings.extra_path_dirs(&env.home()));
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Find the first regular file named `name`, or `name` + `suffix`.
    ///
    /// Directories are tried in order; within a directory the bare name wins over the
    /// suffixed one. Relative directories are resolved against `cwd`. An absolute `name`
    /// is checked as-is. The returned path is absolute whenever `cwd` is.
    pub fn find(&self, name: &str, suffix: &str, cwd: &Path) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        let suffixed = format!("{name}{suffix}");
        let candidates: &[&str] = if suffix.is_empty() {
            &[name]
        } else {
            &[name, suffixed.as_str()]
        };

        if Path::new(name).is_absolute() {
            return candidates
                .iter()
                .map(PathBuf::from)
                .find(|p| p.is_file());
        }

        for dir in &self.dirs {
            let base = cwd.join(dir);
            for candidate in candidates {
                let path = base.join(candidate);
                if path.is_file() {
                    log::debug!("resolved {name} to {}", path.display());
                    return Some(path);
                }
            }
        }
        None
    }
}

/// Resolves names that are not builtins against the search path.
///
/// Consulted after every builtin factory, so a file can never shadow a builtin.
pub struct PathLookup {
    settings: ShellSettings,
}

impl PathLookup {
    pub fn new(settings: ShellSettings) -> Self {
        Self { settings }
    }
}

impl CommandFactory for PathLookup {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let search_path = SearchPath::assemble(env, &self.settings);
        let executable =
            search_path.find(name, &self.settings.command_suffix, &env.current_dir)?;
        Some(Box::new(ExternalCommand::new(
            executable,
            args.iter().map(|x| x.into()).collect(),
        )))
    }
}
