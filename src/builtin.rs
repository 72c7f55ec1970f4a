use crate::command::{CommandFactory, ExecutableCommand, ExitSignal, Stdout};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Commands that run inside the shell process.
///
/// Builtins manage the shell's own state (working directory, termination), so they run
/// in-process instead of being looked up on the search path. Arguments are parsed with
/// [`argh`] (`FromArgs`).
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Name the command is dispatched under.
    fn name() -> &'static str;

    /// Executes the command using the provided output stream and environment.
    fn execute(self, stdout: &mut dyn Stdout, env: &mut Environment) -> Result<ExitSignal>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Stdout,
        env: &mut Environment,
    ) -> Result<ExitSignal> {
        <T as BuiltinCommand>::execute(*self, stdout, env)
    }
}

/// Produced when argh rejects the arguments or handles `--help` itself.
///
/// Help text goes to stdout. A rejection becomes an error, reported on the error stream.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Stdout,
        _env: &mut Environment,
    ) -> Result<ExitSignal> {
        if self.is_error {
            anyhow::bail!("{}", self.output.trim_end());
        }
        writeln!(stdout, "{}", self.output.trim_end())?;
        Ok(ExitSignal::Status(0))
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Exit the interactive shell.
pub struct Exit {
    #[argh(positional, default = "0")]
    /// status code the shell exits with.
    pub status: i32,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Stdout, _env: &mut Environment) -> Result<ExitSignal> {
        Ok(ExitSignal::Terminate(self.status))
    }
}

#[derive(FromArgs)]
/// Print the shell's working directory.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, stdout: &mut dyn Stdout, env: &mut Environment) -> Result<ExitSignal> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(0.into())
    }
}

#[derive(FromArgs)]
/// Change the shell's working directory (to $HOME when no directory is given).
pub struct Cd {
    #[argh(positional)]
    /// target directory, absolute or relative to the working directory.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, _stdout: &mut dyn Stdout, env: &mut Environment) -> Result<ExitSignal> {
        let target = match &self.target {
            Some(t) if !t.is_empty() => PathBuf::from(t),
            _ => match env.get_var("HOME") {
                Some(home) if !home.is_empty() => PathBuf::from(home),
                _ => anyhow::bail!("no target and HOME not set"),
            },
        };

        let new_dir = env.resolve(target);
        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("can't canonicalize {}", new_dir.display()))?;

        env::set_current_dir(&canonical)
            .with_context(|| format!("can't chdir to {}", canonical.display()))?;
        log::debug!("working directory is now {}", canonical.display());
        env.current_dir = canonical;
        Ok(0.into())
    }
}

/// Print the arguments joined by single spaces, followed by a newline.
///
/// Options are not parsed by argh: any word that is not a usable flag is printed as is.
pub struct Echo {
    /// Omit the trailing newline (`-n`).
    pub no_newline: bool,
    pub args: Vec<String>,
}

/// Whether `arg` is an echo flag word such as `-n` or `-ne`.
///
/// The letters after the dash must be a proper subset of `n`, `e`, `E`, so `-neE` is
/// printed.
fn is_echo_flag(arg: &str) -> bool {
    let Some(letters) = arg.strip_prefix('-') else {
        return false;
    };
    let all_flags = letters.chars().all(|c| matches!(c, 'n' | 'e' | 'E'));
    let distinct = ['n', 'e', 'E']
        .iter()
        .filter(|flag| letters.contains(**flag))
        .count();
    all_flags && distinct < 3
}

impl FromArgs for Echo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        let mut echo = Echo {
            no_newline: false,
            args: Vec::with_capacity(args.len()),
        };
        for arg in args {
            if !is_echo_flag(arg) {
                echo.args.push(arg.to_string());
                continue;
            }
            // `-e`/`-E` toggle escape interpretation, which is not supported.
            if arg.contains('n') {
                echo.no_newline = true;
            }
        }
        Ok(echo)
    }
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, stdout: &mut dyn Stdout, _env: &mut Environment) -> Result<ExitSignal> {
        let line = self.args.join(" ");
        stdout.write_all(line.as_bytes())?;
        if !self.no_newline {
            stdout.write_all(b"\n")?;
        }
        Ok(0.into())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::io_adapters::MemWriter;
    use std::env as stdenv;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    /// Serializes tests that read or change the process working directory.
    pub(crate) fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn create(name: &str, args: &[&str]) -> Box<dyn ExecutableCommand> {
        let env = Environment::empty("/");
        let factories: Vec<Box<dyn CommandFactory>> = vec![
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Echo>::default()),
        ];
        factories
            .iter()
            .find_map(|f| f.try_create(&env, name, args))
            .expect("builtin should exist")
    }

    #[test]
    fn test_exit_with_status() {
        let mut env = Environment::empty("/");
        let mut out = MemWriter::new();
        let signal = create("exit", &["7"]).execute(&mut out, &mut env).unwrap();
        assert_eq!(signal, ExitSignal::Terminate(7));
    }

    #[test]
    fn test_exit_defaults_to_zero() {
        let mut env = Environment::empty("/");
        let mut out = MemWriter::new();
        let signal = create("exit", &[]).execute(&mut out, &mut env).unwrap();
        assert_eq!(signal, ExitSignal::Terminate(0));
    }

    #[test]
    fn test_exit_with_bad_status_is_error() {
        let mut env = Environment::empty("/");
        let mut out = MemWriter::new();
        let err = create("exit", &["nope"])
            .execute(&mut out, &mut env)
            .unwrap_err();
        assert!(err.to_string().contains("nope"), "{err}");
        assert!(out.contents().is_empty());
    }

    #[test]
    fn test_help_goes_to_stdout() {
        let mut env = Environment::empty("/");
        let mut out = MemWriter::new();
        let signal = create("cd", &["--help"]).execute(&mut out, &mut env).unwrap();
        assert_eq!(signal, ExitSignal::Status(0));
        assert!(out.contents().starts_with("Usage: cd"), "{}", out.contents());
    }

    #[test]
    fn test_unknown_name_is_not_created() {
        let env = Environment::empty("/");
        assert!(Factory::<Echo>::default().try_create(&env, "ech", &[]).is_none());
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let cur = stdenv::temp_dir();
        let mut env = Environment::empty(&cur);

        let mut out: Vec<u8> = Vec::new();
        let signal = Pwd {}.execute(&mut out, &mut env).unwrap();

        assert_eq!(signal, ExitSignal::Status(0));
        let s = String::from_utf8(out).unwrap();
        assert_eq!(s, format!("{}\n", cur.to_string_lossy()));
    }

    #[test]
    fn test_echo_with_and_without_newline() {
        let mut env = Environment::empty("/");

        let mut out1: Vec<u8> = Vec::new();
        let echo1 = Echo {
            no_newline: false,
            args: vec!["hello".to_string(), "world".to_string()],
        };
        echo1.execute(&mut out1, &mut env).unwrap();
        assert_eq!(String::from_utf8(out1).unwrap(), "hello world\n");

        let mut out2: Vec<u8> = Vec::new();
        let echo2 = Echo {
            no_newline: true,
            args: vec!["foo".to_string(), "bar".to_string()],
        };
        echo2.execute(&mut out2, &mut env).unwrap();
        assert_eq!(String::from_utf8(out2).unwrap(), "foo bar");
    }

    #[test]
    fn test_echo_parses_flag_through_factory() {
        let mut env = Environment::empty("/");
        let mut out = MemWriter::new();
        create("echo", &["-n", "x", ""]).execute(&mut out, &mut env).unwrap();
        assert_eq!(out.contents(), "x ");
    }

    fn echo(args: &[&str]) -> String {
        let mut env = Environment::empty("/");
        let mut out = MemWriter::new();
        let signal = create("echo", args).execute(&mut out, &mut env).unwrap();
        assert_eq!(signal, ExitSignal::Status(0));
        out.contents()
    }

    #[test]
    fn test_echo_prints_dash_words_verbatim() {
        assert_eq!(echo(&["-5"]), "-5\n");
        assert_eq!(echo(&["-x", "--help", "-neE"]), "-x --help -neE\n");
    }

    #[test]
    fn test_echo_combined_and_escape_flags() {
        assert_eq!(echo(&["-ne", "x"]), "x");
        assert_eq!(echo(&["-e", "x"]), "x\n");
        assert_eq!(echo(&["-E", "a", "-n", "b"]), "a b");
    }

    #[test]
    fn test_echo_flag_words() {
        assert!(is_echo_flag("-n"));
        assert!(is_echo_flag("-nn"));
        assert!(is_echo_flag("-eE"));
        assert!(!is_echo_flag("-neE"));
        assert!(!is_echo_flag("-5"));
        assert!(!is_echo_flag("n"));
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_current_dir();
        let temp = tempfile::tempdir().unwrap();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        let orig = stdenv::current_dir().unwrap();

        let mut env = Environment::empty(&orig);
        let cmd = Cd {
            target: Some(canonical_temp.to_string_lossy().to_string()),
        };
        let res = cmd.execute(&mut Vec::<u8>::new(), &mut env);
        let new_cwd = stdenv::current_dir().unwrap();
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        assert_eq!(res.unwrap(), ExitSignal::Status(0));
        assert_eq!(fs::canonicalize(new_cwd).unwrap(), canonical_temp);
        assert_eq!(env.current_dir, canonical_temp);
    }

    #[test]
    fn test_cd_relative_to_environment_dir() {
        let _lock = lock_current_dir();
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        let orig = stdenv::current_dir().unwrap();

        let mut env = Environment::empty(temp.path());
        let res = Cd {
            target: Some("sub".to_string()),
        }
        .execute(&mut Vec::<u8>::new(), &mut env);
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        res.unwrap();
        assert_eq!(
            env.current_dir,
            fs::canonicalize(temp.path().join("sub")).unwrap()
        );
    }

    #[test]
    fn test_cd_to_home_when_none() {
        let _lock = lock_current_dir();
        let temp = tempfile::tempdir().unwrap();
        let canonical_temp = fs::canonicalize(temp.path()).unwrap();
        let orig = stdenv::current_dir().unwrap();

        let mut env = Environment::empty(&orig);
        env.set_var("HOME", canonical_temp.to_string_lossy().to_string());

        let res = Cd { target: None }.execute(&mut Vec::<u8>::new(), &mut env);
        stdenv::set_current_dir(&orig).expect("failed to restore cwd");

        res.unwrap();
        assert_eq!(env.current_dir, canonical_temp);
    }

    #[test]
    fn test_cd_without_home_errors() {
        let mut env = Environment::empty("/");
        let res = Cd { target: None }.execute(&mut Vec::<u8>::new(), &mut env);
        assert!(res.is_err());
    }

    #[test]
    fn test_cd_nonexistent_path_errors() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();
        let mut env = Environment::empty(&orig);

        let name = format!("nonexistent_dir_for_tinsh_test_{}", std::process::id());
        let res = Cd { target: Some(name) }.execute(&mut Vec::<u8>::new(), &mut env);

        let err = res.unwrap_err();
        assert!(err.downcast_ref::<std::io::Error>().is_some());
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }
}
