use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Mutable, user-level view of the process state shared by the parser and the dispatcher.
///
/// The environment contains:
/// - `vars`: a map of environment variables that will be visible to executed commands
///   and to `$name` expansion.
/// - `current_dir`: the working directory used for globbing, path lookup and command
///   execution.
///
/// Parsing only ever reads it. Builtins such as `cd` are the only writers.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// This copies variables from `std::env::vars()` and initializes `current_dir`
    /// from `std::env::current_dir()`.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// An environment with no variables, rooted at `current_dir`.
    pub fn empty(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            current_dir: current_dir.into(),
        }
    }

    /// Get the value of an environment variable.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    /// Set or override an environment variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// The user's home directory, or an empty string when `HOME` is unset.
    pub fn home(&self) -> String {
        self.get_var("HOME").unwrap_or_default()
    }

    /// Seed a search path variable with `defaults` unless it already has a value.
    ///
    /// Returns `true` when the variable was seeded.
    pub fn seed_path_var(&mut self, key: &str, defaults: &[PathBuf]) -> bool {
        if self.get_var(key).is_some_and(|v| !v.is_empty()) {
            return false;
        }
        let joined = stdenv::join_paths(defaults).unwrap_or_else(|err| {
            log::warn!("cannot join default entries for {key}: {err}");
            OsString::new()
        });
        self.set_var(key, joined.to_string_lossy());
        true
    }

    /// Entries of a path-list variable, split the way the host does it. Empty entries are skipped.
    pub fn path_list(&self, key: &str) -> Vec<PathBuf> {
        match self.get_var(key) {
            Some(value) => stdenv::split_paths(&value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Resolve `path` against the current directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.current_dir.join(path)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
