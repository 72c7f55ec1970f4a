//! A tiny interactive command shell.
//!
//! Each input line goes through a small pipeline: backslash and quote resolution that
//! tags every character with an escape level, word splitting, tilde and `$VAR`
//! expansion, then glob expansion against the working directory. The first word is
//! looked up among the builtins (`exit`, `cd`, `pwd`, `echo`) and then on a search
//! path made of the current directory, a shell-private path variable, `PATH` and any
//! configured extra directories.
//!
//! The main entry point is [`Interpreter`]. The public modules [`command`] and [`env`]
//! expose the traits and types for implementing your own commands, and [`parser`]
//! exposes the line parser on its own.

mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
mod expand;
mod external;
mod glob;
mod interpreter;
mod io_adapters;
mod lexer;
pub mod logging;
pub mod parser;

pub use config::ShellConfig;
pub use env::Environment;
pub use external::SearchPath;
pub use interpreter::{Interpreter, LineReader, ReadOutcome, collapse_home};
pub use io_adapters::MemWriter;
