use std::fmt;
use std::io;

/// Which kind of quote was left open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quote {
    Single,
    Double,
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quote::Single => f.write_str("single"),
            Quote::Double => f.write_str("double"),
        }
    }
}

/// Errors raised while parsing a single input line. They discard that line only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unclosed {0}-quoted string in command")]
    UnterminatedQuote(Quote),
    #[error("unfinished backslash escape at end of command")]
    DanglingEscape,
}

impl ParseError {
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::UnterminatedQuote(_) => "UnterminatedQuote",
            ParseError::DanglingEscape => "DanglingEscape",
        }
    }
}

/// Everything the read-eval loop can report to the user.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{0}: command not found")]
    CommandNotFound(String),

    /// Any failure raised while a command was running.
    #[error("{command}: {source:#}")]
    Invocation {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{0}")]
    WorkingDirectoryUnavailable(io::Error),
}

impl ShellError {
    /// Short name of the error used in `tinsh: <kind>: <detail>` reports.
    pub fn kind(&self) -> String {
        match self {
            ShellError::Parse(e) => e.kind().to_string(),
            ShellError::CommandNotFound(_) => "CommandNotFound".to_string(),
            ShellError::Invocation { source, .. } => match source.downcast_ref::<io::Error>() {
                Some(io_err) => format!("{:?}", io_err.kind()),
                None => "Error".to_string(),
            },
            ShellError::WorkingDirectoryUnavailable(e) => format!("{:?}", e.kind()),
        }
    }
}
