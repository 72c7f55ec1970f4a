use crate::env::Environment;
use crate::error::ParseError;
use crate::expand::{expand_tilde, expand_variables};
use crate::glob::expand_globs;
use crate::lexer::{self, Token};
use serde::{Deserialize, Serialize};

/// Switches for the optional expansion stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParseOptions {
    pub expand_tilde: bool,
    pub expand_vars: bool,
    pub glob: bool,
    /// Leave a quoted or escaped `~` unexpanded.
    pub tilde_respects_quotes: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            expand_tilde: true,
            expand_vars: true,
            glob: true,
            tilde_respects_quotes: false,
        }
    }
}

/// A fully expanded command line: the command name followed by its arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    words: Vec<String>,
}

impl ParsedCommand {
    pub fn new(words: Vec<String>) -> Self {
        Self { words }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The command name, if the line had any words.
    pub fn name(&self) -> Option<&str> {
        self.words.first().map(String::as_str)
    }

    /// Everything after the command name.
    pub fn args(&self) -> &[String] {
        self.words.get(1..).unwrap_or_default()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn into_words(self) -> Vec<String> {
        self.words
    }
}

/// Run a raw input line through the whole pipeline:
/// escapes, word splitting, tilde, variables, globbing.
///
/// The environment is only read. Globs are resolved relative to `env.current_dir`.
pub fn parse_line(
    line: &str,
    env: &Environment,
    options: &ParseOptions,
) -> Result<ParsedCommand, ParseError> {
    let mut tokens: Vec<Token> = lexer::split_into_tokens(line)?;
    log::trace!("split {line:?} into {} tokens", tokens.len());

    if options.expand_tilde {
        let home = env.home();
        tokens = tokens
            .iter()
            .map(|t| expand_tilde(t, &home, options.tilde_respects_quotes))
            .collect();
    }

    if options.expand_vars {
        tokens = tokens.iter().map(|t| expand_variables(t, env)).collect();
    }

    let words = if options.glob {
        expand_globs(&tokens, &env.current_dir)
    } else {
        tokens.iter().map(Token::text).collect()
    };
    log::trace!("expanded to {words:?}");

    Ok(ParsedCommand::new(words))
}
