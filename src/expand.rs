//! Tilde and variable expansion over escape-tagged tokens.

use crate::env::Environment;
use crate::lexer::{EscapeLevel, Token};

/// Replace a leading `~` with the home directory.
///
/// Only `~` on its own or followed by `/` or `:` is expanded. The inserted characters
/// inherit the level of the `~`. With `respect_quotes` set, a `~` that is not
/// [`EscapeLevel::Unescaped`] is left alone.
pub fn expand_tilde(token: &Token, home: &str, respect_quotes: bool) -> Token {
    let chars = token.chars();
    let Some(first) = chars.first() else {
        return token.clone();
    };
    if first.ch != '~' {
        return token.clone();
    }
    if let Some(second) = chars.get(1) {
        if second.ch != '/' && second.ch != ':' {
            return token.clone();
        }
    }
    if respect_quotes && first.level != EscapeLevel::Unescaped {
        return token.clone();
    }

    let mut out = Token::new();
    out.push_str(home, first.level);
    for c in &chars[1..] {
        out.push(c.ch, c.level);
    }
    out
}

fn is_var_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarState {
    Text,
    Var,
    BracedVar,
}

/// Per-token state machine behind [`expand_variables`].
struct VarFSM<'a> {
    env: &'a Environment,
    state: VarState,
    name: String,
    /// Level of the `$` that opened the current reference.
    var_level: EscapeLevel,
    out: Token,
}

impl<'a> VarFSM<'a> {
    fn new(env: &'a Environment) -> Self {
        VarFSM {
            env,
            state: VarState::Text,
            name: String::new(),
            var_level: EscapeLevel::Unescaped,
            out: Token::new(),
        }
    }

    /// Close the open reference and append its value.
    fn substitute(&mut self) {
        let value = self.env.get_var(&self.name).unwrap_or_default();
        log::trace!("substituting ${} -> {:?}", self.name, value);
        self.out.push_str(&value, self.var_level);
        self.name.clear();
        self.var_level = EscapeLevel::Unescaped;
        self.state = VarState::Text;
    }

    fn handle(&mut self, ch: char, level: EscapeLevel) {
        match self.state {
            VarState::Text => self.handle_text(ch, level),
            VarState::Var => self.handle_var(ch, level),
            VarState::BracedVar => self.handle_braced_var(ch, level),
        }
    }

    fn open(&mut self, level: EscapeLevel) {
        self.state = VarState::Var;
        self.var_level = level;
    }

    fn handle_text(&mut self, ch: char, level: EscapeLevel) {
        if ch == '$' && level != EscapeLevel::Literal {
            self.open(level);
        } else {
            self.out.push(ch, level);
        }
    }

    fn handle_var(&mut self, ch: char, level: EscapeLevel) {
        if ch == '$' && level != EscapeLevel::Literal {
            self.substitute();
            self.open(level);
        } else if ch == '{' && self.name.is_empty() {
            self.state = VarState::BracedVar;
        } else if level != self.var_level || !is_var_char(ch) {
            // A quote boundary or a non-name character ends the name.
            self.substitute();
            self.out.push(ch, level);
        } else {
            self.name.push(ch);
        }
    }

    fn handle_braced_var(&mut self, ch: char, level: EscapeLevel) {
        if ch == '}' {
            self.substitute();
        } else if level != self.var_level {
            self.substitute();
            self.out.push(ch, level);
        } else {
            self.name.push(ch);
        }
    }

    fn finish(mut self) -> Token {
        match self.state {
            VarState::Text => {}
            VarState::Var | VarState::BracedVar if self.name.is_empty() => {
                // A bare `$` or `${` at the end stays literal.
                let level = self.var_level;
                self.out.push('$', level);
                if self.state == VarState::BracedVar {
                    self.out.push('{', level);
                }
            }
            VarState::Var | VarState::BracedVar => self.substitute(),
        }
        self.out
    }
}

/// Substitute `$name` and `${name}` references in a token.
///
/// A `$` at [`EscapeLevel::Literal`] never starts a reference. Substituted text takes the
/// level of the `$` that introduced it, so a value expanded inside double quotes stays
/// protected from globbing. Unset variables expand to the empty string.
pub fn expand_variables(token: &Token, env: &Environment) -> Token {
    let mut fsm = VarFSM::new(env);
    for c in token.chars() {
        fsm.handle(c.ch, c.level);
    }
    fsm.finish()
}
