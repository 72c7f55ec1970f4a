//! Lexical front end of the parse pipeline: escape resolution and word splitting.
//!
//! The resolver removes quote and backslash characters from a raw line and tags every
//! remaining character with an [`EscapeLevel`]. Later stages (tilde, variables, globbing)
//! consult that tag to decide whether a character still carries shell meaning.

use crate::error::{ParseError, Quote};

/// How much shell metacharacter meaning a character has retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EscapeLevel {
    /// Outside any quoting: wildcards, `$` and word-splitting spaces are active.
    Unescaped,
    /// Inside double quotes: `$` is still active, everything else is literal.
    Semi,
    /// Inside single quotes or after a backslash: fully literal.
    Literal,
}

/// A single character together with its escape level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscapedChar {
    pub ch: char,
    pub level: EscapeLevel,
}

impl EscapedChar {
    pub fn new(ch: char, level: EscapeLevel) -> Self {
        Self { ch, level }
    }
}

/// An intermediate word that carries per-character escape levels through the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    chars: Vec<EscapedChar>,
}

impl Token {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ch: char, level: EscapeLevel) {
        self.chars.push(EscapedChar::new(ch, level));
    }

    /// Append `text`, tagging every character with `level`.
    pub fn push_str(&mut self, text: &str, level: EscapeLevel) {
        self.chars
            .extend(text.chars().map(|ch| EscapedChar::new(ch, level)));
    }

    pub fn chars(&self) -> &[EscapedChar] {
        &self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Plain text of the token with escape information dropped.
    pub fn text(&self) -> String {
        self.chars.iter().map(|c| c.ch).collect()
    }

    pub fn levels(&self) -> Vec<EscapeLevel> {
        self.chars.iter().map(|c| c.level).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    Unquoted,
    Single,
    Double,
}

/// Finite state machine behind [`resolve_escapes`].
///
/// Quote state and the pending backslash are tracked separately: a backslash may be
/// pending both outside quotes and inside a double-quoted string.
struct EscapeFSM {
    input: Vec<char>,
    pos: usize,
    quote: QuoteState,
    escape_pending: bool,
    out: Vec<EscapedChar>,
}

impl EscapeFSM {
    fn new(line: &str) -> Self {
        EscapeFSM {
            input: line.trim().chars().collect(),
            pos: 0,
            quote: QuoteState::Unquoted,
            escape_pending: false,
            out: Vec::new(),
        }
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn emit(&mut self, ch: char, level: EscapeLevel) {
        self.out.push(EscapedChar::new(ch, level));
    }

    fn run(mut self) -> Result<Vec<EscapedChar>, ParseError> {
        while let Some(ch) = self.read_char() {
            if self.escape_pending {
                self.emit(ch, EscapeLevel::Literal);
                self.escape_pending = false;
                continue;
            }
            match self.quote {
                QuoteState::Unquoted => self.handle_unquoted(ch),
                QuoteState::Single => self.handle_single_quote(ch),
                QuoteState::Double => self.handle_double_quote(ch),
            }
        }

        match self.quote {
            QuoteState::Single => return Err(ParseError::UnterminatedQuote(Quote::Single)),
            QuoteState::Double => return Err(ParseError::UnterminatedQuote(Quote::Double)),
            QuoteState::Unquoted => {}
        }
        if self.escape_pending {
            return Err(ParseError::DanglingEscape);
        }
        Ok(self.out)
    }

    fn handle_unquoted(&mut self, ch: char) {
        match ch {
            '\'' => self.quote = QuoteState::Single,
            '"' => self.quote = QuoteState::Double,
            '\\' => self.escape_pending = true,
            c => self.emit(c, EscapeLevel::Unescaped),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.quote = QuoteState::Unquoted,
            c => self.emit(c, EscapeLevel::Literal),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.quote = QuoteState::Unquoted,
            '\\' => match self.peek_char() {
                Some('\\' | '$' | '"') => self.escape_pending = true,
                // Not an escape here: keep the backslash, parse the next char normally.
                _ => self.emit('\\', EscapeLevel::Literal),
            },
            c => self.emit(c, EscapeLevel::Semi),
        }
    }
}

/// Resolve quoting and backslash escapes in a raw input line.
///
/// The line is trimmed first. Quote characters and escaping backslashes are removed;
/// every remaining character is tagged with the escape level it was read under.
///
/// # Errors
/// [`ParseError::UnterminatedQuote`] when a quote is still open at the end of the line,
/// [`ParseError::DanglingEscape`] when the line ends with an unescaped backslash.
pub fn resolve_escapes(line: &str) -> Result<Vec<EscapedChar>, ParseError> {
    EscapeFSM::new(line).run()
}

/// Split resolved text into tokens at unescaped spaces.
///
/// Runs of delimiters never produce empty tokens.
pub fn split_words(chars: &[EscapedChar]) -> Vec<Token> {
    let mut out = Vec::new();
    let mut current = Token::new();
    for &c in chars {
        if c.ch == ' ' && c.level == EscapeLevel::Unescaped {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else {
            current.chars.push(c);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Resolve escapes and split into tokens in one step.
pub fn split_into_tokens(line: &str) -> Result<Vec<Token>, ParseError> {
    let resolved = resolve_escapes(line)?;
    Ok(split_words(&resolved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use EscapeLevel::*;

    fn texts(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(Token::text).collect()
    }

    #[test]
    fn test_plain_words_are_unescaped() {
        let tokens = split_into_tokens("ls -la /tmp").unwrap();
        assert_eq!(texts(&tokens), vec!["ls", "-la", "/tmp"]);
        assert!(tokens[1].levels().iter().all(|l| *l == Unescaped));
    }

    #[test]
    fn test_input_is_trimmed_and_spaces_collapse() {
        let tokens = split_into_tokens("   echo    a   b  ").unwrap();
        assert_eq!(texts(&tokens), vec!["echo", "a", "b"]);
    }

    #[test]
    fn test_single_quotes_are_fully_literal() {
        let tokens = split_into_tokens("'a*b'").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text(), "a*b");
        assert_eq!(tokens[0].levels(), vec![Literal, Literal, Literal]);
    }

    #[test]
    fn test_double_quotes_are_semi_escaped() {
        let tokens = split_into_tokens("echo \"hello world\"").unwrap();
        assert_eq!(texts(&tokens), vec!["echo", "hello world"]);
        assert!(tokens[1].levels().iter().all(|l| *l == Semi));
    }

    #[test]
    fn test_backslash_escapes_space() {
        let tokens = split_into_tokens(r"a\ b c").unwrap();
        assert_eq!(texts(&tokens), vec!["a b", "c"]);
        assert_eq!(tokens[0].levels(), vec![Unescaped, Literal, Unescaped]);
    }

    #[test]
    fn test_backslash_inside_single_quotes_is_kept() {
        let resolved = resolve_escapes(r"'a\b'").unwrap();
        let text: String = resolved.iter().map(|c| c.ch).collect();
        assert_eq!(text, r"a\b");
        assert!(resolved.iter().all(|c| c.level == Literal));
    }

    #[test]
    fn test_double_quote_escapes_only_special_chars() {
        let resolved = resolve_escapes(r#""a\$b\n""#).unwrap();
        let text: String = resolved.iter().map(|c| c.ch).collect();
        assert_eq!(text, r"a$b\n");
        let levels: Vec<_> = resolved.iter().map(|c| c.level).collect();
        assert_eq!(levels, vec![Semi, Literal, Semi, Literal, Semi]);
    }

    #[test]
    fn test_escaped_quote_inside_double_quotes() {
        let resolved = resolve_escapes(r#""say \"hi\"""#).unwrap();
        let text: String = resolved.iter().map(|c| c.ch).collect();
        assert_eq!(text, r#"say "hi""#);
    }

    #[test]
    fn test_other_quote_kind_is_literal_inside_quotes() {
        let tokens = split_into_tokens(r#""it's" 'say "x"'"#).unwrap();
        assert_eq!(texts(&tokens), vec!["it's", r#"say "x""#]);
    }

    #[test]
    fn test_adjacent_quoted_parts_join_into_one_word() {
        let tokens = split_into_tokens(r#"a'b c'"d""#).unwrap();
        assert_eq!(texts(&tokens), vec!["ab cd"]);
        assert_eq!(
            tokens[0].levels(),
            vec![Unescaped, Literal, Literal, Literal, Semi]
        );
    }

    #[test]
    fn test_resolved_length_matches_levels() {
        for line in ["echo 'a b' \"c d\" e\\ f", "x\\\\y", "\"\\\\\""] {
            let resolved = resolve_escapes(line).unwrap();
            let text: String = resolved.iter().map(|c| c.ch).collect();
            assert_eq!(text.chars().count(), resolved.len());
        }
    }

    #[test]
    fn test_unterminated_single_quote_fails() {
        assert_eq!(
            resolve_escapes("echo 'abc").unwrap_err(),
            ParseError::UnterminatedQuote(Quote::Single)
        );
    }

    #[test]
    fn test_unterminated_double_quote_fails() {
        assert_eq!(
            resolve_escapes("echo \"abc").unwrap_err(),
            ParseError::UnterminatedQuote(Quote::Double)
        );
    }

    #[test]
    fn test_trailing_backslash_fails() {
        // Trimming happens first, so the backslash really is last.
        assert_eq!(
            resolve_escapes("echo abc\\").unwrap_err(),
            ParseError::DanglingEscape
        );
    }

    #[test]
    fn test_empty_quotes_produce_no_token() {
        let tokens = split_into_tokens("echo ''").unwrap();
        assert_eq!(texts(&tokens), vec!["echo"]);
    }
}
