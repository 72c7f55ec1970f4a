//! Filename globbing for tokens that contain unescaped wildcards.
//!
//! Patterns support:
//! - `*` matches zero or more characters
//! - `?` matches exactly one character
//! - `[abc]`, `[a-z]` match one character from the set
//! - `[!abc]` or `[^abc]` match one character not in the set
//! - `\c` matches `c` literally
//!
//! Expansion walks the filesystem one path component at a time. Entries whose name
//! starts with `.` are only matched by a component that itself starts with `.`.

use crate::lexer::{EscapeLevel, Token};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound on recursive match calls, so patterns like `*a*a*a*...` stay cheap.
const MAX_MATCH_CALLS: usize = 100_000;

/// Whether `s` contains an unescaped `*`, `?` or `[`.
fn has_magic(s: &str) -> bool {
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '*' | '?' | '[' => return true,
            _ => {}
        }
    }
    false
}

/// Remove pattern escapes from a component that has no wildcards.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Match a single file name against a single-component pattern.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let input: Vec<char> = name.chars().collect();
    let mut calls = 0usize;
    match_bounded(&pat, 0, &input, 0, &mut calls)
}

fn match_bounded(pattern: &[char], pi: usize, input: &[char], ii: usize, calls: &mut usize) -> bool {
    *calls += 1;
    if *calls > MAX_MATCH_CALLS {
        return false;
    }

    if pi >= pattern.len() {
        return ii >= input.len();
    }

    match pattern[pi] {
        '*' => {
            let mut next_pi = pi;
            while next_pi < pattern.len() && pattern[next_pi] == '*' {
                next_pi += 1;
            }
            if next_pi >= pattern.len() {
                return true;
            }
            (ii..=input.len()).any(|start| match_bounded(pattern, next_pi, input, start, calls))
        }
        '?' => ii < input.len() && match_bounded(pattern, pi + 1, input, ii + 1, calls),
        '[' => match parse_class(pattern, pi) {
            Some(class) => {
                ii < input.len()
                    && class.matches(input[ii])
                    && match_bounded(pattern, class.end, input, ii + 1, calls)
            }
            // No closing bracket: `[` is an ordinary character.
            None => {
                ii < input.len()
                    && input[ii] == '['
                    && match_bounded(pattern, pi + 1, input, ii + 1, calls)
            }
        },
        '\\' if pi + 1 < pattern.len() => {
            ii < input.len()
                && input[ii] == pattern[pi + 1]
                && match_bounded(pattern, pi + 2, input, ii + 1, calls)
        }
        c => ii < input.len() && input[ii] == c && match_bounded(pattern, pi + 1, input, ii + 1, calls),
    }
}

/// A parsed `[...]` bracket expression.
struct CharClass {
    negated: bool,
    ranges: Vec<(char, char)>,
    /// Index just past the closing `]`.
    end: usize,
}

impl CharClass {
    fn matches(&self, c: char) -> bool {
        let hit = self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
        hit != self.negated
    }
}

fn parse_class(pattern: &[char], start: usize) -> Option<CharClass> {
    let mut i = start + 1;
    let negated = matches!(pattern.get(i), Some('!' | '^'));
    if negated {
        i += 1;
    }

    let mut ranges = Vec::new();
    let mut first = true;
    loop {
        let mut c = *pattern.get(i)?;
        // `]` right after the opening bracket is a member, not the end.
        if c == ']' && !first {
            return Some(CharClass {
                negated,
                ranges,
                end: i + 1,
            });
        }
        first = false;
        if c == '\\' {
            i += 1;
            c = *pattern.get(i)?;
        }
        i += 1;

        if pattern.get(i) == Some(&'-') && pattern.get(i + 1).is_some_and(|&n| n != ']') {
            let mut hi = pattern[i + 1];
            i += 2;
            if hi == '\\' {
                hi = *pattern.get(i)?;
                i += 1;
            }
            ranges.push((c, hi));
        } else {
            ranges.push((c, c));
        }
    }
}

/// Expand a pattern against the filesystem.
///
/// Relative patterns are resolved against `cwd`, but the returned paths keep the shape
/// the user typed (`src/*.rs` yields `src/main.rs`, not an absolute path). Unreadable
/// directories simply contribute no matches. Results are sorted per directory.
pub fn expand_pattern(pattern: &str, cwd: &Path) -> Vec<String> {
    let absolute = pattern.starts_with('/');
    let dir_only = pattern.len() > 1 && pattern.ends_with('/');
    let components: Vec<&str> = pattern.split('/').filter(|c| !c.is_empty()).collect();

    // Each candidate is (display path, filesystem path).
    let root = if absolute {
        (String::from("/"), PathBuf::from("/"))
    } else {
        (String::new(), cwd.to_path_buf())
    };
    let mut candidates = vec![root];

    for (idx, component) in components.iter().enumerate() {
        let last = idx + 1 == components.len();
        let mut next = Vec::new();
        for (shown, real) in &candidates {
            if has_magic(component) {
                for name in matching_entries(real, component) {
                    next.push((join_shown(shown, &name), real.join(&name)));
                }
            } else {
                let name = unescape(component);
                let real = real.join(&name);
                // Intermediate literal components are checked by the listing below them.
                if !last || real.symlink_metadata().is_ok() {
                    next.push((join_shown(shown, &name), real));
                }
            }
        }
        candidates = next;
        if candidates.is_empty() {
            break;
        }
    }

    candidates
        .into_iter()
        .filter(|(_, real)| !dir_only || real.is_dir())
        .map(|(shown, _)| if dir_only { shown + "/" } else { shown })
        .collect()
}

fn join_shown(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else if prefix.ends_with('/') {
        format!("{prefix}{name}")
    } else {
        format!("{prefix}/{name}")
    }
}

fn matching_entries(dir: &Path, pattern: &str) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let show_hidden = pattern.starts_with('.');
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| show_hidden || !name.starts_with('.'))
        .filter(|name| glob_match(pattern, name))
        .collect();
    names.sort();
    names
}

/// Whether a token contains a wildcard at full metacharacter significance.
pub fn is_glob_eligible(token: &Token) -> bool {
    token
        .chars()
        .iter()
        .any(|c| c.level == EscapeLevel::Unescaped && matches!(c.ch, '*' | '?' | '['))
}

/// Build the pattern string for a token: wildcard characters and backslashes that were
/// quoted or escaped get a `\` prefix so they only match themselves.
pub fn glob_pattern(token: &Token) -> String {
    let mut out = String::with_capacity(token.len());
    for c in token.chars() {
        if c.level != EscapeLevel::Unescaped && matches!(c.ch, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c.ch);
    }
    out
}

/// Glob every eligible token; the rest pass through as plain text.
///
/// A pattern without matches is kept as the literal token text.
pub fn expand_globs(tokens: &[Token], cwd: &Path) -> Vec<String> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        if !is_glob_eligible(token) {
            out.push(token.text());
            continue;
        }
        let pattern = glob_pattern(token);
        let matches = expand_pattern(&pattern, cwd);
        log::trace!("glob {pattern:?} matched {} entries", matches.len());
        if matches.is_empty() {
            out.push(token.text());
        } else {
            out.extend(matches);
        }
    }
    out
}
