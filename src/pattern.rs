//! `dmpdir regex` patterns.
//!
//! Despite the field name these are shell globs matched against a single file
//! name inside the observation space's dump subdirectory:
//!
//!   rads_adt_3?_*.nc
//!   *-L3U_GHRSST-SSTsubskin-AVHRR{F,L}_MA-*.nc
//!   wod_[0-9][0-9][0-9]*.nc4
//!
//! Supported syntax: `*`, `?`, `[...]` (with `!`/`^` negation and ranges),
//! non-nested `{a,b}` alternation and `\x` escapes. Everything else is literal.
//! We compile once to an anchored `regex::Regex`.

use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern is empty")]
    Empty,

    #[error("path separator at offset {0}; patterns match a single file name")]
    PathSeparator(usize),

    #[error("unclosed '[' starting at offset {0}")]
    UnclosedClass(usize),

    #[error("unclosed '{{' starting at offset {0}")]
    UnclosedBrace(usize),

    #[error("nested '{{' at offset {0}")]
    NestedBrace(usize),

    #[error("trailing backslash")]
    TrailingEscape,

    #[error("pattern does not compile: {0}")]
    Regex(#[from] regex::Error),
}

/// A validated, compiled dump-file pattern.
#[derive(Clone)]
pub struct DmpdirPattern {
    source: String,
    regex: Regex,
}

impl DmpdirPattern {
    pub fn parse(glob: &str) -> Result<Self, PatternError> {
        let body = glob_to_regex(glob)?;
        let regex = Regex::new(&format!("^{}$", body))?;
        Ok(Self {
            source: glob.to_string(),
            regex,
        })
    }

    /// Full-name match; `file_name` must not contain directories.
    pub fn is_match(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for DmpdirPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DmpdirPattern").field(&self.source).finish()
    }
}

impl fmt::Display for DmpdirPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for DmpdirPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

/// Translate a glob into an unanchored regex body.
fn glob_to_regex(glob: &str) -> Result<String, PatternError> {
    if glob.is_empty() {
        return Err(PatternError::Empty);
    }

    let chars: Vec<(usize, char)> = glob.char_indices().collect();
    let mut out = String::with_capacity(glob.len() * 2);
    let mut brace_start: Option<usize> = None;
    let mut i = 0;

    while i < chars.len() {
        let (off, c) = chars[i];
        match c {
            '/' => return Err(PatternError::PathSeparator(off)),
            '\\' => {
                let (_, next) = *chars.get(i + 1).ok_or(PatternError::TrailingEscape)?;
                out.push_str(&regex::escape(&next.to_string()));
                i += 2;
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                let (class, consumed) = translate_class(&chars[i..], off)?;
                out.push_str(&class);
                i += consumed;
                continue;
            }
            '{' => {
                if brace_start.is_some() {
                    return Err(PatternError::NestedBrace(off));
                }
                brace_start = Some(off);
                out.push_str("(?:");
            }
            ',' if brace_start.is_some() => out.push('|'),
            '}' if brace_start.is_some() => {
                brace_start = None;
                out.push(')');
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
        i += 1;
    }

    if let Some(start) = brace_start {
        return Err(PatternError::UnclosedBrace(start));
    }
    Ok(out)
}

/// Translate a `[...]` class starting at `chars[0]`. Returns the regex class
/// and the number of chars consumed (including both brackets).
fn translate_class(chars: &[(usize, char)], start: usize) -> Result<(String, usize), PatternError> {
    let mut i = 1;
    let mut negate = false;
    if let Some((_, '!' | '^')) = chars.get(i) {
        negate = true;
        i += 1;
    }
    // A ']' right after '[' or '[!' is a member, not the terminator.
    let first = i;

    let mut members: Vec<char> = Vec::new();
    // Indices into `members` of '-' that form a range.
    let mut ranges: Vec<usize> = Vec::new();
    let mut closed = false;

    while let Some(&(off, c)) = chars.get(i) {
        match c {
            ']' if i > first => {
                closed = true;
                i += 1;
                break;
            }
            '/' => return Err(PatternError::PathSeparator(off)),
            '\\' => {
                let (_, next) = *chars.get(i + 1).ok_or(PatternError::TrailingEscape)?;
                members.push(next);
                i += 2;
                continue;
            }
            '-' if !members.is_empty()
                && chars.get(i + 1).is_some_and(|&(_, n)| n != ']') =>
            {
                ranges.push(members.len());
                members.push('-');
            }
            _ => members.push(c),
        }
        i += 1;
    }

    if !closed {
        return Err(PatternError::UnclosedClass(start));
    }

    let mut class = String::from(if negate { "[^/" } else { "[" });
    for (idx, m) in members.iter().enumerate() {
        if *m == '-' && ranges.contains(&idx) {
            class.push('-');
        } else if matches!(m, '\\' | '[' | ']' | '^' | '-' | '&' | '~') {
            class.push('\\');
            class.push(*m);
        } else {
            class.push(*m);
        }
    }
    class.push(']');
    Ok((class, i))
}
