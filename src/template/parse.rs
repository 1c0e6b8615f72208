use crate::template::{Export, Line, Template};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

/// Placeholder-looking tokens; case is checked separately so that
/// `@atmres_anl@` can be reported instead of silently ignored.
const PLACEHOLDER_RE: &str = r"@([A-Za-z0-9_]+)@";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_RE).expect("placeholder regex compiles"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("expected `export NAME=VALUE`, a comment or a blank line")]
    NotExport,

    #[error("invalid variable name {0:?}")]
    BadName(String),

    #[error("missing '=' after `export {0}`")]
    MissingAssign(String),

    #[error("unterminated {0}")]
    Unterminated(&'static str),

    #[error("unquoted whitespace in value of {0}")]
    UnquotedWhitespace(String),
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {error}")]
    Syntax { line: usize, error: SyntaxError },
}

impl Template {
    /// Parse template text. Fails on the first line that is not a blank line,
    /// a comment or a well-formed export.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let (body, trailing_newline) = match text.strip_suffix('\n') {
            Some(body) => (body, true),
            None => (text, false),
        };

        let mut lines = Vec::new();
        if !(body.is_empty() && !trailing_newline) {
            for (idx, raw) in body.split('\n').enumerate() {
                let line = idx + 1;
                let parsed = parse_line(line, raw)
                    .map_err(|error| TemplateError::Syntax { line, error })?;
                lines.push(parsed);
            }
        }

        Ok(Template {
            lines,
            trailing_newline,
        })
    }
}

fn parse_line(line: usize, raw: &str) -> Result<Line, SyntaxError> {
    let content = raw.strip_suffix('\r').unwrap_or(raw).trim();

    if content.is_empty() {
        return Ok(Line::Blank {
            raw: raw.to_string(),
        });
    }
    if content.starts_with('#') {
        return Ok(Line::Comment {
            raw: raw.to_string(),
        });
    }

    let rest = match content.strip_prefix("export") {
        Some(r) if r.starts_with(char::is_whitespace) => r.trim_start(),
        _ => return Err(SyntaxError::NotExport),
    };

    let name_len = ident_len(rest);
    let name = &rest[..name_len];
    let after = &rest[name_len..];
    let name_ends_cleanly =
        after.is_empty() || after.starts_with('=') || after.starts_with(char::is_whitespace);
    if name.is_empty() || !name_ends_cleanly {
        let token = rest
            .split(|c: char| c == '=' || c.is_whitespace())
            .next()
            .unwrap_or(rest);
        return Err(SyntaxError::BadName(token.to_string()));
    }
    let value_src = after
        .strip_prefix('=')
        .ok_or_else(|| SyntaxError::MissingAssign(name.to_string()))?;

    let (end, references) = scan_value(value_src)?;
    let value = &value_src[..end];
    let trailing = value_src[end..].trim_start();
    if !trailing.is_empty() && !trailing.starts_with('#') {
        return Err(SyntaxError::UnquotedWhitespace(name.to_string()));
    }

    let placeholders = PLACEHOLDER
        .captures_iter(value)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();

    Ok(Line::Export(Export {
        line,
        raw: raw.to_string(),
        name: name.to_string(),
        value: value.to_string(),
        placeholders,
        references,
    }))
}

/// Byte length of a leading shell identifier (`[A-Za-z_][A-Za-z0-9_]*`).
fn ident_len(s: &str) -> usize {
    let mut len = 0;
    for (i, c) in s.char_indices() {
        let ok = if i == 0 {
            c == '_' || c.is_ascii_alphabetic()
        } else {
            c == '_' || c.is_ascii_alphanumeric()
        };
        if !ok {
            break;
        }
        len = i + c.len_utf8();
    }
    len
}

/// Scan one shell word. Returns the byte offset where the word ends and the
/// variables it references.
fn scan_value(src: &str) -> Result<(usize, Vec<String>), SyntaxError> {
    let chars: Vec<(usize, char)> = src.char_indices().collect();
    let mut refs = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (off, c) = chars[i];
        match c {
            c if c.is_whitespace() => return Ok((off, refs)),
            '\'' => {
                i = find(&chars, i + 1, '\'').ok_or(SyntaxError::Unterminated("single quote"))? + 1;
            }
            '"' => i = scan_double(&chars, i + 1, &mut refs)?,
            '`' => {
                i = find(&chars, i + 1, '`').ok_or(SyntaxError::Unterminated("backtick"))? + 1;
            }
            '\\' => {
                if i + 1 >= chars.len() {
                    return Err(SyntaxError::Unterminated("escape"));
                }
                i += 2;
            }
            '$' => i = scan_dollar(&chars, i + 1, &mut refs)?,
            _ => i += 1,
        }
    }

    Ok((src.len(), refs))
}

fn find(chars: &[(usize, char)], from: usize, target: char) -> Option<usize> {
    (from..chars.len()).find(|&k| chars[k].1 == target)
}

/// Body of a double-quoted string starting after the opening quote.
fn scan_double(
    chars: &[(usize, char)],
    mut j: usize,
    refs: &mut Vec<String>,
) -> Result<usize, SyntaxError> {
    while let Some(&(_, c)) = chars.get(j) {
        match c {
            '"' => return Ok(j + 1),
            '\\' => j += 2,
            '$' => j = scan_dollar(chars, j + 1, refs)?,
            '`' => j = find(chars, j + 1, '`').ok_or(SyntaxError::Unterminated("backtick"))? + 1,
            _ => j += 1,
        }
    }
    Err(SyntaxError::Unterminated("double quote"))
}

/// Expansion starting right after a `$`.
fn scan_dollar(
    chars: &[(usize, char)],
    j: usize,
    refs: &mut Vec<String>,
) -> Result<usize, SyntaxError> {
    match chars.get(j).map(|&(_, c)| c) {
        Some('{') => {
            let name = ident_at(chars, j + 1);
            if !name.is_empty() {
                refs.push(name);
            }
            close_group(chars, j, '{', '}').ok_or(SyntaxError::Unterminated("${"))
        }
        Some('(') => close_group(chars, j, '(', ')').ok_or(SyntaxError::Unterminated("$(")),
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {
            let name = ident_at(chars, j);
            let end = j + name.chars().count();
            refs.push(name);
            Ok(end)
        }
        Some(c) if c.is_ascii_digit() || "?$#@*!-".contains(c) => Ok(j + 1),
        // A lone '$' is literal.
        _ => Ok(j),
    }
}

fn ident_at(chars: &[(usize, char)], from: usize) -> String {
    let mut name = String::new();
    for &(_, c) in chars.iter().skip(from) {
        let ok = if name.is_empty() {
            c == '_' || c.is_ascii_alphabetic()
        } else {
            c == '_' || c.is_ascii_alphanumeric()
        };
        if !ok {
            break;
        }
        name.push(c);
    }
    name
}

/// Index just past the bracket matching `chars[open_at]`.
fn close_group(chars: &[(usize, char)], open_at: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for (k, &(_, c)) in chars.iter().enumerate().skip(open_at) {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return Some(k + 1);
            }
        }
    }
    None
}
