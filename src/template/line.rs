/// One physical line of an environment template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Blank { raw: String },
    Comment { raw: String },
    Export(Export),
}

/// `export NAME=VALUE [# comment]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// 1-based line number.
    pub line: usize,
    pub raw: String,
    pub name: String,
    /// Value text exactly as written (quotes included, trailing comment excluded).
    pub value: String,
    /// `@TOKEN@` names in order of appearance, duplicates kept.
    pub placeholders: Vec<String>,
    /// Variables referenced via `$NAME` / `${NAME...}`, in order of appearance.
    pub references: Vec<String>,
}

impl Line {
    pub fn raw(&self) -> &str {
        match self {
            Line::Blank { raw } | Line::Comment { raw } => raw,
            Line::Export(e) => &e.raw,
        }
    }
}

/// `@UPPER_SNAKE_CASE@` token name check (without the `@`s).
pub fn is_upper_snake(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
