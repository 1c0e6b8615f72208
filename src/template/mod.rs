//! Environment-configuration templates.
//!
//! A template is a POSIX shell fragment made only of `export NAME=VALUE`
//! statements, `#` comments and blank lines:
//!
//! ```sh
//! #! /usr/bin/env bash
//! export CASE_ANL=@CASE_ANL@
//! export BERROR_YAML=${HOMEgfs}/sorc/gdas.cd/parm/atm/berror/staticb_${STATICB_TYPE}.yaml
//! ```
//!
//! `@TOKEN@` placeholders belong to the deployment templating step. They are
//! inventoried and checked here but never substituted; `render` gives the
//! file back byte for byte.

pub mod line;
pub mod parse;
pub mod validate;

pub use line::{Export, Line};
pub use parse::{SyntaxError, TemplateError};
pub use validate::Mode;

use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

/// What a template expects from its environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub path: String,
    pub exports: Vec<String>,
    pub placeholders: Vec<String>,
    pub external_references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    lines: Vec<Line>,
    trailing_newline: bool,
}

impl Template {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn exports(&self) -> impl Iterator<Item = &Export> {
        self.lines.iter().filter_map(|l| match l {
            Line::Export(e) => Some(e),
            _ => None,
        })
    }

    /// Last value exported for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.exports()
            .filter(|e| e.name == name)
            .last()
            .map(|e| e.value.as_str())
    }

    /// Distinct `@UPPER_SNAKE_CASE@` placeholders in first-appearance order.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        self.exports()
            .flat_map(|e| e.placeholders.iter())
            .filter(|p| line::is_upper_snake(p))
            .filter(|p| seen.insert(p.as_str()))
            .map(|p| p.as_str())
            .collect()
    }

    /// Variables read before (or without) being exported by this file,
    /// e.g. `HOMEgfs`. First-use order.
    pub fn external_references(&self) -> Vec<&str> {
        let mut exported = BTreeSet::new();
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for e in self.exports() {
            for r in &e.references {
                if !exported.contains(r.as_str()) && seen.insert(r.as_str()) {
                    out.push(r.as_str());
                }
            }
            exported.insert(e.name.as_str());
        }
        out
    }

    pub fn inventory(&self, path: impl Into<String>) -> Inventory {
        let owned = |v: Vec<&str>| v.into_iter().map(str::to_string).collect::<Vec<_>>();
        Inventory {
            path: path.into(),
            exports: self.exports().map(|e| e.name.clone()).collect(),
            placeholders: owned(self.placeholders()),
            external_references: owned(self.external_references()),
        }
    }

    /// The template text exactly as parsed.
    pub fn render(&self) -> String {
        let mut out = self
            .lines
            .iter()
            .map(Line::raw)
            .collect::<Vec<_>>()
            .join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }
}
