//! Macro Table
//!
//! Defined macros and their optional values. The table is the truth oracle for
//! `#ifdef`/`#ifndef` and the source of text substitution.

use super::directive::is_identifier;
use moddep_core::{Error, Result};
use std::collections::BTreeMap;
use std::ops::Range;

/// Substitution text of a macro defined without a value
pub const TRUTHY_MARKER: &str = "1";

/// A macro definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDefinition {
    pub name: String,
    pub value: Option<String>,
}

impl MacroDefinition {
    /// Create a macro that is simply defined (no value)
    pub fn defined(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: None,
        }
    }

    /// Create a macro with a specific value
    pub fn with_value(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: Some(value.to_string()),
        }
    }

    /// Parse a seed of the form `NAME` or `NAME=VALUE`
    pub fn parse_seed(seed: &str) -> Result<Self> {
        let (name, value) = match seed.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (seed.trim(), None),
        };
        if !is_identifier(name) {
            return Err(Error::Config(format!(
                "invalid macro definition '{}': '{}' is not a valid name",
                seed, name
            )));
        }
        Ok(Self {
            name: name.to_string(),
            value: value.map(str::to_string),
        })
    }

    /// Text that replaces an occurrence of the name
    pub fn substitution(&self) -> &str {
        self.value.as_deref().unwrap_or(TRUTHY_MARKER)
    }
}

/// Macro table; an absent name is undefined
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroTable {
    macros: BTreeMap<String, MacroDefinition>,
}

impl MacroTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `NAME` / `NAME=VALUE` seeds; later seeds win
    pub fn from_seeds<S: AsRef<str>>(seeds: &[S]) -> Result<Self> {
        let mut table = Self::new();
        for seed in seeds {
            table.define(MacroDefinition::parse_seed(seed.as_ref())?);
        }
        Ok(table)
    }

    /// Define or redefine a macro; the last write wins
    pub fn define(&mut self, definition: MacroDefinition) {
        self.macros.insert(definition.name.clone(), definition);
    }

    /// Remove a macro; returns whether it was defined
    pub fn undefine(&mut self, name: &str) -> bool {
        self.macros.remove(name).is_some()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.macros.get(name)
    }

    /// Value of a macro, if it is defined with one
    pub fn value(&self, name: &str) -> Option<&str> {
        self.macros.get(name).and_then(|m| m.value.as_deref())
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Definitions in name order
    pub fn iter(&self) -> impl Iterator<Item = &MacroDefinition> {
        self.macros.values()
    }

    /// Replace every standalone identifier that names a defined macro.
    ///
    /// One left-to-right pass; substituted text is not rescanned. String literals and
    /// trailing `!` comments are copied unchanged. Inside the `keep` byte range only
    /// macros with a value are replaced, so a bare flag never turns a unit name into
    /// the truthy marker.
    pub fn expand(&self, text: &str, keep: Option<Range<usize>>) -> String {
        if self.macros.is_empty() {
            return text.to_string();
        }

        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            if c == b'\'' || c == b'"' {
                let end = text[i + 1..]
                    .find(c as char)
                    .map(|p| i + 1 + p + 1)
                    .unwrap_or(bytes.len());
                out.push_str(&text[i..end]);
                i = end;
            } else if c == b'!' {
                out.push_str(&text[i..]);
                break;
            } else if c.is_ascii_alphabetic() || c == b'_' {
                let end = scan_word(bytes, i);
                let word = &text[i..end];
                let protected = keep.as_ref().is_some_and(|r| r.start <= i && end <= r.end);
                match self.macros.get(word) {
                    Some(definition) if !protected || definition.value.is_some() => {
                        out.push_str(definition.substitution())
                    }
                    _ => out.push_str(word),
                }
                i = end;
            } else if c.is_ascii_digit() {
                // numeric literals such as 1.0d0 or 8_int64 are never macro names
                let end = scan_word(bytes, i);
                out.push_str(&text[i..end]);
                i = end;
            } else {
                let len = text[i..].chars().next().map_or(1, char::len_utf8);
                out.push_str(&text[i..i + len]);
                i += len;
            }
        }
        out
    }
}

fn scan_word(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    end
}
