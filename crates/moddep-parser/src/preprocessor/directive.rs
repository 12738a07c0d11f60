//! Directive Scanner
//!
//! Classifies a source line as a preprocessor directive or plain content.

/// A recognized preprocessor control line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `#include 'name'`, quotes stripped
    Include(String),
    /// `#define NAME [VALUE]`
    Define { name: String, value: Option<String> },
    /// `#undef NAME`
    Undef(String),
    /// `#ifdef NAME`
    IfDef(String),
    /// `#ifndef NAME`
    IfNDef(String),
    /// `#else`
    Else,
    /// `#endif`
    EndIf,
    /// `#if` / `#elif`, which cannot be evaluated
    Unsupported(String),
    /// Any other `#keyword`, passed through as content
    Unknown(String),
}

impl Directive {
    /// Opens a conditional block
    pub fn opens_block(&self) -> bool {
        matches!(self, Directive::IfDef(_) | Directive::IfNDef(_))
    }

    /// Closes a conditional block
    pub fn closes_block(&self) -> bool {
        matches!(self, Directive::EndIf)
    }
}

/// Classify one line.
///
/// Returns `Ok(None)` for content, `Err(message)` for a directive whose arguments are
/// malformed.
pub fn classify(text: &str) -> Result<Option<Directive>, String> {
    let Some(body) = text.trim_start().strip_prefix('#') else {
        return Ok(None);
    };
    let body = body.trim_start();
    let keyword_len = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    let (keyword, rest) = body.split_at(keyword_len);
    let rest = rest.trim();

    let directive = match keyword.to_ascii_lowercase().as_str() {
        "include" => Directive::Include(include_target(rest)?),
        "define" => {
            let (name, value) = match rest.split_once(char::is_whitespace) {
                Some((name, value)) => (name, Some(value.trim())),
                None => (rest, None),
            };
            if name.contains('(') {
                return Err(format!("function-like macro '{}' is not supported", name));
            }
            Directive::Define {
                name: macro_name("define", name)?,
                value: value.filter(|v| !v.is_empty()).map(str::to_string),
            }
        }
        "undef" => Directive::Undef(macro_name("undef", first_word(rest))?),
        "ifdef" => Directive::IfDef(macro_name("ifdef", first_word(rest))?),
        "ifndef" => Directive::IfNDef(macro_name("ifndef", first_word(rest))?),
        "else" => Directive::Else,
        "endif" => Directive::EndIf,
        lower @ ("if" | "elif") => Directive::Unsupported(lower.to_string()),
        _ => Directive::Unknown(keyword.to_string()),
    };
    Ok(Some(directive))
}

/// Whether `name` is a valid macro identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn first_word(rest: &str) -> &str {
    rest.split_whitespace().next().unwrap_or("")
}

fn macro_name(keyword: &str, name: &str) -> Result<String, String> {
    if name.is_empty() {
        return Err(format!("#{} requires a macro name", keyword));
    }
    if !is_identifier(name) {
        return Err(format!("#{}: '{}' is not a valid macro name", keyword, name));
    }
    Ok(name.to_string())
}

fn include_target(rest: &str) -> Result<String, String> {
    let target = match rest.chars().next() {
        Some(open @ ('\'' | '"' | '<')) => {
            let close = if open == '<' { '>' } else { open };
            let inner = &rest[1..];
            let end = inner
                .find(close)
                .ok_or_else(|| format!("unterminated file name in #include {}", rest))?;
            &inner[..end]
        }
        _ => first_word(rest),
    };
    if target.is_empty() {
        return Err("#include requires a file name".to_string());
    }
    Ok(target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_lines() {
        assert_eq!(classify("  use foo").unwrap(), None);
        assert_eq!(classify("x = a # b").unwrap(), None);
        assert_eq!(classify("").unwrap(), None);
    }

    #[test]
    fn test_conditionals() {
        assert_eq!(classify("#ifdef USE_MPI").unwrap(), Some(Directive::IfDef("USE_MPI".into())));
        assert_eq!(classify("  #  ifndef  X ").unwrap(), Some(Directive::IfNDef("X".into())));
        assert_eq!(classify("#else").unwrap(), Some(Directive::Else));
        assert_eq!(classify("#endif  /* X */").unwrap(), Some(Directive::EndIf));
        assert_eq!(
            classify("#elif defined(Y)").unwrap(),
            Some(Directive::Unsupported("elif".into()))
        );
        assert_eq!(classify("#if X > 1").unwrap(), Some(Directive::Unsupported("if".into())));
    }

    #[test]
    fn test_define() {
        assert_eq!(
            classify("#define NDIM 3").unwrap(),
            Some(Directive::Define {
                name: "NDIM".into(),
                value: Some("3".into())
            })
        );
        assert_eq!(
            classify("#define FLAG").unwrap(),
            Some(Directive::Define {
                name: "FLAG".into(),
                value: None
            })
        );
        assert_eq!(
            classify("#define REAL_KIND selected_real_kind(15, 307)").unwrap(),
            Some(Directive::Define {
                name: "REAL_KIND".into(),
                value: Some("selected_real_kind(15, 307)".into())
            })
        );
        assert!(classify("#define MAX(a,b) a").is_err());
        assert!(classify("#define").is_err());
        assert!(classify("#define 3D").is_err());
        assert_eq!(classify("#undef FLAG").unwrap(), Some(Directive::Undef("FLAG".into())));
    }

    #[test]
    fn test_include_forms() {
        assert_eq!(classify("#include 'consts.h'").unwrap(), Some(Directive::Include("consts.h".into())));
        assert_eq!(classify("#include \"a/b.inc\"").unwrap(), Some(Directive::Include("a/b.inc".into())));
        assert_eq!(classify("#include <mpif.h>").unwrap(), Some(Directive::Include("mpif.h".into())));
        assert!(classify("#include 'open").is_err());
        assert!(classify("#include").is_err());
    }

    #[test]
    fn test_missing_names() {
        let err = classify("#ifdef").unwrap_err();
        assert!(err.contains("requires a macro name"));
    }

    #[test]
    fn test_unknown_directive() {
        assert_eq!(classify("#pragma once").unwrap(), Some(Directive::Unknown("pragma".into())));
    }

    #[test]
    fn test_keywords_ignore_case() {
        assert_eq!(classify("#IFDEF X").unwrap(), Some(Directive::IfDef("X".into())));
        assert_eq!(classify("#IfNDef X").unwrap(), Some(Directive::IfNDef("X".into())));
        assert_eq!(classify("#Else").unwrap(), Some(Directive::Else));
        assert_eq!(classify("#ENDIF").unwrap(), Some(Directive::EndIf));
        assert_eq!(classify("#ELIF Y").unwrap(), Some(Directive::Unsupported("elif".into())));
        assert_eq!(
            classify("#DEFINE N 3").unwrap(),
            Some(Directive::Define {
                name: "N".into(),
                value: Some("3".into())
            })
        );
    }
}
