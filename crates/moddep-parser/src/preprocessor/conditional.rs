//! Conditional Evaluator
//!
//! Resolves nested `#ifdef`/`#ifndef`/`#else`/`#endif` blocks. Branches are evaluated
//! on an explicit stack of frames rather than by recursion, so nesting depth only
//! costs heap.

use std::ops::Range;
use tracing::{trace, warn};

use moddep_core::{Error, Line, Result};

use super::directive::{self, Directive};
use super::macros::MacroTable;

/// A line together with its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub line: Line,
    pub directive: Option<Directive>,
}

impl Item {
    /// Classify a line; malformed directives fail with their location
    pub fn classify(line: Line) -> Result<Self> {
        let directive =
            directive::classify(&line.text).map_err(|message| Error::malformed(&line.location, message))?;
        Ok(Self { line, directive })
    }
}

/// Positions of one conditional block inside a level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Index of the `#ifdef`/`#ifndef`
    pub open: usize,
    /// Index of the `#else` at the same depth, if any
    pub else_at: Option<usize>,
    /// Index of the matching `#endif`
    pub end: usize,
}

impl Block {
    pub fn then_range(&self) -> Range<usize> {
        self.open + 1..self.else_at.unwrap_or(self.end)
    }

    pub fn else_range(&self) -> Range<usize> {
        match self.else_at {
            Some(else_at) => else_at + 1..self.end,
            None => self.end..self.end,
        }
    }
}

/// Scanner state while matching a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    InThen,
    InElse,
}

/// Locate the `#else` and `#endif` that belong to the block opened at `open`.
///
/// Depth counts nested `#ifdef`/`#ifndef` against `#endif`; only directives at depth
/// zero belong to this block.
pub fn find_block(items: &[Item], open: usize) -> Result<Block> {
    let mut depth = 0usize;
    let mut state = State::InThen;
    let mut else_at = None;

    for (index, item) in items.iter().enumerate().skip(open + 1) {
        let Some(directive) = &item.directive else {
            continue;
        };
        match directive {
            Directive::IfDef(_) | Directive::IfNDef(_) => depth += 1,
            Directive::EndIf if depth == 0 => {
                return Ok(Block {
                    open,
                    else_at,
                    end: index,
                })
            }
            Directive::EndIf => depth -= 1,
            Directive::Else if depth == 0 => {
                if state == State::InElse {
                    return Err(Error::malformed(
                        &item.line.location,
                        format!("second #else for the block opened at {}", items[open].line.location),
                    ));
                }
                state = State::InElse;
                else_at = Some(index);
            }
            Directive::Unsupported(keyword) => return Err(unsupported(item, keyword)),
            _ => {}
        }
    }

    Err(Error::malformed(
        &items[open].line.location,
        "conditional block is never closed: missing #endif",
    ))
}

fn unsupported(item: &Item, keyword: &str) -> Error {
    let message = match keyword {
        "elif" => "#elif is not supported; nest #ifdef/#else blocks instead".to_string(),
        _ => format!("#{} is not supported; use #ifdef or #ifndef", keyword),
    };
    Error::malformed(&item.line.location, message)
}

struct Frame {
    items: Vec<Item>,
    cursor: usize,
}

/// Evaluate a prepared level and everything nested in it.
///
/// `prepare` runs on every chosen branch before it is evaluated (include splicing and
/// branch-level `#define`s); `emit` turns a surviving content line into output.
pub fn evaluate<P, E>(
    items: Vec<Item>,
    macros: &mut MacroTable,
    mut prepare: P,
    mut emit: E,
) -> Result<Vec<Line>>
where
    P: FnMut(Vec<Item>, &mut MacroTable) -> Result<Vec<Item>>,
    E: FnMut(&Line, &MacroTable) -> Line,
{
    let mut output = Vec::with_capacity(items.len());
    let mut frames = vec![Frame { items, cursor: 0 }];

    while let Some(frame) = frames.last_mut() {
        let index = frame.cursor;
        let Some(item) = frame.items.get(index) else {
            frames.pop();
            continue;
        };
        frame.cursor += 1;

        let branch = match &item.directive {
            None => {
                output.push(emit(&item.line, &*macros));
                None
            }
            Some(Directive::IfDef(name)) | Some(Directive::IfNDef(name)) => {
                let block = find_block(&frame.items, index)?;
                let wants_defined = matches!(item.directive, Some(Directive::IfDef(_)));
                let take_then = macros.is_defined(name) == wants_defined;
                trace!(
                    "{}: {} branch of {} selected",
                    item.line.location,
                    if take_then { "first" } else { "second" },
                    name
                );
                let range = if take_then {
                    block.then_range()
                } else {
                    block.else_range()
                };
                frame.cursor = block.end + 1;
                Some(frame.items[range].to_vec())
            }
            Some(Directive::Else) => {
                return Err(Error::malformed(&item.line.location, "#else without matching #ifdef"))
            }
            Some(Directive::EndIf) => {
                return Err(Error::malformed(&item.line.location, "#endif without matching #ifdef"))
            }
            Some(Directive::Unsupported(keyword)) => return Err(unsupported(item, keyword)),
            Some(Directive::Unknown(keyword)) => {
                warn!("{}: passing through unknown directive #{}", item.line.location, keyword);
                output.push(item.line.clone());
                None
            }
            // consumed by `prepare` before the level is evaluated
            Some(Directive::Include(_) | Directive::Define { .. } | Directive::Undef(_)) => None,
        };

        if let Some(branch) = branch {
            let branch = prepare(branch, macros)?;
            frames.push(Frame {
                items: branch,
                cursor: 0,
            });
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use moddep_core::{ErrorKind, Location};

    fn items(text: &str) -> Vec<Item> {
        text.lines()
            .enumerate()
            .map(|(i, t)| Item::classify(Line::new(t, Location::new("t.F90", i as u32 + 1))).unwrap())
            .collect()
    }

    fn run(text: &str, macros: &mut MacroTable) -> Result<Vec<String>> {
        let lines = evaluate(items(text), macros, |b, _| Ok(b), |l, _| l.clone())?;
        Ok(lines.into_iter().map(|l| l.text).collect())
    }

    #[test]
    fn test_find_block_nested() {
        let items = items("#ifdef A\n#ifdef B\nx\n#else\ny\n#endif\n#else\nz\n#endif");
        let block = find_block(&items, 0).unwrap();
        assert_eq!(block, Block { open: 0, else_at: Some(6), end: 8 });
        assert_eq!(block.then_range(), 1..6);
        assert_eq!(block.else_range(), 7..8);

        let inner = find_block(&items, 1).unwrap();
        assert_eq!(inner, Block { open: 1, else_at: Some(3), end: 5 });
    }

    #[test]
    fn test_find_block_without_else() {
        let items = items("#ifndef A\nx\n#endif");
        let block = find_block(&items, 0).unwrap();
        assert_eq!(block.else_at, None);
        assert!(block.else_range().is_empty());
    }

    #[test]
    fn test_unterminated_block() {
        let err = find_block(&items("x\n#ifdef A\ny"), 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDirective);
        assert!(err.to_string().contains("t.F90:2"));
    }

    #[test]
    fn test_second_else() {
        let err = find_block(&items("#ifdef A\nx\n#else\ny\n#else\nz\n#endif"), 0).unwrap_err();
        assert!(err.to_string().contains("t.F90:5"));
    }

    #[test]
    fn test_branch_selection() {
        let mut macros = MacroTable::from_seeds(&["A"]).unwrap();
        assert_eq!(run("#ifdef A\nx\n#else\ny\n#endif", &mut macros).unwrap(), vec!["x"]);
        assert_eq!(run("#ifndef A\nx\n#else\ny\n#endif", &mut macros).unwrap(), vec!["y"]);
        assert_eq!(run("#ifdef B\nx\n#endif\nz", &mut macros).unwrap(), vec!["z"]);
    }

    #[test]
    fn test_stray_directives() {
        let mut macros = MacroTable::new();
        let err = run("x\n#endif", &mut macros).unwrap_err();
        assert!(err.to_string().contains("t.F90:2: #endif without matching #ifdef"));

        let err = run("#else\nx", &mut macros).unwrap_err();
        assert!(err.to_string().contains("t.F90:1: #else without matching #ifdef"));
    }

    #[test]
    fn test_elif_in_discarded_branch_still_fails() {
        let mut macros = MacroTable::new();
        let err = run("#ifdef A\n#elif B\nx\n#endif", &mut macros).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedDirective);
        assert!(err.to_string().contains("#elif is not supported"));
    }

    #[test]
    fn test_deep_nesting_uses_heap_frames() {
        let depth = 500;
        let mut text = String::new();
        for _ in 0..depth {
            text.push_str("#ifndef NEVER\n");
        }
        text.push_str("core\n");
        for _ in 0..depth {
            text.push_str("#endif\n");
        }
        let mut macros = MacroTable::new();
        assert_eq!(run(&text, &mut macros).unwrap(), vec!["core"]);
    }
}
