//! Static and local memory directives.
//!
//! The static generator emits one directive per global in first-appearance
//! order; the local generator emits `.EQUATE` stack offsets for every frame
//! slot, per function in discovery order. Offsets count from the stack
//! pointer after the prologue: `stack_space − offset − 2·words` puts a
//! scalar at its own slot and an array at its first element.

use std::io::Write;

use crate::diagnostic::Span;
use crate::error::{Error, ErrorKind, Result};
use crate::instr::{CallFrame, GlobalVariable, InitKind};
use crate::symbols::SymbolTable;

/// Format the `#2d` / `#2d<N>a` size tag shared by both generators.
fn size_tag(words: u32) -> String {
    if words > 1 {
        format!("#2d{words}a")
    } else {
        "#2d".to_string()
    }
}

pub struct StaticMemoryAllocation<'a> {
    symbols: &'a SymbolTable,
    globals: &'a [GlobalVariable],
}

impl<'a> StaticMemoryAllocation<'a> {
    pub fn new(symbols: &'a SymbolTable, globals: &'a [GlobalVariable]) -> Self {
        Self { symbols, globals }
    }

    pub fn generate(&self, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "; Allocating Global (static) memory")?;
        for global in self.globals {
            let Some(label) = self.symbols.get(&global.ident) else {
                return Err(Error::Compile {
                    kind: ErrorKind::UndeclaredIdentifier(global.ident.clone()),
                    span: Span::default(),
                });
            };
            let directive = match global.kind {
                InitKind::Block => format!(".BLOCK {}", global.value),
                InitKind::Equate => format!(".EQUATE {}", global.value),
                InitKind::Word => format!(".WORD {}", global.value),
            };
            let words = match global.kind {
                InitKind::Block => (global.value / 2) as u32,
                _ => 1,
            };
            writeln!(
                out,
                "{:<9}\t{:<14}; global variable {} {}",
                format!("{label}:"),
                directive,
                global.ident,
                size_tag(words)
            )?;
        }
        Ok(())
    }
}

pub struct LocalMemoryAllocation<'a> {
    frames: &'a [(String, CallFrame)],
}

impl<'a> LocalMemoryAllocation<'a> {
    pub fn new(frames: &'a [(String, CallFrame)]) -> Self {
        Self { frames }
    }

    pub fn generate(&self, out: &mut dyn Write) -> Result<()> {
        for (name, frame) in self.frames {
            writeln!(out, "; Allocating Local memory for {name}")?;
            for (ident, var) in &frame.locals {
                let offset = frame.stack_space - var.offset - 2 * var.words;
                writeln!(
                    out,
                    "{:<9}\t{:<14}; local var {} {}",
                    format!("{}:", var.label),
                    format!(".EQUATE {offset}"),
                    ident,
                    size_tag(var.words)
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::LocalVariable;
    use crate::symbols::LabelSequence;
    use pretty_assertions::assert_eq;

    fn render(generate: impl Fn(&mut Vec<u8>) -> Result<()>) -> String {
        let mut out = Vec::new();
        generate(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn static_directives_and_tags() {
        let mut symbols = SymbolTable::new(LabelSequence::forward());
        symbols.lookup_or_create("_N");
        symbols.lookup_or_create("x");
        symbols.lookup_or_create("arr_");
        let globals = vec![
            GlobalVariable {
                ident: "_N".to_string(),
                kind: InitKind::Equate,
                value: 7,
            },
            GlobalVariable {
                ident: "x".to_string(),
                kind: InitKind::Word,
                value: 2,
            },
            GlobalVariable {
                ident: "arr_".to_string(),
                kind: InitKind::Block,
                value: 8,
            },
        ];
        let output = render(|out| StaticMemoryAllocation::new(&symbols, &globals).generate(out));
        assert_eq!(
            output,
            "; Allocating Global (static) memory\n\
             A:       \t.EQUATE 7     ; global variable _N #2d\n\
             B:       \t.WORD 2       ; global variable x #2d\n\
             C:       \t.BLOCK 8      ; global variable arr_ #2d4a\n"
        );
    }

    #[test]
    fn local_equates_count_back_from_stack_space() {
        let frames = vec![(
            "f".to_string(),
            CallFrame {
                locals: vec![
                    (
                        "a".to_string(),
                        LocalVariable {
                            label: "Y".to_string(),
                            offset: 0,
                            words: 1,
                        },
                    ),
                    (
                        "buf_".to_string(),
                        LocalVariable {
                            label: "X".to_string(),
                            offset: 2,
                            words: 3,
                        },
                    ),
                ],
                stack_space: 8,
            },
        )];
        let output = render(|out| LocalMemoryAllocation::new(&frames).generate(out));
        assert_eq!(
            output,
            "; Allocating Local memory for f\n\
             Y:       \t.EQUATE 6     ; local var a #2d\n\
             X:       \t.EQUATE 0     ; local var buf_ #2d3a\n"
        );
    }
}
