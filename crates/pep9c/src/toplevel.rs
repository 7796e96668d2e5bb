//! Top-level (entry point) instruction emission.
//!
//! Globals are addressed directly (`,d`), compile-time constant names
//! immediately (`,i`), and subscripted arrays through the index register
//! (`,x`). Assignments that fold to an integer on first sight outside any
//! control flow emit no code at all: the `.WORD` directive from the static
//! section already initializes them.

use ruff_python_ast::{self as ast, Expr};

use crate::diagnostic::Span;
use crate::error::{Error, ErrorKind, Result, expr_kind, int_literal};
use crate::instr::LabeledInstruction;
use crate::procedural::{EmitterCore, ProceduralEmitter};
use crate::propagate::{ConstantPropagator, Rvalue};
use crate::symbols::{LabelSequence, SymbolTable, is_array_ident, is_constant_ident};

pub struct TopLevelProgram<'a> {
    core: EmitterCore<'a>,
    idents: &'a SymbolTable,
    propagator: ConstantPropagator,
}

impl<'a> TopLevelProgram<'a> {
    pub fn new(idents: &'a SymbolTable, entry_point: &str) -> Self {
        let mut core = EmitterCore::new(SymbolTable::new(LabelSequence::reversed()));
        core.record_labeled(Some(entry_point.to_string()), "NOP1");
        Self {
            core,
            idents,
            propagator: ConstantPropagator::new(),
        }
    }

    pub fn visit_module(&mut self, module: &'a ast::ModModule) -> Result<()> {
        self.visit_body(&module.body)
    }

    /// Terminate the stream and hand back the instructions together with
    /// the branch/function label table, which the function emitter keeps
    /// drawing from.
    pub fn finalize(mut self) -> (Vec<LabeledInstruction>, SymbolTable) {
        self.core.record(".END");
        (self.core.instructions, self.core.labels)
    }
}

impl<'a> ProceduralEmitter<'a> for TopLevelProgram<'a> {
    fn core(&mut self) -> &mut EmitterCore<'a> {
        &mut self.core
    }

    fn access_memory(
        &mut self,
        expr: &'a Expr,
        mnemonic: &str,
        label: Option<String>,
    ) -> Result<()> {
        self.check_declared(expr)?;
        match expr {
            Expr::NumberLiteral(_) => {
                let Some(value) = int_literal(expr) else {
                    return Err(Error::at(expr, ErrorKind::UnsupportedLiteral(expr_kind(expr))));
                };
                self.core.record_labeled(label, format!("{mnemonic} {value},i"));
                Ok(())
            }

            Expr::Name(name) => {
                let ident = name.id.as_str();
                let mode = if is_constant_ident(ident) { "i" } else { "d" };
                let Some(sym) = self.idents.get(ident) else {
                    return Err(Error::at(
                        expr,
                        ErrorKind::UndeclaredIdentifier(ident.to_string()),
                    ));
                };
                let sym = sym.to_string();
                self.core.record_labeled(label, format!("{mnemonic} {sym},{mode}"));
                Ok(())
            }

            Expr::Subscript(sub) => {
                let Expr::Name(base) = sub.value.as_ref() else {
                    return Err(Error::at(sub.value.as_ref(), ErrorKind::IndexNonArray));
                };
                let ident = base.id.as_str();
                if !self.core.declared.contains(ident) {
                    return Err(Error::at(
                        sub.value.as_ref(),
                        ErrorKind::UndeclaredIdentifier(ident.to_string()),
                    ));
                }
                let Some(sym) = self.idents.get(ident) else {
                    return Err(Error::at(
                        sub.value.as_ref(),
                        ErrorKind::UndeclaredIdentifier(ident.to_string()),
                    ));
                };
                let sym = sym.to_string();

                // Word index to byte offset, then indexed addressing.
                self.access_memory(&sub.slice, "LDWX", label)?;
                self.core.record("ASLX");
                self.core.record(format!("{mnemonic} {sym},x"));
                Ok(())
            }

            other => Err(Error::at(
                other,
                ErrorKind::CannotAccessMemory(expr_kind(other)),
            )),
        }
    }

    fn assign_with(
        &mut self,
        span: Span,
        ident: String,
        target: &'a Expr,
        subscript: Option<&'a Expr>,
        value: Rvalue<'a>,
    ) -> Result<()> {
        if is_constant_ident(&ident) {
            // Defined with .EQUATE; nothing to load or store.
            self.core.declared.insert(ident);
            return Ok(());
        }

        if is_array_ident(&ident) {
            if !self.core.declared.contains(&ident) {
                // First sighting reserves the storage; no code.
                self.core.declared.insert(ident);
                return Ok(());
            }
            if subscript.is_none() {
                return Err(Error::Compile {
                    kind: ErrorKind::ArrayAsScalar,
                    span,
                });
            }
        } else {
            let first_seen = !self.propagator.is_seen(&ident);
            let folded = self.propagator.add_assign(&ident, &value)?;
            if first_seen && folded.constexpr && self.core.scope_depth == 0 {
                // Statically initialized by its .WORD directive.
                self.core.declared.insert(ident);
                return Ok(());
            }
        }

        self.assign_store(&ident, target, value)
    }
}
