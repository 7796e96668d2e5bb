//! Global variable extraction.
//!
//! A first pass over the module that registers every top-level assignment
//! target, folds initializers, and classifies each global as `.EQUATE`
//! (compile-time constant name), `.WORD` (statically initialized), or
//! `.BLOCK` (runtime-initialized storage, sized for arrays). Function
//! bodies are skipped; they are not global by definition.

use ruff_python_ast::{self as ast, Expr, Stmt};

use crate::error::{Error, ErrorKind, Result, ensure_array, ensure_assign};
use crate::instr::{GlobalVariable, InitKind};
use crate::propagate::{ConstantPropagator, Rvalue};
use crate::symbols::{LabelSequence, SymbolTable, is_array_ident, is_constant_ident};

pub struct GlobalVariableExtraction {
    pub symbol_table: SymbolTable,
    pub results: Vec<GlobalVariable>,
    propagator: ConstantPropagator,
}

impl Default for GlobalVariableExtraction {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalVariableExtraction {
    pub fn new() -> Self {
        Self {
            symbol_table: SymbolTable::new(LabelSequence::forward()),
            results: Vec::new(),
            propagator: ConstantPropagator::new(),
        }
    }

    pub fn visit_module(&mut self, module: &ast::ModModule) -> Result<()> {
        self.visit_body(&module.body)
    }

    fn visit_body(&mut self, body: &[Stmt]) -> Result<()> {
        for stmt in body {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Assign(assign) => self.visit_assign(assign),

            // Keep the folds in lockstep with the top-level emitter, which
            // sees the same augmented assignments; no new record results.
            Stmt::AugAssign(aug) => {
                if let Expr::Name(name) = aug.target.as_ref() {
                    self.propagator.add_assign(
                        name.id.as_str(),
                        &Rvalue::Binary {
                            left: &aug.target,
                            op: aug.op,
                            right: &aug.value,
                        },
                    )?;
                }
                Ok(())
            }

            // Assignments nested in top-level control flow still allocate
            // global storage.
            Stmt::If(if_stmt) => {
                self.visit_body(&if_stmt.body)?;
                for clause in &if_stmt.elif_else_clauses {
                    self.visit_body(&clause.body)?;
                }
                Ok(())
            }
            Stmt::While(while_stmt) => {
                self.visit_body(&while_stmt.body)?;
                self.visit_body(&while_stmt.orelse)
            }

            // Function bodies are not global by definition.
            Stmt::FunctionDef(_) => Ok(()),

            _ => Ok(()),
        }
    }

    fn visit_assign(&mut self, assign: &ast::StmtAssign) -> Result<()> {
        let target = ensure_assign(assign)?;
        let Expr::Name(name) = target else {
            // Subscript stores write into storage declared elsewhere.
            return Ok(());
        };
        let ident = name.id.as_str();

        self.symbol_table.lookup_or_create(ident);

        let first_seen = !self.propagator.is_seen(ident);
        let folded = self
            .propagator
            .add_assign(ident, &Rvalue::Expr(&assign.value))?;

        if is_constant_ident(ident) {
            if !first_seen {
                return Err(Error::at(
                    assign,
                    ErrorKind::ConstantReassigned(ident.to_string()),
                ));
            }
            if !folded.constexpr {
                return Err(Error::at(
                    assign,
                    ErrorKind::ConstantNotConstexpr(ident.to_string()),
                ));
            }
            self.record(ident, InitKind::Equate, folded.value);
        } else if first_seen {
            if folded.constexpr {
                self.record(ident, InitKind::Word, folded.value);
            } else if is_array_ident(ident) {
                let words = ensure_array(&assign.value)?;
                self.record(ident, InitKind::Block, i64::from(2 * words));
            } else {
                self.record(ident, InitKind::Block, 2);
            }
        }
        // Reassignment of an already-seen non-constant global needs no new
        // record; the existing directive already covers it.
        Ok(())
    }

    fn record(&mut self, ident: &str, kind: InitKind, value: i64) {
        self.results.push(GlobalVariable {
            ident: ident.to_string(),
            kind,
            value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruff_python_parser::parse_module;

    fn extract(source: &str) -> GlobalVariableExtraction {
        let module = parse_module(source).unwrap().into_syntax();
        let mut extraction = GlobalVariableExtraction::new();
        extraction.visit_module(&module).unwrap();
        extraction
    }

    fn kinds(source: &str) -> Vec<(String, InitKind, i64)> {
        extract(source)
            .results
            .into_iter()
            .map(|g| (g.ident, g.kind, g.value))
            .collect()
    }

    #[test]
    fn classifies_constants_words_and_blocks() {
        let globals = kinds("_N = 3 + 4\nx = 2\ny = input()\narr_ = [0] * 4");
        assert_eq!(
            globals,
            vec![
                ("_N".to_string(), InitKind::Equate, 7),
                ("x".to_string(), InitKind::Word, 2),
                ("y".to_string(), InitKind::Block, 2),
                ("arr_".to_string(), InitKind::Block, 8),
            ]
        );
    }

    #[test]
    fn reassignment_produces_single_record() {
        let globals = kinds("x = input()\nx = 2");
        assert_eq!(globals.len(), 1);
        assert_eq!(globals[0].1, InitKind::Block);
    }

    #[test]
    fn nested_assignments_are_registered() {
        let globals = kinds("x = 1\nif x < 2:\n    y = 3\nwhile x < 5:\n    z = input()");
        let idents: Vec<&str> = globals.iter().map(|(i, _, _)| i.as_str()).collect();
        assert_eq!(idents, ["x", "y", "z"]);
    }

    #[test]
    fn function_bodies_are_skipped() {
        let globals = kinds("def f(a):\n    b = 1\n    return b\nx = 2");
        let idents: Vec<&str> = globals.iter().map(|(i, _, _)| i.as_str()).collect();
        assert_eq!(idents, ["x"]);
    }

    #[test]
    fn constant_reassignment_errors() {
        let module = parse_module("_N = 1\n_N = 2").unwrap().into_syntax();
        let mut extraction = GlobalVariableExtraction::new();
        assert!(extraction.visit_module(&module).is_err());
    }

    #[test]
    fn constant_requires_constexpr_initializer() {
        let module = parse_module("_N = input()").unwrap().into_syntax();
        let mut extraction = GlobalVariableExtraction::new();
        assert!(extraction.visit_module(&module).is_err());
    }

    #[test]
    fn labels_are_allocated_in_first_appearance_order() {
        let extraction = extract("x = 1\ny = 2");
        assert_eq!(extraction.symbol_table.get("x"), Some("A"));
        assert_eq!(extraction.symbol_table.get("y"), Some("B"));
    }
}
