//! User-defined function translation.
//!
//! Each function gets a frame plan before any code is emitted: parameters
//! first (in parameter order), then every distinct assignment target found
//! by walking the body, scalars at 2 bytes and arrays at `2·N`. The
//! prologue reserves the whole frame with one `SUBSP`; every exit releases
//! it with a matching `ADDSP` before `RET`. Locals are addressed
//! stack-relative (`,s` / `,sx`), globals as from the top level.

use std::collections::HashSet;

use ruff_python_ast::{self as ast, Expr, Stmt};

use crate::diagnostic::Span;
use crate::error::{
    Error, ErrorKind, Result, ensure_array, ensure_assign, expr_kind, int_literal, stmt_kind,
};
use crate::instr::{CallFrame, LabeledInstruction, LocalVariable};
use crate::procedural::{EmitterCore, ProceduralEmitter};
use crate::propagate::Rvalue;
use crate::symbols::{SymbolTable, is_array_ident, is_constant_ident};

pub struct FunctionDefinition<'a> {
    core: EmitterCore<'a>,
    idents: &'a SymbolTable,
    /// Frames in discovery order, for the local-memory generator.
    frames: Vec<(String, CallFrame)>,
    current: Option<String>,
    stack_space: u32,
    returned: bool,
    locals_tag: String,
    global_names: HashSet<String>,
}

impl<'a> FunctionDefinition<'a> {
    /// `labels` is the branch/function table handed over by the top-level
    /// emitter, so function labels allocated at call sites are reused here.
    pub fn new(idents: &'a SymbolTable, labels: SymbolTable) -> Self {
        let global_names = idents.names().map(str::to_string).collect();
        Self {
            core: EmitterCore::new(labels),
            idents,
            frames: Vec::new(),
            current: None,
            stack_space: 0,
            returned: false,
            locals_tag: String::new(),
            global_names,
        }
    }

    pub fn visit_module(&mut self, module: &'a ast::ModModule) -> Result<()> {
        // Only function definitions are translated here; everything else
        // belongs to the top-level stream.
        for stmt in &module.body {
            if let Stmt::FunctionDef(func) = stmt {
                self.visit_function_def(func)?;
            }
        }
        Ok(())
    }

    pub fn finalize(self) -> (Vec<LabeledInstruction>, Vec<(String, CallFrame)>) {
        (self.core.instructions, self.frames)
    }

    fn current_frame(&self) -> &CallFrame {
        let name = self.current.as_deref().expect("inside a function");
        &self
            .frames
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .expect("frame exists")
            .1
    }

    fn current_frame_mut(&mut self) -> &mut CallFrame {
        let name = self.current.clone().expect("inside a function");
        &mut self
            .frames
            .iter_mut()
            .find(|(n, _)| **n == name)
            .expect("frame exists")
            .1
    }

    /// Reserve a frame slot for `ident` unless it already has one.
    fn allocate_var(&mut self, ident: &str, words: u32) {
        let func = self.current.as_deref().expect("inside a function");
        let key = format!("{func}{ident}");
        if self.core.labels.contains(&key) {
            return;
        }
        let label = self.core.labels.lookup_or_create(&key);
        let offset = self.stack_space;
        self.stack_space += 2 * words;
        let stack_space = self.stack_space;

        let frame = self.current_frame_mut();
        frame.locals.push((
            ident.to_string(),
            LocalVariable {
                label,
                offset,
                words,
            },
        ));
        frame.stack_space = stack_space;
    }

    /// The frame-planning pre-pass: walk the body for assignment targets.
    fn plan_frame(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::While(while_stmt) => {
                for s in &while_stmt.body {
                    self.plan_frame(s)?;
                }
                Ok(())
            }
            Stmt::If(if_stmt) => {
                for s in &if_stmt.body {
                    self.plan_frame(s)?;
                }
                for clause in &if_stmt.elif_else_clauses {
                    for s in &clause.body {
                        self.plan_frame(s)?;
                    }
                }
                Ok(())
            }
            Stmt::Assign(assign) => {
                let target = ensure_assign(assign)?;
                self.plan_target(target, Some(&assign.value))
            }
            Stmt::AugAssign(aug) => self.plan_target(&aug.target, None),
            Stmt::Return(_) | Stmt::Expr(_) => Ok(()),
            other => Err(Error::at(other, ErrorKind::UnsupportedNode(stmt_kind(other)))),
        }
    }

    fn plan_target(&mut self, target: &Expr, value: Option<&Expr>) -> Result<()> {
        match target {
            Expr::Name(name) => {
                let ident = name.id.as_str();
                let words = if is_array_ident(ident) {
                    match value {
                        Some(init) => ensure_array(init)?,
                        // Augmented assignment cannot initialize an array.
                        None => return Err(Error::at(target, ErrorKind::ArrayAsScalar)),
                    }
                } else {
                    1
                };
                self.allocate_var(ident, words);
                Ok(())
            }
            // Subscript stores go into storage planned elsewhere.
            Expr::Subscript(_) => Ok(()),
            other => Err(Error::at(other, ErrorKind::UnsupportedTarget)),
        }
    }

    fn emit_epilogue(&mut self) {
        let space = self.stack_space;
        let tag = self.locals_tag.clone();
        self.core.record(format!("ADDSP {space},i ; pop {tag}"));
        self.core.record("RET");
    }
}

impl<'a> ProceduralEmitter<'a> for FunctionDefinition<'a> {
    fn core(&mut self) -> &mut EmitterCore<'a> {
        &mut self.core
    }

    fn visit_function_def(&mut self, func: &'a ast::StmtFunctionDef) -> Result<()> {
        if self.current.is_some() {
            return Err(Error::at(func, ErrorKind::UnsupportedNode("FunctionDef")));
        }
        self.record_arity(func)?;

        let name = func.name.to_string();
        self.stack_space = 0;
        self.returned = false;
        self.core.declared = self.global_names.clone();
        let func_label = self.core.labels.lookup_or_create(&name);
        if !self.frames.iter().any(|(n, _)| *n == name) {
            self.frames.push((name.clone(), CallFrame::default()));
        }
        self.current = Some(name.clone());

        // Parameters take the first slots, in parameter order.
        for param in &func.parameters.args {
            let pname = param.parameter.name.as_str();
            if is_array_ident(pname) {
                return Err(Error::at(param, ErrorKind::ArrayParameter));
            }
            if self.current_frame().contains(pname) {
                return Err(Error::at(param, ErrorKind::DuplicateParameter));
            }
            self.allocate_var(pname, 1);
            self.core.declared.insert(pname.to_string());
        }

        for stmt in &func.body {
            self.plan_frame(stmt)?;
        }

        self.core.record(format!("; Function {name}"));
        self.locals_tag = self
            .current_frame()
            .locals
            .iter()
            .map(|(_, var)| format!("#{}", var.label))
            .collect::<Vec<_>>()
            .join(" ");
        let space = self.stack_space;
        let tag = self.locals_tag.clone();
        self.core
            .record_labeled(Some(func_label), format!("SUBSP {space},i ; push {tag}"));

        self.visit_body(&func.body)?;

        // Fall-off-the-end epilogue, unless the body returned explicitly.
        if !self.returned {
            self.emit_epilogue();
        }
        self.current = None;
        Ok(())
    }

    fn visit_return(&mut self, ret: &'a ast::StmtReturn) -> Result<()> {
        if let Some(value) = &ret.value {
            self.visit_expr(value)?;
        }
        self.emit_epilogue();
        self.returned = true;
        Ok(())
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
                if let Some(var) = self.current_frame().get(ident) {
                    let sym = var.label.clone();
                    self.core.record_labeled(label, format!("{mnemonic} {sym},s"));
                } else if let Some(sym) = self.idents.get(ident) {
                    let mode = if is_constant_ident(ident) { "i" } else { "d" };
                    let sym = sym.to_string();
                    self.core.record_labeled(label, format!("{mnemonic} {sym},{mode}"));
                } else {
                    return Err(Error::at(
                        expr,
                        ErrorKind::UndeclaredIdentifier(ident.to_string()),
                    ));
                }
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

                let sym_mode = if let Some(var) = self.current_frame().get(ident) {
                    Some((var.label.clone(), "sx"))
                } else {
                    self.idents.get(ident).map(|sym| (sym.to_string(), "x"))
                };
                let Some((sym, mode)) = sym_mode else {
                    return Err(Error::at(
                        sub.value.as_ref(),
                        ErrorKind::UndeclaredIdentifier(ident.to_string()),
                    ));
                };

                self.access_memory(&sub.slice, "LDWX", label)?;
                self.core.record("ASLX");
                self.core.record(format!("{mnemonic} {sym},{mode}"));
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
        if is_array_ident(&ident) {
            if !self.core.declared.contains(&ident) {
                // First sighting of a local array reserves its frame slot;
                // no code.
                self.core.declared.insert(ident);
                return Ok(());
            }
            if subscript.is_none() {
                return Err(Error::Compile {
                    kind: ErrorKind::ArrayAsScalar,
                    span,
                });
            }
        }
        self.assign_store(&ident, target, value)
    }
}
