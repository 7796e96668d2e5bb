//! The shared procedural-instruction layer.
//!
//! Both the top-level emitter and the function emitter walk statements the
//! same way: expressions load into the accumulator, calls marshal arguments
//! onto the stack, conditionals branch around their body on the inverted
//! comparison. What differs is how memory operands are addressed, so that
//! decision is the one required hook ([`ProceduralEmitter::access_memory`]).

use std::collections::{HashMap, HashSet};

use ruff_python_ast::{self as ast, CmpOp, Expr, Stmt};
use ruff_text_size::Ranged;

use crate::diagnostic::Span;
use crate::error::{
    Error, ErrorKind, Result, ensure_args, ensure_assign, ensure_condition, expr_kind, stmt_kind,
};
use crate::instr::LabeledInstruction;
use crate::propagate::Rvalue;
use crate::symbols::{SymbolTable, is_array_ident};

/// Mutable state shared by every procedural emitter.
pub(crate) struct EmitterCore<'a> {
    pub instructions: Vec<LabeledInstruction>,
    /// Cleared by `input()`, whose `DECI` already writes the target.
    pub should_save: bool,
    /// The name being assigned, while inside an assignment. Always an
    /// `Expr::Name` (for subscript targets, the array name).
    pub current_target: Option<&'a Expr>,
    /// Nesting depth of `if`/`while` bodies.
    pub scope_depth: u32,
    /// Names that may be referenced (assigned or otherwise materialized).
    pub declared: HashSet<String>,
    /// Branch and function labels; one table so the two can never collide.
    pub labels: SymbolTable,
    /// Known function names and their parameter counts.
    pub arities: HashMap<String, usize>,
}

impl<'a> EmitterCore<'a> {
    pub fn new(labels: SymbolTable) -> Self {
        Self {
            instructions: Vec::new(),
            should_save: true,
            current_target: None,
            scope_depth: 0,
            declared: HashSet::new(),
            labels,
            arities: HashMap::new(),
        }
    }

    pub fn record(&mut self, text: impl Into<String>) {
        self.instructions.push(LabeledInstruction::new(text));
    }

    pub fn record_labeled(&mut self, label: Option<String>, text: impl Into<String>) {
        self.instructions.push(LabeledInstruction {
            label,
            text: text.into(),
        });
    }
}

/// Map a source comparison to the branch taken when the condition is
/// *false* (the emitted branch jumps around the body).
fn inverted_branch(op: CmpOp) -> Option<&'static str> {
    match op {
        CmpOp::Lt => Some("BRGE"),
        CmpOp::LtE => Some("BRGT"),
        CmpOp::Gt => Some("BRLE"),
        CmpOp::GtE => Some("BRLT"),
        CmpOp::Eq => Some("BRNE"),
        CmpOp::NotEq => Some("BREQ"),
        _ => None,
    }
}

pub(crate) trait ProceduralEmitter<'a> {
    fn core(&mut self) -> &mut EmitterCore<'a>;

    /// Emit `mnemonic` against the memory operand `expr`, choosing the
    /// addressing mode for the current context (global or stack frame).
    fn access_memory(
        &mut self,
        expr: &'a Expr,
        mnemonic: &str,
        label: Option<String>,
    ) -> Result<()>;

    /// Handle one assignment after target splitting. The two emitters
    /// specialize this: constant folding and store suppression at the top
    /// level, array-reservation rules inside functions.
    fn assign_with(
        &mut self,
        span: Span,
        ident: String,
        target: &'a Expr,
        subscript: Option<&'a Expr>,
        value: Rvalue<'a>,
    ) -> Result<()>;

    // -----------------------------------------------------------------------
    // Statement dispatch
    // -----------------------------------------------------------------------

    fn visit_body(&mut self, body: &'a [Stmt]) -> Result<()> {
        for stmt in body {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &'a Stmt) -> Result<()> {
        match stmt {
            Stmt::Assign(assign) => {
                let target = ensure_assign(assign)?;
                let (ident, target, subscript) = self.split_target(target)?;
                self.assign_with(
                    assign.range().into(),
                    ident,
                    target,
                    subscript,
                    Rvalue::Expr(&assign.value),
                )
            }

            // `target += value` is handled as `target = target + value`.
            Stmt::AugAssign(aug) => {
                let (ident, target, subscript) = self.split_target(&aug.target)?;
                self.assign_with(
                    aug.range().into(),
                    ident,
                    target,
                    subscript,
                    Rvalue::Binary {
                        left: &aug.target,
                        op: aug.op,
                        right: &aug.value,
                    },
                )
            }

            Stmt::If(if_stmt) => {
                self.visit_if(&if_stmt.test, &if_stmt.body, &if_stmt.elif_else_clauses)
            }

            Stmt::While(while_stmt) => self.visit_while(while_stmt),

            Stmt::Return(ret) => self.visit_return(ret),

            Stmt::Expr(expr_stmt) => self.visit_expr(&expr_stmt.value),

            Stmt::FunctionDef(func) => self.visit_function_def(func),

            other => Err(Error::at(other, ErrorKind::UnsupportedNode(stmt_kind(other)))),
        }
    }

    /// Split an assignment target into the assigned identifier, the store
    /// operand, and the subscript index (if any), remembering the target
    /// name for a possible `input()` on the right-hand side.
    fn split_target(&mut self, target: &'a Expr) -> Result<(String, &'a Expr, Option<&'a Expr>)> {
        match target {
            Expr::Name(name) => {
                self.core().current_target = Some(target);
                Ok((name.id.to_string(), target, None))
            }

            Expr::Subscript(sub) => {
                let slice = sub.slice.as_ref();
                if matches!(slice, Expr::Slice(_)) {
                    return Err(Error::at(slice, ErrorKind::SliceUnsupported));
                }
                if !matches!(slice, Expr::Name(_) | Expr::NumberLiteral(_)) {
                    return Err(Error::at(slice, ErrorKind::UnnamedSubscript));
                }
                let Expr::Name(base) = sub.value.as_ref() else {
                    return Err(Error::at(sub.value.as_ref(), ErrorKind::IndexNonArray));
                };
                self.core().current_target = Some(sub.value.as_ref());
                Ok((base.id.to_string(), target, Some(slice)))
            }

            other => Err(Error::at(other, ErrorKind::UnsupportedTarget)),
        }
    }

    /// Emit the right-hand side of an assignment into the accumulator and
    /// store it into the target, unless an intervening `input()` already
    /// wrote the target directly.
    fn assign_store(&mut self, ident: &str, target: &'a Expr, value: Rvalue<'a>) -> Result<()> {
        self.emit_value(value)?;
        self.core().declared.insert(ident.to_string());

        if self.core().should_save {
            self.access_memory(target, "STWA", None)?;
        } else {
            self.core().should_save = true;
        }
        self.core().current_target = None;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn visit_expr(&mut self, expr: &'a Expr) -> Result<()> {
        match expr {
            Expr::NumberLiteral(_) | Expr::Name(_) | Expr::Subscript(_) => {
                self.access_memory(expr, "LDWA", None)
            }
            Expr::BinOp(binop) => self.emit_binary(&binop.left, binop.op, &binop.right),
            Expr::Call(call) => self.visit_call(call),
            other => Err(Error::at(other, ErrorKind::UnsupportedNode(expr_kind(other)))),
        }
    }

    fn emit_value(&mut self, value: Rvalue<'a>) -> Result<()> {
        match value {
            Rvalue::Expr(expr) => self.visit_expr(expr),
            Rvalue::Binary { left, op, right } => self.emit_binary(left, op, right),
        }
    }

    /// Left-leaning add/sub chains accumulate in the A register; the
    /// right-hand side of each operator must be a plain memory operand.
    fn emit_binary(&mut self, left: &'a Expr, op: ast::Operator, right: &'a Expr) -> Result<()> {
        match left {
            Expr::BinOp(binop) => self.emit_binary(&binop.left, binop.op, &binop.right)?,
            _ => self.access_memory(left, "LDWA", None)?,
        }
        match op {
            ast::Operator::Add => self.access_memory(right, "ADDA", None),
            ast::Operator::Sub => self.access_memory(right, "SUBA", None),
            other => Err(Error::Compile {
                kind: ErrorKind::UnsupportedBinaryOperator(format!("{other:?}")),
                span: Span::new(
                    left.range().start().to_u32() as usize,
                    right.range().end().to_u32() as usize,
                ),
            }),
        }
    }

    fn visit_call(&mut self, call: &'a ast::ExprCall) -> Result<()> {
        let Expr::Name(func) = call.func.as_ref() else {
            return Err(Error::at(
                call,
                ErrorKind::UnsupportedCall(expr_kind(&call.func).to_string()),
            ));
        };

        match func.id.as_str() {
            "exit" => {
                self.core().record("STOP");
                Ok(())
            }

            // Identity cast; we only support integers.
            "int" => {
                ensure_args(call, 1)?;
                self.visit_expr(&call.arguments.args[0])
            }

            "input" => {
                ensure_args(call, 0)?;
                let Some(target) = self.core().current_target else {
                    return Err(Error::at(call, ErrorKind::InputOutsideAssignment));
                };
                if let Expr::Name(name) = target {
                    self.core().declared.insert(name.id.to_string());
                }
                self.access_memory(target, "DECI", None)?;
                // DECI already saved the value in memory.
                self.core().should_save = false;
                Ok(())
            }

            "print" => {
                ensure_args(call, 1)?;
                self.access_memory(&call.arguments.args[0], "DECO", None)
            }

            name => {
                let Some(&arity) = self.core().arities.get(name) else {
                    return Err(Error::at(call, ErrorKind::UnsupportedCall(name.to_string())));
                };
                ensure_args(call, arity)?;

                // The caller fills the callee's parameter slots below its
                // own frame pointer before transferring control.
                for (idx, arg) in call.arguments.args.iter().enumerate() {
                    if let Expr::Name(arg_name) = arg
                        && is_array_ident(arg_name.id.as_str())
                    {
                        return Err(Error::at(arg, ErrorKind::ArrayArgument));
                    }
                    self.access_memory(arg, "LDWA", None)?;
                    let offset = -4 - 2 * idx as i64;
                    self.core().record(format!("STWA {offset},s"));
                }

                let func_label = self.core().labels.lookup_or_create(name);
                self.core().record(format!("CALL {func_label}"));
                // The return value (if any) is already in the A register.
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Control flow
    // -----------------------------------------------------------------------

    /// Shared test emission for `if` and `while`: load the left operand
    /// (with the loop entry label, if any), compare, and branch to
    /// `exit_label` when the source condition is false.
    fn branch_compare(
        &mut self,
        test: &'a Expr,
        entry_label: Option<String>,
        exit_label: &str,
    ) -> Result<()> {
        let cmp = ensure_condition(test)?;
        self.access_memory(&cmp.left, "LDWA", entry_label)?;
        self.access_memory(&cmp.comparators[0], "CPWA", None)?;

        let op = cmp.ops[0];
        let Some(branch) = inverted_branch(op) else {
            return Err(Error::at(
                test,
                ErrorKind::UnsupportedComparison(format!("{op:?}")),
            ));
        };
        self.core().record(format!("{branch} {exit_label}"));
        Ok(())
    }

    /// `elif` clauses compile as a nested `if` in the else branch.
    fn visit_if(
        &mut self,
        test: &'a Expr,
        body: &'a [Stmt],
        clauses: &'a [ast::ElifElseClause],
    ) -> Result<()> {
        self.core().scope_depth += 1;
        let else_label = self.core().labels.allocate();
        let fi_label = self.core().labels.allocate();

        let has_else = !clauses.is_empty();
        let false_target = if has_else { &else_label } else { &fi_label };
        self.branch_compare(test, None, false_target)?;

        self.visit_body(body)?;

        if has_else {
            self.core().record(format!("BR {fi_label}"));
            self.core().record_labeled(Some(else_label), "NOP1");

            let (first, rest) = clauses.split_first().expect("has_else");
            match &first.test {
                Some(elif_test) => self.visit_if(elif_test, &first.body, rest)?,
                None => self.visit_body(&first.body)?,
            }
        }

        // Sentinel marker for the join point.
        self.core().record_labeled(Some(fi_label), "NOP1");
        self.core().scope_depth -= 1;
        Ok(())
    }

    fn visit_while(&mut self, while_stmt: &'a ast::StmtWhile) -> Result<()> {
        if !while_stmt.orelse.is_empty() {
            return Err(Error::at(while_stmt, ErrorKind::WhileElse));
        }

        self.core().scope_depth += 1;
        let test_label = self.core().labels.allocate();
        let end_label = self.core().labels.allocate();

        self.branch_compare(&while_stmt.test, Some(test_label.clone()), &end_label)?;

        self.visit_body(&while_stmt.body)?;
        self.core().record(format!("BR {test_label}"));

        // Sentinel marker for the end of the loop.
        self.core().record_labeled(Some(end_label), "NOP1");
        self.core().scope_depth -= 1;
        Ok(())
    }

    fn visit_return(&mut self, ret: &'a ast::StmtReturn) -> Result<()> {
        Err(Error::at(ret, ErrorKind::UnsupportedNode("Return")))
    }

    /// At this layer a definition only records `name → arity` so call sites
    /// can be validated; the function emitter overrides this with the full
    /// translation.
    fn visit_function_def(&mut self, func: &'a ast::StmtFunctionDef) -> Result<()> {
        self.record_arity(func)
    }

    fn record_arity(&mut self, func: &'a ast::StmtFunctionDef) -> Result<()> {
        let params = func.parameters.as_ref();
        if params.vararg.is_some()
            || params.kwarg.is_some()
            || !params.kwonlyargs.is_empty()
            || !params.posonlyargs.is_empty()
        {
            return Err(Error::at(params, ErrorKind::UnsupportedParameters));
        }
        self.core()
            .arities
            .insert(func.name.to_string(), params.args.len());
        Ok(())
    }

    /// The base declaration check applied by every memory-access site.
    fn check_declared(&mut self, expr: &'a Expr) -> Result<()> {
        if let Expr::Name(name) = expr
            && !self.core().declared.contains(name.id.as_str())
        {
            return Err(Error::at(
                expr,
                ErrorKind::UndeclaredIdentifier(name.id.to_string()),
            ));
        }
        Ok(())
    }
}
