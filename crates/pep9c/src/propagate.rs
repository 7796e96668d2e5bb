//! Compile-time constant propagation.
//!
//! Tracks, per name, whether it has been assigned yet, whether it has been
//! reassigned since, and the integer value of its most recent assignment if
//! that assignment folded. A name is "propagated" exactly when its latest
//! right-hand side folded to an integer using only literals, previously
//! folded names, and `+`/`-`.

use ruff_python_ast::{self as ast, Expr};

use crate::error::{Error, ErrorKind, Result, expr_kind, int_literal};

/// The right-hand side of an assignment: either a plain expression, or the
/// `target <op> value` view of an augmented assignment.
#[derive(Debug, Clone, Copy)]
pub enum Rvalue<'a> {
    Expr(&'a Expr),
    Binary {
        left: &'a Expr,
        op: ast::Operator,
        right: &'a Expr,
    },
}

/// The outcome of folding one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fold {
    /// Whether the whole right-hand side folded to an integer.
    pub constexpr: bool,
    /// Whether any name in the expression had been reassigned before use.
    pub used_reassigned: bool,
    /// The folded value; 0 when `constexpr` is false.
    pub value: i64,
}

impl Fold {
    fn none() -> Self {
        Fold {
            constexpr: false,
            used_reassigned: false,
            value: 0,
        }
    }

    fn constant(value: i64) -> Self {
        Fold {
            constexpr: true,
            used_reassigned: false,
            value,
        }
    }
}

/// Per-name propagation state. Presence in the map means the name has been
/// seen; `value` is `Some` only while the latest assignment folded.
#[derive(Debug, Default)]
struct VarState {
    value: Option<i64>,
    reassigned: bool,
}

#[derive(Debug, Default)]
pub struct ConstantPropagator {
    vars: std::collections::HashMap<String, VarState>,
}

impl ConstantPropagator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `ident` has been assigned at least once.
    pub fn is_seen(&self, ident: &str) -> bool {
        self.vars.contains_key(ident)
    }

    /// Record one assignment to `ident` and report how its right-hand side
    /// folded. Reassignment of an already-seen name marks it reassigned.
    pub fn add_assign(&mut self, ident: &str, value: &Rvalue) -> Result<Fold> {
        let folded = self.fold_rvalue(value)?;

        match self.vars.entry(ident.to_string()) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                let state = entry.get_mut();
                state.reassigned = true;
                state.value = folded.constexpr.then_some(folded.value);
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(VarState {
                    value: folded.constexpr.then_some(folded.value),
                    reassigned: false,
                });
            }
        }
        Ok(folded)
    }

    fn fold_rvalue(&self, value: &Rvalue) -> Result<Fold> {
        match value {
            Rvalue::Expr(expr) => self.fold(expr),
            Rvalue::Binary { left, op, right } => {
                self.fold_binary(left, *op, right)
            }
        }
    }

    fn fold_binary(&self, left: &Expr, op: ast::Operator, right: &Expr) -> Result<Fold> {
        if !matches!(op, ast::Operator::Add | ast::Operator::Sub) {
            return Ok(Fold::none());
        }
        let lhs = self.fold(left)?;
        let rhs = self.fold(right)?;
        let used_reassigned = lhs.used_reassigned || rhs.used_reassigned;
        if !(lhs.constexpr && rhs.constexpr) {
            return Ok(Fold {
                constexpr: false,
                used_reassigned,
                value: 0,
            });
        }
        let value = match op {
            ast::Operator::Add => lhs.value + rhs.value,
            _ => lhs.value - rhs.value,
        };
        Ok(Fold {
            constexpr: true,
            used_reassigned,
            value,
        })
    }

    fn fold(&self, expr: &Expr) -> Result<Fold> {
        match expr {
            Expr::BinOp(binop) => self.fold_binary(&binop.left, binop.op, &binop.right),

            Expr::NumberLiteral(_) => match int_literal(expr) {
                Some(value) => Ok(Fold::constant(value)),
                None => Err(Error::at(expr, ErrorKind::UnsupportedLiteral(expr_kind(expr)))),
            },

            Expr::Name(name) => {
                let Some(state) = self.vars.get(name.id.as_str()) else {
                    return Ok(Fold::none());
                };
                Ok(Fold {
                    constexpr: state.value.is_some(),
                    used_reassigned: state.reassigned,
                    value: state.value.unwrap_or(0),
                })
            }

            // A function call cannot be evaluated at compile time.
            Expr::Call(_) => Ok(Fold::none()),

            _ => Err(Error::at(
                expr,
                ErrorKind::UnsupportedExpression(expr_kind(expr)),
            )),
        }
    }
}
