//! Error types and input validation.
//!
//! Every detected error is a programmer error in the source being compiled;
//! the first one aborts the pipeline by propagating `Err` to the caller.
//! Errors carry the byte span of the offending node so the CLI can render
//! `Error at Ln <line>, Col <col>: <message>` against the original source.

use ruff_python_ast::{self as ast, Expr, Stmt};
use ruff_text_size::Ranged;
use thiserror::Error;

use crate::diagnostic::{Span, line_col};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("Unsupported AST node kind \"{0}\"")]
    UnsupportedNode(&'static str),

    #[error("Unsupported type {0} in expression")]
    UnsupportedExpression(&'static str),

    #[error("Unsupported type {0}")]
    UnsupportedLiteral(&'static str),

    #[error("Unsupported binary operator: {0}")]
    UnsupportedBinaryOperator(String),

    #[error("Unsupported comparison \"{0}\"")]
    UnsupportedComparison(String),

    #[error("Conditional must be a comparison")]
    ConditionNotComparison,

    #[error("Multiple comparisons are not supported")]
    MultipleComparisons,

    #[error("Only unary assignments are supported")]
    MultipleTargets,

    #[error("Unsupported assignment target")]
    UnsupportedTarget,

    #[error("Expected {expected} arguments, got {got}")]
    ArgumentCount { expected: usize, got: usize },

    #[error("Star arguments are not supported")]
    StarArguments,

    #[error("Keyword arguments are not supported")]
    KeywordArguments,

    #[error("Use of undeclared identifier \"{0}\"")]
    UndeclaredIdentifier(String),

    #[error("Unsupported function call: {0}")]
    UnsupportedCall(String),

    #[error("input() must be the right-hand side of an assignment")]
    InputOutsideAssignment,

    #[error("Cannot access memory of {0}")]
    CannotAccessMemory(&'static str),

    #[error("Array slicing is not supported")]
    SliceUnsupported,

    #[error("Unnamed expressions in array subscripts are not supported")]
    UnnamedSubscript,

    #[error("Cannot index into non-array object")]
    IndexNonArray,

    #[error("Cannot use array as integer type")]
    ArrayAsScalar,

    #[error("Cannot reassign compile-time constant \"{0}\"")]
    ConstantReassigned(String),

    #[error("Compile-time constant \"{0}\" requires a constant initializer")]
    ConstantNotConstexpr(String),

    #[error("Array initializer must have the form [0] * N")]
    BadArrayInitializer,

    #[error("Multiple parameters with same name")]
    DuplicateParameter,

    #[error("Arrays are not supported as parameters")]
    ArrayParameter,

    #[error("Only plain positional parameters are supported")]
    UnsupportedParameters,

    #[error("Arrays are not supported as arguments")]
    ArrayArgument,

    #[error("else clauses on while loops are not supported")]
    WhileElse,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{kind}")]
    Compile { kind: ErrorKind, span: Span },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a compile error anchored at an AST node.
    pub(crate) fn at(node: &impl Ranged, kind: ErrorKind) -> Self {
        Error::Compile {
            kind,
            span: node.range().into(),
        }
    }

    /// Render the error against the source it came from, with 1-indexed
    /// line/column coordinates for compile errors.
    pub fn render(&self, source: &str) -> String {
        match self {
            Error::Compile { kind, span } => {
                let (line, col) = line_col(source, span.start);
                format!("Error at Ln {line}, Col {col}: {kind}")
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Reject calls with the wrong argument count, star arguments, or keyword
/// arguments.
pub(crate) fn ensure_args(call: &ast::ExprCall, expected: usize) -> Result<()> {
    let got = call.arguments.args.len();
    if got != expected {
        return Err(Error::at(call, ErrorKind::ArgumentCount { expected, got }));
    }
    if call.arguments.args.iter().any(|a| matches!(a, Expr::Starred(_))) {
        return Err(Error::at(call, ErrorKind::StarArguments));
    }
    if !call.arguments.keywords.is_empty() {
        return Err(Error::at(call, ErrorKind::KeywordArguments));
    }
    Ok(())
}

/// Require a condition to be a single comparison (`a < b`, not `a < b < c`
/// or a bare truthiness test).
pub(crate) fn ensure_condition(test: &Expr) -> Result<&ast::ExprCompare> {
    let Expr::Compare(cmp) = test else {
        return Err(Error::at(test, ErrorKind::ConditionNotComparison));
    };
    if cmp.ops.len() != 1 || cmp.comparators.len() != 1 {
        return Err(Error::at(test, ErrorKind::MultipleComparisons));
    }
    Ok(cmp)
}

/// Require exactly one assignment target that is a `Name` or `Subscript`.
pub(crate) fn ensure_assign(assign: &ast::StmtAssign) -> Result<&Expr> {
    if assign.targets.len() != 1 {
        return Err(Error::at(assign, ErrorKind::MultipleTargets));
    }
    let target = &assign.targets[0];
    if !matches!(target, Expr::Name(_) | Expr::Subscript(_)) {
        return Err(Error::at(target, ErrorKind::UnsupportedTarget));
    }
    Ok(target)
}

/// Validate an array initializer of the form `[0] * N` and return N, the
/// number of words to reserve.
pub(crate) fn ensure_array(expr: &Expr) -> Result<u32> {
    if let Expr::BinOp(binop) = expr
        && binop.op == ast::Operator::Mult
        && let Expr::List(list) = binop.left.as_ref()
        && list.elts.len() == 1
        && int_literal(&list.elts[0]) == Some(0)
        && let Some(n) = int_literal(&binop.right)
        && n >= 0
    {
        return Ok(n as u32);
    }
    Err(Error::at(expr, ErrorKind::BadArrayInitializer))
}

/// Extract an integer literal value, if the expression is one.
pub(crate) fn int_literal(expr: &Expr) -> Option<i64> {
    match expr {
        Expr::NumberLiteral(n) => match &n.value {
            ast::Number::Int(i) => i.as_i64(),
            _ => None,
        },
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Node kind names for error messages
// ---------------------------------------------------------------------------

pub(crate) fn expr_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::BoolOp(_) => "BoolOp",
        Expr::BinOp(_) => "BinOp",
        Expr::UnaryOp(_) => "UnaryOp",
        Expr::Lambda(_) => "Lambda",
        Expr::If(_) => "IfExp",
        Expr::Dict(_) => "Dict",
        Expr::Set(_) => "Set",
        Expr::Compare(_) => "Compare",
        Expr::Call(_) => "Call",
        Expr::FString(_) => "FString",
        Expr::StringLiteral(_) => "str",
        Expr::BytesLiteral(_) => "bytes",
        Expr::NumberLiteral(n) => match &n.value {
            ast::Number::Int(_) => "int",
            ast::Number::Float(_) => "float",
            ast::Number::Complex { .. } => "complex",
        },
        Expr::BooleanLiteral(_) => "bool",
        Expr::NoneLiteral(_) => "NoneType",
        Expr::EllipsisLiteral(_) => "Ellipsis",
        Expr::Attribute(_) => "Attribute",
        Expr::Subscript(_) => "Subscript",
        Expr::Starred(_) => "Starred",
        Expr::Name(_) => "Name",
        Expr::List(_) => "List",
        Expr::Tuple(_) => "Tuple",
        Expr::Slice(_) => "Slice",
        _ => "expression",
    }
}

pub(crate) fn stmt_kind(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::FunctionDef(_) => "FunctionDef",
        Stmt::ClassDef(_) => "ClassDef",
        Stmt::Return(_) => "Return",
        Stmt::Delete(_) => "Delete",
        Stmt::Assign(_) => "Assign",
        Stmt::AugAssign(_) => "AugAssign",
        Stmt::AnnAssign(_) => "AnnAssign",
        Stmt::For(_) => "For",
        Stmt::While(_) => "While",
        Stmt::If(_) => "If",
        Stmt::With(_) => "With",
        Stmt::Match(_) => "Match",
        Stmt::Raise(_) => "Raise",
        Stmt::Try(_) => "Try",
        Stmt::Assert(_) => "Assert",
        Stmt::Import(_) => "Import",
        Stmt::ImportFrom(_) => "ImportFrom",
        Stmt::Expr(_) => "Expr",
        Stmt::Pass(_) => "Pass",
        Stmt::Break(_) => "Break",
        Stmt::Continue(_) => "Continue",
        _ => "statement",
    }
}
