//! pep9c - a compiler from a restricted Python subset to Pep/9 assembly
//!
//! pep9c translates a small, statement-oriented Python subset into symbolic
//! assembly for the Pep/9 virtual machine: a 16-bit accumulator-plus-index
//! architecture with stack-relative addressing and directives for static
//! memory (`.BLOCK`, `.WORD`, `.EQUATE`, `.END`).
//!
//! # Quick Start
//!
//! ```
//! use pep9c::compile_source;
//!
//! let mut out = Vec::new();
//! compile_source("x = input()\nprint(x)", "example.py", &mut out).unwrap();
//! let assembly = String::from_utf8(out).unwrap();
//! assert!(assembly.contains("DECI"));
//! ```
//!
//! # Supported Source Features
//!
//! ## Statements
//! - Assignments to names and array subscripts, augmented `+=`/`-=`
//! - `if`/`elif`/`else` and `while` with a single comparison as the test
//! - `def` with positional integer parameters, `return`
//!
//! ## Expressions
//! - Integer literals, names, subscripts, and `+`/`-` chains
//! - Calls: `input()`, `print(x)`, `int(x)`, `exit()`, and user-defined
//!   functions with positional arguments
//!
//! ## Naming conventions (part of the source contract)
//! - `_NAME`: compile-time constant, materialized as `.EQUATE` and
//!   referenced with immediate addressing
//! - `name_`: array variable, initialized with `[0] * N` and accessed by
//!   subscript
//! - anything else: ordinary scalar word
//!
//! # Not Supported
//!
//! - Multiplication, division, or any operator beyond `+`/`-`
//! - Chained comparisons, boolean operators in conditions
//! - Keyword, star, or computed-expression arguments
//! - Array parameters, nested function definitions
//! - Floating point, strings, or any non-integer value
//!
//! The first error encountered aborts compilation; errors carry source
//! coordinates and render as `Error at Ln <line>, Col <col>: <message>`.

mod compiler;
mod diagnostic;
mod entry;
mod error;
mod function;
mod globals;
mod instr;
mod memory;
mod optimize;
mod procedural;
mod propagate;
mod symbols;
mod toplevel;

pub use compiler::{compile, compile_source};
pub use diagnostic::Span;
pub use error::{Error, ErrorKind, Result};
pub use instr::{
    CallFrame, GlobalVariable, InitKind, LabeledInstruction, LocalVariable, OptimizationPass,
};
pub use optimize::{Optimizer, peephole};
pub use symbols::{LabelSequence, SymbolTable};
