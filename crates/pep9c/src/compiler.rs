//! The compilation driver.
//!
//! This is the only module that touches `ruff_python_parser`; everything
//! downstream consumes the AST read-only. The driver fixes the emission
//! order: translation banner, `BR main`, static data, per-function local
//! equates, optimized function bodies, then the optimized top-level body
//! ending with `.END`.

use std::io::Write;

use ruff_python_ast as ast;
use ruff_python_parser::parse_module;

use crate::entry::EntryPoint;
use crate::error::{Error, Result};
use crate::function::FunctionDefinition;
use crate::globals::GlobalVariableExtraction;
use crate::memory::{LocalMemoryAllocation, StaticMemoryAllocation};
use crate::optimize::{Optimizer, peephole};
use crate::toplevel::TopLevelProgram;

const ENTRY_POINT: &str = "main";

/// Translate an already-parsed module, writing Pep/9 assembly to `out`.
pub fn compile(module: &ast::ModModule, input_file: &str, out: &mut dyn Write) -> Result<()> {
    let mut extraction = GlobalVariableExtraction::new();
    extraction.visit_module(module)?;
    let symbol_table = &extraction.symbol_table;

    let mut top_level = TopLevelProgram::new(symbol_table, ENTRY_POINT);
    top_level.visit_module(module)?;
    let (top_instructions, labels) = top_level.finalize();

    // Function labels allocated at call sites are reused here: the label
    // table moves from one emitter to the next.
    let mut functions = FunctionDefinition::new(symbol_table, labels);
    functions.visit_module(module)?;
    let (func_instructions, frames) = functions.finalize();

    writeln!(out, "; Translating {input_file}")?;
    writeln!(out, "; Branching to top level ({ENTRY_POINT}) instructions")?;
    writeln!(out, "\t\tBR {ENTRY_POINT}")?;
    StaticMemoryAllocation::new(symbol_table, &extraction.results).generate(out)?;
    LocalMemoryAllocation::new(&frames).generate(out)?;

    let mut optimizer = Optimizer::new();
    optimizer.add_pass(peephole::double_load);
    optimizer.add_pass(peephole::absorb_nops);

    EntryPoint::new(optimizer.optimize(func_instructions)).generate(out)?;
    EntryPoint::new(optimizer.optimize(top_instructions)).generate(out)?;
    Ok(())
}

/// Parse `source` and translate it. Parse failures surface as
/// [`Error::Parse`].
pub fn compile_source(source: &str, input_file: &str, out: &mut dyn Write) -> Result<()> {
    let parsed = parse_module(source).map_err(|e| Error::Parse(e.to_string()))?;
    compile(&parsed.into_syntax(), input_file, out)
}
