//! Final instruction-stream formatting.
//!
//! Lines without a label are indented with two tabs; labeled lines pad the
//! `label:` column to 9 characters so mnemonics align.

use std::io::Write;

use crate::instr::LabeledInstruction;

pub struct EntryPoint {
    instructions: Vec<LabeledInstruction>,
}

impl EntryPoint {
    pub fn new(instructions: Vec<LabeledInstruction>) -> Self {
        Self { instructions }
    }

    pub fn generate(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out, "; Top Level instructions")?;
        for instruction in &self.instructions {
            match &instruction.label {
                None => writeln!(out, "\t\t{}", instruction.text)?,
                Some(label) => {
                    writeln!(out, "{:<9}\t{}", format!("{label}:"), instruction.text)?
                }
            }
        }
        Ok(())
    }
}
