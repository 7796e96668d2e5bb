//! The optimization pipeline.
//!
//! An [`Optimizer`] holds an ordered list of passes and folds the
//! instruction stream through them left to right. The shipped passes live
//! in [`peephole`].

use crate::instr::{LabeledInstruction, OptimizationPass};

pub mod peephole;

#[derive(Default)]
pub struct Optimizer {
    passes: Vec<OptimizationPass>,
}

impl Optimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pass(&mut self, pass: OptimizationPass) {
        self.passes.push(pass);
    }

    pub fn optimize(&self, instructions: Vec<LabeledInstruction>) -> Vec<LabeledInstruction> {
        self.passes
            .iter()
            .fold(instructions, |instructions, pass| pass(instructions))
    }
}
