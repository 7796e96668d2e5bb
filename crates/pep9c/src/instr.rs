//! The data model shared by the emitters, the memory generators, and the
//! optimizer: labeled Pep/9 instructions, global allocation records, and
//! per-function call frames.

/// A single line of the instruction stream: an optional label and the
/// already-formatted mnemonic with operand and addressing-mode suffix
/// (`LDWA x,d`, `CALL Z`, `NOP1`, `.END`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledInstruction {
    pub label: Option<String>,
    pub text: String,
}

impl LabeledInstruction {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            label: None,
            text: text.into(),
        }
    }

    pub fn labeled(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            text: text.into(),
        }
    }
}

/// How a global variable is materialized in the static data section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitKind {
    /// `.BLOCK <bytes>`: runtime-initialized storage.
    Block,
    /// `.EQUATE <value>`: compile-time constant, no storage.
    Equate,
    /// `.WORD <value>`: statically initialized word.
    Word,
}

/// A global variable record, in first-appearance order. `value` holds the
/// byte count for [`InitKind::Block`] and the integer value otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalVariable {
    pub ident: String,
    pub kind: InitKind,
    pub value: i64,
}

/// A local variable slot inside a call frame. `offset` is the byte offset
/// from the bottom of the frame at allocation time; `words` is 1 for
/// scalars and N for arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub label: String,
    pub offset: u32,
    pub words: u32,
}

/// The stack frame of one function: locals (parameters first) in
/// declaration order, plus the total number of bytes the prologue reserves.
#[derive(Debug, Clone, Default)]
pub struct CallFrame {
    pub locals: Vec<(String, LocalVariable)>,
    pub stack_space: u32,
}

impl CallFrame {
    pub fn get(&self, ident: &str) -> Option<&LocalVariable> {
        self.locals
            .iter()
            .find(|(name, _)| name.as_str() == ident)
            .map(|(_, var)| var)
    }

    pub fn contains(&self, ident: &str) -> bool {
        self.get(ident).is_some()
    }
}

/// A pass takes the instruction stream and returns a new (modified) one.
pub type OptimizationPass = fn(Vec<LabeledInstruction>) -> Vec<LabeledInstruction>;
