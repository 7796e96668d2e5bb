//! Peephole passes over abstract register state.
//!
//! Both passes treat any labeled instruction and any `CALL` as a basic
//! block boundary: a branch target can be reached with any register
//! contents, and a call clobbers them.

use crate::instr::LabeledInstruction;

/// Mnemonics whose third letter (second for `OR`) names the register they
/// overwrite.
const REGISTER_OPS: &[&str] = &[
    "NOT", "NEG", "ASL", "ASR", "ROL", "ROR", "ADD", "SUB", "AND", "OR",
];

/// A parsed memory operand: the symbol (or immediate) and its addressing
/// mode suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Operand {
    sym: String,
    mode: String,
}

/// What the accumulator is known to hold: a plain operand, or the element
/// of `base` selected by the tracked index register. Keying on the
/// structural pair keeps distinct `(base, index)` combinations distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
enum AccValue {
    Plain(Operand),
    Indexed { base: String, index: Operand },
}

fn parse_operand(text: &str) -> Option<Operand> {
    let (_, operand) = text.split_once(' ')?;
    let (sym, mode) = operand.split_once(',')?;
    Some(Operand {
        sym: sym.to_string(),
        mode: mode.to_string(),
    })
}

/// Drop loads whose value is already in the target register.
///
/// Tracks what the accumulator and index register hold, resetting at every
/// basic block boundary. A repeated `ASLX` is dropped while the index
/// register still holds the same (already doubled) word index.
pub fn double_load(instructions: Vec<LabeledInstruction>) -> Vec<LabeledInstruction> {
    let mut acc: Option<AccValue> = None;
    let mut idx: Option<Operand> = None;
    let mut did_asl_idx = false;

    let mut output = Vec::with_capacity(instructions.len());
    for instruction in instructions {
        if instruction.label.is_some() || instruction.text.starts_with("CALL") {
            // Whether branched to or returned into, the registers could
            // hold anything here.
            acc = None;
            idx = None;
            did_asl_idx = false;
        }

        let text = &instruction.text;
        if text.starts_with("LDWA") {
            if let Some(operand) = parse_operand(text) {
                if operand.mode.ends_with('x') {
                    match &idx {
                        None => acc = None,
                        Some(index) => {
                            let value = AccValue::Indexed {
                                base: operand.sym,
                                index: index.clone(),
                            };
                            if acc.as_ref() == Some(&value) {
                                continue;
                            }
                            acc = Some(value);
                        }
                    }
                } else {
                    let value = AccValue::Plain(operand);
                    if acc.as_ref() == Some(&value) {
                        continue;
                    }
                    acc = Some(value);
                }
            }
        } else if text.starts_with("LDWX") {
            if let Some(operand) = parse_operand(text) {
                if idx.as_ref() == Some(&operand) {
                    // The index register already holds this; a following
                    // ASLX stays dropped too, it is still doubled.
                    continue;
                }
                idx = Some(operand);
                did_asl_idx = false;
            }
        } else if REGISTER_OPS.iter().any(|op| text.starts_with(op)) {
            let register = text.as_bytes()[if text.starts_with("OR") { 2 } else { 3 }];
            if register == b'A' {
                acc = None;
            } else if idx.is_some() && text.starts_with("ASL") {
                if did_asl_idx {
                    continue;
                }
                did_asl_idx = true;
            } else {
                idx = None;
                did_asl_idx = false;
            }
        }

        output.push(instruction);
    }
    output
}

/// Absorb a `NOP1` into its successor by moving the label forward.
///
/// A `NOP1` followed by an unlabeled instruction is replaced by that
/// instruction carrying the NOP's label. The final instruction of the
/// stream is always preserved.
pub fn absorb_nops(instructions: Vec<LabeledInstruction>) -> Vec<LabeledInstruction> {
    if instructions.len() < 2 {
        return instructions;
    }

    let mut output = Vec::with_capacity(instructions.len());
    let mut skip_next = false;
    for pair in instructions.windows(2) {
        if skip_next {
            skip_next = false;
            continue;
        }
        let (current, next) = (&pair[0], &pair[1]);
        if current.text.starts_with("NOP1") && next.label.is_none() {
            output.push(LabeledInstruction {
                label: current.label.clone(),
                text: next.text.clone(),
            });
            skip_next = true;
        } else {
            output.push(current.clone());
        }
    }

    if !skip_next {
        output.push(instructions[instructions.len() - 1].clone());
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain(text: &str) -> LabeledInstruction {
        LabeledInstruction::new(text)
    }

    fn labeled(label: &str, text: &str) -> LabeledInstruction {
        LabeledInstruction::labeled(label, text)
    }

    #[test]
    fn consecutive_loads_of_same_operand_collapse() {
        let out = double_load(vec![plain("LDWA A,d"), plain("LDWA A,d")]);
        assert_eq!(out, vec![plain("LDWA A,d")]);
    }

    #[test]
    fn a_call_keeps_both_loads() {
        let input = vec![plain("LDWA A,d"), plain("CALL Z"), plain("LDWA A,d")];
        assert_eq!(double_load(input.clone()), input);
    }

    #[test]
    fn a_label_keeps_both_loads() {
        let input = vec![plain("LDWA A,d"), labeled("Z", "LDWA A,d")];
        assert_eq!(double_load(input.clone()), input);
    }

    #[test]
    fn different_modes_do_not_collapse() {
        let input = vec![plain("LDWA 3,i"), plain("LDWA 3,d")];
        assert_eq!(double_load(input.clone()), input);
    }

    #[test]
    fn store_does_not_invalidate_the_accumulator() {
        let out = double_load(vec![
            plain("LDWA A,d"),
            plain("STWA B,d"),
            plain("LDWA A,d"),
        ]);
        assert_eq!(out, vec![plain("LDWA A,d"), plain("STWA B,d")]);
    }

    #[test]
    fn arithmetic_invalidates_the_accumulator() {
        let input = vec![plain("LDWA A,d"), plain("ADDA 1,i"), plain("LDWA A,d")];
        assert_eq!(double_load(input.clone()), input);
    }

    #[test]
    fn repeated_index_load_and_shift_collapse() {
        let out = double_load(vec![
            plain("LDWX 2,i"),
            plain("ASLX"),
            plain("LDWA A,x"),
            plain("LDWX 2,i"),
            plain("ASLX"),
            plain("STWA A,x"),
        ]);
        assert_eq!(
            out,
            vec![
                plain("LDWX 2,i"),
                plain("ASLX"),
                plain("LDWA A,x"),
                plain("STWA A,x"),
            ]
        );
    }

    #[test]
    fn fresh_index_load_keeps_its_shift() {
        let out = double_load(vec![
            plain("LDWX B,d"),
            plain("ASLX"),
            plain("LDWA A,x"),
            plain("LDWX C,d"),
            plain("ASLX"),
            plain("STWA A,x"),
        ]);
        assert_eq!(
            out,
            vec![
                plain("LDWX B,d"),
                plain("ASLX"),
                plain("LDWA A,x"),
                plain("LDWX C,d"),
                plain("ASLX"),
                plain("STWA A,x"),
            ]
        );
    }

    #[test]
    fn indexed_loads_key_on_base_and_index() {
        // Same base, same index: the second indexed load collapses.
        let out = double_load(vec![
            plain("LDWX 1,i"),
            plain("ASLX"),
            plain("LDWA A,x"),
            plain("LDWA A,x"),
        ]);
        assert_eq!(
            out,
            vec![plain("LDWX 1,i"), plain("ASLX"), plain("LDWA A,x")]
        );

        // Different base, same index: both loads stay.
        let input = vec![
            plain("LDWX 1,i"),
            plain("ASLX"),
            plain("LDWA A,x"),
            plain("LDWA B,x"),
        ];
        assert_eq!(double_load(input.clone()), input);
    }

    #[test]
    fn double_load_is_idempotent() {
        let input = vec![
            labeled("main", "NOP1"),
            plain("LDWA A,d"),
            plain("LDWA A,d"),
            plain("LDWX 2,i"),
            plain("ASLX"),
            plain("ASLX"),
            plain("LDWA B,x"),
            plain("CALL Z"),
            plain("LDWA A,d"),
        ];
        let once = double_load(input);
        let twice = double_load(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn nop_label_moves_onto_successor() {
        let out = absorb_nops(vec![
            labeled("Z", "NOP1"),
            plain("LDWA A,d"),
            plain(".END"),
        ]);
        assert_eq!(out, vec![labeled("Z", "LDWA A,d"), plain(".END")]);
    }

    #[test]
    fn labeled_successor_blocks_absorption() {
        let input = vec![labeled("Z", "NOP1"), labeled("Y", "NOP1"), plain(".END")];
        let out = absorb_nops(input);
        assert_eq!(
            out,
            vec![labeled("Z", "NOP1"), labeled("Y", ".END")]
        );
    }

    #[test]
    fn final_instruction_is_preserved() {
        let input = vec![plain("LDWA A,d"), plain(".END")];
        assert_eq!(absorb_nops(input.clone()), input);
        assert_eq!(absorb_nops(vec![plain(".END")]), vec![plain(".END")]);
    }
}
