//! Physical slot-height verifier for emitted instruction fragments.
//!
//! Checks the rules a machine verifier would reject first:
//! - Control Flow: every jump names a label that is marked exactly once
//! - Stack Height Consistency: each basic block has a unique entry height
//! - Stack Effect Validation: no underflow, no overflow
//!
//! Heights are counted in physical slots, so a `long` counts twice. The
//! verifier returns the height at the fall-through end of the fragment,
//! which must equal the operand stack's slot projection when the simulator
//! and the emitted code agree.

use std::collections::{HashMap, HashSet, VecDeque};

use super::ops::{Insn, Label};

/// Verification error types
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyError {
    /// Jump to a label that is never marked
    UnknownLabel { pc: usize, label: Label },
    /// Label marked more than once
    DuplicateLabel { pc: usize, label: Label },
    /// Stack height mismatch at merge point
    StackHeightMismatch {
        pc: usize,
        expected: usize,
        actual: usize,
    },
    /// Stack underflow
    StackUnderflow { pc: usize, required: usize, actual: usize },
    /// Stack overflow (exceeds max_stack)
    StackOverflow { pc: usize, height: usize, max: usize },
    /// Control never reaches the end of the fragment
    NoFallThrough,
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyError::UnknownLabel { pc, label } => {
                write!(f, "jump at pc={} targets unmarked label {}", pc, label)
            }
            VerifyError::DuplicateLabel { pc, label } => {
                write!(f, "label {} marked again at pc={}", label, pc)
            }
            VerifyError::StackHeightMismatch { pc, expected, actual } => {
                write!(
                    f,
                    "stack height mismatch at pc={}: expected {}, got {}",
                    pc, expected, actual
                )
            }
            VerifyError::StackUnderflow { pc, required, actual } => {
                write!(
                    f,
                    "stack underflow at pc={}: requires {} slots, but only {} on stack",
                    pc, required, actual
                )
            }
            VerifyError::StackOverflow { pc, height, max } => {
                write!(
                    f,
                    "stack overflow at pc={}: height {} exceeds max_stack {}",
                    pc, height, max
                )
            }
            VerifyError::NoFallThrough => {
                write!(f, "end of fragment is unreachable")
            }
        }
    }
}

impl std::error::Error for VerifyError {}

/// A basic block in the control flow graph
#[derive(Debug, Clone)]
pub struct BasicBlock {
    /// Start PC (inclusive)
    pub start: usize,
    /// End PC (exclusive)
    pub end: usize,
    /// Successor block indices
    pub successors: Vec<usize>,
}

/// Control flow graph
#[derive(Debug)]
#[allow(clippy::upper_case_acronyms)]
pub struct CFG {
    /// Basic blocks
    pub blocks: Vec<BasicBlock>,
    /// Map from PC to block index
    pub pc_to_block: HashMap<usize, usize>,
}

/// Slot-height verifier
pub struct Verifier {
    /// Maximum stack size in slots (default 1024)
    pub max_stack: usize,
}

impl Default for Verifier {
    fn default() -> Self {
        Self { max_stack: 1024 }
    }
}

impl Verifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify a fragment that starts with `entry_height` slots already on
    /// the stack. Returns the slot height at its fall-through end.
    pub fn verify(&self, code: &[Insn], entry_height: usize) -> Result<usize, VerifyError> {
        if code.is_empty() {
            return Ok(entry_height);
        }
        let cfg = self.build_cfg(code)?;
        self.verify_stack_heights(code, &cfg, entry_height)
    }

    /// Build control flow graph from the instruction stream
    pub fn build_cfg(&self, code: &[Insn]) -> Result<CFG, VerifyError> {
        let len = code.len();

        let mut marks: HashMap<Label, usize> = HashMap::new();
        for (pc, insn) in code.iter().enumerate() {
            if let Insn::Mark(label) = insn {
                if marks.insert(*label, pc).is_some() {
                    return Err(VerifyError::DuplicateLabel { pc, label: *label });
                }
            }
        }

        // Find all leader PCs (start of basic blocks)
        let mut leaders: HashSet<usize> = HashSet::new();
        leaders.insert(0);

        for (pc, insn) in code.iter().enumerate() {
            match insn {
                Insn::Jump(_, label) | Insn::Goto(label) => {
                    if !marks.contains_key(label) {
                        return Err(VerifyError::UnknownLabel { pc, label: *label });
                    }
                    if pc + 1 < len {
                        leaders.insert(pc + 1);
                    }
                }
                Insn::Mark(_) => {
                    leaders.insert(pc);
                }
                _ => {}
            }
        }

        let mut sorted_leaders: Vec<usize> = leaders.into_iter().collect();
        sorted_leaders.sort();

        let mut blocks: Vec<BasicBlock> = Vec::new();
        let mut pc_to_block: HashMap<usize, usize> = HashMap::new();

        for (i, &start) in sorted_leaders.iter().enumerate() {
            let end = sorted_leaders.get(i + 1).copied().unwrap_or(len);
            let block_idx = blocks.len();
            for pc in start..end {
                pc_to_block.insert(pc, block_idx);
            }
            blocks.push(BasicBlock {
                start,
                end,
                successors: Vec::new(),
            });
        }

        for block in &mut blocks {
            let last = &code[block.end - 1];
            let mut successors = Vec::new();

            let target_block = |label: &Label| marks.get(label).and_then(|pc| pc_to_block.get(pc)).copied();

            match last {
                Insn::Goto(label) => {
                    successors.extend(target_block(label));
                }
                Insn::Jump(_, label) => {
                    successors.extend(target_block(label));
                    if block.end < len {
                        if let Some(&succ) = pc_to_block.get(&block.end) {
                            if !successors.contains(&succ) {
                                successors.push(succ);
                            }
                        }
                    }
                }
                _ => {
                    if block.end < len {
                        if let Some(&succ) = pc_to_block.get(&block.end) {
                            successors.push(succ);
                        }
                    }
                }
            }

            block.successors = successors;
        }

        Ok(CFG { blocks, pc_to_block })
    }

    /// Verify slot heights using abstract interpretation
    pub fn verify_stack_heights(
        &self,
        code: &[Insn],
        cfg: &CFG,
        entry_height: usize,
    ) -> Result<usize, VerifyError> {
        let mut block_heights: Vec<Option<usize>> = vec![None; cfg.blocks.len()];
        let mut exit_height = None;

        let mut worklist: VecDeque<usize> = VecDeque::new();
        block_heights[0] = Some(entry_height);
        worklist.push_back(0);

        while let Some(block_idx) = worklist.pop_front() {
            let block = &cfg.blocks[block_idx];
            let Some(mut height) = block_heights[block_idx] else {
                continue;
            };

            for (pc, insn) in code.iter().enumerate().skip(block.start).take(block.end - block.start) {
                let (pops, pushes) = insn.stack_effect();

                if height < pops {
                    return Err(VerifyError::StackUnderflow {
                        pc,
                        required: pops,
                        actual: height,
                    });
                }

                height = height - pops + pushes;

                if height > self.max_stack {
                    return Err(VerifyError::StackOverflow {
                        pc,
                        height,
                        max: self.max_stack,
                    });
                }
            }

            let falls_off_end =
                block.end == code.len() && !matches!(code[block.end - 1], Insn::Goto(_));
            if falls_off_end {
                exit_height = Some(height);
            }

            for &succ_idx in &block.successors {
                match block_heights[succ_idx] {
                    None => {
                        block_heights[succ_idx] = Some(height);
                        worklist.push_back(succ_idx);
                    }
                    Some(existing) => {
                        if existing != height {
                            return Err(VerifyError::StackHeightMismatch {
                                pc: cfg.blocks[succ_idx].start,
                                expected: existing,
                                actual: height,
                            });
                        }
                    }
                }
            }
        }

        exit_height.ok_or(VerifyError::NoFallThrough)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::ops::{JumpCondition, NumericOp};

    #[test]
    fn test_straight_line() {
        let verifier = Verifier::new();
        let code = vec![Insn::IConst(1), Insn::Convert(NumericOp::I2L), Insn::Dup2];
        assert_eq!(verifier.verify(&code, 0), Ok(4));
    }

    #[test]
    fn test_empty_fragment_keeps_entry_height() {
        assert_eq!(Verifier::new().verify(&[], 3), Ok(3));
    }

    #[test]
    fn test_branches_merge() {
        let verifier = Verifier::new();
        let code = vec![
            Insn::Jump(JumpCondition::IfEq, Label(0)), // 0: consumes the int
            Insn::IConst(1),                           // 1
            Insn::Goto(Label(1)),                      // 2
            Insn::Mark(Label(0)),                      // 3
            Insn::IConst(0),                           // 4
            Insn::Mark(Label(1)),                      // 5
        ];
        let cfg = verifier.build_cfg(&code).unwrap();
        assert_eq!(cfg.blocks.len(), 4);
        assert_eq!(verifier.verify(&code, 1), Ok(1));
    }

    #[test]
    fn test_stack_height_mismatch() {
        let verifier = Verifier::new();
        let code = vec![
            Insn::Jump(JumpCondition::IfEq, Label(0)),
            Insn::IConst(1),
            Insn::IConst(1),
            Insn::Mark(Label(0)),
        ];
        let result = verifier.verify(&code, 1);
        assert!(matches!(result, Err(VerifyError::StackHeightMismatch { .. })));
    }

    #[test]
    fn test_stack_underflow() {
        let result = Verifier::new().verify(&[Insn::Pop2], 1);
        assert!(matches!(result, Err(VerifyError::StackUnderflow { pc: 0, required: 2, actual: 1 })));
    }

    #[test]
    fn test_unknown_label() {
        let result = Verifier::new().verify(&[Insn::Goto(Label(7))], 0);
        assert!(matches!(result, Err(VerifyError::UnknownLabel { .. })));
    }

    #[test]
    fn test_duplicate_label() {
        let result = Verifier::new().verify(&[Insn::Mark(Label(0)), Insn::Mark(Label(0))], 0);
        assert!(matches!(result, Err(VerifyError::DuplicateLabel { pc: 1, .. })));
    }

    #[test]
    fn test_overflow() {
        let verifier = Verifier { max_stack: 2 };
        let result = verifier.verify(&[Insn::LConst0, Insn::IConst(0)], 0);
        assert!(matches!(result, Err(VerifyError::StackOverflow { .. })));
    }
}
