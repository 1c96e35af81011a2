//! Instruction vocabulary shared with the bytecode writer, plus the
//! tooling that inspects emitted code.

mod ops;
mod sink;
pub mod dump;
pub mod verifier;

pub use dump::{Disassembler, format_code};
pub use ops::{
    FieldRef, Insn, InvokeKind, JumpCondition, Label, LdcConstant, MethodRef, NumericOp, SlotKind,
};
pub use sink::{InsnBuffer, InstructionSink};
pub use verifier::{Verifier, VerifyError};
