//! opstack - operand stack simulator for a JVM code generator
//!
//! The library tracks the compile-time type of every operand a code
//! generator leaves on the machine stack and emits the width-correct stack,
//! conversion, boxing and truth instructions that keep that model and the
//! real stack identical.

pub mod codegen;
pub mod config;
pub mod vm;

// Re-export commonly used types
pub use codegen::{CodegenContext, CodegenError, OperandStack, TypeDescriptor};
pub use config::CodegenConfig;
pub use vm::{Insn, InsnBuffer, InstructionSink};
