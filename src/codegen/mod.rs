//! Operand stack simulation and type coercion for the code generator.
//!
//! The generator pushes the type of every value it leaves on the machine
//! stack and routes all structural stack traffic (pop, dup, swap, casts,
//! truth tests, constants, locals) through [`OperandStack`], which emits
//! the instructions and keeps the model in lock-step with them.

pub mod constants;
pub mod context;
pub mod conversion;
pub mod error;
pub mod hierarchy;
pub mod invocation;
pub mod operand_stack;
pub mod trace;
pub mod truth;
pub mod types;
pub mod variables;

#[cfg(test)]
mod test_support;

pub use constants::{ConstantValue, int_constant};
pub use context::CodegenContext;
pub use conversion::numeric_conversion;
pub use error::{CodegenError, ErrorKind, Result, Site};
pub use hierarchy::{ClassHierarchy, ClassInfo, ClassKind, TypeHierarchy};
pub use invocation::{DynamicInvocationPolicy, InvocationPolicy, emit_dynamic_cast};
pub use operand_stack::OperandStack;
pub use trace::{ClassDecl, Replay, ReplayReport, Step, Trace, replay};
pub use truth::emit_primitive_truth;
pub use types::{PrimitiveKind, SlotWidth, TypeDescriptor};
pub use variables::BytecodeVariable;
