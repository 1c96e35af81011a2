//! Reduction of a condition operand to a primitive boolean.

use super::context::CodegenContext;
use super::error::{ErrorKind, Result};
use super::operand_stack::OperandStack;
use super::types::{PrimitiveKind, TypeDescriptor};
use crate::vm::{Insn, InvokeKind, JumpCondition, MethodRef};

impl OperandStack {
    /// Turn whatever the condition expression left above `mark` into a
    /// `boolean`.
    ///
    /// Nothing above the mark means the condition was omitted and
    /// `empty_default` is pushed. Exactly one operand is reduced with the
    /// language's truth rules. Any other count is a generator bug.
    pub fn cast_to_bool(&mut self, cx: &mut CodegenContext<'_>, mark: usize, empty_default: bool) -> Result<()> {
        let size = self.len();
        if mark == size {
            cx.emit(Insn::BiPush(if empty_default { 1 } else { 0 }));
            self.push(TypeDescriptor::boolean());
            return Ok(());
        }
        if size.checked_sub(1) != Some(mark) {
            return Err(cx.error(ErrorKind::BoolMarkMismatch { mark, size }));
        }

        let top = self.top_operand(cx)?;
        match top.as_primitive() {
            Some(PrimitiveKind::Boolean) => return Ok(()),
            Some(kind) => emit_primitive_truth(cx, kind),
            None => {
                let policy = cx.policy;
                policy.cast_non_primitive_to_bool(self, cx, &top)?;
            }
        }
        self.replace(cx, TypeDescriptor::boolean())
    }
}

/// Replace a primitive on the physical stack with 0 or 1.
///
/// Zero is false. For `float` and `double`, NaN is false as well.
pub fn emit_primitive_truth(cx: &mut CodegenContext<'_>, kind: PrimitiveKind) {
    match kind {
        PrimitiveKind::Boolean => {}
        PrimitiveKind::Float | PrimitiveKind::Double => emit_floating_truth(cx, kind),
        _ => {
            let end = cx.new_label();
            let falsy = cx.new_label();
            if kind == PrimitiveKind::Long {
                cx.emit(Insn::LConst0);
                cx.emit(Insn::LCmp);
            }
            cx.emit(Insn::Jump(JumpCondition::IfEq, falsy));
            cx.emit(Insn::IConst(1));
            cx.emit(Insn::Goto(end));
            cx.emit(Insn::Mark(falsy));
            cx.emit(Insn::IConst(0));
            cx.emit(Insn::Mark(end));
        }
    }
}

fn emit_floating_truth(cx: &mut CodegenContext<'_>, kind: PrimitiveKind) {
    let end = cx.new_label();
    let falsy = cx.new_label();
    let falsy_with_copy = cx.new_label();
    let double = kind == PrimitiveKind::Double;

    // Keep a copy for the NaN test
    cx.emit(if double { Insn::Dup2 } else { Insn::Dup });
    if double {
        cx.emit(Insn::DConst0);
        cx.emit(Insn::DCmpL);
    } else {
        cx.emit(Insn::FConst0);
        cx.emit(Insn::FCmpL);
    }
    cx.emit(Insn::Jump(JumpCondition::IfEq, falsy_with_copy));
    let wrapper = TypeDescriptor::Wrapper(kind).internal_name();
    cx.emit(Insn::Invoke(MethodRef::new(
        InvokeKind::Static,
        &wrapper,
        "isNaN",
        vec![TypeDescriptor::primitive(kind)],
        Some(TypeDescriptor::boolean()),
    )));
    cx.emit(Insn::Jump(JumpCondition::IfNe, falsy));
    cx.emit(Insn::IConst(1));
    cx.emit(Insn::Goto(end));
    cx.emit(Insn::Mark(falsy_with_copy));
    cx.emit(if double { Insn::Pop2 } else { Insn::Pop });
    cx.emit(Insn::Mark(falsy));
    cx.emit(Insn::IConst(0));
    cx.emit(Insn::Mark(end));
}
