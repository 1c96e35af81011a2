//! Local variable access.
//!
//! Plain locals are loaded and stored directly. Locals shared with a
//! closure ("holders") live in an indirection cell stored in the slot, so
//! every access goes through the cell.

use serde::{Deserialize, Serialize};

use super::context::CodegenContext;
use super::error::Result;
use super::invocation::emit_dynamic_cast;
use super::operand_stack::OperandStack;
use super::types::TypeDescriptor;
use crate::vm::{Insn, SlotKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BytecodeVariable {
    pub name: String,
    /// Local slot index
    pub index: u16,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    /// Captured by a closure and stored in an indirection cell
    #[serde(default)]
    pub holder: bool,
}

impl BytecodeVariable {
    pub fn new(name: &str, index: u16, ty: TypeDescriptor) -> Self {
        Self {
            name: name.to_string(),
            index,
            ty,
            holder: false,
        }
    }

    pub fn holder(name: &str, index: u16, ty: TypeDescriptor) -> Self {
        Self {
            holder: true,
            ..Self::new(name, index, ty)
        }
    }
}

impl OperandStack {
    /// Store when on the left-hand side of an assignment, load otherwise.
    pub fn load_or_store_variable(
        &mut self,
        cx: &mut CodegenContext<'_>,
        var: &BytecodeVariable,
        use_reference_directly: bool,
        lhs: bool,
    ) -> Result<()> {
        if lhs {
            self.store_variable(cx, var)
        } else {
            self.load_variable(cx, var, use_reference_directly);
            Ok(())
        }
    }

    /// Push the value of `var`. With `use_reference_directly` a holder's
    /// cell itself is pushed instead of its content.
    pub fn load_variable(&mut self, cx: &mut CodegenContext<'_>, var: &BytecodeVariable, use_reference_directly: bool) {
        if !var.holder {
            self.load(cx, var.ty.clone(), var.index);
            return;
        }
        cx.emit(Insn::Load(SlotKind::Reference, var.index));
        if use_reference_directly {
            self.push(cx.runtime().reference_type());
        } else {
            cx.emit(Insn::Invoke(cx.runtime().cell_get()));
            emit_dynamic_cast(cx, &var.ty);
            self.push(var.ty.clone());
        }
    }

    /// Cast the top value to the type of `var` and store it, consuming it.
    pub fn store_variable(&mut self, cx: &mut CodegenContext<'_>, var: &BytecodeVariable) -> Result<()> {
        self.cast_to_variable(cx, var)?;
        if var.holder {
            self.box_top(cx)?;
            cx.emit(Insn::Load(SlotKind::Reference, var.index));
            cx.emit(Insn::CheckCast(cx.runtime().reference_type()));
            cx.emit(Insn::Swap);
            cx.emit(Insn::Invoke(cx.runtime().cell_set()));
        } else {
            cx.emit(Insn::Store(SlotKind::of(&var.ty), var.index));
        }
        self.remove(cx, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::types::PrimitiveKind;
    use crate::codegen::test_support::Harness;
    use crate::config::RuntimeNames;
    use crate::vm::{NumericOp, Verifier};

    fn ty(s: &str) -> TypeDescriptor {
        s.parse().unwrap()
    }

    #[test]
    fn test_plain_store_casts_first() {
        let mut h = Harness::new();
        h.stack.push(ty("int"));
        let var = BytecodeVariable::new("x", 2, ty("long"));
        let code = h.run(|stack, cx| stack.store_variable(cx, &var)).unwrap();
        assert_eq!(
            code,
            vec![Insn::Convert(NumericOp::I2L), Insn::Store(SlotKind::Long, 2)]
        );
        assert!(h.stack.is_empty());
        assert_eq!(Verifier::new().verify(&code, 1), Ok(0));
    }

    #[test]
    fn test_holder_store() {
        let mut h = Harness::new();
        h.stack.push(ty("double"));
        let var = BytecodeVariable::holder("total", 1, ty("double"));
        let code = h.run(|stack, cx| stack.store_variable(cx, &var)).unwrap();
        assert_eq!(
            code,
            vec![
                Insn::Box(PrimitiveKind::Double),
                Insn::Load(SlotKind::Reference, 1),
                Insn::CheckCast(ty("groovy.lang.Reference")),
                Insn::Swap,
                Insn::Invoke(RuntimeNames::default().cell_set()),
            ]
        );
        assert!(h.stack.is_empty());
        assert_eq!(Verifier::new().verify(&code, 2), Ok(0));
    }

    #[test]
    fn test_holder_load() {
        let mut h = Harness::new();
        let var = BytecodeVariable::holder("n", 0, ty("int"));
        let code = h.run(|stack, cx| stack.load_or_store_variable(cx, &var, false, false)).unwrap();
        assert_eq!(
            code,
            vec![
                Insn::Load(SlotKind::Reference, 0),
                Insn::Invoke(RuntimeNames::default().cell_get()),
                Insn::Invoke(RuntimeNames::default().unbox(PrimitiveKind::Int)),
            ]
        );
        assert_eq!(h.stack.entries(), &[ty("int")]);
    }

    #[test]
    fn test_holder_reference_directly() {
        let mut h = Harness::new();
        let var = BytecodeVariable::holder("n", 0, ty("int"));
        let code = h.run(|stack, cx| stack.load_or_store_variable(cx, &var, true, false)).unwrap();
        assert_eq!(code, vec![Insn::Load(SlotKind::Reference, 0)]);
        assert_eq!(h.stack.entries(), &[ty("groovy.lang.Reference")]);
    }

    #[test]
    fn test_holder_uses_configured_cell_class() {
        let mut h = Harness::new();
        h.config.runtime.reference_class = "rt/Cell".to_string();
        h.stack.push(ty("Object"));
        let var = BytecodeVariable::holder("v", 3, ty("Object"));
        let code = h
            .run(|stack, cx| {
                stack.store_variable(cx, &var)?;
                stack.load_variable(cx, &var, false);
                Ok(())
            })
            .unwrap();
        let listing: Vec<String> = code.iter().map(|insn| insn.to_string()).collect();
        assert_eq!(
            listing,
            vec![
                "ALOAD 3",
                "CHECKCAST rt/Cell",
                "SWAP",
                "INVOKEVIRTUAL rt/Cell.set(Ljava/lang/Object;)V",
                "ALOAD 3",
                "INVOKEVIRTUAL rt/Cell.get()Ljava/lang/Object;",
            ]
        );
        assert_eq!(Verifier::new().verify(&code, 1), Ok(1));
    }

    #[test]
    fn test_plain_load() {
        let mut h = Harness::new();
        let var = BytecodeVariable::new("s", 4, ty("String"));
        let code = h.run(|stack, cx| stack.load_or_store_variable(cx, &var, true, false)).unwrap();
        assert_eq!(code, vec![Insn::Load(SlotKind::Reference, 4)]);
        assert_eq!(h.stack.entries(), &[ty("String")]);
    }

    #[test]
    fn test_store_on_empty_stack_fails() {
        let mut h = Harness::new();
        let var = BytecodeVariable::new("x", 0, ty("int"));
        assert!(h.run(|stack, cx| stack.load_or_store_variable(cx, &var, false, true)).is_err());
    }

    #[test]
    fn test_serde_shape() {
        let var: BytecodeVariable =
            serde_json::from_str(r#"{"name":"x","index":3,"type":"long[]"}"#).unwrap();
        assert_eq!(var, BytecodeVariable::new("x", 3, ty("long[]")));
    }
}
