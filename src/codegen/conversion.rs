//! Conversion of the top operand to a requested type.
//!
//! `cast` is the implicit, assignment-style conversion; `coerce` is the
//! explicit `as` conversion that may call into the runtime. Both share one
//! algorithm and end with the top entry retyped to the target.

use log::{debug, warn};

use super::context::CodegenContext;
use super::error::{ErrorKind, Result};
use super::invocation::emit_dynamic_cast;
use super::operand_stack::OperandStack;
use super::types::{PrimitiveKind, TypeDescriptor};
use super::variables::BytecodeVariable;
use crate::vm::{Insn, NumericOp};

/// Instructions converting a `from` value to `to` on the stack.
///
/// `int` is the hub: byte, char and short already live as `int`, so they
/// convert exactly like `int` does. Narrowing from a wide kind into a small
/// one goes through `int` first. `None` means no numeric path exists, which
/// is the case for anything involving `boolean`.
pub fn numeric_conversion(from: PrimitiveKind, to: PrimitiveKind) -> Option<&'static [NumericOp]> {
    use NumericOp::*;
    use PrimitiveKind::*;

    let ops: &'static [NumericOp] = match (from, to) {
        _ if from == to => &[],
        (Boolean, _) | (_, Boolean) => return None,

        (Byte | Char | Short | Int, Int) => &[],
        (Byte | Char | Short | Int, Byte) => &[I2B],
        (Byte | Char | Short | Int, Char) => &[I2C],
        (Byte | Char | Short | Int, Short) => &[I2S],
        (Byte | Char | Short | Int, Long) => &[I2L],
        (Byte | Char | Short | Int, Float) => &[I2F],
        (Byte | Char | Short | Int, Double) => &[I2D],

        (Long, Int) => &[L2I],
        (Long, Byte) => &[L2I, I2B],
        (Long, Char) => &[L2I, I2C],
        (Long, Short) => &[L2I, I2S],
        (Long, Float) => &[L2F],
        (Long, Double) => &[L2D],

        (Float, Int) => &[F2I],
        (Float, Byte) => &[F2I, I2B],
        (Float, Char) => &[F2I, I2C],
        (Float, Short) => &[F2I, I2S],
        (Float, Long) => &[F2L],
        (Float, Double) => &[F2D],

        (Double, Int) => &[D2I],
        (Double, Byte) => &[D2I, I2B],
        (Double, Char) => &[D2I, I2C],
        (Double, Short) => &[D2I, I2S],
        (Double, Long) => &[D2L],
        (Double, Float) => &[D2F],

        (Long, Long) | (Float, Float) | (Double, Double) => &[],
    };
    Some(ops)
}

/// Widening that may round: `float` keeps a 24-bit significand.
fn is_lossy_widening(from: PrimitiveKind, to: PrimitiveKind) -> bool {
    to == PrimitiveKind::Float && (from.is_int_like() || from == PrimitiveKind::Long)
}

impl OperandStack {
    /// Implicit conversion of the top entry to `target`.
    pub fn cast(&mut self, cx: &mut CodegenContext<'_>, target: &TypeDescriptor) -> Result<()> {
        self.convert_and_cast(cx, target, false)
    }

    /// Explicit (`as`) conversion of the top entry to `target`.
    pub fn coerce(&mut self, cx: &mut CodegenContext<'_>, target: &TypeDescriptor) -> Result<()> {
        self.convert_and_cast(cx, target, true)
    }

    /// Implicit conversion to the declared type of `var`.
    pub fn cast_to_variable(&mut self, cx: &mut CodegenContext<'_>, var: &BytecodeVariable) -> Result<()> {
        self.convert_and_cast(cx, &var.ty, false)
    }

    fn convert_and_cast(&mut self, cx: &mut CodegenContext<'_>, target: &TypeDescriptor, coerce: bool) -> Result<()> {
        if self.is_empty() {
            return Err(cx.error(ErrorKind::CastOnEmptyStack {
                target: target.clone(),
                coerce,
            }));
        }
        let target = cx.types.canonical(target);
        let top = self.top_operand(cx)?;
        if top == target || cx.types.is_compatible(&top, &target) {
            return self.replace(cx, target);
        }

        if coerce {
            let policy = cx.policy;
            policy.coerce(self, cx, &top, &target)?;
            return self.replace(cx, target);
        }

        match (top.as_primitive(), target.as_primitive()) {
            (Some(from), Some(to)) => {
                if let Some(ops) = numeric_conversion(from, to) {
                    debug!("numeric conversion {} -> {}: {:?}", from, to, ops);
                    if is_lossy_widening(from, to) {
                        warn!("{} -> {} may lose precision beyond 24 bits", from, to);
                    }
                    for op in ops {
                        cx.emit(Insn::Convert(*op));
                    }
                    return self.replace(cx, target);
                }
                debug!("no numeric conversion {} -> {}, boxing", from, to);
                self.box_top(cx)?;
            }
            // Unboxing happens below
            (None, Some(_)) => {}
            (_, None) => {
                let policy = cx.policy;
                policy.cast_to_non_primitive_if_necessary(self, cx, &top, &target)?;
            }
        }

        match target.as_primitive() {
            Some(kind)
                if kind != PrimitiveKind::Boolean
                    && !top.is_primitive()
                    && top == TypeDescriptor::Wrapper(kind) =>
            {
                cx.emit(Insn::Unbox(kind));
            }
            _ => {
                let current = self.top_operand(cx)?;
                if !cx.types.is_subtype(&current, &target) {
                    emit_dynamic_cast(cx, &target);
                }
            }
        }
        self.replace(cx, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::test_support::Harness;
    use crate::config::RuntimeNames;

    fn ty(s: &str) -> TypeDescriptor {
        s.parse().unwrap()
    }

    fn cast(from: &str, to: &str) -> (Vec<Insn>, Vec<TypeDescriptor>) {
        let mut h = Harness::new();
        h.stack.push(ty(from));
        let target = ty(to);
        let code = h.run(|stack, cx| stack.cast(cx, &target)).unwrap();
        (code, h.stack.entries().to_vec())
    }

    #[test]
    fn test_matrix_hub() {
        use NumericOp::*;
        use PrimitiveKind::*;
        assert_eq!(numeric_conversion(Byte, Int), Some(&[][..]));
        assert_eq!(numeric_conversion(Char, Long), Some(&[I2L][..]));
        assert_eq!(numeric_conversion(Short, Byte), Some(&[I2B][..]));
        assert_eq!(numeric_conversion(Double, Char), Some(&[D2I, I2C][..]));
        assert_eq!(numeric_conversion(Long, Float), Some(&[L2F][..]));
        assert_eq!(numeric_conversion(Long, Double), Some(&[L2D][..]));
        assert_eq!(numeric_conversion(Int, Boolean), None);
        assert_eq!(numeric_conversion(Boolean, Int), None);
        assert_eq!(numeric_conversion(Boolean, Boolean), Some(&[][..]));
    }

    #[test]
    fn test_matrix_ops_chain() {
        for from in PrimitiveKind::NUMERIC {
            for to in PrimitiveKind::NUMERIC {
                let ops = numeric_conversion(from, to).unwrap();
                let mut current = if from.is_int_like() { PrimitiveKind::Int } else { from };
                for op in ops {
                    let (input, output) = op.signature();
                    assert_eq!(input, current, "{} -> {}", from, to);
                    current = if output.is_int_like() { PrimitiveKind::Int } else { output };
                }
                let expected = if to.is_int_like() { PrimitiveKind::Int } else { to };
                assert_eq!(current, expected, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_int_to_double_widens_without_boxing() {
        let (code, stack) = cast("int", "double");
        assert_eq!(code, vec![Insn::Convert(NumericOp::I2D)]);
        assert_eq!(stack, vec![ty("double")]);
    }

    #[test]
    fn test_identity_and_compatible_emit_nothing() {
        let (code, stack) = cast("long", "long");
        assert!(code.is_empty());
        assert_eq!(stack, vec![ty("long")]);

        let (code, stack) = cast("java.util.ArrayList", "java.util.List");
        assert!(code.is_empty());
        assert_eq!(stack, vec![ty("java.util.List")]);
    }

    #[test]
    fn test_int_to_boolean_goes_through_runtime() {
        let (code, stack) = cast("int", "boolean");
        assert_eq!(
            code,
            vec![
                Insn::Box(PrimitiveKind::Int),
                Insn::Invoke(RuntimeNames::default().unbox(PrimitiveKind::Boolean)),
            ]
        );
        assert_eq!(stack, vec![ty("boolean")]);
    }

    #[test]
    fn test_wrapper_unboxes_directly() {
        let (code, _) = cast("java.lang.Long", "long");
        assert_eq!(code, vec![Insn::Unbox(PrimitiveKind::Long)]);
    }

    #[test]
    fn test_object_to_primitive_uses_dynamic_unbox() {
        let (code, stack) = cast("Object", "int");
        assert_eq!(code, vec![Insn::Invoke(RuntimeNames::default().unbox(PrimitiveKind::Int))]);
        assert_eq!(stack, vec![ty("int")]);

        let (code, _) = cast("java.lang.Boolean", "boolean");
        assert_eq!(
            code,
            vec![Insn::Invoke(RuntimeNames::default().unbox(PrimitiveKind::Boolean))]
        );
    }

    #[test]
    fn test_reference_downcast() {
        let (code, stack) = cast("Object", "java.util.List");
        let list = ty("java.util.List");
        let names = RuntimeNames::default();
        assert_eq!(
            code,
            vec![
                Insn::LoadClass(list.clone()),
                Insn::Invoke(names.cast_to_type()),
                Insn::CheckCast(list.clone()),
            ]
        );
        assert_eq!(stack, vec![list]);
    }

    #[test]
    fn test_primitive_to_object_only_boxes() {
        let (code, stack) = cast("double", "Object");
        assert_eq!(code, vec![Insn::Box(PrimitiveKind::Double)]);
        assert_eq!(stack, vec![ty("Object")]);
    }

    #[test]
    fn test_alias_resolves_before_cast() {
        let mut h = Harness::new();
        h.types.define_alias("T", ty("long"));
        h.stack.push(ty("int"));
        let code = h.run(|stack, cx| stack.cast(cx, &ty("T"))).unwrap();
        assert_eq!(code, vec![Insn::Convert(NumericOp::I2L)]);
        assert_eq!(h.stack.entries(), &[ty("long")]);
    }

    #[test]
    fn test_cast_on_empty_stack() {
        let mut h = Harness::new();
        let err = h.run(|stack, cx| stack.coerce(cx, &ty("int"))).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::CastOnEmptyStack {
                target: ty("int"),
                coerce: true
            }
        );
    }

    #[test]
    fn test_coerce_calls_as_type() {
        let mut h = Harness::new();
        h.stack.push(ty("java.lang.String"));
        let set = ty("java.util.Set");
        let code = h.run(|stack, cx| stack.coerce(cx, &set)).unwrap();
        assert_eq!(
            code,
            vec![
                Insn::LoadClass(set.clone()),
                Insn::Invoke(RuntimeNames::default().as_type()),
                Insn::CheckCast(set.clone()),
            ]
        );
        assert_eq!(h.stack.entries(), &[set]);
    }

    #[test]
    fn test_coerce_primitive_boxes_first() {
        let mut h = Harness::new();
        h.stack.push(ty("int"));
        let code = h.run(|stack, cx| stack.coerce(cx, &ty("long"))).unwrap();
        assert_eq!(
            code,
            vec![
                Insn::Box(PrimitiveKind::Int),
                Insn::LoadClass(ty("long")),
                Insn::Invoke(RuntimeNames::default().as_type()),
                Insn::Invoke(RuntimeNames::default().unbox(PrimitiveKind::Long)),
            ]
        );
        assert_eq!(h.stack.entries(), &[ty("long")]);
        assert_eq!(code[1].to_string(), "GETSTATIC java/lang/Long.TYPE : Ljava/lang/Class;");
    }
}
