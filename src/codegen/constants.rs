//! Loading of literal values.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::context::CodegenContext;
use super::error::{ErrorKind, Result};
use super::operand_stack::OperandStack;
use super::types::{BIG_DECIMAL, BIG_INTEGER, PrimitiveKind, TypeDescriptor};
use crate::vm::{FieldRef, Insn, InvokeKind, LdcConstant, MethodRef};

/// A literal as resolved by the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConstantValue {
    Null,
    Boolean(bool),
    Byte(i8),
    /// UTF-16 code unit
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Arbitrary-precision integer in decimal text form
    BigInteger(String),
    BigDecimal(String),
    /// Any other object literal; it has no load strategy.
    Object { class_name: String, text: String },
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Null => f.write_str("null"),
            ConstantValue::Boolean(v) => write!(f, "{}", v),
            ConstantValue::Byte(v) => write!(f, "{}", v),
            ConstantValue::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "{:?}", c),
                None => write!(f, "\\u{:04x}", v),
            },
            ConstantValue::Short(v) => write!(f, "{}", v),
            ConstantValue::Int(v) => write!(f, "{}", v),
            ConstantValue::Long(v) => write!(f, "{}L", v),
            ConstantValue::Float(v) => write!(f, "{:?}F", v),
            ConstantValue::Double(v) => write!(f, "{:?}D", v),
            ConstantValue::String(s) => write!(f, "{:?}", s),
            ConstantValue::BigInteger(s) => write!(f, "{}G", s),
            ConstantValue::BigDecimal(s) => write!(f, "{}G", s),
            ConstantValue::Object { class_name, text } => write!(f, "{}({})", class_name, text),
        }
    }
}

impl OperandStack {
    /// Load `value` declared as `declared` and push its type.
    ///
    /// A wrapper-typed primitive literal is loaded as the primitive and
    /// boxed afterwards, except for booleans, which reuse the shared
    /// `Boolean.TRUE`/`Boolean.FALSE` instances.
    pub fn push_constant(&mut self, cx: &mut CodegenContext<'_>, value: &ConstantValue, declared: &TypeDescriptor) -> Result<()> {
        let mut ty = declared.unwrapper();
        let mut boxing = ty != *declared;

        match (value, ty.as_primitive()) {
            (ConstantValue::Null, _) => {
                cx.emit(Insn::AConstNull);
                ty = TypeDescriptor::object();
            }
            (ConstantValue::Boolean(v), _) if boxing => {
                let wrapper = TypeDescriptor::Wrapper(PrimitiveKind::Boolean);
                cx.emit(Insn::GetStatic(FieldRef::new(
                    &wrapper.internal_name(),
                    if *v { "TRUE" } else { "FALSE" },
                    wrapper.clone(),
                )));
                boxing = false;
                ty = declared.clone();
            }
            (_, Some(kind)) => push_primitive(cx, value, kind, declared)?,
            (ConstantValue::BigInteger(text), None) => new_instance(cx, &TypeDescriptor::class(BIG_INTEGER), text),
            (ConstantValue::BigDecimal(text), None) => new_instance(cx, &TypeDescriptor::class(BIG_DECIMAL), text),
            (ConstantValue::String(s), None) => cx.emit(Insn::Ldc(LdcConstant::String(Arc::from(s.as_str())))),
            (_, None) => {
                return Err(cx.error(ErrorKind::UnsupportedConstant {
                    value: value.to_string(),
                    ty: declared.clone(),
                }));
            }
        }

        self.push(ty);
        if boxing {
            self.box_top(cx)?;
        }
        Ok(())
    }
}

fn push_primitive(cx: &mut CodegenContext<'_>, value: &ConstantValue, kind: PrimitiveKind, declared: &TypeDescriptor) -> Result<()> {
    let insn = match (kind, value) {
        (PrimitiveKind::Int, ConstantValue::Int(v)) => int_constant(*v),
        (PrimitiveKind::Short, ConstantValue::Short(v)) => int_constant(i32::from(*v)),
        (PrimitiveKind::Byte, ConstantValue::Byte(v)) => int_constant(i32::from(*v)),
        (PrimitiveKind::Char, ConstantValue::Char(v)) => int_constant(i32::from(*v)),
        (PrimitiveKind::Boolean, ConstantValue::Boolean(v)) => Insn::IConst(if *v { 1 } else { 0 }),
        (PrimitiveKind::Long, ConstantValue::Long(v)) => match *v {
            0 => Insn::LConst0,
            1 => Insn::LConst1,
            v => Insn::Ldc(LdcConstant::Long(v)),
        },
        // Zero is matched on the bit pattern: -0.0 must keep its sign.
        (PrimitiveKind::Float, ConstantValue::Float(v)) => {
            if v.to_bits() == 0f32.to_bits() {
                Insn::FConst0
            } else if *v == 1.0 {
                Insn::FConst1
            } else if *v == 2.0 {
                Insn::FConst2
            } else {
                Insn::Ldc(LdcConstant::Float(*v))
            }
        }
        (PrimitiveKind::Double, ConstantValue::Double(v)) => {
            if v.to_bits() == 0f64.to_bits() {
                Insn::DConst0
            } else if *v == 1.0 {
                Insn::DConst1
            } else {
                Insn::Ldc(LdcConstant::Double(*v))
            }
        }
        _ => {
            return Err(cx.error(ErrorKind::ConstantTypeMismatch {
                value: value.to_string(),
                ty: declared.clone(),
            }));
        }
    };
    cx.emit(insn);
    Ok(())
}

/// Shortest load for an int-sized constant.
pub fn int_constant(value: i32) -> Insn {
    match value {
        0..=5 => Insn::IConst(value as i8),
        v if i8::try_from(v).is_ok() => Insn::BiPush(v as i8),
        v if i16::try_from(v).is_ok() => Insn::SiPush(v as i16),
        v => Insn::Ldc(LdcConstant::Int(v)),
    }
}

/// `new T(text)` through the single-string constructor.
fn new_instance(cx: &mut CodegenContext<'_>, ty: &TypeDescriptor, text: &str) {
    cx.emit(Insn::New(ty.clone()));
    cx.emit(Insn::Dup);
    cx.emit(Insn::Ldc(LdcConstant::String(Arc::from(text))));
    cx.emit(Insn::Invoke(MethodRef::new(
        InvokeKind::Special,
        &ty.internal_name(),
        "<init>",
        vec![TypeDescriptor::string()],
        None,
    )));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::test_support::Harness;

    fn ty(s: &str) -> TypeDescriptor {
        s.parse().unwrap()
    }

    fn load(value: ConstantValue, declared: &str) -> (Vec<Insn>, Vec<TypeDescriptor>) {
        let mut h = Harness::new();
        let declared = ty(declared);
        let code = h.run(|stack, cx| stack.push_constant(cx, &value, &declared)).unwrap();
        (code, h.stack.entries().to_vec())
    }

    #[test]
    fn test_int_ladder() {
        assert_eq!(int_constant(0), Insn::IConst(0));
        assert_eq!(int_constant(-1), Insn::BiPush(-1));
        assert_eq!(int_constant(5), Insn::IConst(5));
        assert_eq!(int_constant(6), Insn::BiPush(6));
        assert_eq!(int_constant(-128), Insn::BiPush(-128));
        assert_eq!(int_constant(128), Insn::SiPush(128));
        assert_eq!(int_constant(-32768), Insn::SiPush(-32768));
        assert_eq!(int_constant(32768), Insn::Ldc(LdcConstant::Int(32768)));
    }

    #[test]
    fn test_null() {
        let (code, stack) = load(ConstantValue::Null, "java.lang.Integer");
        assert_eq!(code, vec![Insn::AConstNull]);
        assert_eq!(stack, vec![ty("Object")]);
    }

    #[test]
    fn test_boxed_boolean_uses_shared_instance() {
        let (code, stack) = load(ConstantValue::Boolean(true), "java.lang.Boolean");
        assert_eq!(code.len(), 1);
        assert_eq!(code[0].to_string(), "GETSTATIC java/lang/Boolean.TRUE : Ljava/lang/Boolean;");
        assert_eq!(stack, vec![ty("java.lang.Boolean")]);
    }

    #[test]
    fn test_boxed_int_is_boxed_after_load() {
        let (code, stack) = load(ConstantValue::Int(300), "java.lang.Integer");
        assert_eq!(code, vec![Insn::SiPush(300), Insn::Box(PrimitiveKind::Int)]);
        assert_eq!(stack, vec![ty("java.lang.Integer")]);
    }

    #[test]
    fn test_signed_zero_is_distinct() {
        let (pos, _) = load(ConstantValue::Float(0.0), "float");
        let (neg, _) = load(ConstantValue::Float(-0.0), "float");
        assert_eq!(pos, vec![Insn::FConst0]);
        assert_eq!(neg, vec![Insn::Ldc(LdcConstant::Float(-0.0))]);
        assert_ne!(pos[0].to_string(), neg[0].to_string());

        let (pos, _) = load(ConstantValue::Double(0.0), "double");
        let (neg, stack) = load(ConstantValue::Double(-0.0), "double");
        assert_eq!(pos, vec![Insn::DConst0]);
        assert_eq!(neg[0].to_string(), "LDC -0.0D");
        assert_eq!(stack, vec![ty("double")]);
    }

    #[test]
    fn test_long_and_float_specials() {
        assert_eq!(load(ConstantValue::Long(1), "long").0, vec![Insn::LConst1]);
        assert_eq!(load(ConstantValue::Long(2), "long").0, vec![Insn::Ldc(LdcConstant::Long(2))]);
        assert_eq!(load(ConstantValue::Float(2.0), "float").0, vec![Insn::FConst2]);
        assert_eq!(load(ConstantValue::Double(2.0), "double").0, vec![Insn::Ldc(LdcConstant::Double(2.0))]);
        assert_eq!(load(ConstantValue::Char(65), "char").0, vec![Insn::BiPush(65)]);
    }

    #[test]
    fn test_big_decimal_construction() {
        let (code, stack) = load(ConstantValue::BigDecimal("1.50".into()), "java.math.BigDecimal");
        let listing: Vec<String> = code.iter().map(|i| i.to_string()).collect();
        assert_eq!(
            listing,
            vec![
                "NEW java/math/BigDecimal",
                "DUP",
                "LDC \"1.50\"",
                "INVOKESPECIAL java/math/BigDecimal.<init>(Ljava/lang/String;)V",
            ]
        );
        assert_eq!(stack, vec![ty("java.math.BigDecimal")]);
    }

    #[test]
    fn test_unsupported_and_mismatched() {
        let mut h = Harness::new();
        let value = ConstantValue::Object {
            class_name: "java.util.regex.Pattern".into(),
            text: "a+".into(),
        };
        let declared = ty("java.util.regex.Pattern");
        let err = h.run(|stack, cx| stack.push_constant(cx, &value, &declared)).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedConstant { .. }));

        let err = h
            .run(|stack, cx| stack.push_constant(cx, &ConstantValue::Long(3), &TypeDescriptor::int()))
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ConstantTypeMismatch { .. }));
        assert!(h.stack.is_empty());
    }

    #[test]
    fn test_serde_shape() {
        let v: ConstantValue = serde_json::from_str(r#"{"kind":"float","value":-0.0}"#).unwrap();
        assert_eq!(v.to_string(), "-0.0F");
        let v: ConstantValue = serde_json::from_str(r#"{"kind":"null"}"#).unwrap();
        assert_eq!(v, ConstantValue::Null);
    }
}
