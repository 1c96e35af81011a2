use std::fmt;
use std::sync::Arc;

use crate::codegen::types::{PrimitiveKind, SlotWidth, TypeDescriptor};

/// Abstract instructions handed to the bytecode writer.
///
/// The vocabulary is the contract with the writing backend: every variant
/// carries its immediates as typed fields, and stack effects are expressed
/// in physical slots (see [`Insn::stack_effect`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Insn {
    // ========================================
    // Constants
    // ========================================
    AConstNull,
    /// `ICONST_M1` .. `ICONST_5`
    IConst(i8),
    BiPush(i8),
    SiPush(i16),
    LConst0,
    LConst1,
    FConst0,
    FConst1,
    FConst2,
    DConst0,
    DConst1,
    Ldc(LdcConstant),

    // ========================================
    // Stack Manipulation
    // ========================================
    Pop,
    Pop2,
    Dup,
    Dup2,
    DupX2,
    Dup2X1,
    Dup2X2,
    Swap,

    // ========================================
    // Locals
    // ========================================
    Load(SlotKind, u16),
    Store(SlotKind, u16),

    // ========================================
    // Conversion
    // ========================================
    Convert(NumericOp),
    LCmp,
    FCmpL,
    DCmpL,
    /// `Wrapper.valueOf(prim)`
    Box(PrimitiveKind),
    /// `wrapper.primValue()` on a value statically known to be the wrapper.
    Unbox(PrimitiveKind),
    CheckCast(TypeDescriptor),

    // ========================================
    // Objects and calls
    // ========================================
    New(TypeDescriptor),
    GetStatic(FieldRef),
    Invoke(MethodRef),
    /// Class literal; primitives load their wrapper's `TYPE` field.
    LoadClass(TypeDescriptor),

    // ========================================
    // Control Flow
    // ========================================
    Jump(JumpCondition, Label),
    Goto(Label),
    Mark(Label),
}

/// Width/kind-specific local load/store family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl SlotKind {
    pub fn of(ty: &TypeDescriptor) -> SlotKind {
        match ty.as_primitive() {
            Some(PrimitiveKind::Long) => SlotKind::Long,
            Some(PrimitiveKind::Float) => SlotKind::Float,
            Some(PrimitiveKind::Double) => SlotKind::Double,
            Some(_) => SlotKind::Int,
            None => SlotKind::Reference,
        }
    }

    pub fn width(self) -> SlotWidth {
        match self {
            SlotKind::Long | SlotKind::Double => SlotWidth::Two,
            _ => SlotWidth::One,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            SlotKind::Int => "I",
            SlotKind::Long => "L",
            SlotKind::Float => "F",
            SlotKind::Double => "D",
            SlotKind::Reference => "A",
        }
    }
}

/// One primitive conversion instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericOp {
    I2L,
    I2F,
    I2D,
    I2B,
    I2C,
    I2S,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
}

impl NumericOp {
    /// Stack kinds consumed and produced.
    pub fn signature(self) -> (PrimitiveKind, PrimitiveKind) {
        use PrimitiveKind::*;
        match self {
            NumericOp::I2L => (Int, Long),
            NumericOp::I2F => (Int, Float),
            NumericOp::I2D => (Int, Double),
            NumericOp::I2B => (Int, Byte),
            NumericOp::I2C => (Int, Char),
            NumericOp::I2S => (Int, Short),
            NumericOp::L2I => (Long, Int),
            NumericOp::L2F => (Long, Float),
            NumericOp::L2D => (Long, Double),
            NumericOp::F2I => (Float, Int),
            NumericOp::F2L => (Float, Long),
            NumericOp::F2D => (Float, Double),
            NumericOp::D2I => (Double, Int),
            NumericOp::D2L => (Double, Long),
            NumericOp::D2F => (Double, Float),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NumericOp::I2L => "I2L",
            NumericOp::I2F => "I2F",
            NumericOp::I2D => "I2D",
            NumericOp::I2B => "I2B",
            NumericOp::I2C => "I2C",
            NumericOp::I2S => "I2S",
            NumericOp::L2I => "L2I",
            NumericOp::L2F => "L2F",
            NumericOp::L2D => "L2D",
            NumericOp::F2I => "F2I",
            NumericOp::F2L => "F2L",
            NumericOp::F2D => "F2D",
            NumericOp::D2I => "D2I",
            NumericOp::D2L => "D2L",
            NumericOp::D2F => "D2F",
        }
    }
}

/// Condition of a conditional branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JumpCondition {
    /// Branch if the int on top is zero (`IFEQ`).
    IfEq,
    /// Branch if the int on top is non-zero (`IFNE`).
    IfNe,
    IfNull,
    IfNonNull,
}

impl JumpCondition {
    fn name(self) -> &'static str {
        match self {
            JumpCondition::IfEq => "IFEQ",
            JumpCondition::IfNe => "IFNE",
            JumpCondition::IfNull => "IFNULL",
            JumpCondition::IfNonNull => "IFNONNULL",
        }
    }
}

/// Branch target allocated by an [`InstructionSink`](super::InstructionSink).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Constant-pool entry loaded by `LDC`.
#[derive(Debug, Clone, PartialEq)]
pub enum LdcConstant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(Arc<str>),
}

impl LdcConstant {
    fn width(&self) -> SlotWidth {
        match self {
            LdcConstant::Long(_) | LdcConstant::Double(_) => SlotWidth::Two,
            _ => SlotWidth::One,
        }
    }
}

impl fmt::Display for LdcConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LdcConstant::Int(v) => write!(f, "{}", v),
            LdcConstant::Long(v) => write!(f, "{}L", v),
            LdcConstant::Float(v) => write!(f, "{:?}F", v),
            LdcConstant::Double(v) => write!(f, "{:?}D", v),
            LdcConstant::String(s) => write!(f, "{:?}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Static,
    Virtual,
    Special,
}

/// A resolved method reference. Parameter and return types are kept
/// typed so the verifier can compute the slot effect of a call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub kind: InvokeKind,
    /// Internal name of the declaring class.
    pub owner: Arc<str>,
    pub name: Arc<str>,
    pub params: Vec<TypeDescriptor>,
    /// `None` for `void`.
    pub ret: Option<TypeDescriptor>,
}

impl MethodRef {
    pub fn new(
        kind: InvokeKind,
        owner: &str,
        name: &str,
        params: Vec<TypeDescriptor>,
        ret: Option<TypeDescriptor>,
    ) -> Self {
        Self {
            kind,
            owner: Arc::from(owner),
            name: Arc::from(name),
            params,
            ret,
        }
    }

    pub fn descriptor(&self) -> String {
        let params: String = self.params.iter().map(|p| p.descriptor()).collect();
        let ret = self.ret.as_ref().map_or_else(|| "V".to_string(), |r| r.descriptor());
        format!("({}){}", params, ret)
    }

    /// Physical slots consumed, including the receiver.
    fn slots_consumed(&self) -> usize {
        let receiver = match self.kind {
            InvokeKind::Static => 0,
            InvokeKind::Virtual | InvokeKind::Special => 1,
        };
        receiver + self.params.iter().map(|p| p.width().slots()).sum::<usize>()
    }

    fn slots_produced(&self) -> usize {
        self.ret.as_ref().map_or(0, |r| r.width().slots())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: Arc<str>,
    pub name: Arc<str>,
    pub ty: TypeDescriptor,
}

impl FieldRef {
    pub fn new(owner: &str, name: &str, ty: TypeDescriptor) -> Self {
        Self {
            owner: Arc::from(owner),
            name: Arc::from(name),
            ty,
        }
    }
}

impl Insn {
    /// Returns the mnemonic of the instruction.
    pub fn name(&self) -> &'static str {
        match self {
            Insn::AConstNull => "ACONST_NULL",
            Insn::IConst(_) => "ICONST",
            Insn::BiPush(_) => "BIPUSH",
            Insn::SiPush(_) => "SIPUSH",
            Insn::LConst0 => "LCONST_0",
            Insn::LConst1 => "LCONST_1",
            Insn::FConst0 => "FCONST_0",
            Insn::FConst1 => "FCONST_1",
            Insn::FConst2 => "FCONST_2",
            Insn::DConst0 => "DCONST_0",
            Insn::DConst1 => "DCONST_1",
            Insn::Ldc(_) => "LDC",
            Insn::Pop => "POP",
            Insn::Pop2 => "POP2",
            Insn::Dup => "DUP",
            Insn::Dup2 => "DUP2",
            Insn::DupX2 => "DUP_X2",
            Insn::Dup2X1 => "DUP2_X1",
            Insn::Dup2X2 => "DUP2_X2",
            Insn::Swap => "SWAP",
            Insn::Load(..) => "LOAD",
            Insn::Store(..) => "STORE",
            Insn::Convert(op) => op.name(),
            Insn::LCmp => "LCMP",
            Insn::FCmpL => "FCMPL",
            Insn::DCmpL => "DCMPL",
            Insn::Box(_) => "BOX",
            Insn::Unbox(_) => "UNBOX",
            Insn::CheckCast(_) => "CHECKCAST",
            Insn::New(_) => "NEW",
            Insn::GetStatic(_) => "GETSTATIC",
            Insn::Invoke(m) => match m.kind {
                InvokeKind::Static => "INVOKESTATIC",
                InvokeKind::Virtual => "INVOKEVIRTUAL",
                InvokeKind::Special => "INVOKESPECIAL",
            },
            Insn::LoadClass(ty) if ty.is_primitive() => "GETSTATIC",
            Insn::LoadClass(_) => "LDC",
            Insn::Jump(cond, _) => cond.name(),
            Insn::Goto(_) => "GOTO",
            Insn::Mark(_) => "LABEL",
        }
    }

    /// Physical stack effect: (slots popped, slots pushed).
    ///
    /// The duplicate family is expressed as "pops the slots it reorders,
    /// pushes them back plus the copy", which keeps underflow checks exact.
    pub fn stack_effect(&self) -> (usize, usize) {
        match self {
            Insn::AConstNull
            | Insn::IConst(_)
            | Insn::BiPush(_)
            | Insn::SiPush(_)
            | Insn::FConst0
            | Insn::FConst1
            | Insn::FConst2
            | Insn::LoadClass(_)
            | Insn::New(_) => (0, 1),
            Insn::LConst0 | Insn::LConst1 | Insn::DConst0 | Insn::DConst1 => (0, 2),
            Insn::Ldc(c) => (0, c.width().slots()),

            Insn::Pop => (1, 0),
            Insn::Pop2 => (2, 0),
            Insn::Dup => (1, 2),
            Insn::Dup2 => (2, 4),
            Insn::DupX2 => (3, 4),
            Insn::Dup2X1 => (3, 5),
            Insn::Dup2X2 => (4, 6),
            Insn::Swap => (2, 2),

            Insn::Load(kind, _) => (0, kind.width().slots()),
            Insn::Store(kind, _) => (kind.width().slots(), 0),

            Insn::Convert(op) => {
                let (from, to) = op.signature();
                (from.width().slots(), to.width().slots())
            }
            Insn::LCmp | Insn::DCmpL => (4, 1),
            Insn::FCmpL => (2, 1),
            Insn::Box(kind) => (kind.width().slots(), 1),
            Insn::Unbox(kind) => (1, kind.width().slots()),
            Insn::CheckCast(_) => (1, 1),

            Insn::GetStatic(field) => (0, field.ty.width().slots()),
            Insn::Invoke(method) => (method.slots_consumed(), method.slots_produced()),

            Insn::Jump(..) => (1, 0),
            Insn::Goto(_) | Insn::Mark(_) => (0, 0),
        }
    }
}

impl fmt::Display for Insn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insn::IConst(-1) => f.write_str("ICONST_M1"),
            Insn::IConst(v) => write!(f, "ICONST_{}", v),
            Insn::BiPush(v) => write!(f, "BIPUSH {}", v),
            Insn::SiPush(v) => write!(f, "SIPUSH {}", v),
            Insn::Ldc(c) => write!(f, "LDC {}", c),
            Insn::Load(kind, idx) => write!(f, "{}LOAD {}", kind.prefix(), idx),
            Insn::Store(kind, idx) => write!(f, "{}STORE {}", kind.prefix(), idx),
            Insn::Box(kind) => write!(
                f,
                "INVOKESTATIC {}.valueOf({}){}",
                TypeDescriptor::Wrapper(*kind).internal_name(),
                kind.descriptor(),
                TypeDescriptor::Wrapper(*kind).descriptor()
            ),
            Insn::Unbox(kind) => write!(
                f,
                "INVOKEVIRTUAL {}.{}Value(){}",
                TypeDescriptor::Wrapper(*kind).internal_name(),
                kind.name(),
                kind.descriptor()
            ),
            Insn::CheckCast(ty) => write!(f, "CHECKCAST {}", ty.internal_name()),
            Insn::New(ty) => write!(f, "NEW {}", ty.internal_name()),
            Insn::GetStatic(field) => write!(
                f,
                "GETSTATIC {}.{} : {}",
                field.owner,
                field.name,
                field.ty.descriptor()
            ),
            Insn::Invoke(m) => write!(f, "{} {}.{}{}", self.name(), m.owner, m.name, m.descriptor()),
            Insn::LoadClass(ty) => match ty.as_primitive() {
                Some(kind) => write!(
                    f,
                    "GETSTATIC {}.TYPE : Ljava/lang/Class;",
                    TypeDescriptor::Wrapper(kind).internal_name()
                ),
                None => write!(f, "LDC {}.class", ty.internal_name()),
            },
            Insn::Jump(_, label) | Insn::Goto(label) => write!(f, "{} {}", self.name(), label),
            Insn::Mark(label) => write!(f, "{}:", label),
            _ => f.write_str(self.name()),
        }
    }
}
