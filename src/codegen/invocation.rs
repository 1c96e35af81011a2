//! Language-level conversions the stack simulator delegates.
//!
//! Pure stack mechanics stop at primitives, wrappers and checked casts.
//! Anything that needs the runtime library (object truthiness, dynamic
//! casts to arbitrary classes, user-visible `as` coercion) goes through an
//! [`InvocationPolicy`].

use log::debug;

use super::context::CodegenContext;
use super::error::Result;
use super::operand_stack::OperandStack;
use super::types::{PrimitiveKind, TypeDescriptor, CLASS};
use crate::config::RuntimeNames;
use crate::vm::{Insn, InvokeKind, MethodRef};

pub trait InvocationPolicy {
    /// Explicit coercion (`value as Target`) of the top entry from `from`
    /// to `target`. The caller retypes the entry afterwards.
    fn coerce(
        &self,
        stack: &mut OperandStack,
        cx: &mut CodegenContext<'_>,
        from: &TypeDescriptor,
        target: &TypeDescriptor,
    ) -> Result<()>;

    /// Box the top entry if it is primitive, then emit whatever runtime
    /// cast is needed to reach the reference type `target`.
    fn cast_to_non_primitive_if_necessary(
        &self,
        stack: &mut OperandStack,
        cx: &mut CodegenContext<'_>,
        from: &TypeDescriptor,
        target: &TypeDescriptor,
    ) -> Result<()>;

    /// Reduce a reference on top of the stack to a primitive boolean.
    fn cast_non_primitive_to_bool(
        &self,
        stack: &mut OperandStack,
        cx: &mut CodegenContext<'_>,
        top: &TypeDescriptor,
    ) -> Result<()>;
}

/// Policy for a dynamically typed language: casts and truthiness are
/// decided by runtime helpers.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicInvocationPolicy;

impl InvocationPolicy for DynamicInvocationPolicy {
    fn coerce(
        &self,
        stack: &mut OperandStack,
        cx: &mut CodegenContext<'_>,
        from: &TypeDescriptor,
        target: &TypeDescriptor,
    ) -> Result<()> {
        if cx.types.is_subtype(from, target) {
            return Ok(());
        }
        debug!("coercing {} to {} through the runtime", from, target);
        stack.box_top(cx)?;
        let as_type = cx.runtime().as_type();
        cx.emit(Insn::LoadClass(target.clone()));
        cx.emit(Insn::Invoke(as_type));
        emit_dynamic_cast(cx, target);
        stack.replace(cx, target.clone())
    }

    fn cast_to_non_primitive_if_necessary(
        &self,
        stack: &mut OperandStack,
        cx: &mut CodegenContext<'_>,
        _from: &TypeDescriptor,
        target: &TypeDescriptor,
    ) -> Result<()> {
        let boxed = stack.box_top(cx)?;
        if cx.types.is_subtype(&boxed, target) {
            return Ok(());
        }
        let runtime = cx.runtime();
        if target.is_named(CLASS) {
            cx.emit(Insn::Invoke(runtime.cast_to_class()));
        } else if *target == TypeDescriptor::string() {
            cx.emit(Insn::Invoke(runtime.cast_to_string()));
        } else if cx.types.is_enum(target) {
            cx.emit(Insn::LoadClass(target.clone()));
            cx.emit(Insn::Invoke(runtime.cast_to_enum()));
            cx.emit(Insn::CheckCast(target.clone()));
        } else {
            cx.emit(Insn::LoadClass(target.clone()));
            cx.emit(Insn::Invoke(runtime.cast_to_type()));
        }
        Ok(())
    }

    fn cast_non_primitive_to_bool(
        &self,
        _stack: &mut OperandStack,
        cx: &mut CodegenContext<'_>,
        _top: &TypeDescriptor,
    ) -> Result<()> {
        let unbox = cx.runtime().unbox(PrimitiveKind::Boolean);
        cx.emit(Insn::Invoke(unbox));
        Ok(())
    }
}

/// Cast the top of the physical stack to `target` without consulting the
/// model: Object needs nothing, primitives unbox through the runtime,
/// everything else gets a checked cast.
pub fn emit_dynamic_cast(cx: &mut CodegenContext<'_>, target: &TypeDescriptor) {
    if target.is_object() {
        return;
    }
    match target.as_primitive() {
        Some(kind) => {
            let unbox = cx.runtime().unbox(kind);
            cx.emit(Insn::Invoke(unbox));
        }
        None => cx.emit(Insn::CheckCast(target.clone())),
    }
}

impl RuntimeNames {
    fn transformation(&self, name: &str, params: Vec<TypeDescriptor>, ret: TypeDescriptor) -> MethodRef {
        MethodRef::new(InvokeKind::Static, &self.type_transformation, name, params, Some(ret))
    }

    /// `<kind>Unbox(Object)` applying the language's conversion rules.
    pub fn unbox(&self, kind: PrimitiveKind) -> MethodRef {
        self.transformation(
            &format!("{}Unbox", kind.name()),
            vec![TypeDescriptor::object()],
            TypeDescriptor::primitive(kind),
        )
    }

    pub fn cast_to_type(&self) -> MethodRef {
        self.transformation(
            "castToType",
            vec![TypeDescriptor::object(), TypeDescriptor::class(CLASS)],
            TypeDescriptor::object(),
        )
    }

    pub fn cast_to_enum(&self) -> MethodRef {
        self.transformation(
            "castToEnum",
            vec![TypeDescriptor::object(), TypeDescriptor::class(CLASS)],
            TypeDescriptor::object(),
        )
    }

    pub fn cast_to_string(&self) -> MethodRef {
        self.transformation("castToString", vec![TypeDescriptor::object()], TypeDescriptor::string())
    }

    pub fn cast_to_class(&self) -> MethodRef {
        self.transformation(
            "castToClass",
            vec![TypeDescriptor::object()],
            TypeDescriptor::class(CLASS),
        )
    }

    pub fn as_type(&self) -> MethodRef {
        MethodRef::new(
            InvokeKind::Static,
            &self.bytecode_adapter,
            "asType",
            vec![TypeDescriptor::object(), TypeDescriptor::class(CLASS)],
            Some(TypeDescriptor::object()),
        )
    }

    /// `get()` on the indirection cell.
    pub fn cell_get(&self) -> MethodRef {
        MethodRef::new(
            InvokeKind::Virtual,
            &self.reference_class,
            "get",
            vec![],
            Some(TypeDescriptor::object()),
        )
    }

    /// `set(Object)` on the indirection cell.
    pub fn cell_set(&self) -> MethodRef {
        MethodRef::new(
            InvokeKind::Virtual,
            &self.reference_class,
            "set",
            vec![TypeDescriptor::object()],
            None,
        )
    }

    /// Type of the indirection cell holding closure-shared locals.
    pub fn reference_type(&self) -> TypeDescriptor {
        TypeDescriptor::class(&self.reference_class.replace('/', "."))
    }
}
