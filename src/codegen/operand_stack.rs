//! Compile-time model of the runtime operand stack.
//!
//! The model holds one entry per *logical* value. `long` and `double`
//! occupy two physical slots but a single entry; the physical view is only
//! ever derived (see [`OperandStack::slot_depth`]). Every mutator emits the
//! matching instructions through the context in the same call, so the model
//! and the emitted stream cannot drift apart when the generator uses the
//! model for all stack traffic.

use std::fmt;

use log::trace;

use super::context::CodegenContext;
use super::error::{CodegenError, ErrorKind, Result};
use super::types::{SlotWidth, TypeDescriptor};
use crate::vm::{Insn, JumpCondition, Label, SlotKind};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperandStack {
    stack: Vec<TypeDescriptor>,
}

impl OperandStack {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Number of logical entries.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Entries bottom to top.
    pub fn entries(&self) -> &[TypeDescriptor] {
        &self.stack
    }

    /// Physical slots occupied on the real stack.
    pub fn slot_depth(&self) -> usize {
        self.stack.iter().map(|ty| ty.width().slots()).sum()
    }

    /// Record a value produced by an instruction the caller already emitted.
    pub fn push(&mut self, ty: TypeDescriptor) {
        self.stack.push(ty);
    }

    pub fn top_operand(&self, cx: &CodegenContext<'_>) -> Result<TypeDescriptor> {
        self.peek(cx, 0, "top operand").cloned()
    }

    /// Entry `depth` positions below the top.
    fn peek(&self, cx: &CodegenContext<'_>, depth: usize, operation: &'static str) -> Result<&TypeDescriptor> {
        let size = self.stack.len();
        if depth >= size {
            return Err(self.underflow(cx, operation, depth + 1));
        }
        Ok(&self.stack[size - 1 - depth])
    }

    fn underflow(&self, cx: &CodegenContext<'_>, operation: &'static str, required: usize) -> CodegenError {
        cx.error(ErrorKind::Underflow {
            operation,
            required,
            size: self.stack.len(),
        })
    }

    /// Discard the top entry with a width-correct `POP`/`POP2`.
    pub fn pop(&mut self, cx: &mut CodegenContext<'_>) -> Result<()> {
        if self.stack.is_empty() {
            return Err(self.underflow(cx, "pop", 1));
        }
        self.pop_down_to(cx, self.stack.len() - 1)
    }

    /// Discard entries until exactly `mark` remain, one instruction per entry.
    pub fn pop_down_to(&mut self, cx: &mut CodegenContext<'_>, mark: usize) -> Result<()> {
        if mark > self.stack.len() {
            return Err(cx.error(ErrorKind::PopBelowMark {
                mark,
                size: self.stack.len(),
            }));
        }
        while self.stack.len() > mark {
            if let Some(ty) = self.stack.pop() {
                match ty.width() {
                    SlotWidth::Two => cx.emit(Insn::Pop2),
                    SlotWidth::One => cx.emit(Insn::Pop),
                }
            }
        }
        Ok(())
    }

    /// Forget `amount` entries that another instruction already consumed.
    pub fn remove(&mut self, cx: &CodegenContext<'_>, amount: usize) -> Result<()> {
        if amount > self.stack.len() {
            return Err(self.underflow(cx, "remove", amount));
        }
        let keep = self.stack.len() - amount;
        self.stack.truncate(keep);
        trace!("removed {} operands, {} left", amount, keep);
        Ok(())
    }

    /// Retype the top entry.
    pub fn replace(&mut self, cx: &CodegenContext<'_>, ty: TypeDescriptor) -> Result<()> {
        self.replace_n(cx, ty, 1)
    }

    /// Drop `n` entries and push `ty` in their place.
    pub fn replace_n(&mut self, cx: &CodegenContext<'_>, ty: TypeDescriptor, n: usize) -> Result<()> {
        if n > self.stack.len() {
            return Err(self.underflow(cx, "replace", n));
        }
        self.stack.truncate(self.stack.len() - n);
        self.push(ty);
        Ok(())
    }

    pub fn dup(&mut self, cx: &mut CodegenContext<'_>) -> Result<()> {
        let ty = self.peek(cx, 0, "dup")?.clone();
        match ty.width() {
            SlotWidth::Two => cx.emit(Insn::Dup2),
            SlotWidth::One => cx.emit(Insn::Dup),
        }
        self.push(ty);
        Ok(())
    }

    /// Exchange the top two entries.
    ///
    /// There is no width-aware swap instruction, so three of the four
    /// width combinations duplicate the top under the bottom and then
    /// discard the original top.
    pub fn swap(&mut self, cx: &mut CodegenContext<'_>) -> Result<()> {
        let top = self.peek(cx, 0, "swap")?.width();
        let bottom = self.peek(cx, 1, "swap")?.width();
        match (bottom, top) {
            (SlotWidth::One, SlotWidth::One) => cx.emit(Insn::Swap),
            (SlotWidth::One, SlotWidth::Two) => {
                cx.emit(Insn::Dup2X1);
                cx.emit(Insn::Pop2);
            }
            (SlotWidth::Two, SlotWidth::One) => {
                cx.emit(Insn::DupX2);
                cx.emit(Insn::Pop);
            }
            (SlotWidth::Two, SlotWidth::Two) => {
                cx.emit(Insn::Dup2X2);
                cx.emit(Insn::Pop2);
            }
        }
        let size = self.stack.len();
        self.stack.swap(size - 1, size - 2);
        Ok(())
    }

    /// Box a primitive top entry into its wrapper. Returns the new top type.
    pub fn box_top(&mut self, cx: &mut CodegenContext<'_>) -> Result<TypeDescriptor> {
        let top = self.top_operand(cx)?;
        let Some(kind) = top.as_primitive() else {
            return Ok(top);
        };
        cx.emit(Insn::Box(kind));
        let boxed = top.wrapper();
        self.replace(cx, boxed.clone())?;
        Ok(boxed)
    }

    /// Conditional jump to a fresh label, consuming the top entry.
    pub fn jump(&mut self, cx: &mut CodegenContext<'_>, cond: JumpCondition) -> Result<Label> {
        let label = cx.new_label();
        self.jump_to(cx, cond, label)?;
        Ok(label)
    }

    pub fn jump_to(&mut self, cx: &mut CodegenContext<'_>, cond: JumpCondition, label: Label) -> Result<()> {
        if self.stack.is_empty() {
            return Err(self.underflow(cx, "jump", 1));
        }
        cx.emit(Insn::Jump(cond, label));
        self.remove(cx, 1)
    }

    pub fn push_bool(&mut self, cx: &mut CodegenContext<'_>, value: bool) {
        cx.emit(Insn::IConst(if value { 1 } else { 0 }));
        self.push(TypeDescriptor::boolean());
    }

    /// Load local `index` as `ty`.
    pub fn load(&mut self, cx: &mut CodegenContext<'_>, ty: TypeDescriptor, index: u16) {
        cx.emit(Insn::Load(SlotKind::of(&ty), index));
        self.push(ty);
    }
}

impl fmt::Display for OperandStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperandStack(size={}:[", self.stack.len())?;
        for (i, ty) in self.stack.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", ty)?;
        }
        f.write_str("])")
    }
}
