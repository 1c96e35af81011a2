use super::ops::{Insn, Label};

/// Receiver of emitted instructions. The stack simulator only appends;
/// it never reads back what it wrote.
pub trait InstructionSink {
    fn emit(&mut self, insn: Insn);

    /// Allocate a fresh branch target.
    fn new_label(&mut self) -> Label;
}

/// In-memory sink used by the CLI and by tests.
#[derive(Debug, Clone, Default)]
pub struct InsnBuffer {
    code: Vec<Insn>,
    next_label: u32,
}

impl InsnBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code(&self) -> &[Insn] {
        &self.code
    }

    pub fn into_code(self) -> Vec<Insn> {
        self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Drop everything emitted so far; labels keep counting.
    pub fn clear(&mut self) {
        self.code.clear();
    }
}

impl InstructionSink for InsnBuffer {
    fn emit(&mut self, insn: Insn) {
        self.code.push(insn);
    }

    fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_unique() {
        let mut buf = InsnBuffer::new();
        let a = buf.new_label();
        let b = buf.new_label();
        assert_ne!(a, b);
        buf.emit(Insn::Mark(a));
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.new_label(), Label(2));
    }
}
