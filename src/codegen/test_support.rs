use super::context::CodegenContext;
use super::error::{Result, Site};
use super::hierarchy::ClassHierarchy;
use super::invocation::DynamicInvocationPolicy;
use super::operand_stack::OperandStack;
use crate::config::CodegenConfig;
use crate::vm::{Insn, InsnBuffer};

/// Owns everything a context borrows so unit tests can drive a stack.
pub struct Harness {
    pub stack: OperandStack,
    pub types: ClassHierarchy,
    pub config: CodegenConfig,
    policy: DynamicInvocationPolicy,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            stack: OperandStack::new(),
            types: ClassHierarchy::with_builtins(),
            config: CodegenConfig::default(),
            policy: DynamicInvocationPolicy,
        }
    }

    /// Run `f` against a fresh sink and return what it emitted.
    pub fn run<F>(&mut self, f: F) -> Result<Vec<Insn>>
    where
        F: FnOnce(&mut OperandStack, &mut CodegenContext<'_>) -> Result<()>,
    {
        let mut sink = InsnBuffer::new();
        let mut cx = CodegenContext::new(
            &mut sink,
            &self.types,
            &self.policy,
            &self.config,
            Site::new("Test.groovy", "Test", "run()V"),
        );
        f(&mut self.stack, &mut cx)?;
        Ok(sink.into_code())
    }
}
