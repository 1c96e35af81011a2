use log::trace;

use super::error::{CodegenError, ErrorKind, Site};
use super::hierarchy::TypeHierarchy;
use super::invocation::InvocationPolicy;
use crate::config::{CodegenConfig, RuntimeNames};
use crate::vm::{InstructionSink, Insn, Label};

/// Collaborators borrowed by every operand stack operation.
///
/// One context serves one callable body. It owns nothing but the
/// diagnostic site; the sink, hierarchy and policy are lent by the
/// surrounding code generator.
pub struct CodegenContext<'a> {
    sink: &'a mut dyn InstructionSink,
    pub types: &'a dyn TypeHierarchy,
    pub policy: &'a dyn InvocationPolicy,
    pub config: &'a CodegenConfig,
    pub site: Site,
}

impl<'a> CodegenContext<'a> {
    pub fn new(
        sink: &'a mut dyn InstructionSink,
        types: &'a dyn TypeHierarchy,
        policy: &'a dyn InvocationPolicy,
        config: &'a CodegenConfig,
        site: Site,
    ) -> Self {
        Self {
            sink,
            types,
            policy,
            config,
            site,
        }
    }

    pub fn emit(&mut self, insn: Insn) {
        if self.config.trace_emission {
            trace!(target: "opstack::emit", "{}:{} {}", self.site.callable, self.site.line, insn);
        }
        self.sink.emit(insn);
    }

    pub fn new_label(&mut self) -> Label {
        self.sink.new_label()
    }

    pub fn runtime(&self) -> &'a RuntimeNames {
        &self.config.runtime
    }

    pub fn set_line(&mut self, line: u32) {
        self.site.line = line;
    }

    /// Wrap `kind` with the current site.
    pub fn error(&self, kind: ErrorKind) -> CodegenError {
        CodegenError::new(kind, self.site.clone())
    }
}
