//! Replayable traces of operand stack operations.
//!
//! A trace is the sequence of calls a code generator makes while walking
//! one callable body, plus the classes it needs to know about. Replaying
//! it yields the emitted instructions and the final model.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::constants::ConstantValue;
use super::context::CodegenContext;
use super::error::{Result, Site};
use super::hierarchy::{ClassHierarchy, ClassInfo, ClassKind};
use super::invocation::DynamicInvocationPolicy;
use super::operand_stack::OperandStack;
use super::types::TypeDescriptor;
use super::variables::BytecodeVariable;
use crate::config::CodegenConfig;
use crate::vm::{Insn, InsnBuffer};

fn one() -> usize {
    1
}

/// One call into the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Record a value whose instruction was emitted elsewhere
    Push {
        #[serde(rename = "type")]
        ty: TypeDescriptor,
    },
    Pop,
    PopDownTo {
        mark: usize,
    },
    Remove {
        amount: usize,
    },
    Replace {
        #[serde(rename = "type")]
        ty: TypeDescriptor,
        #[serde(default = "one")]
        n: usize,
    },
    Dup,
    Swap,
    Box,
    Cast {
        #[serde(rename = "type")]
        ty: TypeDescriptor,
    },
    Coerce {
        #[serde(rename = "type")]
        ty: TypeDescriptor,
    },
    CastToBool {
        mark: usize,
        #[serde(default)]
        empty_default: bool,
    },
    Constant {
        value: ConstantValue,
        #[serde(rename = "type")]
        ty: TypeDescriptor,
    },
    LoadVar {
        var: BytecodeVariable,
        #[serde(default)]
        use_reference_directly: bool,
    },
    StoreVar {
        var: BytecodeVariable,
    },
    PushBool {
        value: bool,
    },
    Line {
        line: u32,
    },
}

impl Step {
    /// Steps that change the model without emitting the matching code.
    pub fn is_model_only(&self) -> bool {
        matches!(self, Step::Push { .. } | Step::Remove { .. } | Step::Replace { .. })
    }

    fn apply(&self, stack: &mut OperandStack, cx: &mut CodegenContext<'_>) -> Result<()> {
        match self {
            Step::Push { ty } => stack.push(ty.clone()),
            Step::Pop => stack.pop(cx)?,
            Step::PopDownTo { mark } => stack.pop_down_to(cx, *mark)?,
            Step::Remove { amount } => stack.remove(cx, *amount)?,
            Step::Replace { ty, n } => stack.replace_n(cx, ty.clone(), *n)?,
            Step::Dup => stack.dup(cx)?,
            Step::Swap => stack.swap(cx)?,
            Step::Box => {
                stack.box_top(cx)?;
            }
            Step::Cast { ty } => stack.cast(cx, ty)?,
            Step::Coerce { ty } => stack.coerce(cx, ty)?,
            Step::CastToBool { mark, empty_default } => stack.cast_to_bool(cx, *mark, *empty_default)?,
            Step::Constant { value, ty } => stack.push_constant(cx, value, ty)?,
            Step::LoadVar {
                var,
                use_reference_directly,
            } => stack.load_variable(cx, var, *use_reference_directly),
            Step::StoreVar { var } => stack.store_variable(cx, var)?,
            Step::PushBool { value } => stack.push_bool(cx, *value),
            Step::Line { line } => cx.set_line(*line),
        }
        Ok(())
    }
}

/// A class the trace refers to beyond the platform classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    #[serde(default)]
    pub kind: ClassKind,
    #[serde(default)]
    pub superclass: Option<TypeDescriptor>,
    #[serde(default)]
    pub interfaces: Vec<TypeDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trace {
    pub source: String,
    pub class_name: String,
    pub callable: String,
    pub classes: Vec<ClassDecl>,
    /// Alias name to the type it stands for
    pub aliases: BTreeMap<String, TypeDescriptor>,
    pub steps: Vec<Step>,
}

impl Trace {
    /// Parse a trace; `.toml` files are TOML, everything else JSON.
    pub fn load(path: &Path) -> std::result::Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        let is_toml = path.extension().is_some_and(|ext| ext == "toml");
        if is_toml {
            toml::from_str(&content).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
        } else {
            serde_json::from_str(&content).map_err(|e| format!("failed to parse {}: {}", path.display(), e))
        }
    }

    pub fn has_model_only_steps(&self) -> bool {
        self.steps.iter().any(Step::is_model_only)
    }

    fn site(&self) -> Site {
        Site::new(
            if self.source.is_empty() { "<trace>" } else { &self.source },
            if self.class_name.is_empty() { "Script" } else { &self.class_name },
            if self.callable.is_empty() { "run()Ljava/lang/Object;" } else { &self.callable },
        )
    }

    fn hierarchy(&self) -> ClassHierarchy {
        let mut types = ClassHierarchy::with_builtins();
        for decl in &self.classes {
            let superclass = match (&decl.superclass, decl.kind) {
                (Some(sup), _) => Some(sup.clone()),
                (None, ClassKind::Enum) => Some(TypeDescriptor::class("java.lang.Enum")),
                (None, _) => Some(TypeDescriptor::object()),
            };
            types.register(
                &decl.name,
                ClassInfo {
                    kind: decl.kind,
                    superclass,
                    interfaces: decl.interfaces.clone(),
                },
            );
        }
        for (alias, target) in &self.aliases {
            types.define_alias(alias, target.clone());
        }
        types
    }
}

/// Outcome of a successful replay.
#[derive(Debug, Clone)]
pub struct Replay {
    pub code: Vec<Insn>,
    pub stack: OperandStack,
}

/// Serializable summary of a replay, as printed by `--format json`.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub code: Vec<String>,
    pub stack: Vec<TypeDescriptor>,
    pub logical_depth: usize,
    pub slot_depth: usize,
}

impl Replay {
    pub fn report(&self) -> ReplayReport {
        ReplayReport {
            code: self.code.iter().map(|insn| insn.to_string()).collect(),
            stack: self.stack.entries().to_vec(),
            logical_depth: self.stack.len(),
            slot_depth: self.stack.slot_depth(),
        }
    }
}

/// Drive a fresh operand stack through every step of `trace`.
pub fn replay(trace: &Trace, config: &CodegenConfig) -> std::result::Result<Replay, String> {
    let types = trace.hierarchy();
    let policy = DynamicInvocationPolicy;
    let mut sink = InsnBuffer::new();
    let mut stack = OperandStack::new();
    {
        let mut cx = CodegenContext::new(&mut sink, &types, &policy, config, trace.site());
        for (i, step) in trace.steps.iter().enumerate() {
            debug!("step {}: {:?}", i + 1, step);
            step.apply(&mut stack, &mut cx)
                .map_err(|e| format!("step {}: {}", i + 1, e))?;
        }
    }
    info!(
        "replayed {} steps: {} instructions, {}",
        trace.steps.len(),
        sink.len(),
        stack
    );
    Ok(Replay {
        code: sink.into_code(),
        stack,
    })
}
