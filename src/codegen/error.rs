//! Internal compiler errors raised by the operand stack simulator.
//!
//! Every error here means the code generator drove the simulator into a
//! state that cannot match the real machine stack. None of them describe a
//! problem in user code; they abort generation of the current body only.

use std::fmt;

use super::types::TypeDescriptor;

/// Where code generation currently is, for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Site {
    /// Source unit name (usually the file name)
    pub source: String,
    pub class_name: String,
    /// Signature of the enclosing method or constructor
    pub callable: String,
    pub line: u32,
}

impl Site {
    pub fn new(source: &str, class_name: &str, callable: &str) -> Self {
        Self {
            source: source.to_string(),
            class_name: class_name.to_string(),
            callable: callable.to_string(),
            line: 0,
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}.{}, line {})",
            self.source, self.class_name, self.callable, self.line
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// An operation needed more entries than the model holds
    Underflow {
        operation: &'static str,
        required: usize,
        size: usize,
    },
    /// `pop_down_to` with a mark above the current length
    PopBelowMark { mark: usize, size: usize },
    CastOnEmptyStack { target: TypeDescriptor, coerce: bool },
    /// `cast_to_bool` saw neither zero nor one operand above its mark
    BoolMarkMismatch { mark: usize, size: usize },
    /// Literal with no known emission strategy
    UnsupportedConstant { value: String, ty: TypeDescriptor },
    /// Primitive literal whose value does not fit its declared kind
    ConstantTypeMismatch { value: String, ty: TypeDescriptor },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Underflow { operation, required, size } => {
                write!(
                    f,
                    "{} needs {} operands, but operand stack holds {}",
                    operation, required, size
                )
            }
            ErrorKind::PopBelowMark { mark, size } => {
                write!(
                    f,
                    "cannot pop operand stack down to {}: it holds only {} elements",
                    mark, size
                )
            }
            ErrorKind::CastOnEmptyStack { target, coerce } => {
                write!(
                    f,
                    "expecting {} to {} but operand stack is empty",
                    if *coerce { "coercion" } else { "casting" },
                    target
                )
            }
            ErrorKind::BoolMarkMismatch { mark, size } => {
                write!(
                    f,
                    "operand stack contains {} elements, but we expected only {}",
                    size, mark
                )
            }
            ErrorKind::UnsupportedConstant { value, ty } => {
                write!(f, "cannot generate bytecode for constant: {} of type: {}", value, ty)
            }
            ErrorKind::ConstantTypeMismatch { value, ty } => {
                write!(f, "constant {} does not fit declared type {}", value, ty)
            }
        }
    }
}

/// A compilation-aborting internal error with its diagnostic site.
#[derive(Debug, Clone, PartialEq)]
pub struct CodegenError {
    pub kind: ErrorKind,
    pub site: Site,
}

impl CodegenError {
    pub fn new(kind: ErrorKind, site: Site) -> Self {
        Self { kind, site }
    }
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal compiler error in {}: {}", self.site, self.kind)
    }
}

impl std::error::Error for CodegenError {}

pub type Result<T> = std::result::Result<T, CodegenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_carries_site() {
        let mut site = Site::new("Script.groovy", "Script", "run()Ljava/lang/Object;");
        site.line = 12;
        let err = CodegenError::new(ErrorKind::BoolMarkMismatch { mark: 1, size: 3 }, site);
        assert_eq!(
            err.to_string(),
            "internal compiler error in Script.groovy (Script.run()Ljava/lang/Object;, line 12): \
             operand stack contains 3 elements, but we expected only 1"
        );
    }

    #[test]
    fn test_cast_message() {
        let kind = ErrorKind::CastOnEmptyStack {
            target: TypeDescriptor::int(),
            coerce: true,
        };
        assert_eq!(kind.to_string(), "expecting coercion to int but operand stack is empty");
    }
}
