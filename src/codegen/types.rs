//! Type descriptors tracked on the operand stack.
//!
//! A `TypeDescriptor` is the compiler's view of one runtime value: a
//! primitive, the wrapper class of a primitive, a named class, or an array.
//! Descriptors are immutable and cheap to clone; names are shared through
//! `Arc<str>` so one descriptor pool can serve bodies generated in parallel.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Primitive value kinds of the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Char,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Kinds that take part in numeric conversions (everything but boolean).
    pub const NUMERIC: [PrimitiveKind; 7] = [
        PrimitiveKind::Byte,
        PrimitiveKind::Char,
        PrimitiveKind::Short,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Source-level keyword: `int`, `double`, ...
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    /// Field descriptor character.
    pub fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
        }
    }

    /// Fully qualified name of the wrapper class.
    pub fn wrapper_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "java.lang.Boolean",
            PrimitiveKind::Byte => "java.lang.Byte",
            PrimitiveKind::Char => "java.lang.Character",
            PrimitiveKind::Short => "java.lang.Short",
            PrimitiveKind::Int => "java.lang.Integer",
            PrimitiveKind::Long => "java.lang.Long",
            PrimitiveKind::Float => "java.lang.Float",
            PrimitiveKind::Double => "java.lang.Double",
        }
    }

    pub fn from_wrapper_name(name: &str) -> Option<PrimitiveKind> {
        PrimitiveKind::ALL
            .into_iter()
            .find(|kind| kind.wrapper_name() == name)
    }

    pub fn from_name(name: &str) -> Option<PrimitiveKind> {
        PrimitiveKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn width(self) -> SlotWidth {
        match self {
            PrimitiveKind::Long | PrimitiveKind::Double => SlotWidth::Two,
            _ => SlotWidth::One,
        }
    }

    /// byte, char and short live as int on the operand stack.
    pub fn is_int_like(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte | PrimitiveKind::Char | PrimitiveKind::Short | PrimitiveKind::Int
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Physical width of a value on the machine stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotWidth {
    One,
    Two,
}

impl SlotWidth {
    pub fn slots(self) -> usize {
        match self {
            SlotWidth::One => 1,
            SlotWidth::Two => 2,
        }
    }
}

/// Semantic type of one operand stack entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    /// Boxed form of a primitive (`java.lang.Integer` for `int`).
    Wrapper(PrimitiveKind),
    /// Any other class or interface, by fully qualified name.
    Class(Arc<str>),
    Array(Arc<TypeDescriptor>),
}

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const CLASS: &str = "java.lang.Class";
pub const BIG_INTEGER: &str = "java.math.BigInteger";
pub const BIG_DECIMAL: &str = "java.math.BigDecimal";
pub const REFERENCE: &str = "groovy.lang.Reference";

impl TypeDescriptor {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        TypeDescriptor::Primitive(kind)
    }

    /// Class by name. Wrapper class names fold into `Wrapper` so that
    /// equality stays structural.
    pub fn class(name: &str) -> Self {
        match PrimitiveKind::from_wrapper_name(name) {
            Some(kind) => TypeDescriptor::Wrapper(kind),
            None => TypeDescriptor::Class(Arc::from(name)),
        }
    }

    pub fn array(component: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Arc::new(component))
    }

    pub fn object() -> Self {
        TypeDescriptor::class(OBJECT)
    }

    pub fn string() -> Self {
        TypeDescriptor::class(STRING)
    }

    pub fn boolean() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Boolean)
    }

    pub fn int() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Int)
    }

    pub fn long() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Long)
    }

    pub fn float() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Float)
    }

    pub fn double() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Double)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDescriptor::Primitive(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeDescriptor::Array(_))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            TypeDescriptor::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn component_type(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::Array(component) => Some(component),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, TypeDescriptor::Class(name) if &**name == OBJECT)
    }

    pub fn is_named(&self, name: &str) -> bool {
        matches!(self, TypeDescriptor::Class(own) if &**own == name)
    }

    /// Slot width policy: only `long` and `double` occupy two slots.
    pub fn width(&self) -> SlotWidth {
        match self {
            TypeDescriptor::Primitive(kind) => kind.width(),
            _ => SlotWidth::One,
        }
    }

    pub fn is_two_slot(&self) -> bool {
        self.width() == SlotWidth::Two
    }

    /// Boxed form; non-primitives box to themselves.
    pub fn wrapper(&self) -> TypeDescriptor {
        match self {
            TypeDescriptor::Primitive(kind) => TypeDescriptor::Wrapper(*kind),
            other => other.clone(),
        }
    }

    /// Primitive form of a wrapper; everything else unwraps to itself.
    pub fn unwrapper(&self) -> TypeDescriptor {
        match self {
            TypeDescriptor::Wrapper(kind) => TypeDescriptor::Primitive(*kind),
            other => other.clone(),
        }
    }

    /// Internal name used by type instructions (`java/lang/Integer`,
    /// `[Ljava/lang/String;` for arrays).
    pub fn internal_name(&self) -> String {
        match self {
            TypeDescriptor::Primitive(kind) => kind.descriptor().to_string(),
            TypeDescriptor::Wrapper(kind) => kind.wrapper_name().replace('.', "/"),
            TypeDescriptor::Class(name) => name.replace('.', "/"),
            TypeDescriptor::Array(_) => self.descriptor(),
        }
    }

    /// Field descriptor (`I`, `Ljava/lang/String;`, `[J`).
    pub fn descriptor(&self) -> String {
        match self {
            TypeDescriptor::Primitive(kind) => kind.descriptor().to_string(),
            TypeDescriptor::Wrapper(_) | TypeDescriptor::Class(_) => {
                format!("L{};", self.internal_name())
            }
            TypeDescriptor::Array(component) => format!("[{}", component.descriptor()),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(kind) => write!(f, "{}", kind),
            TypeDescriptor::Wrapper(kind) => f.write_str(kind.wrapper_name()),
            TypeDescriptor::Class(name) => f.write_str(name),
            TypeDescriptor::Array(component) => write!(f, "{}[]", component),
        }
    }
}

/// Parses the textual form used by traces: `int`, `java.util.List`,
/// `long[]`. `String` and `Object` are accepted as short forms.
impl FromStr for TypeDescriptor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(component) = s.strip_suffix("[]") {
            return Ok(TypeDescriptor::array(component.parse()?));
        }
        if s.is_empty() {
            return Err("empty type name".to_string());
        }
        if let Some(kind) = PrimitiveKind::from_name(s) {
            return Ok(TypeDescriptor::Primitive(kind));
        }
        if s.chars().any(|c| c.is_whitespace() || c == '[' || c == ']') {
            return Err(format!("malformed type name: {}", s));
        }
        Ok(match s {
            "String" => TypeDescriptor::string(),
            "Object" => TypeDescriptor::object(),
            _ => TypeDescriptor::class(s),
        })
    }
}

impl Serialize for TypeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TypeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_width() {
        assert_eq!(TypeDescriptor::long().width(), SlotWidth::Two);
        assert_eq!(TypeDescriptor::double().width(), SlotWidth::Two);
        assert_eq!(TypeDescriptor::int().width(), SlotWidth::One);
        assert_eq!(TypeDescriptor::float().width(), SlotWidth::One);
        assert_eq!(TypeDescriptor::Wrapper(PrimitiveKind::Long).width(), SlotWidth::One);
        assert_eq!(
            TypeDescriptor::array(TypeDescriptor::double()).width(),
            SlotWidth::One
        );
    }

    #[test]
    fn test_wrapper_names_fold() {
        assert_eq!(
            TypeDescriptor::class("java.lang.Integer"),
            TypeDescriptor::Wrapper(PrimitiveKind::Int)
        );
        assert_eq!(TypeDescriptor::int().wrapper(), TypeDescriptor::class("java.lang.Integer"));
        assert_eq!(TypeDescriptor::Wrapper(PrimitiveKind::Char).unwrapper(), TypeDescriptor::primitive(PrimitiveKind::Char));
        assert_eq!(TypeDescriptor::string().wrapper(), TypeDescriptor::string());
    }

    #[test]
    fn test_parse() {
        assert_eq!("int".parse::<TypeDescriptor>().unwrap(), TypeDescriptor::int());
        assert_eq!(
            "String[][]".parse::<TypeDescriptor>().unwrap(),
            TypeDescriptor::array(TypeDescriptor::array(TypeDescriptor::string()))
        );
        assert_eq!(
            "java.util.List".parse::<TypeDescriptor>().unwrap(),
            TypeDescriptor::class("java.util.List")
        );
        assert!("".parse::<TypeDescriptor>().is_err());
        assert!("in t".parse::<TypeDescriptor>().is_err());
    }

    #[test]
    fn test_descriptors() {
        assert_eq!(TypeDescriptor::long().descriptor(), "J");
        assert_eq!(TypeDescriptor::string().descriptor(), "Ljava/lang/String;");
        assert_eq!(
            TypeDescriptor::array(TypeDescriptor::string()).internal_name(),
            "[Ljava/lang/String;"
        );
        assert_eq!(TypeDescriptor::Wrapper(PrimitiveKind::Int).internal_name(), "java/lang/Integer");
        assert_eq!(TypeDescriptor::array(TypeDescriptor::int()).to_string(), "int[]");
    }

    #[test]
    fn test_serde_as_text() {
        let ty = TypeDescriptor::array(TypeDescriptor::Wrapper(PrimitiveKind::Long));
        let json = serde_json::to_string(&ty).unwrap();
        assert_eq!(json, "\"java.lang.Long[]\"");
        assert_eq!(serde_json::from_str::<TypeDescriptor>(&json).unwrap(), ty);
        assert!(serde_json::from_str::<TypeDescriptor>("\"\"").is_err());
    }
}
