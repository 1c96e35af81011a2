//! Class hierarchy queries the conversion engine relies on.
//!
//! The real type graph belongs to semantic analysis; the simulator only
//! asks three questions of it: what a name resolves to, what kind of class
//! it is, and what its direct supertypes are. Subtyping and
//! "compatible without conversion" are derived from those answers.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use super::types::{BIG_DECIMAL, BIG_INTEGER, CLASS, OBJECT, PrimitiveKind, REFERENCE, STRING, TypeDescriptor};

/// Maximum alias chain followed by [`ClassHierarchy::canonical`].
const MAX_ALIAS_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    #[default]
    Class,
    Interface,
    Enum,
    Annotation,
}

#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub kind: ClassKind,
    pub superclass: Option<TypeDescriptor>,
    pub interfaces: Vec<TypeDescriptor>,
}

/// Boundary to the external type system.
pub trait TypeHierarchy {
    /// Follow alias indirection to the canonical descriptor.
    fn canonical(&self, ty: &TypeDescriptor) -> TypeDescriptor;

    /// Kind of a reference type; primitives and arrays report `Class`.
    fn class_kind(&self, ty: &TypeDescriptor) -> ClassKind;

    /// Direct superclass and interfaces of a reference type.
    fn supertypes(&self, ty: &TypeDescriptor) -> Vec<TypeDescriptor>;

    /// True when a value of `sub` can be used as `sup` with no instruction:
    /// same type, subclass, or implemented interface.
    fn is_subtype(&self, sub: &TypeDescriptor, sup: &TypeDescriptor) -> bool {
        if sub == sup {
            return true;
        }
        if sub.is_primitive() || sup.is_primitive() {
            return false;
        }
        if sup.is_object() {
            return true;
        }
        match (sub, sup) {
            (TypeDescriptor::Array(a), TypeDescriptor::Array(b)) => {
                !a.is_primitive() && !b.is_primitive() && self.is_subtype(a, b)
            }
            (TypeDescriptor::Array(_), _) => {
                sup.is_named("java.lang.Cloneable") || sup.is_named("java.io.Serializable")
            }
            (_, TypeDescriptor::Array(_)) => false,
            _ => {
                let mut seen: HashSet<TypeDescriptor> = HashSet::new();
                let mut queue: VecDeque<TypeDescriptor> = self.supertypes(sub).into();
                while let Some(next) = queue.pop_front() {
                    if &next == sup {
                        return true;
                    }
                    if seen.insert(next.clone()) {
                        queue.extend(self.supertypes(&next));
                    }
                }
                false
            }
        }
    }

    /// Compatible without any conversion: identity, arrays of compatible
    /// components, or reference subtyping.
    fn is_compatible(&self, source: &TypeDescriptor, target: &TypeDescriptor) -> bool {
        if source == target {
            return true;
        }
        if let (Some(a), Some(b)) = (source.component_type(), target.component_type()) {
            if self.is_compatible(a, b) {
                return true;
            }
        }
        !source.is_primitive() && !target.is_primitive() && self.is_subtype(source, target)
    }

    fn is_enum(&self, ty: &TypeDescriptor) -> bool {
        self.class_kind(ty) == ClassKind::Enum
    }
}

/// Registry-backed hierarchy with the platform classes preloaded.
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    classes: HashMap<String, ClassInfo>,
    aliases: HashMap<String, TypeDescriptor>,
}

impl ClassHierarchy {
    /// An empty registry: every unknown class derives directly from Object.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut h = Self::new();
        let serializable = "java.io.Serializable";
        let comparable = "java.lang.Comparable";

        h.define_interface(serializable, &[]);
        h.define_interface("java.lang.Cloneable", &[]);
        h.define_interface(comparable, &[]);
        h.define_interface("java.lang.CharSequence", &[]);
        h.define_interface("java.lang.Iterable", &[]);
        h.define_interface("java.util.Collection", &["java.lang.Iterable"]);
        h.define_interface("java.util.List", &["java.util.Collection"]);
        h.define_interface("java.util.Set", &["java.util.Collection"]);
        h.define_interface("java.util.Map", &[]);
        h.define_interface("java.lang.annotation.Annotation", &[]);

        h.define_class(OBJECT, None, &[]);
        h.define_class(STRING, Some(OBJECT), &[serializable, comparable, "java.lang.CharSequence"]);
        h.define_class(CLASS, Some(OBJECT), &[serializable]);
        h.define_class("java.lang.Number", Some(OBJECT), &[serializable]);
        h.define_class(BIG_INTEGER, Some("java.lang.Number"), &[comparable]);
        h.define_class(BIG_DECIMAL, Some("java.lang.Number"), &[comparable]);
        h.define_class("java.lang.Enum", Some(OBJECT), &[comparable, serializable]);
        h.define_class(REFERENCE, Some(OBJECT), &[serializable]);
        h.define_class("java.util.ArrayList", Some(OBJECT), &["java.util.List", serializable]);
        h.define_class("java.util.HashMap", Some(OBJECT), &["java.util.Map", serializable]);

        for kind in PrimitiveKind::ALL {
            let parent = match kind {
                PrimitiveKind::Boolean | PrimitiveKind::Char => OBJECT,
                _ => "java.lang.Number",
            };
            h.define_class(kind.wrapper_name(), Some(parent), &[serializable, comparable]);
        }
        h
    }

    pub fn register(&mut self, name: &str, info: ClassInfo) {
        self.classes.insert(name.to_string(), info);
    }

    pub fn define_class(&mut self, name: &str, superclass: Option<&str>, interfaces: &[&str]) {
        let superclass = match superclass {
            Some(s) => Some(TypeDescriptor::class(s)),
            None if name == OBJECT => None,
            None => Some(TypeDescriptor::object()),
        };
        self.register(
            name,
            ClassInfo {
                kind: ClassKind::Class,
                superclass,
                interfaces: interfaces.iter().map(|i| TypeDescriptor::class(i)).collect(),
            },
        );
    }

    pub fn define_interface(&mut self, name: &str, extends: &[&str]) {
        self.register(
            name,
            ClassInfo {
                kind: ClassKind::Interface,
                superclass: Some(TypeDescriptor::object()),
                interfaces: extends.iter().map(|i| TypeDescriptor::class(i)).collect(),
            },
        );
    }

    pub fn define_enum(&mut self, name: &str, interfaces: &[&str]) {
        self.register(
            name,
            ClassInfo {
                kind: ClassKind::Enum,
                superclass: Some(TypeDescriptor::class("java.lang.Enum")),
                interfaces: interfaces.iter().map(|i| TypeDescriptor::class(i)).collect(),
            },
        );
    }

    pub fn define_annotation(&mut self, name: &str) {
        self.register(
            name,
            ClassInfo {
                kind: ClassKind::Annotation,
                superclass: Some(TypeDescriptor::object()),
                interfaces: vec![TypeDescriptor::class("java.lang.annotation.Annotation")],
            },
        );
    }

    /// Make `alias` resolve to `target` (type aliases, placeholder nodes).
    pub fn define_alias(&mut self, alias: &str, target: TypeDescriptor) {
        self.aliases.insert(alias.to_string(), target);
    }

    /// Follow aliases, array components included, for at most `budget` steps.
    fn resolve_alias(&self, ty: &TypeDescriptor, mut budget: usize) -> TypeDescriptor {
        let mut current = ty.clone();
        while budget > 0 {
            budget -= 1;
            let next = match &current {
                TypeDescriptor::Class(name) => self.aliases.get(&**name).cloned(),
                TypeDescriptor::Array(component) => {
                    return TypeDescriptor::array(self.resolve_alias(component, budget));
                }
                _ => None,
            };
            match next {
                Some(target) => current = target,
                None => return current,
            }
        }
        current
    }

    fn info(&self, ty: &TypeDescriptor) -> Option<&ClassInfo> {
        match ty {
            TypeDescriptor::Wrapper(kind) => self.classes.get(kind.wrapper_name()),
            TypeDescriptor::Class(name) => self.classes.get(&**name),
            _ => None,
        }
    }
}

impl TypeHierarchy for ClassHierarchy {
    fn canonical(&self, ty: &TypeDescriptor) -> TypeDescriptor {
        self.resolve_alias(ty, MAX_ALIAS_DEPTH)
    }

    fn class_kind(&self, ty: &TypeDescriptor) -> ClassKind {
        self.info(ty).map_or(ClassKind::Class, |info| info.kind)
    }

    fn supertypes(&self, ty: &TypeDescriptor) -> Vec<TypeDescriptor> {
        if ty.is_object() || ty.is_primitive() {
            return Vec::new();
        }
        match self.info(ty) {
            Some(info) => info
                .superclass
                .iter()
                .chain(info.interfaces.iter())
                .cloned()
                .collect(),
            None if ty.is_array() => vec![
                TypeDescriptor::object(),
                TypeDescriptor::class("java.lang.Cloneable"),
                TypeDescriptor::class("java.io.Serializable"),
            ],
            None => vec![TypeDescriptor::object()],
        }
    }
}
