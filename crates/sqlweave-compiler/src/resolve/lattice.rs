//! The abstract value lattice for binding classification.
//!
//! Elements: {Unknown, Fragment, Function, Object, Namespace, Opaque}.
//! The join of two identical elements is that element; the join of anything
//! else is Opaque. This single rule is what makes conditional assignment
//! refuse: two branches assigning different fragments meet at Opaque, and
//! the compiler never picks one.

use indexmap::IndexMap;

use crate::source_map::SourceId;

/// Index of a `sql` template site in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(pub(crate) u32);

impl FragmentId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Index of a function site in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub(crate) u32);

impl FuncId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Why a value is opaque. Carried so the call-site boundary can emit the
/// precise diagnostic kind instead of a generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpaqueReason {
    /// Assigned along more than one control-flow path.
    Conditional,
    /// Produced by a call expression; function bodies are never evaluated.
    CallResult,
    /// Sourced from `require(...)`.
    DynamicImport,
    /// Reached through a computed property access.
    DynamicAccess,
    /// Anything else the analysis refuses to model.
    Unresolved,
}

/// Classification of one binding or expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Declared but never given a value.
    Unknown,
    Fragment(FragmentId),
    Function(FuncId),
    /// Object literal whose properties all resolve to fragments (possibly
    /// through further nesting). Static access projects a property.
    Object(IndexMap<String, Value>),
    /// A whole-module namespace (`import * as ns`, `export * as ns`).
    Namespace(SourceId),
    Opaque(OpaqueReason),
}

impl Value {
    /// Lattice join: identical elements join to themselves, anything else
    /// joins to Opaque.
    pub fn join(self, other: Value) -> Value {
        if self == other {
            self
        } else {
            Value::Opaque(OpaqueReason::Conditional)
        }
    }

    pub fn as_fragment(&self) -> Option<FragmentId> {
        match self {
            Value::Fragment(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<FuncId> {
        match self {
            Value::Function(id) => Some(*id),
            _ => None,
        }
    }

    /// True for values an ObjectOfFragments property may hold.
    pub fn is_fragment_shaped(&self) -> bool {
        match self {
            Value::Fragment(_) => true,
            Value::Object(map) => map.values().all(Value::is_fragment_shaped),
            _ => false,
        }
    }

    /// The opaque reason, treating `Unknown` as plain unresolved.
    pub fn opaque_reason(&self) -> Option<OpaqueReason> {
        match self {
            Value::Opaque(reason) => Some(*reason),
            Value::Unknown => Some(OpaqueReason::Unresolved),
            _ => None,
        }
    }
}
