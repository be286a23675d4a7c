//! Introspectable behavior units.
//!
//! Plugins contribute task, perception and memory units the engine has never
//! seen before. The engine cannot depend on their concrete Rust types, so each
//! unit describes itself:
//! - a **class descriptor** (`UnitClass`) with a name, a parent and declared fields
//! - **field reads** through `Unit::read_field`, one `FieldHandle` at a time
//! - an optional **nested unit** when the unit is a pure forwarding wrapper
//!
//! Class identity is the fully qualified name. Ancestry is explicit through
//! `parent`, so "is this a kind of X" is a walk up the chain.
//!
//! `UnitObject` is a data-driven implementation used by hosts that build units
//! from definitions (and by the simulation harness).

use crate::error::FieldError;
use crate::items::{ItemRef, ItemSelector, ItemStack};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared handle to a class descriptor.
pub type ClassRef = Arc<UnitClass>;

/// Shared handle to a unit.
pub type UnitRef = Arc<dyn Unit>;

/// Name of the universal root class. Never scanned for fields.
pub const ROOT_CLASS: &str = "object.Object";

// ============================================================================
// VALUE KINDS
// ============================================================================

/// Declared type of a field, and runtime type of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Declared as the root type; holds anything
    Any,
    /// Another behavior unit
    Unit,
    /// A sequence of arbitrary values
    Collection,
    /// Weighted choice over item stacks
    ItemSelector,
    /// A single item kind
    Item,
    /// An item with a count
    ItemStack,
    /// A class descriptor (e.g. "targets instances of this class")
    Class,
    Number,
    Text,
    Flag,
}

impl ValueKind {
    /// True when a field declared as `self` can be read as a `target`.
    ///
    /// Only `Any` widens; there is no other subtyping between kinds.
    pub fn is_assignable_to(self, target: ValueKind) -> bool {
        target == ValueKind::Any || self == target
    }
}

/// A field value read from a unit.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Unit(UnitRef),
    Collection(Vec<Value>),
    ItemSelector(ItemSelector),
    Item(ItemRef),
    ItemStack(ItemStack),
    Class(ClassRef),
    Number(f64),
    Text(String),
    Flag(bool),
}

impl Value {
    /// Runtime kind, `None` for null.
    pub fn kind(&self) -> Option<ValueKind> {
        Some(match self {
            Value::Null => return None,
            Value::Unit(_) => ValueKind::Unit,
            Value::Collection(_) => ValueKind::Collection,
            Value::ItemSelector(_) => ValueKind::ItemSelector,
            Value::Item(_) => ValueKind::Item,
            Value::ItemStack(_) => ValueKind::ItemStack,
            Value::Class(_) => ValueKind::Class,
            Value::Number(_) => ValueKind::Number,
            Value::Text(_) => ValueKind::Text,
            Value::Flag(_) => ValueKind::Flag,
        })
    }

    /// True when the value is non-null and readable as `kind`.
    pub fn is_instance_of(&self, kind: ValueKind) -> bool {
        self.kind().is_some_and(|k| k.is_assignable_to(kind))
    }

    pub fn as_unit(&self) -> Option<&UnitRef> {
        match self {
            Value::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            Value::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&[Value]> {
        match self {
            Value::Collection(values) => Some(values),
            _ => None,
        }
    }
}

// ============================================================================
// CLASS DESCRIPTORS
// ============================================================================

/// Accessibility of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccess {
    Public,
    /// Private, but the host lets inspectors read it
    Private,
    /// Cannot be opened for reading at all
    Sealed,
}

/// A field declared directly on one class.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub kind: ValueKind,
    pub access: FieldAccess,
}

/// Class descriptor of a unit or an agent kind.
#[derive(Debug)]
pub struct UnitClass {
    name: String,
    parent: Option<ClassRef>,
    fields: Vec<FieldDecl>,
}

impl UnitClass {
    /// Starts a class deriving directly from the universal root.
    pub fn builder(name: &str) -> UnitClassBuilder {
        UnitClassBuilder {
            name: name.to_string(),
            parent: None,
            fields: Vec::new(),
        }
    }

    /// A class with no fields of its own.
    pub fn leaf(name: &str, parent: &ClassRef) -> ClassRef {
        Self::builder(name).extends(parent).build()
    }

    /// Fully qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name after the last `.` or `$`.
    pub fn simple_name(&self) -> &str {
        self.name
            .rsplit(['.', '$'])
            .next()
            .unwrap_or(&self.name)
    }

    pub fn parent(&self) -> Option<&ClassRef> {
        self.parent.as_ref()
    }

    /// Fields declared on this class only.
    pub fn declared_fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn is_root(&self) -> bool {
        self.name == ROOT_CLASS
    }

    /// This class, then each ancestor, most derived first.
    pub fn ancestry(&self) -> Ancestry<'_> {
        Ancestry { next: Some(self) }
    }

    /// True when this class or one of its ancestors is named `name`.
    pub fn is_a(&self, name: &str) -> bool {
        self.ancestry().any(|class| class.name == name)
    }

    /// True when `self` is `other` or derives from it.
    pub fn is_subclass_of(&self, other: &UnitClass) -> bool {
        self.is_a(&other.name)
    }

    /// Finds the most derived class declaring `field`.
    pub fn declaring_class(&self, field: &str) -> Option<&UnitClass> {
        self.ancestry()
            .find(|class| class.fields.iter().any(|decl| decl.name == field))
    }
}

impl PartialEq for UnitClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for UnitClass {}

impl fmt::Display for UnitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Iterator over a class and its ancestors.
pub struct Ancestry<'a> {
    next: Option<&'a UnitClass>,
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = &'a UnitClass;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}

/// Builder for `UnitClass`.
pub struct UnitClassBuilder {
    name: String,
    parent: Option<ClassRef>,
    fields: Vec<FieldDecl>,
}

impl UnitClassBuilder {
    pub fn extends(mut self, parent: &ClassRef) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    /// Declares a private (host-readable) field.
    pub fn field(self, name: &str, kind: ValueKind) -> Self {
        self.field_with_access(name, kind, FieldAccess::Private)
    }

    /// Declares a field that can never be opened for reading.
    pub fn sealed_field(self, name: &str, kind: ValueKind) -> Self {
        self.field_with_access(name, kind, FieldAccess::Sealed)
    }

    pub fn field_with_access(mut self, name: &str, kind: ValueKind, access: FieldAccess) -> Self {
        self.fields.push(FieldDecl {
            name: name.to_string(),
            kind,
            access,
        });
        self
    }

    pub fn build(self) -> ClassRef {
        Arc::new(UnitClass {
            name: self.name,
            parent: self.parent,
            fields: self.fields,
        })
    }
}

// ============================================================================
// FIELD HANDLES
// ============================================================================

/// A verified-accessible reference to one declared field.
///
/// Handles are produced by the `FieldScanner` and cached per
/// `(class, kind)`; they carry the declaring class so shadowed fields in a
/// hierarchy stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldHandle {
    owner: Arc<str>,
    name: Arc<str>,
    kind: ValueKind,
}

impl FieldHandle {
    pub fn new(owner: &str, name: &str, kind: ValueKind) -> Self {
        Self {
            owner: Arc::from(owner),
            name: Arc::from(name),
            kind,
        }
    }

    /// Name of the class declaring the field.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared kind.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }
}

// ============================================================================
// UNITS
// ============================================================================

/// An introspectable behavior unit.
///
/// Implementations must be read-only from the engine's point of view:
/// `read_field` may fail, but never mutates the unit.
pub trait Unit: Send + Sync {
    /// Concrete class of this unit.
    fn class(&self) -> &ClassRef;

    /// Reads the current value of one field.
    fn read_field(&self, field: &FieldHandle) -> Result<Value, FieldError>;

    /// The unit this one forwards to, for explicit wrappers.
    fn nested(&self) -> Option<UnitRef> {
        None
    }
}

impl fmt::Debug for dyn Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unit<{}>", self.class().name())
    }
}

/// Object identity of a unit, used for cycle detection.
pub fn identity(unit: &UnitRef) -> usize {
    Arc::as_ptr(unit) as *const () as usize
}

type FieldKey = (String, String);

/// Data-driven unit: a class descriptor plus a table of field values.
///
/// Field values live behind a lock so hosts can wire up graphs with cycles
/// after the units are shared.
#[derive(Debug)]
pub struct UnitObject {
    class: ClassRef,
    values: RwLock<HashMap<FieldKey, Value>>,
    detached: Vec<FieldKey>,
    wraps: RwLock<Option<UnitRef>>,
}

impl UnitObject {
    pub fn new(class: &ClassRef) -> Self {
        Self {
            class: Arc::clone(class),
            values: RwLock::new(HashMap::new()),
            detached: Vec::new(),
            wraps: RwLock::new(None),
        }
    }

    /// Sets a field, resolved on the most derived class declaring it.
    ///
    /// Undeclared names are stored on the concrete class and are simply
    /// never found by the scanner.
    pub fn with(self, field: &str, value: Value) -> Self {
        self.assign(field, value);
        self
    }

    /// Marks a field as detached: every read fails.
    pub fn with_detached(mut self, field: &str) -> Self {
        let key = self.key_for(field);
        self.detached.push(key);
        self
    }

    /// Makes this unit an explicit wrapper around `inner`.
    pub fn wrapping(self, inner: UnitRef) -> Self {
        *self.wraps.write().unwrap_or_else(PoisonError::into_inner) = Some(inner);
        self
    }

    /// Sets a field after the unit has been shared.
    pub fn assign(&self, field: &str, value: Value) {
        let key = self.key_for(field);
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    pub fn into_ref(self) -> UnitRef {
        Arc::new(self)
    }

    fn key_for(&self, field: &str) -> FieldKey {
        let owner = self
            .class
            .declaring_class(field)
            .map(|class| class.name().to_string())
            .unwrap_or_else(|| self.class.name().to_string());
        (owner, field.to_string())
    }
}

impl Unit for UnitObject {
    fn class(&self) -> &ClassRef {
        &self.class
    }

    fn read_field(&self, field: &FieldHandle) -> Result<Value, FieldError> {
        let key = (field.owner().to_string(), field.name().to_string());
        if self.detached.contains(&key) {
            return Err(FieldError::Detached(field.name().to_string()));
        }
        let declared = self
            .class
            .ancestry()
            .filter(|class| class.name() == field.owner())
            .flat_map(|class| class.declared_fields())
            .any(|decl| decl.name == field.name());
        if !declared {
            return Err(FieldError::Unknown(field.name().to_string()));
        }
        Ok(self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned()
            .unwrap_or(Value::Null))
    }

    fn nested(&self) -> Option<UnitRef> {
        self.wraps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
