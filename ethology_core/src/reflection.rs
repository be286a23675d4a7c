//! Cached field-based value extraction across a class hierarchy.
//!
//! The scanner answers "give me every value of kind K this unit holds",
//! without knowing anything about the unit's concrete type. The expensive
//! part (walking the hierarchy and checking field accessibility) happens once
//! per `(class, kind)` pair; later calls only re-read values through the
//! cached handles.

use crate::registry::panic_message;
use crate::unit::{FieldAccess, FieldHandle, Unit, UnitClass, Value, ValueKind};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

type CacheKey = (String, ValueKind);

/// Reflective field scanner with a process-scoped handle cache.
///
/// Shared across worker threads behind an `Arc`. Concurrent population of
/// distinct keys is fine; concurrent population of the same key computes the
/// same list twice and the last writer wins.
#[derive(Debug, Default)]
pub struct FieldScanner {
    cache: RwLock<HashMap<CacheKey, Arc<[FieldHandle]>>>,
}

impl FieldScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// First non-null value of `kind` held by `target`, in declaration order
    /// from the concrete class upwards.
    pub fn find_first(&self, target: &dyn Unit, kind: ValueKind) -> Option<Value> {
        self.handles_for(target.class(), kind)
            .iter()
            .find_map(|handle| read(target, handle))
    }

    /// Every non-null value of `kind` held by `target`.
    pub fn find_all(&self, target: &dyn Unit, kind: ValueKind) -> Vec<Value> {
        self.handles_for(target.class(), kind)
            .iter()
            .filter_map(|handle| read(target, handle))
            .collect()
    }

    /// Drops every cached handle list. Called at session teardown.
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of cached `(class, kind)` entries.
    pub fn cached_entries(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn handles_for(&self, class: &UnitClass, kind: ValueKind) -> Arc<[FieldHandle]> {
        let key = (class.name().to_string(), kind);
        if let Some(handles) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(handles);
        }

        let handles: Arc<[FieldHandle]> = collect_handles(class, kind).into();
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&handles));
        handles
    }
}

/// Walks the class and its ancestors (never the root) for matching fields.
fn collect_handles(class: &UnitClass, kind: ValueKind) -> Vec<FieldHandle> {
    class
        .ancestry()
        .take_while(|c| !c.is_root())
        .flat_map(|c| {
            c.declared_fields()
                .iter()
                .filter(move |decl| decl.kind.is_assignable_to(kind))
                .filter_map(move |decl| {
                    if decl.access == FieldAccess::Sealed {
                        trace!("Skipping sealed field {}.{}", c.name(), decl.name);
                        return None;
                    }
                    Some(FieldHandle::new(c.name(), &decl.name, decl.kind))
                })
        })
        .collect()
}

/// One field, isolated: an error or a panic drops only this value.
fn read(target: &dyn Unit, handle: &FieldHandle) -> Option<Value> {
    match catch_unwind(AssertUnwindSafe(|| target.read_field(handle))) {
        Ok(Ok(Value::Null)) => None,
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            trace!("Field read failed on {}: {}", target.class().name(), e);
            None
        }
        Err(payload) => {
            trace!(
                "Field read panicked on {}: {}",
                target.class().name(),
                panic_message(payload.as_ref())
            );
            None
        }
    }
}
