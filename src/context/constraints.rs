//! Constraint name lookup.
//!
//! # Responsibilities
//! - Resolve `(catalog, schema, constraint name)` to the constraint's RID
//! - Hold the names registered while catalog schemas are introspected
//!
//! Read-only from the point of view of header certification.

use std::sync::Arc;

use dashmap::DashMap;

/// Resolves a named constraint to its short identifier.
pub trait ConstraintLookup: Send + Sync {
    fn lookup(&self, catalog: &str, schema: &str, constraint: &str) -> Option<String>;
}

/// Lookup that knows no constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConstraints;

impl ConstraintLookup for NoConstraints {
    fn lookup(&self, _catalog: &str, _schema: &str, _constraint: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Key,
    ForeignKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintEntry {
    pub kind: ConstraintKind,
    /// RID of the constraint, when the catalog exposes one.
    pub rid: Option<String>,
}

type ConstraintName = (String, String, String);

/// Concurrent registry of constraint names per catalog.
#[derive(Debug, Clone, Default)]
pub struct ConstraintRegistry {
    inner: Arc<DashMap<ConstraintName, ConstraintEntry>>,
}

impl ConstraintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        catalog: &str,
        schema: &str,
        constraint: &str,
        kind: ConstraintKind,
        rid: Option<String>,
    ) {
        self.inner.insert(
            (catalog.to_string(), schema.to_string(), constraint.to_string()),
            ConstraintEntry { kind, rid },
        );
    }

    /// Entry for a constraint, optionally restricted to one kind.
    pub fn get(
        &self,
        catalog: &str,
        schema: &str,
        constraint: &str,
        kind: Option<ConstraintKind>,
    ) -> Option<ConstraintEntry> {
        let key = (catalog.to_string(), schema.to_string(), constraint.to_string());
        let entry = self.inner.get(&key)?.value().clone();
        match kind {
            Some(k) if k != entry.kind => None,
            _ => Some(entry),
        }
    }

    /// RID of a constraint of the given kind.
    pub fn lookup_kind(
        &self,
        catalog: &str,
        schema: &str,
        constraint: &str,
        kind: ConstraintKind,
    ) -> Option<String> {
        self.get(catalog, schema, constraint, Some(kind))?.rid
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}

impl ConstraintLookup for ConstraintRegistry {
    fn lookup(&self, catalog: &str, schema: &str, constraint: &str) -> Option<String> {
        self.get(catalog, schema, constraint, None)?.rid
    }
}
