//! Validation registry
//!
//! Validators do not own a field's error. Each one registers its own entry,
//! keyed by field, and the registry aggregates whatever is currently
//! registered. Entries of one field keep registration order; the first one
//! is the field's visible result.
//!
//! Every register, unregister and reregister publishes exactly one snapshot,
//! so observers never see a field momentarily without an entry while a
//! validator swaps its result.

use crate::field::{FieldId, FieldRef};
use crate::reactive::{Published, Subscription};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Outcome of one validator for one field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ValidationResult {
    /// Error message, if the input is invalid
    pub error: Option<String>,
    /// `true` while an asynchronous check is in flight
    pub pending: bool,
}

impl ValidationResult {
    /// No error, not pending.
    pub const EMPTY: Self = Self {
        error: None,
        pending: false,
    };

    /// A settled result carrying `message`.
    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            pending: false,
        }
    }

    /// A settled result from an optional error.
    pub fn settled(error: Option<String>) -> Self {
        Self {
            error,
            pending: false,
        }
    }

    /// An in-flight result that keeps showing `previous_error`.
    pub fn pending(previous_error: Option<String>) -> Self {
        Self {
            error: previous_error,
            pending: true,
        }
    }

    /// Check if there is no error and nothing in flight.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.error.is_none() && !self.pending
    }
}

/// Handle of one registry entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    /// Raw numeric handle.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry#{}", self.0)
    }
}

/// Immutable view of every registered validation entry.
#[derive(Clone, Debug, Default)]
pub struct ValidationSnapshot {
    fields: HashMap<FieldId, IndexMap<EntryId, ValidationResult>>,
    owners: HashMap<EntryId, FieldId>,
}

impl ValidationSnapshot {
    // ─── Queries ────────────────────────────────────────────────────────────

    /// First registered result of `field`, or [`ValidationResult::EMPTY`].
    #[must_use]
    pub fn result(&self, field: FieldId) -> ValidationResult {
        self.fields
            .get(&field)
            .and_then(|entries| entries.values().next())
            .cloned()
            .unwrap_or(ValidationResult::EMPTY)
    }

    /// All results registered for `field`, in registration order.
    pub fn results(&self, field: FieldId) -> impl Iterator<Item = &ValidationResult> {
        self.fields
            .get(&field)
            .into_iter()
            .flat_map(|entries| entries.values())
    }

    /// Check if every entry of every field in `fields` is valid.
    #[must_use]
    pub fn all_valid<I>(&self, fields: I) -> bool
    where
        I: IntoIterator<Item = FieldId>,
    {
        fields
            .into_iter()
            .all(|field| self.results(field).all(ValidationResult::is_valid))
    }

    /// Check if nothing has an error and nothing is pending.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.entries().all(ValidationResult::is_valid)
    }

    /// Check if any entry is pending.
    #[must_use]
    pub fn pending(&self) -> bool {
        self.entries().any(|result| result.pending)
    }

    /// Field owning `entry`, if it is registered.
    #[must_use]
    pub fn owner(&self, entry: EntryId) -> Option<FieldId> {
        self.owners.get(&entry).copied()
    }

    /// Total number of registered entries.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Check if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    fn entries(&self) -> impl Iterator<Item = &ValidationResult> {
        self.fields.values().flat_map(|entries| entries.values())
    }

    // ─── Transitions ────────────────────────────────────────────────────────

    fn with_inserted(&self, field: FieldId, entry: EntryId, result: ValidationResult) -> Self {
        let mut next = self.clone();
        next.fields.entry(field).or_default().insert(entry, result);
        next.owners.insert(entry, field);
        next
    }

    fn without(mut self, entry: EntryId) -> Self {
        if let Some(field) = self.owners.remove(&entry) {
            if let Some(entries) = self.fields.get_mut(&field) {
                entries.shift_remove(&entry);
                if entries.is_empty() {
                    self.fields.remove(&field);
                }
            }
        }
        self
    }
}

/// Shared registry of validation entries for one form.
#[derive(Clone, Debug, Default)]
pub struct ValidationRegistry {
    current: Published<ValidationSnapshot>,
    next_entry: Arc<AtomicU64>,
}

impl ValidationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&self) -> EntryId {
        EntryId(self.next_entry.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Add an entry for `field`.
    pub fn register(&self, field: &FieldRef, result: ValidationResult) -> EntryId {
        let entry = self.allocate();
        let field = field.id();
        self.current
            .update(|snapshot| (Some(snapshot.with_inserted(field, entry, result)), ()));
        tracing::debug!(%field, %entry, version = self.current.version(), "validation registered");
        entry
    }

    /// Remove `entry`. Returns `false` if it was not registered.
    pub fn unregister(&self, entry: EntryId) -> bool {
        let removed = self.current.update(|snapshot| {
            if snapshot.owner(entry).is_none() {
                return (None, false);
            }
            (Some(snapshot.clone().without(entry)), true)
        });
        if removed {
            tracing::debug!(%entry, version = self.current.version(), "validation unregistered");
        }
        removed
    }

    /// Replace `old` with a new entry for the same field in one publish.
    ///
    /// The new entry is inserted before the old one is removed, so the field
    /// always has at least one entry. Returns `None` (and publishes nothing)
    /// if `old` is not registered.
    pub fn reregister(&self, old: EntryId, result: ValidationResult) -> Option<EntryId> {
        let entry = self.allocate();
        let replaced = self.current.update(|snapshot| match snapshot.owner(old) {
            Some(field) => (
                Some(snapshot.with_inserted(field, entry, result).without(old)),
                true,
            ),
            None => (None, false),
        });
        if !replaced {
            return None;
        }
        tracing::debug!(%old, %entry, version = self.current.version(), "validation reregistered");
        Some(entry)
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    /// Visible result of `field`.
    #[must_use]
    pub fn validation_result(&self, field: &FieldRef) -> ValidationResult {
        self.current.get().result(field.id())
    }

    /// Check if every entry of every field in `fields` is valid.
    #[must_use]
    pub fn is_field_valid<'f, I>(&self, fields: I) -> bool
    where
        I: IntoIterator<Item = &'f FieldRef>,
    {
        self.current
            .get()
            .all_valid(fields.into_iter().map(FieldRef::id))
    }

    /// Check if nothing has an error and nothing is pending.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.current.get().valid()
    }

    /// Check if any entry is pending.
    #[must_use]
    pub fn pending(&self) -> bool {
        self.current.get().pending()
    }

    /// Current snapshot of every entry.
    pub fn snapshot(&self) -> Arc<ValidationSnapshot> {
        self.current.get()
    }

    /// Subscribe to published snapshots.
    pub fn subscribe(&self) -> Subscription<ValidationSnapshot> {
        self.current.subscribe()
    }

    /// Number of snapshots published so far.
    pub fn version(&self) -> u64 {
        self.current.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry_is_valid() {
        let registry = ValidationRegistry::new();
        let field = FieldRef::new("");

        assert!(registry.valid());
        assert!(!registry.pending());
        assert_eq!(registry.validation_result(&field), ValidationResult::EMPTY);
    }

    #[test]
    fn test_first_entry_is_visible() {
        let registry = ValidationRegistry::new();
        let field = FieldRef::new("");

        registry.register(&field, ValidationResult::with_error("first"));
        registry.register(&field, ValidationResult::with_error("second"));

        assert_eq!(
            registry.validation_result(&field).error.as_deref(),
            Some("first")
        );
        assert_eq!(registry.snapshot().results(field.id()).count(), 2);
    }

    #[test]
    fn test_unregister_exact_entry() {
        let registry = ValidationRegistry::new();
        let field = FieldRef::new("");
        let first = registry.register(&field, ValidationResult::with_error("first"));
        registry.register(&field, ValidationResult::with_error("second"));

        assert!(registry.unregister(first));
        assert_eq!(
            registry.validation_result(&field).error.as_deref(),
            Some("second")
        );

        let version = registry.version();
        assert!(!registry.unregister(first));
        assert_eq!(registry.version(), version);
    }

    #[test]
    fn test_reregister_is_one_publish() {
        let registry = ValidationRegistry::new();
        let field = FieldRef::new("");
        let entry = registry.register(&field, ValidationResult::pending(None));
        let mut sub = registry.subscribe();

        let next = registry
            .reregister(entry, ValidationResult::with_error("bad"))
            .unwrap();

        let snapshot = sub.poll().unwrap();
        assert_eq!(sub.last_observed_version(), registry.version());
        assert_eq!(snapshot.owner(next), Some(field.id()));
        assert_eq!(snapshot.owner(entry), None);
        assert_eq!(snapshot.results(field.id()).count(), 1);
        assert!(sub.poll().is_none());
    }

    #[test]
    fn test_reregister_unknown_entry() {
        let registry = ValidationRegistry::new();
        let field = FieldRef::new("");
        let entry = registry.register(&field, ValidationResult::EMPTY);
        registry.unregister(entry);

        assert!(registry.reregister(entry, ValidationResult::EMPTY).is_none());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_pending_is_not_valid() {
        let registry = ValidationRegistry::new();
        let field = FieldRef::new("");
        registry.register(&field, ValidationResult::pending(None));

        assert!(registry.pending());
        assert!(!registry.valid());
        assert!(!registry.is_field_valid([&field]));
    }

    #[test]
    fn test_is_field_valid_scopes_to_fields() {
        let registry = ValidationRegistry::new();
        let good = FieldRef::new("");
        let bad = FieldRef::new("");
        registry.register(&good, ValidationResult::EMPTY);
        registry.register(&bad, ValidationResult::with_error("nope"));

        assert!(registry.is_field_valid([&good]));
        assert!(!registry.is_field_valid([&good, &bad]));
        assert!(!registry.valid());
    }

    #[test]
    fn test_empty_field_sets_are_dropped() {
        let registry = ValidationRegistry::new();
        let field = FieldRef::new("");
        let entry = registry.register(&field, ValidationResult::with_error("x"));
        registry.unregister(entry);

        assert!(registry.snapshot().is_empty());
        assert!(registry.valid());
    }
}
