//! Form state store
//!
//! One [`FormSnapshot`] per form, keyed by root field handle. Fields with no
//! entry read as their initial state, so the store starts empty and `reset`
//! just empties it again.
//!
//! Derived fields never get an entry of their own. Reads and writes go through
//! [`resolve_mapping`] and land on the root field.

use crate::field::{FieldId, FieldRef};
use crate::mapping::{resolve_mapping, FieldMapping};
use crate::reactive::{Published, Subscription};
use crate::state::{FieldPatch, FieldState};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

/// A stored entry: the root field and its current state.
#[derive(Clone, Debug)]
pub struct StoredField {
    field: FieldRef,
    state: FieldState,
}

impl StoredField {
    /// The root field owning this entry.
    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    /// The stored state.
    pub fn state(&self) -> &FieldState {
        &self.state
    }
}

/// Immutable view of every stored field state at one version.
#[derive(Clone, Debug, Default)]
pub struct FormSnapshot {
    entries: HashMap<FieldId, StoredField>,
}

impl FormSnapshot {
    /// State of `field`: the stored state, or its initial state.
    ///
    /// Derived fields read their root's state with the value mapped through
    /// the composed forward transform.
    pub fn get(&self, field: &FieldRef) -> FieldState {
        let mapping = resolve_mapping(field);
        let root_state = self.root_state(mapping.source());
        view_of(&mapping, root_state)
    }

    /// Check if `field` has a stored entry.
    #[must_use]
    pub fn contains(&self, field: &FieldRef) -> bool {
        self.entries.contains_key(&field.id())
    }

    /// Check if any stored state differs from its field's initial state.
    #[must_use]
    pub fn modified(&self) -> bool {
        self.entries
            .values()
            .any(|entry| !entry.state.equals(Some(entry.field.initial_state())))
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate stored entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &StoredField> {
        self.entries.values()
    }

    fn root_state(&self, root: &FieldRef) -> FieldState {
        self.entries
            .get(&root.id())
            .map(|entry| entry.state.clone())
            .unwrap_or_else(|| root.initial_state().clone())
    }

    fn with_entry(&self, root: &FieldRef, state: FieldState) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(
            root.id(),
            StoredField {
                field: root.clone(),
                state,
            },
        );
        Self { entries }
    }
}

fn view_of(mapping: &FieldMapping, root_state: FieldState) -> FieldState {
    if mapping.is_identity() {
        return root_state;
    }
    let value = mapping.apply_from_source(root_state.value().clone());
    root_state.updated(FieldPatch::new().value(value))
}

/// Shared handle to one form's field states.
///
/// Cloning shares the underlying store.
#[derive(Clone, Debug, Default)]
pub struct FormStateStore {
    current: Published<FormSnapshot>,
}

impl FormStateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `field`.
    pub fn get(&self, field: &FieldRef) -> FieldState {
        self.current.get().get(field)
    }

    /// Apply `f` to the current state of `field` and store the result.
    ///
    /// Returns `true` if a new snapshot was published. An update that leaves
    /// all four state fields unchanged publishes nothing.
    pub fn update<F>(&self, field: &FieldRef, f: F) -> bool
    where
        F: FnOnce(&FieldState) -> FieldState,
    {
        match self.try_update(field, |state| Ok::<_, Infallible>(f(state))) {
            Ok(changed) => changed,
            Err(never) => match never {},
        }
    }

    /// Replace the state of `field`.
    pub fn set(&self, field: &FieldRef, state: FieldState) -> bool {
        self.update(field, |_| state)
    }

    /// Fallible form of [`FormStateStore::update`].
    ///
    /// If `f` fails nothing is published and the error is returned.
    pub fn try_update<E, F>(&self, field: &FieldRef, f: F) -> Result<bool, E>
    where
        F: FnOnce(&FieldState) -> Result<FieldState, E>,
    {
        self.apply(field, |state| f(state).map(|next| (next, ())))
            .map(|(changed, ())| changed)
    }

    /// Like [`FormStateStore::try_update`], but `f` also returns a value that
    /// is handed back to the caller.
    pub fn try_update_with<R, E, F>(&self, field: &FieldRef, f: F) -> Result<R, E>
    where
        F: FnOnce(&FieldState) -> Result<(FieldState, R), E>,
    {
        self.apply(field, f).map(|(_, out)| out)
    }

    fn apply<R, E, F>(&self, field: &FieldRef, f: F) -> Result<(bool, R), E>
    where
        F: FnOnce(&FieldState) -> Result<(FieldState, R), E>,
    {
        let mapping = resolve_mapping(field);
        let root = mapping.source().clone();

        let (changed, out) = self.current.try_update(|snapshot| {
            let root_state = snapshot.root_state(&root);
            let view = view_of(&mapping, root_state.clone());
            let (next, out) = f(&view)?;

            let next_root = if mapping.is_identity() {
                next
            } else if next.value() == view.value() {
                // Untouched values keep the root value as is, so lossy
                // transforms do not rewrite it on metadata-only updates.
                next.updated(FieldPatch::new().value(root_state.value().clone()))
            } else {
                let value = mapping.apply_to_source(next.value().clone());
                next.updated(FieldPatch::new().value(value))
            };

            if next_root.is_identical(&root_state) {
                return Ok((None, (false, out)));
            }
            Ok((Some(snapshot.with_entry(&root, next_root)), (true, out)))
        })?;

        if changed {
            tracing::debug!(
                field = %field.id(),
                root = %root.id(),
                version = self.current.version(),
                "field state published"
            );
        }
        Ok((changed, out))
    }

    /// Drop every stored entry so all fields read as their initial state.
    pub fn reset(&self) {
        let cleared = self.current.update(|snapshot| {
            if snapshot.is_empty() {
                (None, 0)
            } else {
                (Some(FormSnapshot::default()), snapshot.len())
            }
        });
        if cleared > 0 {
            tracing::debug!(cleared, version = self.current.version(), "form state reset");
        }
    }

    /// Check if any field differs from its initial state.
    #[must_use]
    pub fn modified(&self) -> bool {
        self.current.get().modified()
    }

    /// Current snapshot of every stored state.
    pub fn snapshot(&self) -> Arc<FormSnapshot> {
        self.current.get()
    }

    /// Subscribe to published snapshots.
    pub fn subscribe(&self) -> Subscription<FormSnapshot> {
        self.current.subscribe()
    }

    /// Number of snapshots published so far.
    pub fn version(&self) -> u64 {
        self.current.version()
    }

    /// Check if two handles share the same store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.current.ptr_eq(&other.current)
    }
}
