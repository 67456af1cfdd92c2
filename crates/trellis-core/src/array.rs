//! Array field operations
//!
//! Structural edits of an array field's child list. Every operation validates
//! its indices against the current list before touching it, and the whole
//! edit is applied as one store update: either the new list is published in a
//! single snapshot or nothing is.
//!
//! Children are moved, never rebuilt, so their identities (and the states and
//! validation entries keyed by them) survive reorders.

use crate::error::{CoreError, Result};
use crate::field::{ArrayFieldRef, FieldNode};
use crate::state::{FieldPatch, FieldState};
use crate::store::FormStateStore;
use crate::value::Value;

/// Operations on one array field within one store.
#[derive(Clone, Copy, Debug)]
pub struct ArrayFieldOps<'a> {
    store: &'a FormStateStore,
    field: &'a ArrayFieldRef,
}

impl<'a> ArrayFieldOps<'a> {
    /// Bind `field` to `store`.
    pub fn new(store: &'a FormStateStore, field: &'a ArrayFieldRef) -> Self {
        Self { store, field }
    }

    /// The array field these operations act on.
    pub fn field(&self) -> &'a ArrayFieldRef {
        self.field
    }

    /// Current children in stored order.
    pub fn items(&self) -> Result<Vec<FieldNode>> {
        let state = self.store.get(self.field.field());
        self.items_of(&state).map(<[FieldNode]>::to_vec)
    }

    /// Number of current children.
    pub fn len(&self) -> Result<usize> {
        let state = self.store.get(self.field.field());
        self.items_of(&state).map(<[FieldNode]>::len)
    }

    /// Check if the array has no children.
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// Append a fresh child built from `value`. Returns the new child.
    pub fn push(&self, value: impl Into<Value>) -> Result<FieldNode> {
        let node = self.field.item_template(value);
        self.modify("push", |items| {
            items.push(node.clone());
            Ok(())
        })?;
        Ok(node)
    }

    /// Prepend a fresh child built from `value`. Returns the new child.
    pub fn unshift(&self, value: impl Into<Value>) -> Result<FieldNode> {
        let node = self.field.item_template(value);
        self.modify("unshift", |items| {
            items.insert(0, node.clone());
            Ok(())
        })?;
        Ok(node)
    }

    /// Insert a fresh child at `index`. `index == len` appends.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<FieldNode> {
        let node = self.field.item_template(value);
        self.modify("insert", |items| {
            if index > items.len() {
                return Err(CoreError::out_of_bounds("insert", index, items.len()));
            }
            items.insert(index, node.clone());
            Ok(())
        })?;
        Ok(node)
    }

    /// Remove the first child identical to `child`.
    ///
    /// Returns `false` (and publishes nothing) if no child matches.
    pub fn remove(&self, child: &FieldNode) -> Result<bool> {
        self.modify("remove", |items| {
            match items.iter().position(|item| item == child) {
                Some(index) => {
                    items.remove(index);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    /// Remove the child at `index`. Returns the removed child.
    pub fn remove_at(&self, index: usize) -> Result<FieldNode> {
        self.modify("remove_at", |items| {
            if index >= items.len() {
                return Err(CoreError::out_of_bounds("remove", index, items.len()));
            }
            Ok(items.remove(index))
        })
    }

    /// Exchange the children at `i` and `j`.
    pub fn swap(&self, i: usize, j: usize) -> Result<()> {
        self.modify("swap", |items| {
            let len = items.len();
            if let Some(bad) = [i, j].into_iter().find(|&index| index >= len) {
                return Err(CoreError::invalid_access(bad, len));
            }
            items.swap(i, j);
            Ok(())
        })
    }

    /// Move the child at `from` so it ends up at `to`.
    ///
    /// Both indices must address an existing child.
    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        self.modify("move", |items| {
            let len = items.len();
            if let Some(bad) = [from, to].into_iter().find(|&index| index >= len) {
                return Err(CoreError::out_of_bounds("move", bad, len));
            }
            let item = items.remove(from);
            items.insert(to, item);
            Ok(())
        })
    }

    fn items_of<'s>(&self, state: &'s FieldState) -> Result<&'s [FieldNode]> {
        state
            .value()
            .as_items()
            .ok_or_else(|| CoreError::not_an_array(self.field.id()))
    }

    /// Apply `edit` to a copy of the child list and publish it.
    ///
    /// Publishes nothing if `edit` fails or leaves the list unchanged. A
    /// changed list also marks the array field touched.
    fn modify<R, F>(&self, operation: &'static str, edit: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<FieldNode>) -> Result<R>,
    {
        self.store.try_update_with(self.field.field(), |state| {
            let current = self.items_of(state)?;
            let mut items = current.to_vec();
            let out = edit(&mut items)?;

            if items.as_slice() == current {
                return Ok((state.clone(), out));
            }

            tracing::trace!(
                field = %self.field.id(),
                operation,
                len = items.len(),
                "array field edited"
            );
            let next = state.updated(FieldPatch::new().value(Value::Items(items)).touched(true));
            Ok((next, out))
        })
    }
}
