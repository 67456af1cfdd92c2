//! Structural extraction
//!
//! Projects a [`FieldNode`] tree into a parallel tree of values or states read
//! from one [`FormSnapshot`]. Arrays expand to their currently stored children,
//! so the shape of the result follows the live list, not the initial one.

use crate::field::{FieldNode, FieldRef};
use crate::state::FieldState;
use crate::store::FormSnapshot;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;

/// What to read from each leaf.
pub trait Projection {
    /// Leaf payload of the extracted tree.
    type Output: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// Project one field state.
    fn project(state: FieldState) -> Self::Output;
}

/// Extract plain values.
#[derive(Clone, Copy, Debug, Default)]
pub struct Values;

impl Projection for Values {
    type Output = Value;

    fn project(state: FieldState) -> Value {
        state.into_value()
    }
}

/// Extract full field states.
#[derive(Clone, Copy, Debug, Default)]
pub struct States;

impl Projection for States {
    type Output = FieldState;

    fn project(state: FieldState) -> FieldState {
        state
    }
}

/// A tree with the same shape as the [`FieldNode`] it was extracted from.
#[derive(Clone, Debug, PartialEq)]
pub enum Extracted<T> {
    /// Projection of a single field
    Leaf(T),
    /// One entry per child of an array field
    List(Vec<Extracted<T>>),
    /// Same keys as the group node
    Group(IndexMap<String, Extracted<T>>),
}

impl<T> Extracted<T> {
    /// The leaf payload.
    pub fn as_leaf(&self) -> Option<&T> {
        match self {
            Self::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// Consume the tree, returning the leaf payload.
    pub fn into_leaf(self) -> Option<T> {
        match self {
            Self::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// The entries of an array projection.
    pub fn as_list(&self) -> Option<&[Extracted<T>]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The entries of a group projection.
    pub fn as_group(&self) -> Option<&IndexMap<String, Extracted<T>>> {
        match self {
            Self::Group(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key of a group projection.
    pub fn get(&self, key: &str) -> Option<&Extracted<T>> {
        self.as_group().and_then(|entries| entries.get(key))
    }
}

/// Project `node` against `snapshot`.
///
/// An array field whose stored value is not an item list is projected as a
/// leaf.
pub fn extract<P: Projection>(snapshot: &FormSnapshot, node: &FieldNode) -> Extracted<P::Output> {
    match node {
        FieldNode::Leaf(field) => Extracted::Leaf(P::project(snapshot.get(field))),
        FieldNode::Array(array) => {
            let state = snapshot.get(array.field());
            match state.value().as_items() {
                Some(children) => Extracted::List(
                    children
                        .iter()
                        .map(|child| extract::<P>(snapshot, child))
                        .collect(),
                ),
                None => Extracted::Leaf(P::project(state)),
            }
        }
        FieldNode::Group(entries) => Extracted::Group(
            entries
                .iter()
                .map(|(key, child)| (key.clone(), extract::<P>(snapshot, child)))
                .collect(),
        ),
    }
}

/// Leaf fields under `node`, in tree order.
///
/// Arrays contribute the leaves of their stored children, not themselves.
pub fn leaf_fields(snapshot: &FormSnapshot, node: &FieldNode) -> Vec<FieldRef> {
    let mut out = Vec::new();
    collect_leaves(snapshot, node, &mut out);
    out
}

fn collect_leaves(snapshot: &FormSnapshot, node: &FieldNode, out: &mut Vec<FieldRef>) {
    match node {
        FieldNode::Leaf(field) => out.push(field.clone()),
        FieldNode::Array(array) => {
            let state = snapshot.get(array.field());
            for child in state.value().as_items().unwrap_or(&[]) {
                collect_leaves(snapshot, child, out);
            }
        }
        FieldNode::Group(entries) => {
            for child in entries.values() {
                collect_leaves(snapshot, child, out);
            }
        }
    }
}
