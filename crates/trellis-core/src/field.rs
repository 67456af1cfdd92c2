//! Field references
//!
//! A [`FieldRef`] is an identity token, not a value. Definitions are stored
//! behind an `Arc` and addressed by a [`FieldId`] allocated from a process-wide
//! counter, so the form store is a plain handle-to-state map.
//!
//! Field trees are described with [`FieldNode`], a closed sum over leaf fields,
//! array fields and keyed groups of nodes.

use crate::mapping::MappedRef;
use crate::state::FieldState;
use crate::value::Value;
use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_FIELD_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle identifying one field definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(u64);

impl FieldId {
    fn allocate() -> Self {
        Self(NEXT_FIELD_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric handle.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field#{}", self.0)
    }
}

struct FieldDef {
    id: FieldId,
    initial_state: FieldState,
    derivation: Option<MappedRef>,
}

// Unlinks derivation chains iteratively.
impl Drop for FieldDef {
    fn drop(&mut self) {
        let mut next = self.derivation.take();
        while let Some(step) = next {
            next = Arc::into_inner(step.into_source().inner)
                .and_then(|mut source| source.derivation.take());
        }
    }
}

/// Identity token for one field.
///
/// Cloning is cheap and keeps the identity; two calls to [`FieldRef::new`]
/// with equal values produce two distinct fields.
#[derive(Clone)]
pub struct FieldRef {
    inner: Arc<FieldDef>,
}

impl FieldRef {
    /// Define an enabled field with the given initial value.
    pub fn new(initial_value: impl Into<Value>) -> Self {
        Self::with_disabled(initial_value, false)
    }

    /// Define a field with an explicit initial disabled flag.
    pub fn with_disabled(initial_value: impl Into<Value>, initial_disabled: bool) -> Self {
        Self::from_parts(FieldState::new(initial_value, initial_disabled), None)
    }

    pub(crate) fn from_parts(initial_state: FieldState, derivation: Option<MappedRef>) -> Self {
        Self {
            inner: Arc::new(FieldDef {
                id: FieldId::allocate(),
                initial_state,
                derivation,
            }),
        }
    }

    /// Identity handle of this field.
    pub fn id(&self) -> FieldId {
        self.inner.id
    }

    /// State the field has until something is stored for it.
    pub fn initial_state(&self) -> &FieldState {
        &self.inner.initial_state
    }

    /// Shorthand for `initial_state().value()`.
    pub fn initial_value(&self) -> &Value {
        self.inner.initial_state.value()
    }

    /// Derivation record, if this field was created by [`FieldRef::mapped_to`].
    pub fn derivation(&self) -> Option<&MappedRef> {
        self.inner.derivation.as_ref()
    }

    /// Check if this field is derived from another one.
    #[must_use]
    pub fn is_derived(&self) -> bool {
        self.inner.derivation.is_some()
    }
}

impl PartialEq for FieldRef {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for FieldRef {}

impl Hash for FieldRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRef")
            .field("id", &self.inner.id)
            .field("derived", &self.is_derived())
            .finish()
    }
}

/// Factory turning a raw item value into a fresh child subtree.
pub type ItemTemplate = Arc<dyn Fn(Value) -> FieldNode + Send + Sync>;

/// A field whose value is an ordered list of child subtrees.
///
/// Every child ever placed in the list comes from [`ArrayFieldRef::item_template`]
/// or is a repositioned existing child, so child identities stay stable across
/// reorders.
#[derive(Clone)]
pub struct ArrayFieldRef {
    field: FieldRef,
    template: ItemTemplate,
}

impl ArrayFieldRef {
    /// Define an enabled array field, building one child per initial item.
    pub fn new<I, V, F>(initial_items: I, template: F) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
        F: Fn(Value) -> FieldNode + Send + Sync + 'static,
    {
        Self::with_disabled(initial_items, template, false)
    }

    /// Define an array field with an explicit initial disabled flag.
    pub fn with_disabled<I, V, F>(initial_items: I, template: F, initial_disabled: bool) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
        F: Fn(Value) -> FieldNode + Send + Sync + 'static,
    {
        let template: ItemTemplate = Arc::new(template);
        let children = initial_items
            .into_iter()
            .map(|item| template(item.into()))
            .collect();

        Self {
            field: FieldRef::with_disabled(Value::Items(children), initial_disabled),
            template,
        }
    }

    /// The underlying field holding the item list.
    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    /// Identity handle of the underlying field.
    pub fn id(&self) -> FieldId {
        self.field.id()
    }

    /// Build a fresh child subtree from a raw item value.
    pub fn item_template(&self, value: impl Into<Value>) -> FieldNode {
        (self.template)(value.into())
    }

    /// Children the field starts with.
    pub fn initial_items(&self) -> &[FieldNode] {
        self.field.initial_value().as_items().unwrap_or(&[])
    }
}

impl AsRef<FieldRef> for ArrayFieldRef {
    fn as_ref(&self) -> &FieldRef {
        &self.field
    }
}

impl fmt::Debug for ArrayFieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayFieldRef")
            .field("id", &self.field.id())
            .field("initial_len", &self.initial_items().len())
            .finish()
    }
}

/// Define an enabled field.
pub fn define_field(initial_value: impl Into<Value>) -> FieldRef {
    FieldRef::new(initial_value)
}

/// Define an enabled array field.
pub fn define_array_field<I, V, F>(initial_items: I, template: F) -> ArrayFieldRef
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
    F: Fn(Value) -> FieldNode + Send + Sync + 'static,
{
    ArrayFieldRef::new(initial_items, template)
}

/// A node in a field tree.
#[derive(Clone, Debug)]
pub enum FieldNode {
    /// A single field
    Leaf(FieldRef),
    /// An array field with child subtrees
    Array(ArrayFieldRef),
    /// A keyed group of nodes, in insertion order
    Group(IndexMap<String, FieldNode>),
}

impl FieldNode {
    /// Build a group node from `(key, node)` pairs.
    pub fn group<K, N, I>(entries: I) -> Self
    where
        K: Into<String>,
        N: Into<FieldNode>,
        I: IntoIterator<Item = (K, N)>,
    {
        Self::Group(
            entries
                .into_iter()
                .map(|(k, n)| (k.into(), n.into()))
                .collect(),
        )
    }

    /// The field behind a leaf or array node.
    pub fn as_field(&self) -> Option<&FieldRef> {
        match self {
            Self::Leaf(field) => Some(field),
            Self::Array(array) => Some(array.field()),
            Self::Group(_) => None,
        }
    }

    /// The array reference behind an array node.
    pub fn as_array(&self) -> Option<&ArrayFieldRef> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Look up a child of a group node.
    pub fn get(&self, key: &str) -> Option<&FieldNode> {
        match self {
            Self::Group(entries) => entries.get(key),
            _ => None,
        }
    }
}

impl PartialEq for FieldNode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Leaf(a), Self::Leaf(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a.field() == b.field(),
            (Self::Group(a), Self::Group(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldNode {}

impl Hash for FieldNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            Self::Leaf(field) => field.hash(state),
            Self::Array(array) => array.field().hash(state),
            // Group equality ignores key order, so only the size is hashed.
            Self::Group(entries) => entries.len().hash(state),
        }
    }
}

impl From<FieldRef> for FieldNode {
    fn from(field: FieldRef) -> Self {
        Self::Leaf(field)
    }
}

impl From<&FieldRef> for FieldNode {
    fn from(field: &FieldRef) -> Self {
        Self::Leaf(field.clone())
    }
}

impl From<ArrayFieldRef> for FieldNode {
    fn from(array: ArrayFieldRef) -> Self {
        Self::Array(array)
    }
}

impl From<&ArrayFieldRef> for FieldNode {
    fn from(array: &ArrayFieldRef) -> Self {
        Self::Array(array.clone())
    }
}
