//! Derived fields
//!
//! [`FieldRef::mapped_to`] wraps a source field with a pair of inverse
//! transforms. Derivations may chain; [`resolve_mapping`] walks the chain
//! iteratively down to the root field and composes the transforms, so every
//! read and write of a derived field lands on the root's state.
//!
//! ```text
//! root ──from₁──▶ d1 ──from₂──▶ d2        from_source = from₂ ∘ from₁
//! root ◀──to₁─── d1 ◀──to₂─── d2          to_source   = to₁ ∘ to₂
//! ```

use crate::field::FieldRef;
use crate::state::FieldPatch;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// A value transform used by derived fields.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Derivation record: one step from a source field to a derived field.
#[derive(Clone)]
pub struct MappedRef {
    source: FieldRef,
    from_source: Transform,
    to_source: Transform,
}

impl MappedRef {
    /// The field this step reads from.
    pub fn source(&self) -> &FieldRef {
        &self.source
    }

    /// Forward transform of this single step.
    pub fn from_source(&self) -> &Transform {
        &self.from_source
    }

    /// Backward transform of this single step.
    pub fn to_source(&self) -> &Transform {
        &self.to_source
    }

    pub(crate) fn into_source(self) -> FieldRef {
        self.source
    }
}

impl fmt::Debug for MappedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedRef")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl FieldRef {
    /// Derive a new field from this one.
    ///
    /// `from_source` and `to_source` should be inverses of each other. The
    /// derived field's initial state is this field's initial state with the
    /// value passed through `from_source`.
    pub fn mapped_to<F, G>(&self, from_source: F, to_source: G) -> FieldRef
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
        G: Fn(Value) -> Value + Send + Sync + 'static,
    {
        let from_source: Transform = Arc::new(from_source);
        let to_source: Transform = Arc::new(to_source);

        let initial_state = self
            .initial_state()
            .updated(FieldPatch::new().value(from_source(self.initial_value().clone())));

        FieldRef::from_parts(
            initial_state,
            Some(MappedRef {
                source: self.clone(),
                from_source,
                to_source,
            }),
        )
    }
}

/// Resolved mapping from a (possibly derived) field to its root field.
#[derive(Clone)]
pub struct FieldMapping {
    source: FieldRef,
    // Steps ordered from the requested field towards the root.
    steps: Arc<[MappedRef]>,
}

impl FieldMapping {
    /// The root field that owns the state.
    pub fn source(&self) -> &FieldRef {
        &self.source
    }

    /// Number of derivation steps between the requested field and the root.
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// Check if this is the identity mapping.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    /// Map a root value to the requested field's value.
    pub fn apply_from_source(&self, value: Value) -> Value {
        self.steps
            .iter()
            .rev()
            .fold(value, |acc, step| (step.from_source)(acc))
    }

    /// Map a value of the requested field back to the root value.
    pub fn apply_to_source(&self, value: Value) -> Value {
        self.steps
            .iter()
            .fold(value, |acc, step| (step.to_source)(acc))
    }

    /// The composed forward transform as a standalone function.
    pub fn from_source(&self) -> Transform {
        let mapping = self.clone();
        Arc::new(move |value| mapping.apply_from_source(value))
    }

    /// The composed backward transform as a standalone function.
    pub fn to_source(&self) -> Transform {
        let mapping = self.clone();
        Arc::new(move |value| mapping.apply_to_source(value))
    }
}

impl fmt::Debug for FieldMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMapping")
            .field("source", &self.source)
            .field("depth", &self.depth())
            .finish()
    }
}

/// Resolve `field` to its root field and the composed transforms.
///
/// A field without a derivation resolves to the identity mapping onto itself.
/// The chain is walked with a loop, so long chains do not grow the stack.
pub fn resolve_mapping(field: &FieldRef) -> FieldMapping {
    let mut steps = Vec::new();
    let mut current = field.clone();

    loop {
        let next = match current.derivation() {
            Some(step) => {
                steps.push(step.clone());
                step.source().clone()
            }
            None => break,
        };
        current = next;
    }

    if !steps.is_empty() {
        tracing::trace!(
            field = %field.id(),
            source = %current.id(),
            depth = steps.len(),
            "resolved derived field"
        );
    }

    FieldMapping {
        source: current,
        steps: steps.into(),
    }
}

/// Number of derivation steps between `field` and its root field.
pub fn chain_len(field: &FieldRef) -> usize {
    let mut len = 0;
    let mut step = field.derivation();
    while let Some(mapped) = step {
        len += 1;
        step = mapped.source().derivation();
    }
    len
}
