//! Field state
//!
//! [`FieldState`] is an immutable value object. Equality and hashing look at
//! `value` and `disabled` only: two states that differ only in focus or touch
//! history are the same state for change detection.

use crate::value::Value;
use std::hash::{Hash, Hasher};

/// State of one field: its value plus metadata.
#[derive(Clone, Debug, Default)]
pub struct FieldState {
    value: Value,
    disabled: bool,
    active: bool,
    touched: bool,
}

impl FieldState {
    /// Create a fresh, inactive and untouched state.
    pub fn new(value: impl Into<Value>, disabled: bool) -> Self {
        Self {
            value: value.into(),
            disabled,
            active: false,
            touched: false,
        }
    }

    /// Value of the field.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume the state, returning its value.
    pub fn into_value(self) -> Value {
        self.value
    }

    /// `true` when the field is disabled.
    pub fn disabled(&self) -> bool {
        self.disabled
    }

    /// `true` when the field is focused.
    pub fn active(&self) -> bool {
        self.active
    }

    /// `true` when the field has been focused or edited once.
    pub fn touched(&self) -> bool {
        self.touched
    }

    /// Return a new state with the patched fields replaced.
    ///
    /// `self` is never modified; fields absent from `patch` carry over.
    #[must_use]
    pub fn updated(&self, patch: FieldPatch) -> Self {
        Self {
            value: patch.value.unwrap_or_else(|| self.value.clone()),
            disabled: patch.disabled.unwrap_or(self.disabled),
            active: patch.active.unwrap_or(self.active),
            touched: patch.touched.unwrap_or(self.touched),
        }
    }

    /// Compare `value` and `disabled` against an optional other state.
    ///
    /// Returns `false` when `other` is absent.
    pub fn equals(&self, other: Option<&FieldState>) -> bool {
        other.is_some_and(|other| self == other)
    }

    /// Compare all four fields, including `active` and `touched`.
    pub fn is_identical(&self, other: &FieldState) -> bool {
        self == other && self.active == other.active && self.touched == other.touched
    }
}

impl PartialEq for FieldState {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.disabled == other.disabled
    }
}

impl Eq for FieldState {}

impl Hash for FieldState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
        self.disabled.hash(state);
    }
}

/// Partial update applied by [`FieldState::updated`].
#[derive(Clone, Debug, Default)]
pub struct FieldPatch {
    value: Option<Value>,
    disabled: Option<bool>,
    active: Option<bool>,
    touched: Option<bool>,
}

impl FieldPatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the value.
    #[must_use]
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Replace the disabled flag.
    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    /// Replace the active flag.
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Replace the touched flag.
    #[must_use]
    pub fn touched(mut self, touched: bool) -> Self {
        self.touched = Some(touched);
        self
    }

    /// Check if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.disabled.is_none()
            && self.active.is_none()
            && self.touched.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updated_carries_unspecified_fields() {
        let state = FieldState::new("fizz", true);
        let next = state.updated(FieldPatch::new().touched(true));

        assert_eq!(next.value().as_str(), Some("fizz"));
        assert!(next.disabled());
        assert!(next.touched());
        assert!(!state.touched(), "original must not change");
    }

    #[test]
    fn test_equality_ignores_focus_history() {
        let state = FieldState::new(1, false);
        let focused = state.updated(FieldPatch::new().active(true).touched(true));

        assert_eq!(state, focused);
        assert!(!state.is_identical(&focused));
    }

    #[test]
    fn test_equality_includes_disabled() {
        let state = FieldState::new(1, false);
        assert_ne!(state, state.updated(FieldPatch::new().disabled(true)));
    }

    #[test]
    fn test_equals_absent_is_false() {
        let state = FieldState::new(1, false);
        assert!(!state.equals(None));
        assert!(state.equals(Some(&state.clone())));
    }

    #[test]
    fn test_empty_patch() {
        assert!(FieldPatch::new().is_empty());
        assert!(!FieldPatch::new().value(Value::Null).is_empty());
    }
}
