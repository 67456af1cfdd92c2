//! # Form Instance
//!
//! [`Form`] is the surface a host rendering layer talks to. It owns one
//! [`FormStateStore`], one [`ValidationRegistry`], the runtime configuration
//! and the effect handlers used by asynchronous validators.
//!
//! ## Example
//!
//! ```rust,ignore
//! use trellis_form::{Form, FieldRef};
//!
//! let form = Form::new();
//! let name = FieldRef::new("fizz");
//!
//! form.set_field_value(&name, "buzz");
//! assert!(form.get_field_state(&name).touched());
//! assert!(form.modified());
//!
//! form.reset();
//! assert_eq!(form.get_field_value(&name).as_str(), Some("fizz"));
//! ```
//!
//! Cloning a `Form` yields another handle to the same instance. Two separately
//! constructed forms never share state, even for the same field references.

use crate::config::FormConfig;
use crate::context::{FormScope, FormScopeGuard};
use crate::effects::{FormEffects, TokioEffects};
use crate::validator::{AttachedValidator, FieldValidator};
use std::fmt;
use std::sync::Arc;
use trellis_core::{
    extract, leaf_fields, ArrayFieldOps, ArrayFieldRef, EntryId, Extracted, FieldNode,
    FieldPatch, FieldRef, FieldState, FormSnapshot, FormStateStore, Projection, States,
    Subscription, ValidationRegistry, ValidationResult, ValidationSnapshot, Value, Values,
};

struct FormInner {
    store: FormStateStore,
    validations: ValidationRegistry,
    config: FormConfig,
    effects: Arc<dyn FormEffects>,
}

/// Handle to one form instance.
#[derive(Clone)]
pub struct Form {
    inner: Arc<FormInner>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Create a form with default configuration and tokio effects.
    pub fn new() -> Self {
        Self::with_config(FormConfig::default())
    }

    /// Create a form with `config` and tokio effects.
    pub fn with_config(config: FormConfig) -> Self {
        Self::with_parts(config, Arc::new(TokioEffects::new()))
    }

    /// Create a form with explicit configuration and effect handlers.
    pub fn with_parts(config: FormConfig, effects: Arc<dyn FormEffects>) -> Self {
        Self {
            inner: Arc::new(FormInner {
                store: FormStateStore::new(),
                validations: ValidationRegistry::new(),
                config,
                effects,
            }),
        }
    }

    /// Runtime configuration.
    pub fn config(&self) -> &FormConfig {
        &self.inner.config
    }

    /// Effect handlers used by asynchronous validators.
    pub fn effects(&self) -> &Arc<dyn FormEffects> {
        &self.inner.effects
    }

    /// The underlying state store.
    pub fn store(&self) -> &FormStateStore {
        &self.inner.store
    }

    /// The underlying validation registry.
    pub fn validations(&self) -> &ValidationRegistry {
        &self.inner.validations
    }

    /// Check if two handles refer to the same form instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Make this form the current one for the calling thread.
    pub fn enter(&self) -> FormScopeGuard {
        FormScope::enter(self)
    }

    // ─── Field State ─────────────────────────────────────────

    /// Current state of `field`.
    #[must_use]
    pub fn get_field_state(&self, field: &FieldRef) -> FieldState {
        self.inner.store.get(field)
    }

    /// Current value of `field`.
    #[must_use]
    pub fn get_field_value(&self, field: &FieldRef) -> Value {
        self.inner.store.get(field).into_value()
    }

    /// Replace the state of `field`. Returns `true` if anything changed.
    pub fn set_field_state(&self, field: &FieldRef, state: FieldState) -> bool {
        self.inner.store.set(field, state)
    }

    /// Apply `f` to the state of `field`. Returns `true` if anything changed.
    pub fn update_field_state<F>(&self, field: &FieldRef, f: F) -> bool
    where
        F: FnOnce(&FieldState) -> FieldState,
    {
        self.inner.store.update(field, f)
    }

    /// Set the value of `field` and mark it touched.
    ///
    /// Does nothing when `value` equals the current value.
    pub fn set_field_value(&self, field: &FieldRef, value: impl Into<Value>) -> bool {
        let value = value.into();
        self.inner.store.update(field, |state| {
            if state.value() == &value {
                state.clone()
            } else {
                state.updated(FieldPatch::new().value(value).touched(true))
            }
        })
    }

    /// Enable or disable `field`.
    pub fn set_field_disabled(&self, field: &FieldRef, disabled: bool) -> bool {
        self.inner
            .store
            .update(field, |state| state.updated(FieldPatch::new().disabled(disabled)))
    }

    /// Mark `field` focused. Focusing also marks it touched.
    pub fn focus_field(&self, field: &FieldRef) -> bool {
        self.inner.store.update(field, |state| {
            state.updated(FieldPatch::new().active(true).touched(true))
        })
    }

    /// Mark `field` no longer focused.
    pub fn blur_field(&self, field: &FieldRef) -> bool {
        self.inner
            .store
            .update(field, |state| state.updated(FieldPatch::new().active(false)))
    }

    /// Restore every field to its initial state.
    pub fn reset(&self) {
        self.inner.store.reset();
    }

    /// Check if any field differs from its initial state.
    #[must_use]
    pub fn modified(&self) -> bool {
        self.inner.store.modified()
    }

    // ─── Structure ───────────────────────────────────────────

    /// Structural operations on `field` within this form.
    pub fn array<'a>(&'a self, field: &'a ArrayFieldRef) -> ArrayFieldOps<'a> {
        ArrayFieldOps::new(&self.inner.store, field)
    }

    /// Values of every field under `node`, shaped like `node`.
    #[must_use]
    pub fn get_values(&self, node: &FieldNode) -> Extracted<Value> {
        extract::<Values>(&self.inner.store.snapshot(), node)
    }

    /// States of every field under `node`, shaped like `node`.
    #[must_use]
    pub fn get_states(&self, node: &FieldNode) -> Extracted<FieldState> {
        extract::<States>(&self.inner.store.snapshot(), node)
    }

    /// Project `node` with an arbitrary projection.
    #[must_use]
    pub fn extract<P: Projection>(&self, node: &FieldNode) -> Extracted<P::Output> {
        extract::<P>(&self.inner.store.snapshot(), node)
    }

    // ─── Validation ──────────────────────────────────────────

    /// Register a validation entry for `field`.
    ///
    /// The entry lives as long as the returned registration.
    pub fn register_validation(
        &self,
        field: &FieldRef,
        result: ValidationResult,
    ) -> ValidationRegistration {
        ValidationRegistration::new(self.inner.validations.clone(), field, result)
    }

    /// Visible validation result of `field`.
    #[must_use]
    pub fn get_validation_result(&self, field: &FieldRef) -> ValidationResult {
        self.inner.validations.validation_result(field)
    }

    /// Check if every leaf field under `node` is valid and settled.
    ///
    /// Arrays contribute their current children's leaves, not their own
    /// entries; those still count towards [`Form::valid`].
    #[must_use]
    pub fn is_field_valid(&self, node: &FieldNode) -> bool {
        let fields = leaf_fields(&self.inner.store.snapshot(), node);
        self.inner.validations.is_field_valid(&fields)
    }

    /// Check if no entry has an error and none is pending.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.inner.validations.valid()
    }

    /// Check if any validation is in flight.
    #[must_use]
    pub fn pending(&self) -> bool {
        self.inner.validations.pending()
    }

    /// Attach a validator and run its first evaluation.
    pub fn attach<P: Projection>(&self, validator: FieldValidator<P>) -> AttachedValidator<P> {
        AttachedValidator::attach(self, validator)
    }

    // ─── Change Feeds ────────────────────────────────────────

    /// Subscribe to field state snapshots.
    pub fn subscribe_states(&self) -> Subscription<FormSnapshot> {
        self.inner.store.subscribe()
    }

    /// Subscribe to validation snapshots.
    pub fn subscribe_validations(&self) -> Subscription<ValidationSnapshot> {
        self.inner.validations.subscribe()
    }

    /// Bind a root field tree to this form, resetting its state.
    pub fn with_fields(&self, fields: impl Into<FieldNode>) -> FormWithFields {
        FormWithFields::new(self.clone(), fields.into())
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("config", &self.inner.config)
            .field("state_version", &self.inner.store.version())
            .field("validation_version", &self.inner.validations.version())
            .finish_non_exhaustive()
    }
}

/// A registered validation entry.
///
/// Dropping the registration removes the entry.
#[derive(Debug)]
pub struct ValidationRegistration {
    registry: ValidationRegistry,
    entry: Option<EntryId>,
}

impl ValidationRegistration {
    pub(crate) fn new(
        registry: ValidationRegistry,
        field: &FieldRef,
        result: ValidationResult,
    ) -> Self {
        let entry = registry.register(field, result);
        Self {
            registry,
            entry: Some(entry),
        }
    }

    /// Current registry entry, if still registered.
    pub fn entry(&self) -> Option<EntryId> {
        self.entry
    }

    /// Replace the registered result.
    ///
    /// The new entry is added before the old one is removed, in one publish.
    /// Returns `false` if the entry is no longer registered.
    pub fn update(&mut self, result: ValidationResult) -> bool {
        let Some(old) = self.entry else {
            return false;
        };
        self.entry = self.registry.reregister(old, result);
        if self.entry.is_none() {
            tracing::debug!(entry = %old, "validation entry was removed elsewhere; update dropped");
        }
        self.entry.is_some()
    }

    /// Remove the entry now.
    pub fn unregister(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.registry.unregister(entry);
        }
    }
}

impl Drop for ValidationRegistration {
    fn drop(&mut self) {
        self.release();
    }
}

/// A form bound to one root field tree.
#[derive(Clone, Debug)]
pub struct FormWithFields {
    form: Form,
    fields: FieldNode,
}

impl FormWithFields {
    fn new(form: Form, fields: FieldNode) -> Self {
        form.reset();
        Self { form, fields }
    }

    /// The underlying form.
    pub fn form(&self) -> &Form {
        &self.form
    }

    /// The bound field tree.
    pub fn fields(&self) -> &FieldNode {
        &self.fields
    }

    /// Bind a different tree. The form is reset only if the tree changed.
    pub fn set_fields(&mut self, fields: impl Into<FieldNode>) {
        let fields = fields.into();
        if fields != self.fields {
            self.form.reset();
            self.fields = fields;
        }
    }

    /// Values of the bound tree.
    #[must_use]
    pub fn values(&self) -> Extracted<Value> {
        self.form.get_values(&self.fields)
    }

    /// States of the bound tree.
    #[must_use]
    pub fn states(&self) -> Extracted<FieldState> {
        self.form.get_states(&self.fields)
    }

    /// Check if every field of the bound tree is valid and settled.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.form.is_field_valid(&self.fields)
    }

    /// Restore every field to its initial state.
    pub fn reset(&self) {
        self.form.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{define_array_field, define_field};

    #[test]
    fn test_set_field_value_touches() {
        let form = Form::new();
        let name = define_field("fizz");

        assert!(form.set_field_value(&name, "buzz"));
        let state = form.get_field_state(&name);
        assert_eq!(state.value().as_str(), Some("buzz"));
        assert!(state.touched());
    }

    #[test]
    fn test_set_equal_value_publishes_nothing() {
        let form = Form::new();
        let name = define_field("fizz");

        assert!(!form.set_field_value(&name, "fizz"));
        assert_eq!(form.store().version(), 0);
        assert!(!form.get_field_state(&name).touched());
    }

    #[test]
    fn test_signed_zero_write_is_a_no_op() {
        let form = Form::new();
        let amount = define_field(0.0);

        assert!(!form.set_field_value(&amount, -0.0));
        assert!(!form.modified());
    }

    #[test]
    fn test_focus_and_blur() {
        let form = Form::new();
        let name = define_field("");

        form.focus_field(&name);
        let state = form.get_field_state(&name);
        assert!(state.active());
        assert!(state.touched());

        form.blur_field(&name);
        let state = form.get_field_state(&name);
        assert!(!state.active());
        assert!(state.touched());
        assert!(!form.modified());
    }

    #[test]
    fn test_disable_marks_modified() {
        let form = Form::new();
        let name = define_field("");

        form.set_field_disabled(&name, true);
        assert!(form.get_field_state(&name).disabled());
        assert!(form.modified());
    }

    #[test]
    fn test_forms_do_not_share_state() {
        let a = Form::new();
        let b = Form::new();
        let name = define_field("fizz");

        a.set_field_value(&name, "buzz");
        assert_eq!(b.get_field_value(&name).as_str(), Some("fizz"));
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&a.clone()));
    }

    #[test]
    fn test_registration_lifecycle() {
        let form = Form::new();
        let name = define_field("");

        let mut registration =
            form.register_validation(&name, ValidationResult::with_error("required"));
        assert!(!form.valid());

        assert!(registration.update(ValidationResult::EMPTY));
        assert!(form.valid());
        assert_eq!(form.get_validation_result(&name), ValidationResult::EMPTY);

        registration.update(ValidationResult::with_error("again"));
        drop(registration);
        assert!(form.valid());
        assert!(form.validations().snapshot().is_empty());
    }

    #[test]
    fn test_update_after_external_unregister() {
        let form = Form::new();
        let name = define_field("");
        let mut registration = form.register_validation(&name, ValidationResult::EMPTY);
        let entry = registration.entry().unwrap();

        assert!(form.validations().unregister(entry));
        assert!(!registration.update(ValidationResult::with_error("late")));
        assert_eq!(registration.entry(), None);
        assert!(form.validations().snapshot().is_empty());

        let version = form.validations().version();
        assert!(!registration.update(ValidationResult::with_error("again")));
        assert_eq!(form.validations().version(), version);
    }

    #[test]
    fn test_is_field_valid_ignores_array_level_entries() {
        let form = Form::new();
        let list = define_array_field(Vec::<Value>::new(), |v| define_field(v).into());
        let node = FieldNode::from(&list);

        let _registration =
            form.register_validation(list.field(), ValidationResult::with_error("array-level"));
        assert!(form.is_field_valid(&node));
        assert!(!form.valid());
        assert_eq!(
            form.get_validation_result(list.field()).error.as_deref(),
            Some("array-level")
        );
    }

    #[test]
    fn test_with_fields_resets() {
        let form = Form::new();
        let name = define_field("fizz");
        form.set_field_value(&name, "buzz");

        let bound = form.with_fields(&name);
        assert_eq!(bound.values(), Extracted::Leaf(Value::from("fizz")));
        assert!(bound.is_valid());

        form.set_field_value(&name, "buzz");
        let mut bound = bound;
        bound.set_fields(&name);
        assert!(form.modified(), "same tree keeps state");

        bound.set_fields(define_field("other"));
        assert!(!form.modified());
    }
}
