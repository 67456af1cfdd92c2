//! Form scope
//!
//! Hosts that render nested components without threading a [`Form`] handle
//! through every call can install a form as the current one for the calling
//! thread. Scopes nest; dropping a guard restores whatever was current before.
//!
//! The free functions in this module mirror the [`Form`] accessors and fail
//! with [`FormError::MissingFormContext`] when no scope is active.

use crate::error::{FormError, Result};
use crate::form::Form;
use std::cell::RefCell;
use std::marker::PhantomData;
use trellis_core::{Extracted, FieldNode, FieldRef, FieldState, ValidationResult, Value};

thread_local! {
    static FORM_STACK: RefCell<Vec<Form>> = const { RefCell::new(Vec::new()) };
}

/// Entry point for installing a current form.
#[derive(Debug, Clone, Copy)]
pub struct FormScope;

impl FormScope {
    /// Install `form` as the current form until the guard is dropped.
    pub fn enter(form: &Form) -> FormScopeGuard {
        let depth = FORM_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(form.clone());
            stack.len() - 1
        });
        tracing::trace!(depth, "form scope entered");
        FormScopeGuard {
            depth,
            _not_send: PhantomData,
        }
    }

    /// Run `f` with `form` installed as the current form.
    pub fn run<R>(form: &Form, f: impl FnOnce() -> R) -> R {
        let _guard = Self::enter(form);
        f()
    }
}

/// Restores the previous current form when dropped.
///
/// Guards are tied to the thread that created them.
#[derive(Debug)]
#[must_use = "the scope ends as soon as the guard is dropped"]
pub struct FormScopeGuard {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl Drop for FormScopeGuard {
    fn drop(&mut self) {
        FORM_STACK.with(|stack| stack.borrow_mut().truncate(self.depth));
        tracing::trace!(depth = self.depth, "form scope exited");
    }
}

/// The innermost current form on this thread.
pub fn current_form() -> Result<Form> {
    FORM_STACK
        .with(|stack| stack.borrow().last().cloned())
        .ok_or(FormError::MissingFormContext)
}

/// Check if a form scope is active on this thread.
#[must_use]
pub fn has_current_form() -> bool {
    FORM_STACK.with(|stack| !stack.borrow().is_empty())
}

/// Run `f` against the current form.
///
/// The form is cloned out of the scope stack first, so `f` may enter nested
/// scopes.
pub fn with_current<R>(f: impl FnOnce(&Form) -> R) -> Result<R> {
    let form = current_form()?;
    Ok(f(&form))
}

// ─── Scoped Accessors ────────────────────────────────────────

/// [`Form::get_field_state`] on the current form.
pub fn get_field_state(field: &FieldRef) -> Result<FieldState> {
    with_current(|form| form.get_field_state(field))
}

/// [`Form::get_field_value`] on the current form.
pub fn get_field_value(field: &FieldRef) -> Result<Value> {
    with_current(|form| form.get_field_value(field))
}

/// [`Form::set_field_state`] on the current form.
pub fn set_field_state(field: &FieldRef, state: FieldState) -> Result<bool> {
    with_current(|form| form.set_field_state(field, state))
}

/// [`Form::update_field_state`] on the current form.
pub fn update_field_state<F>(field: &FieldRef, f: F) -> Result<bool>
where
    F: FnOnce(&FieldState) -> FieldState,
{
    with_current(|form| form.update_field_state(field, f))
}

/// [`Form::get_values`] on the current form.
pub fn get_values(node: &FieldNode) -> Result<Extracted<Value>> {
    with_current(|form| form.get_values(node))
}

/// [`Form::get_states`] on the current form.
pub fn get_states(node: &FieldNode) -> Result<Extracted<FieldState>> {
    with_current(|form| form.get_states(node))
}

/// [`Form::get_validation_result`] on the current form.
pub fn get_validation_result(field: &FieldRef) -> Result<ValidationResult> {
    with_current(|form| form.get_validation_result(field))
}

/// [`Form::is_field_valid`] on the current form.
pub fn is_field_valid(node: &FieldNode) -> Result<bool> {
    with_current(|form| form.is_field_valid(node))
}

/// [`Form::reset`] on the current form.
pub fn reset() -> Result<()> {
    with_current(Form::reset)
}

/// [`Form::modified`] on the current form.
pub fn modified() -> Result<bool> {
    with_current(Form::modified)
}

/// [`Form::valid`] on the current form.
pub fn valid() -> Result<bool> {
    with_current(Form::valid)
}

/// [`Form::pending`] on the current form.
pub fn pending() -> Result<bool> {
    with_current(Form::pending)
}
