//! Trellis Form - Form Instances and Validators
//!
//! This crate wires the pure field model from `trellis-core` to a runtime:
//!
//! - [`Form`]: one form instance with its own state store and validation
//!   registry. This is the API a host rendering layer calls.
//! - [`FormScope`] and [`current_form`]: thread-scoped access to the form a
//!   component is rendered under.
//! - [`FieldValidator`] / [`AttachedValidator`]: synchronous and debounced
//!   asynchronous validators that keep a registry entry current.
//! - [`FormConfig`]: debounce and fault-message settings.
//! - [`effects`]: timer and task spawning traits with a tokio handler.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use trellis_form::{define_field, FieldValidator, Form};
//!
//! let form = Form::new();
//! let email = define_field("");
//!
//! let validator = form.attach(
//!     FieldValidator::asynchronous(&email, |value, _| async move {
//!         let taken = lookup(value.as_leaf().and_then(|v| v.as_str())).await?;
//!         Ok(taken.then(|| "already registered".to_owned()))
//!     })
//!     .debounce(Duration::from_millis(300)),
//! );
//!
//! form.set_field_value(&email, "fizz@example.com");
//! validator.refresh(); // pending until the lookup settles
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod effects;
pub mod error;
pub mod form;
pub mod validator;

pub use config::FormConfig;
pub use context::{current_form, with_current, FormScope, FormScopeGuard};
pub use effects::{FormEffects, TaskSpawner, TimeEffects, TokioEffects};
pub use error::{FormError, Result};
pub use form::{Form, FormWithFields, ValidationRegistration};
pub use validator::{AttachedValidator, FieldValidator, ValidationTarget};

pub use trellis_core::{
    define_array_field, define_field, ArrayFieldRef, Extracted, FieldNode, FieldPatch, FieldRef,
    FieldState, ValidationResult, Value,
};
