//! Attached validators
//!
//! A [`FieldValidator`] describes a check on one field, optionally reading
//! other fields as dependencies. Attaching it to a [`Form`] registers a
//! validation entry and keeps it current: the host calls
//! [`AttachedValidator::refresh`] after state changes and the validator
//! re-evaluates only when its extracted inputs actually changed.
//!
//! Asynchronous checks are debounced. Each evaluation bumps a generation
//! counter; a result is committed only if its generation is still the latest
//! when it settles. Detaching bumps the generation too, so nothing in flight
//! can write to the registry after the validator is gone.
//!
//! ```text
//! refresh ─▶ inputs changed? ─no─▶ done
//!               │yes
//!     sync ─────┼──────────── async
//!      │                        │
//!   compute            generation += 1
//!      │               commit {previous error, pending}
//!   commit                      │
//!                     sleep(debounce) ─▶ stale? drop
//!                               │
//!                        run check ─▶ stale? drop
//!                               │
//!                     commit {error, settled}
//! ```

use crate::form::{Form, ValidationRegistration};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;
use trellis_core::{
    extract, ArrayFieldRef, Extracted, FieldNode, FieldRef, FieldState, Projection, States,
    ValidationRegistry, ValidationResult, Value, Values,
};

/// Synchronous check over extracted inputs.
pub type SyncCheck<T> = Arc<dyn Fn(&Extracted<T>, &[Extracted<T>]) -> Option<String> + Send + Sync>;

/// Asynchronous check over extracted inputs.
pub type AsyncCheck<T> = Arc<
    dyn Fn(Extracted<T>, Vec<Extracted<T>>) -> BoxFuture<'static, anyhow::Result<Option<String>>>
        + Send
        + Sync,
>;

enum Check<T> {
    Immediate(SyncCheck<T>),
    Debounced {
        check: AsyncCheck<T>,
        debounce: Option<Duration>,
    },
}

/// Something a validator can be attached to.
pub trait ValidationTarget {
    /// Field the validation entry is registered under.
    fn key(&self) -> FieldRef;

    /// Node whose projection is the validator's primary input.
    fn node(&self) -> FieldNode;
}

impl ValidationTarget for FieldRef {
    fn key(&self) -> FieldRef {
        self.clone()
    }

    fn node(&self) -> FieldNode {
        FieldNode::Leaf(self.clone())
    }
}

impl ValidationTarget for ArrayFieldRef {
    fn key(&self) -> FieldRef {
        self.field().clone()
    }

    fn node(&self) -> FieldNode {
        FieldNode::Array(self.clone())
    }
}

impl<T: ValidationTarget + ?Sized> ValidationTarget for &T {
    fn key(&self) -> FieldRef {
        (**self).key()
    }

    fn node(&self) -> FieldNode {
        (**self).node()
    }
}

/// Description of a validator, ready to be attached to a form.
///
/// `P` selects whether the check sees values ([`Values`]) or full field
/// states ([`States`]).
pub struct FieldValidator<P: Projection = Values> {
    key: FieldRef,
    target: FieldNode,
    deps: Vec<FieldNode>,
    check: Check<P::Output>,
    _projection: PhantomData<fn() -> P>,
}

impl<P: Projection> FieldValidator<P> {
    fn with_check(target: impl ValidationTarget, check: Check<P::Output>) -> Self {
        Self {
            key: target.key(),
            target: target.node(),
            deps: Vec::new(),
            check,
            _projection: PhantomData,
        }
    }

    fn from_sync<F>(target: impl ValidationTarget, f: F) -> Self
    where
        F: Fn(&Extracted<P::Output>, &[Extracted<P::Output>]) -> Option<String>
            + Send
            + Sync
            + 'static,
    {
        Self::with_check(target, Check::Immediate(Arc::new(f)))
    }

    fn from_async<F, Fut>(target: impl ValidationTarget, f: F) -> Self
    where
        F: Fn(Extracted<P::Output>, Vec<Extracted<P::Output>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<String>>> + Send + 'static,
    {
        let check: AsyncCheck<P::Output> = Arc::new(move |value, deps| f(value, deps).boxed());
        Self::with_check(
            target,
            Check::Debounced {
                check,
                debounce: None,
            },
        )
    }

    /// Declare nodes whose projections are passed to the check as
    /// dependencies, in order.
    #[must_use]
    pub fn depends_on<I>(mut self, deps: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<FieldNode>,
    {
        self.deps.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Override the form's default debounce. Ignored by synchronous checks.
    #[must_use]
    pub fn debounce(mut self, delay: Duration) -> Self {
        if let Check::Debounced { debounce, .. } = &mut self.check {
            *debounce = Some(delay);
        }
        self
    }

    /// Field the validation entry is registered under.
    pub fn field(&self) -> &FieldRef {
        &self.key
    }

    /// Check if the validator runs asynchronously.
    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self.check, Check::Debounced { .. })
    }
}

impl FieldValidator<Values> {
    /// Synchronous check over values.
    pub fn sync<F>(target: impl ValidationTarget, f: F) -> Self
    where
        F: Fn(&Extracted<Value>, &[Extracted<Value>]) -> Option<String> + Send + Sync + 'static,
    {
        Self::from_sync(target, f)
    }

    /// Asynchronous check over values.
    pub fn asynchronous<F, Fut>(target: impl ValidationTarget, f: F) -> Self
    where
        F: Fn(Extracted<Value>, Vec<Extracted<Value>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<String>>> + Send + 'static,
    {
        Self::from_async(target, f)
    }
}

impl FieldValidator<States> {
    /// Synchronous check over full field states.
    pub fn sync_states<F>(target: impl ValidationTarget, f: F) -> Self
    where
        F: Fn(&Extracted<FieldState>, &[Extracted<FieldState>]) -> Option<String>
            + Send
            + Sync
            + 'static,
    {
        Self::from_sync(target, f)
    }

    /// Asynchronous check over full field states.
    pub fn async_states<F, Fut>(target: impl ValidationTarget, f: F) -> Self
    where
        F: Fn(Extracted<FieldState>, Vec<Extracted<FieldState>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<String>>> + Send + 'static,
    {
        Self::from_async(target, f)
    }
}

impl<P: Projection> fmt::Debug for FieldValidator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValidator")
            .field("field", &self.key)
            .field("deps", &self.deps.len())
            .field("async", &self.is_async())
            .finish()
    }
}

type Inputs<T> = (Extracted<T>, Vec<Extracted<T>>);

struct Slot<T> {
    registration: Option<ValidationRegistration>,
    generation: u64,
    detached: bool,
    inputs: Option<Inputs<T>>,
    result: ValidationResult,
}

impl<T> Slot<T> {
    fn commit(&mut self, registry: &ValidationRegistry, key: &FieldRef, result: ValidationResult) {
        if self.detached {
            return;
        }
        match self.registration.as_mut() {
            Some(registration) => {
                if self.result == result {
                    return;
                }
                registration.update(result.clone());
            }
            None => {
                self.registration = Some(ValidationRegistration::new(
                    registry.clone(),
                    key,
                    result.clone(),
                ));
            }
        }
        self.result = result;
    }
}

/// A validator attached to a form.
///
/// Dropping it (or calling [`AttachedValidator::detach`]) removes its entry
/// and discards any in-flight asynchronous result.
pub struct AttachedValidator<P: Projection = Values> {
    form: Form,
    key: FieldRef,
    target: FieldNode,
    deps: Vec<FieldNode>,
    check: Check<P::Output>,
    slot: Arc<Mutex<Slot<P::Output>>>,
}

impl<P: Projection> AttachedValidator<P> {
    pub(crate) fn attach(form: &Form, validator: FieldValidator<P>) -> Self {
        let attached = Self {
            form: form.clone(),
            key: validator.key,
            target: validator.target,
            deps: validator.deps,
            check: validator.check,
            slot: Arc::new(Mutex::new(Slot {
                registration: None,
                generation: 0,
                detached: false,
                inputs: None,
                result: ValidationResult::EMPTY,
            })),
        };
        attached.refresh();
        attached
    }

    /// Field the validation entry is registered under.
    pub fn field(&self) -> &FieldRef {
        &self.key
    }

    /// Result this validator last committed.
    #[must_use]
    pub fn result(&self) -> ValidationResult {
        self.slot.lock().result.clone()
    }

    /// Number of evaluations started so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.slot.lock().generation
    }

    /// Re-evaluate if the inputs changed since the last evaluation.
    ///
    /// Returns `true` if an evaluation was started.
    pub fn refresh(&self) -> bool {
        let snapshot = self.form.store().snapshot();
        let inputs: Inputs<P::Output> = (
            extract::<P>(&snapshot, &self.target),
            self.deps
                .iter()
                .map(|dep| extract::<P>(&snapshot, dep))
                .collect(),
        );

        let mut slot = self.slot.lock();
        if slot.detached || slot.inputs.as_ref() == Some(&inputs) {
            return false;
        }
        slot.inputs = Some(inputs.clone());
        slot.generation += 1;
        let generation = slot.generation;
        let registry = self.form.validations();

        match &self.check {
            Check::Immediate(check) => {
                let error = self.run_sync(check, &inputs);
                slot.commit(registry, &self.key, ValidationResult::settled(error));
            }
            Check::Debounced { check, debounce } => {
                let previous = slot.result.error.clone();
                slot.commit(registry, &self.key, ValidationResult::pending(previous));
                drop(slot);

                let delay = debounce.unwrap_or_else(|| self.form.config().default_debounce());
                self.spawn_async(check.clone(), inputs, generation, delay);
            }
        }

        tracing::trace!(field = %self.key.id(), generation, "validator evaluated");
        true
    }

    /// Remove the entry and discard anything in flight.
    pub fn detach(self) {}

    fn run_sync(&self, check: &SyncCheck<P::Output>, inputs: &Inputs<P::Output>) -> Option<String> {
        match panic::catch_unwind(AssertUnwindSafe(|| check(&inputs.0, &inputs.1))) {
            Ok(error) => error,
            Err(_) => {
                tracing::warn!(field = %self.key.id(), "validator panicked");
                Some(self.form.config().unexpected_error_message.clone())
            }
        }
    }

    fn spawn_async(
        &self,
        check: AsyncCheck<P::Output>,
        inputs: Inputs<P::Output>,
        generation: u64,
        delay: Duration,
    ) {
        let slot: Weak<Mutex<Slot<P::Output>>> = Arc::downgrade(&self.slot);
        let registry = self.form.validations().clone();
        let effects = self.form.effects().clone();
        let key = self.key.clone();
        let unexpected = self.form.config().unexpected_error_message.clone();

        let task = async move {
            effects.sleep(delay).await;
            if !is_current(&slot, generation) {
                tracing::trace!(field = %key.id(), generation, "validation superseded before start");
                return;
            }

            let (value, deps) = inputs;
            let outcome = AssertUnwindSafe(async move { check(value, deps).await })
                .catch_unwind()
                .await;
            let error = match outcome {
                Ok(Ok(error)) => error,
                Ok(Err(err)) => {
                    tracing::warn!(field = %key.id(), error = ?err, "validator failed");
                    Some(unexpected)
                }
                Err(_) => {
                    tracing::warn!(field = %key.id(), "validator panicked");
                    Some(unexpected)
                }
            };

            let Some(slot) = slot.upgrade() else {
                return;
            };
            let mut slot = slot.lock();
            if slot.detached || slot.generation != generation {
                tracing::trace!(field = %key.id(), generation, "discarding stale validation");
                return;
            }
            slot.commit(&registry, &key, ValidationResult::settled(error));
        };

        self.form.effects().spawn(task.boxed());
    }
}

fn is_current<T>(slot: &Weak<Mutex<Slot<T>>>, generation: u64) -> bool {
    slot.upgrade().is_some_and(|slot| {
        let slot = slot.lock();
        !slot.detached && slot.generation == generation
    })
}

impl<P: Projection> Drop for AttachedValidator<P> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        slot.detached = true;
        slot.generation += 1;
        slot.registration.take();
    }
}

impl<P: Projection> fmt::Debug for AttachedValidator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("AttachedValidator")
            .field("field", &self.key)
            .field("generation", &slot.generation)
            .field("result", &slot.result)
            .finish_non_exhaustive()
    }
}
