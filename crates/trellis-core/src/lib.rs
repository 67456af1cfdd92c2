//! Trellis Core - Field State Model for Tree-Shaped Forms
//!
//! This crate holds the pure, runtime-free part of the form engine: how fields
//! are identified, where their state lives, and how validation results are
//! aggregated. Anything that needs timers or task spawning lives in
//! `trellis-form`.
//!
//! # Building Blocks
//!
//! - [`FieldRef`]: an opaque identity handle carrying an immutable initial state.
//!   Two fields with the same initial value are still two distinct fields.
//! - [`ArrayFieldRef`]: a field whose value is an ordered list of child
//!   [`FieldNode`]s, produced by an item template.
//! - [`FieldState`]: value plus `disabled`/`active`/`touched` metadata.
//! - [`FormStateStore`]: the keyed store mapping field handles to states, published
//!   as versioned [`FormSnapshot`]s.
//! - [`resolve_mapping`]: resolves derived fields (see [`FieldRef::mapped_to`]) to their
//!   root field and the composed forward/backward transforms.
//! - [`ArrayFieldOps`]: bounds-checked structural mutation of array fields.
//! - [`extract`]: projects a field tree into a parallel tree of values or states.
//! - [`ValidationRegistry`]: aggregates independently registered validation results.
//!
//! # Usage
//!
//! ```rust,ignore
//! use trellis_core::{FieldPatch, FieldRef, FormStateStore};
//!
//! let name = FieldRef::new("fizz");
//! let store = FormStateStore::new();
//!
//! store.update(&name, |s| s.updated(FieldPatch::new().value("buzz")));
//! assert_eq!(store.get(&name).value().as_str(), Some("buzz"));
//!
//! store.reset();
//! assert_eq!(store.get(&name).value().as_str(), Some("fizz"));
//! ```

#![forbid(unsafe_code)]

pub mod array;
pub mod error;
pub mod extract;
pub mod field;
pub mod mapping;
pub mod reactive;
pub mod state;
pub mod store;
pub mod validation;
pub mod value;

pub use array::ArrayFieldOps;
pub use error::{CoreError, Result};
pub use extract::{extract, leaf_fields, Extracted, Projection, States, Values};
pub use field::{
    define_array_field, define_field, ArrayFieldRef, FieldId, FieldNode, FieldRef, ItemTemplate,
};
pub use mapping::{chain_len, resolve_mapping, FieldMapping, MappedRef, Transform};
pub use reactive::{Published, Subscription};
pub use state::{FieldPatch, FieldState};
pub use store::{FormSnapshot, FormStateStore, StoredField};
pub use validation::{EntryId, ValidationRegistry, ValidationResult, ValidationSnapshot};
pub use value::Value;
