//! End-to-end behaviour of the pure field model
//!
//! Exercises the store, array operations, extraction and registry together
//! through the public API only.

use trellis_core::{
    define_array_field, define_field, extract, leaf_fields, ArrayFieldOps, CoreError,
    Extracted, FieldNode, FieldPatch, FieldRef, FormStateStore, States, ValidationRegistry,
    ValidationResult, Value, Values,
};

fn value_of(store: &FormStateStore, field: &FieldRef) -> Value {
    store.get(field).value().clone()
}

#[test]
fn fizz_buzz_reset_scenario() {
    let store = FormStateStore::new();
    let name = define_field("fizz");

    assert_eq!(value_of(&store, &name), Value::from("fizz"));

    store.update(&name, |s| s.updated(FieldPatch::new().value("buzz")));
    assert_eq!(value_of(&store, &name), Value::from("buzz"));

    store.reset();
    assert_eq!(value_of(&store, &name), Value::from("fizz"));
}

#[test]
fn modified_flag_follows_values() {
    let store = FormStateStore::new();
    let name = define_field("fizz");
    assert!(!store.modified());

    store.set(&name, store.get(&name).updated(FieldPatch::new().value("buzz")));
    assert!(store.modified());

    store.reset();
    assert!(!store.modified());
}

#[test]
fn extraction_reproduces_tree_shape() {
    let store = FormStateStore::new();
    let title = define_field("title");
    let tags = define_array_field(["a", "b"], |v| define_field(v).into());
    let city = define_field("Berlin");

    let root = FieldNode::group([
        ("title", FieldNode::from(&title)),
        ("tags", FieldNode::from(&tags)),
        ("address", FieldNode::group([("city", &city)])),
    ]);
    let snapshot = store.snapshot();

    let values = extract::<Values>(&snapshot, &root);
    let expected = Extracted::Group(
        [
            ("title".to_owned(), Extracted::Leaf(Value::from("title"))),
            (
                "tags".to_owned(),
                Extracted::List(vec![
                    Extracted::Leaf(Value::from("a")),
                    Extracted::Leaf(Value::from("b")),
                ]),
            ),
            (
                "address".to_owned(),
                Extracted::Group(
                    [("city".to_owned(), Extracted::Leaf(Value::from("Berlin")))]
                        .into_iter()
                        .collect(),
                ),
            ),
        ]
        .into_iter()
        .collect(),
    );
    assert_eq!(values, expected);

    let states = extract::<States>(&snapshot, &root);
    let city_state = states
        .get("address")
        .and_then(|a| a.get("city"))
        .and_then(Extracted::as_leaf);
    assert_eq!(city_state, Some(city.initial_state()));
    assert_eq!(states.get("tags").and_then(Extracted::as_list).map(<[_]>::len), Some(2));
}

#[test]
fn existing_children_survive_insertions() {
    let store = FormStateStore::new();
    let list = define_array_field(["a", "b"], |v| define_field(v).into());
    let ops = ArrayFieldOps::new(&store, &list);
    let before = ops.items().unwrap();

    ops.push("c").unwrap();
    ops.unshift("z").unwrap();
    ops.insert(2, "m").unwrap();

    let after = ops.items().unwrap();
    assert_eq!(after.len(), 5);
    assert_eq!(after[1], before[0]);
    assert_eq!(after[3], before[1]);
}

#[test]
fn out_of_range_structural_access_does_not_mutate() {
    let store = FormStateStore::new();
    let list = define_array_field(["a", "b"], |v| define_field(v).into());
    let ops = ArrayFieldOps::new(&store, &list);
    let before = ops.items().unwrap();
    let len = before.len();

    assert!(ops.move_item(usize::MAX, 0).is_err());
    assert!(ops.move_item(0, len).is_err());
    assert!(matches!(
        ops.swap(len, 0),
        Err(CoreError::InvalidElementAccess { .. })
    ));

    assert_eq!(ops.items().unwrap(), before);
    assert_eq!(store.version(), 0);
}

#[test]
fn derived_siblings_share_root_state() {
    let store = FormStateStore::new();
    let cents = define_field(250);
    let euros = cents.mapped_to(
        |v| Value::from(v.as_i64().unwrap_or_default() as f64 / 100.0),
        |v| Value::from((v.as_f64().unwrap_or_default() * 100.0).round() as i64),
    );
    let label = cents.mapped_to(
        |v| Value::from(format!("{} ct", v.as_i64().unwrap_or_default())),
        |v| {
            let text = v.as_str().unwrap_or_default().trim_end_matches(" ct");
            Value::from(text.parse::<i64>().unwrap_or_default())
        },
    );

    store.update(&euros, |s| s.updated(FieldPatch::new().value(3.5)));

    assert_eq!(value_of(&store, &cents), Value::from(350));
    assert_eq!(value_of(&store, &label), Value::from("350 ct"));
    assert_eq!(store.snapshot().len(), 1);
}

#[test]
fn validation_follows_array_children() {
    let store = FormStateStore::new();
    let registry = ValidationRegistry::new();
    let list = define_array_field(["a"], |v| define_field(v).into());
    let node = FieldNode::from(&list);
    let ops = ArrayFieldOps::new(&store, &list);

    let child = ops.push("b").unwrap();
    let child_field = child.as_field().unwrap();
    let entry = registry.register(child_field, ValidationResult::with_error("too short"));

    let fields = leaf_fields(&store.snapshot(), &node);
    assert!(!registry.is_field_valid(&fields));

    // Removing the child removes it from the leaf set, and tearing down
    // its registration clears the error.
    ops.remove(&child).unwrap();
    registry.unregister(entry);
    let fields = leaf_fields(&store.snapshot(), &node);
    assert!(registry.is_field_valid(&fields));
    assert!(registry.valid());
}
