//! Form API as seen by a host rendering layer

use assert_matches::assert_matches;
use trellis_form::context::{self, FormScope};
use trellis_form::{
    define_array_field, define_field, Extracted, FieldNode, FieldPatch, FieldValidator, Form,
    FormError, ValidationResult, Value,
};

#[test]
fn fizz_buzz_reset_scenario() {
    let form = Form::new();
    let name = define_field("fizz");

    assert_eq!(form.get_field_value(&name), Value::from("fizz"));
    form.update_field_state(&name, |s| s.updated(FieldPatch::new().value("buzz")));
    assert_eq!(form.get_field_value(&name), Value::from("buzz"));
    assert!(form.modified());

    form.reset();
    assert_eq!(form.get_field_value(&name), Value::from("fizz"));
    assert!(!form.modified());
}

#[test]
fn scoped_accessors_require_a_form() {
    let name = define_field("fizz");
    assert_matches!(
        context::get_field_state(&name),
        Err(FormError::MissingFormContext)
    );

    let form = Form::new();
    let result = FormScope::run(&form, || {
        context::set_field_state(&name, name.initial_state().updated(FieldPatch::new().value(1)))
    });
    assert_eq!(result, Ok(true));
    assert_eq!(form.get_field_value(&name), Value::from(1));
}

#[test]
fn array_children_validate_with_the_array() {
    let form = Form::new();
    let people = define_array_field(["fizz"], |v| {
        FieldNode::group([("name", define_field(v))])
    });
    let root = FieldNode::from(&people);

    let child = form.array(&people).push("").unwrap();
    let child_name = child.get("name").and_then(FieldNode::as_field).unwrap().clone();
    let validator = form.attach(FieldValidator::sync(&child_name, |value, _| {
        let empty = value.as_leaf().and_then(Value::as_str).map_or(true, str::is_empty);
        empty.then(|| "required".to_owned())
    }));
    assert!(!form.is_field_valid(&root));

    form.array(&people).remove(&child).unwrap();
    validator.detach();
    assert!(form.is_field_valid(&root));

    let values = form.get_values(&root);
    assert_eq!(values.as_list().map(<[_]>::len), Some(1));
}

#[test]
fn whole_array_validator() {
    let form = Form::new();
    let tags = define_array_field(Vec::<Value>::new(), |v| define_field(v).into());
    let node = FieldNode::from(&tags);

    let validator = form.attach(FieldValidator::sync(&tags, |items, _| {
        let count = items.as_list().map_or(0, <[_]>::len);
        (count == 0).then(|| "add at least one tag".to_owned())
    }));
    assert!(!form.valid());
    assert_eq!(
        form.get_validation_result(tags.field()).error.as_deref(),
        Some("add at least one tag")
    );
    // Validity of the array node only looks at its leaves.
    assert!(form.is_field_valid(&node));

    form.array(&tags).push("rust").unwrap();
    validator.refresh();
    assert!(form.valid());
    assert!(form.is_field_valid(&node));
}

#[test]
fn derived_field_round_trip() {
    let form = Form::new();
    let cents = define_field(150);
    let euros = cents.mapped_to(
        |v| Value::from(v.as_i64().unwrap_or_default() as f64 / 100.0),
        |v| Value::from((v.as_f64().unwrap_or_default() * 100.0).round() as i64),
    );

    form.set_field_value(&euros, 2.5);
    assert_eq!(form.get_field_value(&cents), Value::from(250));
    assert!(form.get_field_state(&cents).touched());
    assert!(form.modified());
}

#[test]
fn change_feeds_report_each_update_once() {
    let form = Form::new();
    let name = define_field("");
    let mut states = form.subscribe_states();
    let mut validations = form.subscribe_validations();

    form.set_field_value(&name, "fizz");
    form.set_field_value(&name, "fizz");
    assert!(states.poll().is_some());
    assert_eq!(states.last_observed_version(), 1);

    let registration = form.register_validation(&name, ValidationResult::EMPTY);
    registration.unregister();
    assert!(validations.poll().is_some());
    assert_eq!(validations.last_observed_version(), 2);
}

#[test]
fn bound_tree_values() {
    let form = Form::new();
    let name = define_field("fizz");
    let bound = form.with_fields(FieldNode::group([("name", &name)]));

    form.set_field_value(&name, "buzz");
    assert_eq!(
        bound.values().get("name"),
        Some(&Extracted::Leaf(Value::from("buzz")))
    );

    bound.reset();
    assert_eq!(
        bound.states().get("name").and_then(Extracted::as_leaf),
        Some(name.initial_state())
    );
}
