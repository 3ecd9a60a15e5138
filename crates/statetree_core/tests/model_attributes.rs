use serde_json::json;
use statetree_core::model::Parent;
use statetree_core::{tick, Attributes, Computation, Model, ModelError, ModelOptions, Value};

#[test]
fn reserved_names_are_rejected_everywhere() {
    let model = Model::empty();

    assert_eq!(
        model.read_attribute("parent").expect_err("reserved read"),
        ModelError::ReservedField("parent".to_string())
    );
    assert!(matches!(
        model.assign_attribute("path", 1),
        Err(ModelError::ReservedField(_))
    ));
    assert!(matches!(
        model.assign_attribute("", 1),
        Err(ModelError::InvalidFieldName(_))
    ));
    assert!(model.attribute_names().is_empty());
}

#[test]
fn lazy_reads_return_the_same_child() {
    let root = Model::empty();

    let first = root.read_attribute("profile").expect("lazy read");
    let second = root.read_attribute("profile").expect("second read");
    let first = first.as_model().expect("singular name gives a model");
    let second = second.as_model().expect("still a model");
    assert!(first.ptr_eq(second));
    assert!(first.is_nil());
    assert_eq!(first.path(), vec!["profile".to_string()]);

    let tags = root.read_attribute("tags").expect("plural read");
    assert!(tags.as_collection().is_some());

    // uninstantiated children are not part of the snapshot
    assert_eq!(root.to_json(), json!({"tags": []}));
}

#[test]
fn read_chain_through_placeholders_stays_uninstantiated() {
    let root = Model::empty();
    let a = root.read_attribute("a").expect("read a");
    let a = a.as_model().expect("placeholder").clone();

    let b = a.read_attribute("b").expect("read b");
    let again = a.read_attribute("b").expect("read b again");
    let b = b.as_model().expect("placeholder");
    assert!(b.ptr_eq(again.as_model().expect("same placeholder")));
    assert_eq!(b.path(), vec!["a".to_string(), "b".to_string()]);

    assert!(a.is_nil());
    assert!(a.attribute_names().is_empty());
    assert_eq!(root.len(), 0);
    assert_eq!(root.to_json(), json!({}));

    b.assign_attribute("x", 1).expect("write below the chain");
    assert!(!a.is_nil());
    assert!(matches!(a.peek("b"), Some(Value::Model(ref held)) if held.ptr_eq(b)));
    assert_eq!(root.to_json(), json!({"a": {"b": {"x": 1}}}));
}

#[test]
fn empty_mass_assignment_expands_a_placeholder() {
    let root = Model::empty();
    let a = root.read_attribute("a").expect("read a");
    let a = a.as_model().expect("placeholder").clone();

    a.set_attributes(Attributes::new()).expect("mass assign");

    assert!(!a.is_nil());
    assert_eq!(root.to_json(), json!({"a": {}}));
}

#[test]
fn collection_items_carry_indexed_paths() {
    let root = Model::empty();
    let items = root.read_attribute("items").expect("read items");
    let items = items.as_collection().expect("plural gives collection").clone();

    items.push(json!({"name": "first"})).expect("push");
    items.push(json!({"name": "second"})).expect("push");

    let second = items.get(1).expect("second item");
    let second = second.as_model().expect("map wrapped into model");
    assert_eq!(second.path(), vec!["items".to_string(), "1".to_string()]);
    assert!(matches!(second.parent(), Some(Parent::Collection(_))));
    assert!(second.root().ptr_eq(&root));
    assert_eq!(
        root.to_json(),
        json!({"items": [{"name": "first"}, {"name": "second"}]})
    );
}

#[test]
fn deep_write_expands_every_ancestor() {
    let root = Model::empty();
    let observer = Computation::new();
    let a = observer.run(|| root.read_attribute("a").expect("read a"));
    let a = a.as_model().expect("model").clone();
    let b = a.read_attribute("b").expect("read b");
    let b = b.as_model().expect("model").clone();
    assert!(b.is_nil());

    let completion = b.assign_attribute("x", 1).expect("deep write");
    assert!(completion.expect("committed").is_resolved());

    assert!(!b.is_nil());
    assert_eq!(root.to_json(), json!({"a": {"b": {"x": 1}}}));
    assert!(observer.is_invalidated());
}

#[test]
fn lazy_size_notification_waits_for_the_end_of_the_tick() {
    let root = Model::empty();
    let observer = Computation::new();
    observer.run(|| root.len());

    tick::batch(|| {
        root.read_attribute("profile").expect("lazy read");
        assert!(!observer.is_invalidated());
        assert_eq!(tick::pending(), 1);
    });

    assert!(observer.is_invalidated());
    assert_eq!(tick::pending(), 0);
}

#[test]
fn key_observers_are_notified_on_write() {
    let model = Model::from_json(json!({"name": "a"}), ModelOptions::new()).expect("model");
    let observer = Computation::new();
    let name = observer.run(|| model.read_attribute("name").expect("read"));
    assert_eq!(name, Value::from("a"));

    model.assign_attribute("other", 1).expect("unrelated write");
    assert!(!observer.is_invalidated());

    model.assign_attribute("name", "b").expect("write");
    assert!(observer.is_invalidated());
    assert_eq!(observer.invalidation_count(), 1);
}

#[test]
fn models_compare_to_plain_maps_by_content() {
    let model =
        Model::from_json(json!({"a": 1, "b": "x"}), ModelOptions::new()).expect("model builds");

    assert_eq!(Value::Model(model.clone()), Value::from(json!({"a": 1, "b": "x"})));
    assert_ne!(Value::Model(model.clone()), Value::from(json!({"a": 1})));

    let other = Model::from_json(json!({"a": 1, "b": "x"}), ModelOptions::new()).expect("model");
    assert_ne!(Value::Model(model), Value::Model(other));

    let placeholder = Model::new(None, ModelOptions::new()).expect("uninstantiated");
    assert_eq!(Value::Model(placeholder), Value::Nil);
}

#[test]
fn append_requires_a_parent() {
    let root = Model::empty();
    assert_eq!(
        root.append(1).expect_err("root has no parent"),
        ModelError::NoParent { path: Vec::new() }
    );
}

#[test]
fn append_on_placeholder_creates_collection_in_parent() {
    let root = Model::empty();
    let tag = root.read_attribute("tag").expect("lazy read");
    let tag = tag.as_model().expect("placeholder").clone();

    let collection = tag.append("urgent").expect("append");
    tag.append("later").expect("append again");

    assert_eq!(collection.len(), 2);
    assert!(matches!(root.peek("tag"), Some(Value::Collection(_))));
    assert_eq!(root.to_json(), json!({"tag": ["urgent", "later"]}));
}

#[test]
fn append_to_rejects_scalar_fields() {
    let root = Model::from_json(json!({"title": "x"}), ModelOptions::new()).expect("model");
    root.append_to("notes", "n1").expect("plural field");
    assert_eq!(root.to_json(), json!({"title": "x", "notes": ["n1"]}));

    assert_eq!(
        root.append_to("title", "y").expect_err("scalar field"),
        ModelError::NotACollection {
            field: "title".to_string()
        }
    );
}
