use serde_json::json;
use statetree_core::persistor::ChangeRecord;
use statetree_core::{
    Attributes, ClassPaths, Computation, MemoryStore, Model, ModelError, ModelOptions, RuleSet,
    Schema, Value,
};
use std::rc::Rc;

fn attrs(value: serde_json::Value) -> Attributes {
    match Value::from(value) {
        Value::Map(attributes) => attributes,
        other => panic!("expected object, got {}", other.kind()),
    }
}

#[test]
fn invalid_key_leaves_model_untouched() {
    let model = Model::from_json(json!({"a": 1}), ModelOptions::new()).expect("model");
    let generation = model.generation();

    let err = model
        .set_attributes(attrs(json!({"a": 2, "options": {}})))
        .expect_err("reserved key");
    assert_eq!(err, ModelError::ReservedField("options".to_string()));
    assert_eq!(model.to_json(), json!({"a": 1}));
    assert_eq!(model.generation(), generation);
}

#[test]
fn each_mass_assignment_replaces_the_registry_once() {
    let model = Model::from_json(json!({"name": "a"}), ModelOptions::new()).expect("model");
    let generation = model.generation();

    let observer = Computation::new();
    observer.run(|| model.read_attribute("name").expect("read"));

    model
        .set_attributes(attrs(json!({"name": "a"})))
        .expect("mass assign");
    assert_eq!(model.generation(), generation + 1);
    assert!(observer.is_invalidated());
    assert_eq!(observer.invalidation_count(), 1);

    // re-running subscribes to the fresh registry
    observer.run(|| model.read_attribute("name").expect("read"));
    model.assign_attribute("name", "b").expect("write");
    assert_eq!(observer.invalidation_count(), 2);
}

#[test]
fn id_is_assigned_before_other_fields() {
    let schema = Schema::new("tagged").with_setter("alias", |model, value| {
        let owner = model.peek("id").unwrap_or_default();
        model.assign_attribute("alias_owner", owner)?;
        model.assign_attribute("alias", value)
    });
    let options = ModelOptions::new().with_class_paths(Rc::new(ClassPaths::new().register(&[], schema)));
    let model = Model::new(None, options).expect("uninstantiated");

    model
        .set_attributes(attrs(json!({"alias": "x", "id": "abc"})))
        .expect("mass assign");
    assert_eq!(model.peek("alias_owner"), Some(Value::from("abc")));
    assert_eq!(model.peek("alias"), Some(Value::from("x")));
}

#[test]
fn custom_accessors_are_used() {
    let schema = Schema::new("person")
        .with_setter("name", |model, value| {
            let upper = value.as_str().map(str::to_uppercase);
            model.assign_attribute("name", upper.map_or(value, Value::from))
        })
        .with_getter("greeting", |model| {
            let name = model.read_attribute("name")?;
            Ok(Value::from(format!("hello {}", name.as_str().unwrap_or("?"))))
        });
    let options = ModelOptions::new().with_class_paths(Rc::new(ClassPaths::new().register(&[], schema)));

    let model = Model::from_json(json!({"name": "ada"}), options).expect("model");
    assert_eq!(model.peek("name"), Some(Value::from("ADA")));
    assert_eq!(model.get("greeting").expect("getter"), Value::from("hello ADA"));

    model.set("name", "grace").expect("setter");
    assert_eq!(model.get("name").expect("plain read"), Value::from("GRACE"));
}

#[test]
fn absent_keys_are_removed_except_id() {
    let store = MemoryStore::new();
    let model = Model::from_json(
        json!({"id": "m1", "a": 1, "b": 2}),
        ModelOptions::new().with_persistor(store.factory()),
    )
    .expect("model");

    model
        .set_attributes(attrs(json!({"a": 1, "c": 3})))
        .expect("mass assign");

    assert_eq!(model.to_json(), json!({"id": "m1", "a": 1, "c": 3}));
    assert!(model.changed_attributes().is_empty());
    assert_eq!(
        store.changes(),
        vec![ChangeRecord {
            path: Vec::new(),
            field: None,
            new: true,
        }]
    );
    assert_eq!(store.document("m1"), Some(json!({"id": "m1", "a": 1, "c": 3})));
}

#[test]
fn rejected_mass_assignment_restores_removed_keys() {
    let paths = ClassPaths::new().register(
        &[],
        Schema::new("doc").with_validator(RuleSet::new().presence("title")),
    );
    let model = Model::loaded(
        Some(attrs(json!({"title": "t", "body": "x"}))),
        ModelOptions::new().with_class_paths(Rc::new(paths)),
    )
    .expect("loaded");

    let outcome = model
        .set_attributes(attrs(json!({"body": "y"})))
        .expect("mass assign");
    assert!(outcome.is_none());
    assert_eq!(model.to_json(), json!({"title": "t", "body": "x"}));
    assert!(model.errors().contains("title"));
}

#[test]
fn construction_never_persists() {
    let store = MemoryStore::new();
    let model = Model::from_json(
        json!({"name": "n", "address": {"city": "Oslo"}}),
        ModelOptions::new().with_persistor(store.factory()),
    )
    .expect("model");

    assert!(store.changes().is_empty());
    assert!(store.documents().is_empty());
    // root and the nested address each got a delegate
    assert_eq!(store.loaded_count(), 2);
    assert!(model.peek("id").is_some());
    assert!(model.changed_attributes().is_empty());
}
