//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `statetree_core` linkage end to end: config, logging, store, commit.
//! - Keep output deterministic apart from generated ids.

use log::error;
use serde_json::json;
use statetree_core::{
    init_logging, ClassPaths, CoreConfig, Model, ModelOptions, RuleSet, Schema, SqliteStore,
};
use std::process::ExitCode;
use std::rc::Rc;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => CoreConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => CoreConfig::default(),
    };
    init_logging(&config.log_config())?;
    println!("statetree_core version={}", statetree_core::core_version());

    let store = match config.database_path.as_ref() {
        Some(path) => SqliteStore::open(path, "people")?,
        None => SqliteStore::in_memory("people")?,
    };
    let class_paths = ClassPaths::new().register(
        &[],
        Schema::new("person").with_validator(RuleSet::new().presence("name").min("age", 18.0)),
    );
    let options = ModelOptions::new()
        .with_class_paths(Rc::new(class_paths))
        .with_persistor(store.factory());

    let person = Model::from_json(json!({"name": "Ada", "age": 36}), options)?;
    person.assign_attribute("age", 37)?;
    println!("valid write: age={:?}", person.peek("age"));

    let outcome = person.assign_attribute("age", 12)?;
    println!(
        "invalid write: persisted={} age={:?} errors={}",
        outcome.is_some(),
        person.peek("age"),
        person.errors()
    );

    for id in store.ids()? {
        if let Some(document) = store.document(&id)? {
            println!("stored {id}: {document}");
        }
    }
    Ok(())
}
