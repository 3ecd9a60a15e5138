//! Field-keyed error set produced by validation.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Ordered mapping from field name to user-facing messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Errors {
    fields: BTreeMap<String, Vec<String>>,
}

impl Errors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one message for `field`; duplicate messages are ignored.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let message = message.into();
        let messages = self.fields.entry(field.into()).or_default();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    /// Messages recorded for `field`.
    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields with at least one message.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }

    pub fn remove(&mut self, field: &str) -> Option<Vec<String>> {
        self.fields.remove(field)
    }

    /// Appends every message of `other`.
    pub fn merge(&mut self, other: &Errors) {
        for (field, messages) in other.iter() {
            for message in messages {
                self.add(field, message.as_str());
            }
        }
    }

    /// Copy restricted to the given fields.
    pub fn retain_fields<S: AsRef<str>>(&self, fields: &[S]) -> Errors {
        let fields = self
            .fields
            .iter()
            .filter(|(field, _)| fields.iter().any(|kept| kept.as_ref() == field.as_str()))
            .map(|(field, messages)| (field.clone(), messages.clone()))
            .collect();
        Errors { fields }
    }
}

impl Display for Errors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in self.iter() {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{field}: {}", messages.join(", "))?;
        }
        Ok(())
    }
}
