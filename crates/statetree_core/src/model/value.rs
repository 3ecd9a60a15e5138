//! Values held in a model's attribute store.
//!
//! # Invariants
//! - `Map` and `List` are plain inputs; the store only ever holds their
//!   wrapped forms (`Model`, `Collection`).
//! - Models and collections compare by identity with each other and by
//!   content with plain values.

use super::{Collection, Model};
use serde_json::{Map as JsonMap, Number, Value as Json};
use std::collections::BTreeMap;

/// Field name to value mapping owned by one model.
pub type Attributes = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Plain mapping, wrapped into a child [`Model`] on assignment.
    Map(Attributes),
    /// Plain sequence, wrapped into a child [`Collection`] on assignment.
    List(Vec<Value>),
    Model(Model),
    Collection(Collection),
}

impl Value {
    /// `Nil`, or a model that was never instantiated.
    pub fn is_nil(&self) -> bool {
        match self {
            Self::Nil => true,
            Self::Model(model) => model.is_nil(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Self::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Map(_) => "map",
            Self::List(_) => "list",
            Self::Model(_) => "model",
            Self::Collection(_) => "collection",
        }
    }

    /// Deep copy with models and collections unwrapped into plain values.
    pub fn to_plain(&self) -> Value {
        match self {
            Self::Model(model) => model.to_plain().map_or(Self::Nil, Self::Map),
            Self::Collection(collection) => collection.to_plain(),
            Self::Map(map) => Self::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_plain()))
                    .collect(),
            ),
            Self::List(items) => Self::List(items.iter().map(Value::to_plain).collect()),
            other => other.clone(),
        }
    }

    pub fn to_json(&self) -> Json {
        match self {
            Self::Nil => Json::Null,
            Self::Bool(value) => Json::Bool(*value),
            Self::Int(value) => Json::Number(Number::from(*value)),
            Self::Float(value) => Number::from_f64(*value).map_or(Json::Null, Json::Number),
            Self::Str(text) => Json::String(text.clone()),
            Self::Map(map) => Json::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect::<JsonMap<String, Json>>(),
            ),
            Self::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Self::Model(model) => model.to_json(),
            Self::Collection(collection) => collection.to_json(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Model(left), Self::Model(right)) => left.ptr_eq(right),
            (Self::Model(model), plain) | (plain, Self::Model(model)) => model.attributes_eq(plain),
            (Self::Collection(left), Self::Collection(right)) => left.ptr_eq(right),
            (Self::Collection(collection), Self::List(items))
            | (Self::List(items), Self::Collection(collection)) => collection.items_eq(items),
            (Self::Nil, Self::Nil) => true,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Int(left), Self::Int(right)) => left == right,
            (Self::Float(left), Self::Float(right)) => left == right,
            (Self::Int(int), Self::Float(float)) | (Self::Float(float), Self::Int(int)) => {
                *int as f64 == *float
            }
            (Self::Str(left), Self::Str(right)) => left == right,
            (Self::Map(left), Self::Map(right)) => left == right,
            (Self::List(left), Self::List(right)) => left == right,
            _ => false,
        }
    }
}

impl From<Json> for Value {
    fn from(value: Json) -> Self {
        match value {
            Json::Null => Self::Nil,
            Json::Bool(value) => Self::Bool(value),
            Json::Number(number) => match number.as_i64() {
                Some(int) => Self::Int(int),
                None => Self::Float(number.as_f64().unwrap_or_default()),
            },
            Json::String(text) => Self::Str(text),
            Json::Array(items) => Self::List(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Attributes> for Value {
    fn from(value: Attributes) -> Self {
        Self::Map(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl From<Model> for Value {
    fn from(value: Model) -> Self {
        Self::Model(value)
    }
}

impl From<Collection> for Value {
    fn from(value: Collection) -> Self {
        Self::Collection(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}
