use crate::validation::Errors;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors raised synchronously by model operations.
///
/// Validation failures of ordinary writes are not reported here; they revert
/// the write and surface through `Model::errors()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A reserved name was used as a field.
    ReservedField(String),
    InvalidFieldName(String),
    /// Append on a model that has no parent model to hold the collection.
    NoParent { path: Vec<String> },
    NotACollection { field: String },
    NotAMapping { kind: &'static str },
    NotABuffer,
    /// The model a buffer saves into has been dropped.
    DetachedBuffer,
    Validation(Errors),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReservedField(name) => {
                write!(f, "`{name}` is reserved and cannot be used as a field name")
            }
            Self::InvalidFieldName(name) => write!(f, "invalid field name `{name}`"),
            Self::NoParent { path } => write!(
                f,
                "model at `{}` has no parent; collections must live inside a model",
                path.join(".")
            ),
            Self::NotACollection { field } => write!(f, "field `{field}` is not a collection"),
            Self::NotAMapping { kind } => write!(f, "expected a mapping, got {kind}"),
            Self::NotABuffer => write!(f, "save is only available on buffers"),
            Self::DetachedBuffer => write!(f, "buffer target no longer exists"),
            Self::Validation(errors) => write!(f, "validation failed: {errors}"),
        }
    }
}

impl Error for ModelError {}
