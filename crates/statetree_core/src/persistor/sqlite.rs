//! SQLite-backed document store.
//!
//! # Responsibility
//! - Persist the JSON snapshot of a root model on every successful commit.
//! - Reload stored documents as loaded models.
//!
//! # Invariants
//! - One row per `(collection, id)`; writes are upserts.
//! - Writes happen only through the commit protocol, never on construction.

use super::{Completion, InitialState, PersistError, Persistor, PersistorFactory};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::{Model, ModelError, ModelOptions, Value, ID_FIELD};
use log::{debug, error, info};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value as Json;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from document reads and writes.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Json(serde_json::Error),
    Model(ModelError),
    MissingId,
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "invalid document json: {err}"),
            Self::Model(err) => write!(f, "{err}"),
            Self::MissingId => write!(f, "document has no id"),
            Self::InvalidData(message) => write!(f, "invalid persisted document: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Model(err) => Some(err),
            Self::MissingId | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ModelError> for StoreError {
    fn from(value: ModelError) -> Self {
        Self::Model(value)
    }
}

/// Documents of one collection in a SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Rc<Connection>,
    collection: String,
}

impl SqliteStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection, collection: impl Into<String>) -> Self {
        Self {
            conn: Rc::new(conn),
            collection: collection.into(),
        }
    }

    pub fn open(path: impl AsRef<Path>, collection: impl Into<String>) -> StoreResult<Self> {
        Ok(Self::new(open_db(path)?, collection))
    }

    pub fn in_memory(collection: impl Into<String>) -> StoreResult<Self> {
        Ok(Self::new(open_db_in_memory()?, collection))
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn factory(&self) -> PersistorFactory {
        let store = self.clone();
        Rc::new(move |_model: &Model| -> Box<dyn Persistor> {
            Box::new(SqlitePersistor {
                store: store.clone(),
            })
        })
    }

    /// Stored JSON body for `id`.
    pub fn document(&self, id: &str) -> StoreResult<Option<Json>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![self.collection, id],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|body| serde_json::from_str(&body).map_err(StoreError::from))
            .transpose()
    }

    /// Document ids, most recently written first.
    pub fn ids(&self) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM documents WHERE collection = ?1 ORDER BY updated_at DESC, id ASC",
        )?;
        let rows = stmt.query_map(params![self.collection], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for id in rows {
            ids.push(id?);
        }
        Ok(ids)
    }

    /// Rebuilds the stored document `id` as a loaded model bound to this store.
    pub fn load(&self, id: &str, options: ModelOptions) -> StoreResult<Option<Model>> {
        let Some(body) = self.document(id)? else {
            return Ok(None);
        };
        let attributes = match Value::from(body) {
            Value::Map(attributes) => attributes,
            other => {
                return Err(StoreError::InvalidData(format!(
                    "document {id} is a {}",
                    other.kind()
                )))
            }
        };
        let model = Model::loaded(Some(attributes), options.with_persistor(self.factory()))?;
        debug!(
            "event=store_load module=persistor store=sqlite status=ok collection={} id={id}",
            self.collection
        );
        Ok(Some(model))
    }

    fn write(&self, model: &Model) -> StoreResult<String> {
        let root = model.root();
        let id = match root.peek(ID_FIELD) {
            Some(Value::Str(id)) => id,
            Some(Value::Int(id)) => id.to_string(),
            _ => return Err(StoreError::MissingId),
        };
        let body = serde_json::to_string(&root.to_json())?;
        self.conn.execute(
            "INSERT INTO documents (collection, id, body, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at",
            params![self.collection, id, body, now_epoch_ms()],
        )?;
        Ok(id)
    }
}

struct SqlitePersistor {
    store: SqliteStore,
}

impl Persistor for SqlitePersistor {
    fn loaded(&self, _model: &Model, _state: InitialState) {}

    fn changed(&self, model: &Model, field: Option<&str>) -> Completion {
        match self.store.write(model) {
            Ok(id) => {
                info!(
                    "event=store_write module=persistor status=ok collection={} id={id} field={}",
                    self.store.collection,
                    field.unwrap_or("*")
                );
                Completion::resolved()
            }
            Err(err) => {
                error!(
                    "event=store_write module=persistor status=error collection={} error={err}",
                    self.store.collection
                );
                Completion::rejected(PersistError::Storage(err.to_string()))
            }
        }
    }

    fn auto_generate_id(&self) -> bool {
        true
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
