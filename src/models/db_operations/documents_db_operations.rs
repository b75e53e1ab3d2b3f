use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition, TableError,
    TransactionError,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Collection, Document, Record};

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Redb database error: {0}")]
    RedbDatabase(#[from] DatabaseError),
    #[error("Redb storage error: {0}")]
    RedbStorage(#[from] StorageError),
    #[error("Redb transaction error: {0}")]
    RedbTransaction(#[from] TransactionError),
    #[error("Redb table error: {0}")]
    RedbTable(#[from] TableError),
    #[error("Redb commit error: {0}")]
    RedbCommit(#[from] CommitError),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("UUID parse error: {0}")]
    Uuid(#[from] uuid::Error),
    #[error("Item not found in database: {0}")]
    NotFound(String),
}

/// Every collection is one table: UUID bytes -> JSON document.
pub fn table_for(collection: Collection) -> TableDefinition<'static, &'static [u8; 16], &'static str> {
    TableDefinition::new(collection.name())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Single-field equality plus single-field ordering, evaluated over the whole collection.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub equals: Option<(String, Value)>,
    pub order_by: Option<(String, SortDirection)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.equals = Some((field.to_string(), value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

fn parse_id(id: &str) -> Result<[u8; 16], DbError> {
    Ok(Uuid::parse_str(id)?.into_bytes())
}

/// Creates the tables for every collection. Safe to call repeatedly.
pub fn ensure_collections(db: &Database) -> Result<(), DbError> {
    let write_txn = db.begin_write()?;
    for collection in Collection::ALL {
        write_txn.open_table(table_for(collection))?;
    }
    write_txn.commit()?;
    Ok(())
}

pub fn add_raw(db: &Database, collection: Collection, document: &Value) -> Result<String, DbError> {
    let doc_uuid = Uuid::new_v4();
    let doc_json = serde_json::to_string(document)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(table_for(collection))?;
        let doc_id_bytes = doc_uuid.into_bytes();
        table.insert(&doc_id_bytes, doc_json.as_str())?;
    }
    write_txn.commit()?;

    Ok(doc_uuid.to_string())
}

/// Reads every document of a collection in key order. A collection that was
/// never written to reads as empty.
pub fn get_all_raw(db: &Database, collection: Collection) -> Result<Vec<(String, Value)>, DbError> {
    let read_txn = db.begin_read()?;
    let table = match read_txn.open_table(table_for(collection)) {
        Ok(table) => table,
        Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut documents = Vec::new();
    for entry in table.iter()? {
        let (id_guard, doc_guard) = entry?;
        let doc_uuid = Uuid::from_bytes(*id_guard.value());
        match serde_json::from_str::<Value>(doc_guard.value()) {
            Ok(value) => documents.push((doc_uuid.to_string(), value)),
            Err(e) => log::warn!(
                "Skipping unreadable document {} in '{}': {}",
                doc_uuid,
                collection.name(),
                e
            ),
        }
    }
    Ok(documents)
}

pub fn get_raw(db: &Database, collection: Collection, id: &str) -> Result<Option<Value>, DbError> {
    let doc_id_bytes = parse_id(id)?;
    let read_txn = db.begin_read()?;
    let table = match read_txn.open_table(table_for(collection)) {
        Ok(table) => table,
        Err(TableError::TableDoesNotExist(_)) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let value = match table.get(&doc_id_bytes)? {
        Some(guard) => Some(serde_json::from_str(guard.value())?),
        None => None,
    };
    Ok(value)
}

/// Replaces an existing document. Fails with `NotFound` rather than creating one.
pub fn update_raw(db: &Database, collection: Collection, id: &str, document: &Value) -> Result<(), DbError> {
    let doc_id_bytes = parse_id(id)?;
    let doc_json = serde_json::to_string(document)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(table_for(collection))?;
        let exists = table.get(&doc_id_bytes)?.is_some();
        if !exists {
            return Err(DbError::NotFound(format!("{}/{}", collection.name(), id)));
        }
        table.insert(&doc_id_bytes, doc_json.as_str())?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Returns whether a document was actually removed.
pub fn delete_document(db: &Database, collection: Collection, id: &str) -> Result<bool, DbError> {
    let doc_id_bytes = parse_id(id)?;

    let write_txn = db.begin_write()?;
    let removed = {
        let mut table = write_txn.open_table(table_for(collection))?;
        let removed = table.remove(&doc_id_bytes)?.is_some();
        removed
    };
    write_txn.commit()?;
    Ok(removed)
}

/// Orders JSON values the way listings expect: nulls first, then numbers,
/// strings, booleans. Mixed types compare by that rank.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::String(_) => 2,
            Value::Bool(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

pub fn query_raw(db: &Database, collection: Collection, query: &Query) -> Result<Vec<(String, Value)>, DbError> {
    let mut documents = get_all_raw(db, collection)?;

    if let Some((field, expected)) = &query.equals {
        documents.retain(|(_, doc)| doc.get(field) == Some(expected));
    }

    if let Some((field, direction)) = &query.order_by {
        // Stable: ties keep store order.
        documents.sort_by(|(_, a), (_, b)| {
            let ordering = compare_values(
                a.get(field).unwrap_or(&Value::Null),
                b.get(field).unwrap_or(&Value::Null),
            );
            match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }

    if let Some(limit) = query.limit {
        documents.truncate(limit);
    }
    Ok(documents)
}

// ====================================================================
// ===================== TYPED RECORD OPERATIONS ======================
// ====================================================================

fn decode<R: DeserializeOwned>(collection: Collection, id: String, value: Value) -> Option<Document<R>> {
    match serde_json::from_value(value) {
        Ok(data) => Some(Document { id, data }),
        Err(e) => {
            log::warn!("Document {} in '{}' does not match its record shape: {}", id, collection.name(), e);
            None
        }
    }
}

pub fn add_document<R: Record>(db: &Database, record: &R) -> Result<String, DbError> {
    add_raw(db, R::COLLECTION, &serde_json::to_value(record)?)
}

pub fn get_all_documents<R: Record>(db: &Database) -> Result<Vec<Document<R>>, DbError> {
    Ok(get_all_raw(db, R::COLLECTION)?
        .into_iter()
        .filter_map(|(id, value)| decode(R::COLLECTION, id, value))
        .collect())
}

pub fn get_document<R: Record>(db: &Database, id: &str) -> Result<Option<Document<R>>, DbError> {
    Ok(get_raw(db, R::COLLECTION, id)?.and_then(|value| decode(R::COLLECTION, id.to_string(), value)))
}

pub fn update_document<R: Record>(db: &Database, id: &str, record: &R) -> Result<(), DbError> {
    update_raw(db, R::COLLECTION, id, &serde_json::to_value(record)?)
}

pub fn query_documents<R: Record>(db: &Database, query: &Query) -> Result<Vec<Document<R>>, DbError> {
    Ok(query_raw(db, R::COLLECTION, query)?
        .into_iter()
        .filter_map(|(id, value)| decode(R::COLLECTION, id, value))
        .collect())
}
