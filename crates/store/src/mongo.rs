//! Managed document database adapter, backed by the official MongoDB driver.
//!
//! Documents live in `MONGODB_DATABASE` keyed by the Mongo `_id`, which is
//! the docload doc id; the `_id` is split back out of the document on every
//! read. Conditions are translated to native query operators and evaluated
//! server-side, as are ordering and the result limit.

use std::env;

use mongodb::bson::spec::BinarySubtype;
use mongodb::bson::{doc, Binary, Bson, Document};
use mongodb::sync::{Client, Collection, Database};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use docload_core::{Condition, Op, Value};

use crate::{
    prepare_document, restore_document, DocStream, DocumentStore, Result, StoreError,
};

const DEFAULT_URI: &str = "mongodb://localhost:27017";
const DEFAULT_DATABASE: &str = "docload";

/// Adapter over a MongoDB deployment.
pub struct MongoStore {
    uri: String,
    database: String,
    client: OnceCell<Client>,
}

impl MongoStore {
    /// Configure from `MONGODB_URI` and `MONGODB_DATABASE`.
    pub fn from_env() -> Self {
        MongoStore {
            uri: env::var("MONGODB_URI").unwrap_or_else(|_| DEFAULT_URI.to_string()),
            database: env::var("MONGODB_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
            client: OnceCell::new(),
        }
    }

    /// Connect on first use; the handle is memoized for the process lifetime.
    fn db(&self) -> Result<Database> {
        let client = self.client.get_or_try_init(|| {
            let client = Client::with_uri_str(&self.uri).map_err(|e| self.connect_error(e))?;
            // The driver connects lazily, so ping here to surface a bad
            // address or credentials at a predictable point.
            client
                .database(&self.database)
                .run_command(doc! {"ping": 1})
                .run()
                .map_err(|e| self.connect_error(e))?;
            Ok::<_, StoreError>(client)
        })?;
        Ok(client.database(&self.database))
    }

    fn connect_error(&self, e: mongodb::error::Error) -> StoreError {
        warn!(
            "Check environment variables: MONGODB_URI, MONGODB_DATABASE, \
             are they set correctly."
        );
        StoreError::Connection {
            backend: "mongodb",
            message: e.to_string(),
        }
    }

    fn collection(&self, name: &str) -> Result<Collection<Document>> {
        Ok(self.db()?.collection::<Document>(name))
    }
}

impl DocumentStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    fn supported_ops(&self) -> &'static [Op] {
        &Op::ALL
    }

    fn upload(&self, collection: &str, doc_id: &str, mut doc: Value) -> Result<Value> {
        prepare_document(collection, &mut doc)?;
        let mut stored = value_to_document(doc.clone())?;
        stored.insert("_id", doc_id);

        info!("document with doc_id={doc_id} is being loaded into collection={collection}");
        self.collection(collection)?
            .replace_one(doc! {"_id": doc_id}, &stored)
            .upsert(true)
            .run()?;
        Ok(doc)
    }

    fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>> {
        let found = self
            .collection(collection)?
            .find_one(doc! {"_id": doc_id})
            .run()?;
        match found {
            Some(mut stored) => {
                stored.remove("_id");
                let mut doc = document_to_value(stored);
                restore_document(&mut doc)?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    fn query<'a>(
        &'a self,
        collection: &str,
        limit: usize,
        order_by: Option<&str>,
        conditions: &[Condition],
    ) -> Result<DocStream<'a>> {
        if limit == 0 {
            // A find limit of 0 means "no limit" server-side
            return Ok(Box::new(std::iter::empty()));
        }
        let filter = build_filter(conditions)?;
        let coll = self.collection(collection)?;
        let mut find = coll.find(filter).limit(limit as i64);
        if let Some(field) = order_by {
            let mut sort = Document::new();
            sort.insert(field, 1);
            find = find.sort(sort);
        }
        let cursor = find.run()?;

        Ok(Box::new(cursor.map(|item| -> Result<(String, Value)> {
            let mut stored = item?;
            let doc_id = match stored.remove("_id") {
                Some(Bson::String(s)) => s,
                Some(other) => other.to_string(),
                None => String::new(),
            };
            let mut doc = document_to_value(stored);
            restore_document(&mut doc)?;
            Ok((doc_id, doc))
        })))
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.db()?.list_collection_names().run()?)
    }

    fn delete(&self, collection: &str, doc_id: &str) -> Result<()> {
        let outcome = self
            .collection(collection)?
            .delete_one(doc! {"_id": doc_id})
            .run()?;
        if outcome.deleted_count == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                doc_id: doc_id.to_string(),
            });
        }
        info!("{doc_id} was requested to be deleted");
        Ok(())
    }

    fn delete_all(&self, collection: &str, batch_size: usize) -> Result<u64> {
        let coll = self.collection(collection)?;
        let cursor = coll
            .find(Document::new())
            .projection(doc! {"_id": 1})
            .run()?;

        let batch_size = batch_size.max(1);
        let mut batch: Vec<Bson> = Vec::with_capacity(batch_size);
        let mut deleted = 0u64;
        for item in cursor {
            let stored = item?;
            if let Some(id) = stored.get("_id") {
                batch.push(id.clone());
            }
            if batch.len() >= batch_size {
                deleted += delete_batch(&coll, &mut batch)?;
            }
        }
        deleted += delete_batch(&coll, &mut batch)?;

        match deleted {
            0 => warn!("No documents were deleted, check if your collection has any."),
            1 => info!("1 document was deleted."),
            n => info!("{n} documents were deleted."),
        }
        Ok(deleted)
    }
}

fn delete_batch(coll: &Collection<Document>, batch: &mut Vec<Bson>) -> Result<u64> {
    if batch.is_empty() {
        return Ok(0);
    }
    let ids = Bson::Array(std::mem::take(batch));
    let outcome = coll.delete_many(doc! {"_id": {"$in": ids}}).run()?;
    Ok(outcome.deleted_count)
}

/// Translate parsed conditions into one conjunctive Mongo filter.
fn build_filter(conditions: &[Condition]) -> Result<Document> {
    if conditions.is_empty() {
        return Ok(Document::new());
    }
    let mut clauses: Vec<Bson> = Vec::with_capacity(conditions.len());
    for cond in conditions {
        if cond.op.wants_list() && cond.value.as_array().is_none() {
            return Err(StoreError::InvalidOperand {
                op: cond.op.token(),
                field: cond.field.clone(),
            });
        }
        let value = value_to_bson(cond.value.clone());
        let matcher: Bson = match cond.op {
            // Mongo equality matches scalars and array members alike, which
            // covers array-contains
            Op::Eq | Op::ArrayContains => value,
            Op::Ne => Bson::Document(doc! {"$ne": value}),
            Op::Lt => Bson::Document(doc! {"$lt": value}),
            Op::Le => Bson::Document(doc! {"$lte": value}),
            Op::Gt => Bson::Document(doc! {"$gt": value}),
            Op::Ge => Bson::Document(doc! {"$gte": value}),
            Op::In | Op::ArrayContainsAny => Bson::Document(doc! {"$in": value}),
            Op::NotIn => Bson::Document(doc! {"$nin": value}),
        };
        let mut clause = Document::new();
        clause.insert(cond.field.clone(), matcher);
        clauses.push(Bson::Document(clause));
    }
    Ok(doc! {"$and": clauses})
}

fn value_to_document(value: Value) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, value_to_bson(v)))
            .collect()),
        other => Err(StoreError::Backend {
            backend: "mongodb",
            message: format!("document root is a {}, expected an object", other.type_name()),
        }),
    }
}

fn document_to_value(document: Document) -> Value {
    Value::Object(
        document
            .into_iter()
            .map(|(k, v)| (k, bson_to_value(v)))
            .collect(),
    )
}

fn value_to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Int(i) => Bson::Int64(i),
        Value::Float(f) => Bson::Double(f),
        Value::String(s) => Bson::String(s),
        Value::Bytes(bytes) => Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes,
        }),
        Value::Array(items) => Bson::Array(items.into_iter().map(value_to_bson).collect()),
        Value::Object(map) => Bson::Document(
            map.into_iter()
                .map(|(k, v)| (k, value_to_bson(v)))
                .collect(),
        ),
    }
}

fn bson_to_value(bson: Bson) -> Value {
    match bson {
        Bson::Null => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::Int(i as i64),
        Bson::Int64(i) => Value::Int(i),
        Bson::Double(f) => Value::Float(f),
        Bson::String(s) => Value::String(s),
        Bson::Binary(bin) => Value::Bytes(bin.bytes),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_value).collect()),
        Bson::Document(d) => document_to_value(d),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => Value::Int(dt.timestamp_millis()),
        other => Value::String(other.to_string()),
    }
}
