//! Document store adapters for docload.
//!
//! A [`DocumentStore`] bridges the document model and one backing store's
//! native call shape. Three adapters exist:
//!
//! - [`MongoStore`]: managed document database via the official `mongodb`
//!   driver (conditions translated server-side)
//! - [`RedisStore`]: in-memory JSON key-value store via the official `redis`
//!   client (conditions evaluated client-side over a SCAN cursor)
//! - [`MemoryStore`]: process-local map sharing the client-side matcher;
//!   backs tests and smoke runs
//!
//! Every adapter runs the same pipeline: on upload, base64 fields are
//! decoded, the compression policy is applied, and identity sidecars are
//! stripped; on read, compressed fields are restored. Connections are
//! established lazily on first use and kept for the process lifetime.

pub mod matcher;

mod error;
mod memory;
mod mongo;
mod redis;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use redis::RedisStore;

use docload_core::codec::{self, Restore};
use docload_core::{Condition, Op, Value};

/// Sidecar field carrying a document's own id
pub const SIDECAR_ID: &str = "_id";

/// Sidecar field carrying a document's own collection
pub const SIDECAR_COLLECTION: &str = "_collection";

/// The content-bearing collection whose large fields get compressed
pub const CONTENT_COLLECTION: &str = "article_instances";

/// Fields compressed on upload into [`CONTENT_COLLECTION`]
pub const COMPRESSED_FIELDS: &[&str] = &["header_xml"];

/// Compressed counterparts restored on every read
pub const RESTORE_FIELDS: &[&str] = &["header_xml_zstd"];

/// Keys deleted per request during a collection-wide delete
pub const DELETE_BATCH_SIZE: usize = 100;

/// A lazy, finite, single-pass stream of `(doc_id, document)` pairs.
///
/// Consuming it exhausts the underlying store cursor; it cannot be restarted.
pub type DocStream<'a> = Box<dyn Iterator<Item = Result<(String, Value)>> + 'a>;

/// Uniform interface over one backing store.
pub trait DocumentStore {
    /// Short backend name used in logs and error messages.
    fn backend(&self) -> &'static str;

    /// Operators this backend accepts in query conditions.
    fn supported_ops(&self) -> &'static [Op];

    /// Write `doc` keyed by `(collection, doc_id)`, applying the upload
    /// pipeline. Returns the document as stored.
    fn upload(&self, collection: &str, doc_id: &str, doc: Value) -> Result<Value>;

    /// Fetch by composite key. An absent document is `Ok(None)`, not an
    /// error. Compressed fields come back restored.
    fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>>;

    /// Stream documents matching every condition (conjunctive), bounded by
    /// `limit`, optionally ordered by one field.
    fn query<'a>(
        &'a self,
        collection: &str,
        limit: usize,
        order_by: Option<&str>,
        conditions: &[Condition],
    ) -> Result<DocStream<'a>>;

    /// Enumerate collection names. Never counts documents — counting forces
    /// a full scan.
    fn list_collections(&self) -> Result<Vec<String>>;

    /// Delete one document. Deleting an absent document is a
    /// [`StoreError::NotFound`].
    fn delete(&self, collection: &str, doc_id: &str) -> Result<()>;

    /// Delete every document in a collection, at most `batch_size` keys per
    /// request. Returns the number deleted.
    fn delete_all(&self, collection: &str, batch_size: usize) -> Result<u64>;
}

/// Resolve the effective `(collection, doc_id)` for an upload.
///
/// Precedence: explicit CLI value, then the document's own sidecar field,
/// then (for the id) the source file's stem. Numeric `_id` values are
/// rendered integrally, so `13901.0` becomes `"13901"`.
pub fn resolve_identity(
    cli_collection: Option<&str>,
    cli_doc_id: Option<&str>,
    stem: Option<&str>,
    doc: &Value,
    source: &str,
) -> Result<(String, String)> {
    let collection = cli_collection
        .map(str::to_string)
        .or_else(|| doc.get(SIDECAR_COLLECTION).and_then(Value::as_str).map(str::to_string))
        .ok_or_else(|| StoreError::MissingCollection {
            doc_source: source.to_string(),
        })?;

    let doc_id = cli_doc_id
        .map(str::to_string)
        .or_else(|| match doc.get(SIDECAR_ID) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Int(i)) => Some(i.to_string()),
            Some(Value::Float(f)) => Some((*f as i64).to_string()),
            _ => None,
        })
        .or_else(|| stem.map(str::to_string))
        .ok_or_else(|| StoreError::MissingDocId {
            doc_source: source.to_string(),
        })?;

    Ok((collection, doc_id))
}

/// Upload pipeline shared by every adapter: decode `.b64` fields, compress
/// designated content fields, strip identity sidecars.
pub fn prepare_document(collection: &str, doc: &mut Value) -> Result<()> {
    codec::decode_b64_fields(doc)?;

    if collection == CONTENT_COLLECTION {
        // The compression policy only touches fields that are present;
        // compress_fields itself treats absence as an error.
        let present: Vec<&str> = COMPRESSED_FIELDS
            .iter()
            .copied()
            .filter(|f| doc.get(f).is_some())
            .collect();
        if !present.is_empty() {
            codec::compress_fields(doc, &present)?;
        }
    }

    if let Some(map) = doc.as_object_mut() {
        map.remove(SIDECAR_ID);
        map.remove(SIDECAR_COLLECTION);
    }
    Ok(())
}

/// Read pipeline shared by every adapter: restore compressed fields to
/// UTF-8 text. A document without them passes through untouched.
pub fn restore_document(doc: &mut Value) -> Result<()> {
    codec::decompress_fields(doc, RESTORE_FIELDS, Restore::Utf8Text)?;
    Ok(())
}
