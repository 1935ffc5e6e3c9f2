//! In-memory JSON key-value store adapter, backed by the official Redis
//! client and the RedisJSON commands.
//!
//! Documents live at `<collection>:<doc_id>` via `JSON.SET`/`JSON.GET`/
//! `JSON.DEL`. There is no server-side query engine in scope: `query` walks
//! a SCAN cursor over the collection's key pattern and evaluates conditions
//! client-side with [`matcher`]; collection-wide deletes chunk the scanned
//! keys so no single DEL request grows past the batch size.

use std::cell::RefCell;
use std::collections::{BTreeSet, VecDeque};
use std::env;

use once_cell::sync::OnceCell;
use redis::{Client, Connection, JsonCommands};
use tracing::{info, warn};

use docload_core::{Condition, Op, Value};

use crate::matcher;
use crate::{
    prepare_document, restore_document, DocStream, DocumentStore, Result, StoreError,
};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: &str = "6370";

/// Keys pulled per SCAN round trip
const SCAN_COUNT: usize = 100;

/// Adapter over a Redis instance with the JSON module.
pub struct RedisStore {
    url: String,
    client: OnceCell<Client>,
    conn: RefCell<Option<Connection>>,
}

impl RedisStore {
    /// Configure from `REDIS_HOST`, `REDIS_PORT`, `REDIS_USER`, `REDIS_PASS`.
    pub fn from_env() -> Self {
        let host = env::var("REDIS_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = env::var("REDIS_PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        let url = match (env::var("REDIS_USER").ok(), env::var("REDIS_PASS").ok()) {
            (Some(user), Some(pass)) => format!("redis://{user}:{pass}@{host}:{port}/"),
            (None, Some(pass)) => format!("redis://:{pass}@{host}:{port}/"),
            _ => format!("redis://{host}:{port}/"),
        };
        RedisStore {
            url,
            client: OnceCell::new(),
            conn: RefCell::new(None),
        }
    }

    fn connect_error(&self, e: redis::RedisError) -> StoreError {
        warn!(
            "Check environment variables: REDIS_HOST, REDIS_PORT, REDIS_USER, REDIS_PASS, \
             are they set correctly. Or verify what is being passed to RedisStore::from_env()."
        );
        StoreError::Connection {
            backend: "redis",
            message: e.to_string(),
        }
    }

    /// Open a fresh connection and verify it with a PING.
    fn connect(&self) -> Result<Connection> {
        let client = self
            .client
            .get_or_try_init(|| Client::open(self.url.as_str()).map_err(|e| self.connect_error(e)))?;
        let mut conn = client
            .get_connection()
            .map_err(|e| self.connect_error(e))?;
        redis::cmd("PING")
            .query::<String>(&mut conn)
            .map_err(|e| self.connect_error(e))?;
        Ok(conn)
    }

    /// Run `f` on the memoized connection, establishing it on first use.
    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut slot = self.conn.borrow_mut();
        let mut conn = match slot.take() {
            Some(conn) => conn,
            None => self.connect()?,
        };
        let result = f(&mut conn);
        *slot = Some(conn);
        result
    }
}

impl DocumentStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    fn supported_ops(&self) -> &'static [Op] {
        &Op::ALL
    }

    fn upload(&self, collection: &str, doc_id: &str, mut doc: Value) -> Result<Value> {
        prepare_document(collection, &mut doc)?;
        let json = serde_json::Value::from(doc.clone());

        info!("document with doc_id={doc_id} is being loaded into collection={collection}");
        self.with_conn(|conn| {
            let _: redis::Value = conn.json_set(key(collection, doc_id), "$", &json)?;
            Ok(())
        })?;
        Ok(doc)
    }

    fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>> {
        let raw: Option<String> =
            self.with_conn(|conn| Ok(conn.json_get(key(collection, doc_id), "$")?))?;
        match raw {
            Some(text) => Ok(Some(parse_stored(&text)?)),
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
        for cond in conditions {
            if cond.op.wants_list() && cond.value.as_array().is_none() {
                return Err(StoreError::InvalidOperand {
                    op: cond.op.token(),
                    field: cond.field.clone(),
                });
            }
        }

        // The stream owns a dedicated connection so the memoized one stays
        // free for interleaved operations.
        let stream = RedisQueryStream {
            conn: self.connect()?,
            pattern: format!("{collection}:*"),
            cursor: 0,
            pending: VecDeque::new(),
            scan_done: false,
            conditions: conditions.to_vec(),
            remaining: if order_by.is_some() { usize::MAX } else { limit },
            failed: false,
        };
        match order_by {
            None => Ok(Box::new(stream)),
            Some(field) => {
                // Ordering needs the full match set in hand; laziness is
                // traded away only when the caller asks for it.
                let mut matched = stream.collect::<Result<Vec<_>>>()?;
                let field = field.to_string();
                matched.sort_by(|(_, a), (_, b)| {
                    matcher::order_key(a.get_path(&field), b.get_path(&field))
                });
                matched.truncate(limit);
                Ok(Box::new(matched.into_iter().map(Ok::<_, StoreError>)))
            }
        }
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut names = BTreeSet::new();
            let mut cursor = 0u64;
            loop {
                let (next, keys) = scan_batch(conn, "*", cursor)?;
                for k in keys {
                    if let Some((collection, _)) = k.split_once(':') {
                        names.insert(collection.to_string());
                    }
                }
                cursor = next;
                if cursor == 0 {
                    break;
                }
            }
            Ok(names.into_iter().collect())
        })
    }

    fn delete(&self, collection: &str, doc_id: &str) -> Result<()> {
        let removed: i64 =
            self.with_conn(|conn| Ok(conn.json_del(key(collection, doc_id), "$")?))?;
        if removed == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                doc_id: doc_id.to_string(),
            });
        }
        info!("{doc_id} was requested to be deleted");
        Ok(())
    }

    fn delete_all(&self, collection: &str, batch_size: usize) -> Result<u64> {
        let pattern = format!("{collection}:*");
        let batch_size = batch_size.max(1);
        let deleted = self.with_conn(|conn| {
            let mut deleted = 0u64;
            let mut cursor = 0u64;
            let mut pending: Vec<String> = Vec::new();
            loop {
                let (next, keys) = scan_batch(conn, &pattern, cursor)?;
                pending.extend(keys);
                while pending.len() >= batch_size {
                    let chunk: Vec<String> = pending.drain(..batch_size).collect();
                    deleted += del_keys(conn, chunk)?;
                }
                cursor = next;
                if cursor == 0 {
                    break;
                }
            }
            if !pending.is_empty() {
                deleted += del_keys(conn, pending)?;
            }
            Ok(deleted)
        })?;

        match deleted {
            0 => warn!("No documents were deleted, check if your collection has any."),
            1 => info!("1 document was deleted."),
            n => info!("{n} documents were deleted."),
        }
        Ok(deleted)
    }
}

/// Lazy scan-and-filter stream over one collection's keys.
struct RedisQueryStream {
    conn: Connection,
    pattern: String,
    cursor: u64,
    pending: VecDeque<String>,
    scan_done: bool,
    conditions: Vec<Condition>,
    remaining: usize,
    failed: bool,
}

impl RedisQueryStream {
    /// Fetch one key's document; `None` when it raced a deletion or fails
    /// a condition.
    fn load(&mut self, k: &str) -> Result<Option<(String, Value)>> {
        let raw: Option<String> = self.conn.json_get(k, "$")?;
        let Some(text) = raw else {
            return Ok(None);
        };
        let doc = parse_stored(&text)?;
        if !self.conditions.iter().all(|c| matcher::matches(&doc, c)) {
            return Ok(None);
        }
        Ok(Some((doc_id_of(k).to_string(), doc)))
    }
}

impl Iterator for RedisQueryStream {
    type Item = Result<(String, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }
        loop {
            if let Some(k) = self.pending.pop_front() {
                match self.load(&k) {
                    Ok(Some(pair)) => {
                        self.remaining -= 1;
                        return Some(Ok(pair));
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        self.failed = true;
                        return Some(Err(e));
                    }
                }
            }
            if self.scan_done {
                return None;
            }
            match scan_batch(&mut self.conn, &self.pattern, self.cursor) {
                Ok((next, keys)) => {
                    self.cursor = next;
                    if next == 0 {
                        self.scan_done = true;
                    }
                    self.pending.extend(keys);
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

fn key(collection: &str, doc_id: &str) -> String {
    format!("{collection}:{doc_id}")
}

/// Everything after the collection prefix; ids may themselves contain `:`.
fn doc_id_of(key: &str) -> &str {
    key.split_once(':').map(|(_, id)| id).unwrap_or(key)
}

/// One SCAN round trip.
fn scan_batch(conn: &mut Connection, pattern: &str, cursor: u64) -> Result<(u64, Vec<String>)> {
    Ok(redis::cmd("SCAN")
        .arg(cursor)
        .arg("MATCH")
        .arg(pattern)
        .arg("COUNT")
        .arg(SCAN_COUNT)
        .query(conn)?)
}

fn del_keys(conn: &mut Connection, keys: Vec<String>) -> Result<u64> {
    Ok(redis::cmd("DEL").arg(keys).query(conn)?)
}

/// Decode a JSON.GET payload: the `$` path wraps the document in an array.
fn parse_stored(text: &str) -> Result<Value> {
    let json: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| StoreError::Core(docload_core::Error::Json(e)))?;
    let mut doc = match json {
        serde_json::Value::Array(mut items) if !items.is_empty() => Value::from(items.remove(0)),
        serde_json::Value::Array(_) => Value::Null,
        other => Value::from(other),
    };
    restore_document(&mut doc)?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shape() {
        assert_eq!(key("article_instances", "13901"), "article_instances:13901");
        assert_eq!(doc_id_of("article_instances:13901"), "13901");
        assert_eq!(doc_id_of("journals:issn:1465-5411"), "issn:1465-5411");
    }

    #[test]
    fn test_parse_stored_unwraps_path_array() {
        let doc = parse_stored(r#"[{"pmcid": "PMC13901"}]"#).unwrap();
        assert_eq!(doc.get("pmcid"), Some(&Value::from("PMC13901")));

        // Legacy root-path replies come back bare
        let doc = parse_stored(r#"{"pmcid": "PMC13901"}"#).unwrap();
        assert_eq!(doc.get("pmcid"), Some(&Value::from("PMC13901")));
    }
}
