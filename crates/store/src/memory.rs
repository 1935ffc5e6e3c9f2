//! Process-local store. No server, no persistence.
//!
//! Shares the upload/read pipeline and the client-side matcher with the real
//! adapters, which makes it the store of record for unit and integration
//! tests and for `--store memory` smoke runs.

use std::cell::RefCell;
use std::collections::BTreeMap;

use docload_core::{Condition, Op, Value};

use crate::matcher;
use crate::{
    prepare_document, restore_document, DocStream, DocumentStore, Result, StoreError,
};

/// Ephemeral in-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    data: RefCell<BTreeMap<String, BTreeMap<String, Value>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn supported_ops(&self) -> &'static [Op] {
        &Op::ALL
    }

    fn upload(&self, collection: &str, doc_id: &str, mut doc: Value) -> Result<Value> {
        prepare_document(collection, &mut doc)?;
        self.data
            .borrow_mut()
            .entry(collection.to_string())
            .or_default()
            .insert(doc_id.to_string(), doc.clone());
        Ok(doc)
    }

    fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>> {
        let stored = self
            .data
            .borrow()
            .get(collection)
            .and_then(|c| c.get(doc_id))
            .cloned();
        match stored {
            Some(mut doc) => {
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
        for cond in conditions {
            if cond.op.wants_list() && cond.value.as_array().is_none() {
                return Err(StoreError::InvalidOperand {
                    op: cond.op.token(),
                    field: cond.field.clone(),
                });
            }
        }

        let snapshot: Vec<(String, Value)> = self
            .data
            .borrow()
            .get(collection)
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        let mut matched = Vec::new();
        for (id, mut doc) in snapshot {
            restore_document(&mut doc)?;
            if conditions.iter().all(|c| matcher::matches(&doc, c)) {
                matched.push((id, doc));
            }
        }
        if let Some(field) = order_by {
            let field = field.to_string();
            matched.sort_by(|(_, a), (_, b)| {
                matcher::order_key(a.get_path(&field), b.get_path(&field))
            });
        }
        matched.truncate(limit);
        Ok(Box::new(matched.into_iter().map(Ok::<_, StoreError>)))
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.data.borrow().keys().cloned().collect())
    }

    fn delete(&self, collection: &str, doc_id: &str) -> Result<()> {
        let mut data = self.data.borrow_mut();
        let removed = data
            .get_mut(collection)
            .and_then(|c| c.remove(doc_id))
            .is_some();
        if let Some(c) = data.get(collection) {
            if c.is_empty() {
                data.remove(collection);
            }
        }
        if removed {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                collection: collection.to_string(),
                doc_id: doc_id.to_string(),
            })
        }
    }

    fn delete_all(&self, collection: &str, batch_size: usize) -> Result<u64> {
        let mut deleted = 0u64;
        loop {
            let batch: Vec<String> = {
                let data = self.data.borrow();
                match data.get(collection) {
                    Some(c) => c.keys().take(batch_size.max(1)).cloned().collect(),
                    None => Vec::new(),
                }
            };
            if batch.is_empty() {
                break;
            }
            let mut data = self.data.borrow_mut();
            if let Some(c) = data.get_mut(collection) {
                for key in &batch {
                    if c.remove(key).is_some() {
                        deleted += 1;
                    }
                }
            }
        }
        self.data.borrow_mut().remove(collection);
        Ok(deleted)
    }
}
