//! End-to-end flows over the in-memory store — the same upload/read
//! pipeline the network adapters run, minus the server.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use docload_core::{Condition, Op, Value};
use docload_store::{
    resolve_identity, DocumentStore, MemoryStore, StoreError, CONTENT_COLLECTION,
};

fn parse(condition: &str) -> Condition {
    Condition::parse(condition, &Op::ALL, "memory").unwrap()
}

#[test]
fn load_then_get_reproduces_header_xml() {
    let header = "<article><front>PMC13901 header</front></article>";
    let doc = Value::from(serde_json::json!({
        "_id": 13901,
        "pmcid": "PMC13901",
        "header_xml.b64": BASE64.encode(header),
    }));

    let (collection, doc_id) = resolve_identity(
        Some(CONTENT_COLLECTION),
        None,
        Some("13901"),
        &doc,
        "13901.json",
    )
    .unwrap();
    assert_eq!(doc_id, "13901");

    let store = MemoryStore::new();
    let stored = store.upload(&collection, &doc_id, doc).unwrap();

    // Stored form carries the compressed field, stripped of sidecars.
    assert!(stored.get("header_xml").is_none());
    assert!(stored.get("header_xml_zstd").is_some());
    assert!(stored.get("_id").is_none());

    // Reading restores the original decoded content.
    let fetched = store.get(&collection, &doc_id).unwrap().unwrap();
    assert_eq!(fetched.get("header_xml"), Some(&Value::from(header)));
    assert_eq!(fetched.get("pmcid"), Some(&Value::from("PMC13901")));
    assert!(fetched.get("header_xml_zstd").is_none());
}

#[test]
fn absent_document_is_none_not_an_error() {
    let store = MemoryStore::new();
    assert!(store.get("articles", "PMC0").unwrap().is_none());
}

#[test]
fn query_honors_conditions_and_limit() {
    let store = MemoryStore::new();
    for i in 0..20 {
        let doc = Value::from(serde_json::json!({
            "pmcid": format!("PMC{i}"),
            "version": i,
            "is_oa": i % 2 == 0,
        }));
        store.upload("articles", &format!("PMC{i}"), doc).unwrap();
    }

    // Conjunctive filters
    let hits: Vec<_> = store
        .query(
            "articles",
            20,
            None,
            &[parse("is_oa == yes"), parse("version >= 10")],
        )
        .unwrap()
        .map(|r| r.unwrap().0)
        .collect();
    assert_eq!(hits.len(), 5); // 10, 12, 14, 16, 18

    // A limit of 5 never yields more than 5, even when more match.
    let hits: Vec<_> = store
        .query("articles", 5, None, &[parse("version >= 0")])
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(hits.len(), 5);
}

#[test]
fn query_orders_by_field() {
    let store = MemoryStore::new();
    for (id, version) in [("a", 3), ("b", 1), ("c", 2)] {
        let doc = Value::from(serde_json::json!({"version": version}));
        store.upload("articles", id, doc).unwrap();
    }
    let ids: Vec<_> = store
        .query("articles", 10, Some("version"), &[])
        .unwrap()
        .map(|r| r.unwrap().0)
        .collect();
    assert_eq!(ids, ["b", "c", "a"]);
}

#[test]
fn delete_star_removes_everything_in_batches() {
    let store = MemoryStore::new();
    for i in 0..230 {
        let doc = Value::from(serde_json::json!({"i": i}));
        store.upload("bulk", &format!("d{i}"), doc).unwrap();
    }
    store
        .upload("other", "keep", Value::from(serde_json::json!({"k": 1})))
        .unwrap();

    let deleted = store.delete_all("bulk", 100).unwrap();
    assert_eq!(deleted, 230);
    assert_eq!(store.list_collections().unwrap(), ["other"]);
}

#[test]
fn deleting_an_absent_document_is_an_error() {
    let store = MemoryStore::new();
    let err = store.delete("articles", "missing").unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
}

#[test]
fn sidecar_collection_routes_the_document() {
    let doc = Value::from(serde_json::json!({
        "_collection": "journals",
        "_id": "jl-1",
        "jtitle": "ANN MED",
    }));
    let (collection, doc_id) = resolve_identity(None, None, None, &doc, "jl.json").unwrap();
    assert_eq!(collection, "journals");
    assert_eq!(doc_id, "jl-1");

    let store = MemoryStore::new();
    let stored = store.upload(&collection, &doc_id, doc).unwrap();
    assert!(stored.get("_collection").is_none());
    let fetched = store.get("journals", "jl-1").unwrap().unwrap();
    assert_eq!(fetched.get("jtitle"), Some(&Value::from("ANN MED")));
}
