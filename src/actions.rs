//! Subcommand implementations.
//!
//! Each `run_*` function executes one subcommand against the chosen store
//! and returns the process exit code for the success-ish outcomes (full
//! success, document not found, completed with skipped errors). Hard
//! failures propagate as errors; `main` maps them to the subcommand's
//! dedicated exit code.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::ArgMatches;
use tracing::{debug, error, info};

use docload_core::Condition;
use docload_store::{
    resolve_identity, DocumentStore, StoreError, DELETE_BATCH_SIZE,
};

use crate::format::{log_debug_doc, save_json_doc};
use crate::source::FileSource;
use crate::{EXIT_NO_DOC, EXIT_WITH_ERRORS};

pub fn run_load(store: &dyn DocumentStore, matches: &ArgMatches, debug_mode: bool) -> Result<i32> {
    let collection = matches.get_one::<String>("collection").map(String::as_str);
    let doc_id = matches.get_one::<String>("doc-id").map(String::as_str);
    let skip_errors = matches.get_flag("skip-errors");

    let mut errors = 0u32;
    for raw in matches.get_many::<String>("json_files").unwrap() {
        let source = FileSource::parse(raw);
        info!("processing file - {source}");
        if let Err(e) = load_one(store, &source, collection, doc_id, debug_mode) {
            if !skip_errors {
                return Err(e);
            }
            errors += 1;
            error!("{e:#}");
        }
    }

    if errors > 0 {
        error!("Total {errors} error(s) encountered.");
        return Ok(EXIT_WITH_ERRORS);
    }
    Ok(0)
}

fn load_one(
    store: &dyn DocumentStore,
    source: &FileSource,
    cli_collection: Option<&str>,
    cli_doc_id: Option<&str>,
    debug_mode: bool,
) -> Result<()> {
    let started = Instant::now();
    let doc = source.read()?;
    if !doc.is_object() {
        return Err(StoreError::NotAnObject {
            doc_source: source.to_string(),
        }
        .into());
    }
    let (collection, doc_id) = resolve_identity(
        cli_collection,
        cli_doc_id,
        source.stem().as_deref(),
        &doc,
        &source.to_string(),
    )?;
    let stored = store.upload(&collection, &doc_id, doc)?;
    log_debug_doc(debug_mode, &stored);
    debug!(
        "upload() completed in {:.6} sec",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

pub fn run_get(store: &dyn DocumentStore, matches: &ArgMatches) -> Result<i32> {
    let collection = matches.get_one::<String>("collection").unwrap();
    let dst = matches.get_one::<PathBuf>("dst").unwrap();

    for doc_id in matches.get_many::<String>("doc_ids").unwrap() {
        info!("retrieving document from collection={collection} with doc_id={doc_id}");
        match store.get(collection, doc_id)? {
            Some(doc) => save_json_doc(dst, doc_id, &doc)?,
            None => {
                error!(
                    "No document with doc_id={doc_id} in collection={collection}, \
                     check the collection name or doc_ids argument."
                );
                return Ok(EXIT_NO_DOC);
            }
        }
    }
    Ok(0)
}

pub fn run_query(store: &dyn DocumentStore, matches: &ArgMatches) -> Result<i32> {
    let collection = matches.get_one::<String>("collection").unwrap();
    let limit = *matches.get_one::<usize>("limit").unwrap();
    let order_by = matches.get_one::<String>("orderby").map(String::as_str);
    let dst = matches.get_one::<PathBuf>("dst").unwrap();

    let conditions = matches
        .get_many::<String>("conditions")
        .unwrap()
        .map(|s| Condition::parse(s, store.supported_ops(), store.backend()))
        .collect::<docload_core::Result<Vec<_>>>()?;

    let started = Instant::now();
    let mut found = 0usize;
    for item in store.query(collection, limit, order_by, &conditions)? {
        let (doc_id, doc) = item?;
        found += 1;
        save_json_doc(dst, &doc_id, &doc)?;
    }
    info!("Found {found} document(s) in collection={collection} with limit={limit}");
    debug!(
        "query() completed in {:.6} sec",
        started.elapsed().as_secs_f64()
    );
    Ok(0)
}

pub fn run_list_collections(store: &dyn DocumentStore) -> Result<i32> {
    for name in store.list_collections()? {
        println!("{name}");
    }
    Ok(0)
}

pub fn run_delete(store: &dyn DocumentStore, matches: &ArgMatches) -> Result<i32> {
    let collection = matches.get_one::<String>("collection").unwrap();
    let skip_errors = matches.get_flag("skip-errors");

    let started = Instant::now();
    let mut errors = 0u32;
    for doc_id in matches.get_many::<String>("doc_ids").unwrap() {
        if doc_id == "*" {
            store.delete_all(collection, DELETE_BATCH_SIZE)?;
            continue;
        }
        if let Err(e) = store.delete(collection, doc_id) {
            if !skip_errors {
                return Err(e.into());
            }
            errors += 1;
            error!("{e}");
        }
    }
    debug!(
        "delete() completed in {:.6} sec",
        started.elapsed().as_secs_f64()
    );

    if errors > 0 {
        error!("Total {errors} error(s) encountered.");
        return Ok(EXIT_WITH_ERRORS);
    }
    Ok(0)
}
