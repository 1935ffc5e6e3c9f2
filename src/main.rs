//! docload — load, query, and delete JSON documents in MongoDB or RedisJSON.
//!
//! One operation per invocation. The backing store is chosen with the
//! global `--store` flag (or the `DOCLOAD_STORE` environment variable);
//! store locations and credentials come from the environment — see
//! `MongoStore::from_env` and `RedisStore::from_env`.

mod actions;
mod commands;
mod format;
mod source;

use std::process;

use docload_store::{DocumentStore, MemoryStore, MongoStore, RedisStore};
use tracing_subscriber::EnvFilter;

use actions::{run_delete, run_get, run_list_collections, run_load, run_query};

// Exit codes form a stable contract with calling scripts.
pub(crate) const EXIT_NO_DOC: i32 = 1;
pub(crate) const EXIT_QUERY: i32 = 2;
pub(crate) const EXIT_LOAD: i32 = 3;
pub(crate) const EXIT_LIST_COLLECTIONS: i32 = 4;
pub(crate) const EXIT_GET: i32 = 5;
pub(crate) const EXIT_WITH_ERRORS: i32 = 6;
pub(crate) const EXIT_DELETE: i32 = 7;

fn main() {
    let matches = commands::build_cli().get_matches();
    let debug = matches.get_flag("debug");
    init_logging(debug);

    let store = select_store(&matches);

    let code = match matches.subcommand() {
        Some(("load", sub)) => complete(run_load(store.as_ref(), sub, debug), EXIT_LOAD),
        Some(("get", sub)) => complete(run_get(store.as_ref(), sub), EXIT_GET),
        Some(("query", sub)) => complete(run_query(store.as_ref(), sub), EXIT_QUERY),
        Some(("list-collections", _)) => {
            complete(run_list_collections(store.as_ref()), EXIT_LIST_COLLECTIONS)
        }
        Some(("delete", sub)) => complete(run_delete(store.as_ref(), sub), EXIT_DELETE),
        _ => unreachable!("a subcommand is required"),
    };
    process::exit(code);
}

/// Collapse an action outcome to an exit code: hard failures are logged and
/// mapped to the subcommand's dedicated code.
fn complete(result: anyhow::Result<i32>, error_code: i32) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            error_code
        }
    }
}

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn select_store(matches: &clap::ArgMatches) -> Box<dyn DocumentStore> {
    let choice = matches
        .get_one::<String>("store")
        .cloned()
        .or_else(|| std::env::var("DOCLOAD_STORE").ok())
        .unwrap_or_else(|| "mongo".to_string());
    match choice.as_str() {
        "redis" => Box::new(RedisStore::from_env()),
        "memory" => Box::new(MemoryStore::new()),
        "mongo" => Box::new(MongoStore::from_env()),
        other => {
            tracing::warn!("unknown store '{other}', falling back to mongo");
            Box::new(MongoStore::from_env())
        }
    }
}
