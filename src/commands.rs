//! Clap command tree definition.

use clap::{Arg, ArgAction, Command};

/// Build the complete CLI command tree.
pub fn build_cli() -> Command {
    Command::new("docload")
        .about("Load, query, and delete JSON documents in MongoDB or RedisJSON")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Debug this application")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .help("Backing store (default: mongo; env: DOCLOAD_STORE)")
                .value_parser(["mongo", "redis", "memory"])
                .global(true),
        )
        .subcommand(build_load())
        .subcommand(build_get())
        .subcommand(build_query())
        .subcommand(build_list_collections())
        .subcommand(build_delete())
}

fn build_load() -> Command {
    Command::new("load")
        .about("Load JSON_FILES into the backing store")
        .long_about(
            "Load JSON_FILES into the backing store.\n\n\
             Files may reside locally or behind an http(s) URL; multiple\n\
             files are allowed in one run.\n\n\
             The document id comes from --doc-id, else from an `_id` field\n\
             of the loaded file, else from the file's base name. --doc-id\n\
             applies to every file, so with several files they all end up\n\
             under the same id. The collection comes from --collection,\n\
             else from a `_collection` field of the loaded file.",
        )
        .arg(
            Arg::new("collection")
                .short('c')
                .long("collection")
                .help("Collection name to load documents into"),
        )
        .arg(
            Arg::new("doc-id")
                .short('i')
                .long("doc-id")
                .help("Document id; overrides `_id` and the file name"),
        )
        .arg(
            Arg::new("skip-errors")
                .short('s')
                .long("skip-errors")
                .help("Report and skip individual file loading errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json_files")
                .value_name("JSON_FILES")
                .num_args(1..)
                .required(true),
        )
}

fn build_get() -> Command {
    Command::new("get")
        .about("Get documents and store them locally as JSON files")
        .arg(
            Arg::new("collection")
                .short('c')
                .long("collection")
                .help("Collection name to fetch documents from")
                .required(true),
        )
        .arg(
            Arg::new("dst")
                .short('t')
                .long("dst")
                .help("Destination folder for JSON files")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .default_value("/tmp"),
        )
        .arg(
            Arg::new("doc_ids")
                .value_name("DOC_IDS")
                .num_args(1..)
                .required(true),
        )
}

fn build_query() -> Command {
    Command::new("query")
        .about("Find documents matching every CONDITION")
        .long_about(
            "Find documents matching every CONDITION (conjunctive).\n\n\
             Each CONDITION is one `FIELD OP VALUE` string, e.g.\n\
             'pmcid == PMC13901' or 'version > 2'. Values are typed by\n\
             inference: y/yes/true/on and n/no/false/off become booleans,\n\
             none/null becomes null, numbers become numbers, and JSON\n\
             literals like [1, 2] become lists. Matches are written one\n\
             JSON file per document into --dst.",
        )
        .arg(
            Arg::new("collection")
                .short('c')
                .long("collection")
                .help("Collection name to search")
                .required(true),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .help("Number of records in the result set")
                .value_parser(clap::value_parser!(usize))
                .default_value("5"),
        )
        .arg(
            Arg::new("orderby")
                .long("orderby")
                .help("Field to order the result set by"),
        )
        .arg(
            Arg::new("dst")
                .short('t')
                .long("dst")
                .help("Destination folder for JSON files")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .default_value("/tmp"),
        )
        .arg(
            Arg::new("conditions")
                .value_name("CONDITIONS")
                .num_args(1..)
                .required(true),
        )
}

fn build_list_collections() -> Command {
    Command::new("list-collections").about("Print collection names, one per line")
}

fn build_delete() -> Command {
    Command::new("delete")
        .about("Delete documents by id, or a whole collection with '*'")
        .long_about(
            "Delete documents in a collection by document id, or every\n\
             document in the collection by passing '*' as the id (use\n\
             quotes to avoid shell expansion). Collection-wide deletes\n\
             run in batches.",
        )
        .arg(
            Arg::new("collection")
                .short('c')
                .long("collection")
                .help("Collection name to delete documents from")
                .required(true),
        )
        .arg(
            Arg::new("skip-errors")
                .short('s')
                .long("skip-errors")
                .help("Report and skip individual deletion errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("doc_ids")
                .value_name("DOC_IDS")
                .num_args(1..)
                .required(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_tree_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_load_invocation() {
        let m = build_cli()
            .try_get_matches_from([
                "docload", "load", "--collection", "journals", "-i", "jl-1", "a.json", "b.json",
            ])
            .unwrap();
        let (name, sub) = m.subcommand().unwrap();
        assert_eq!(name, "load");
        assert_eq!(sub.get_one::<String>("collection").unwrap(), "journals");
        assert_eq!(sub.get_one::<String>("doc-id").unwrap(), "jl-1");
        let files: Vec<_> = sub.get_many::<String>("json_files").unwrap().collect();
        assert_eq!(files, ["a.json", "b.json"]);
    }

    #[test]
    fn test_query_invocation() {
        let m = build_cli()
            .try_get_matches_from([
                "docload",
                "--store",
                "memory",
                "query",
                "-c",
                "articles",
                "--limit",
                "3",
                "pmcid == PMC13901",
            ])
            .unwrap();
        assert_eq!(m.get_one::<String>("store").unwrap(), "memory");
        let (_, sub) = m.subcommand().unwrap();
        assert_eq!(*sub.get_one::<usize>("limit").unwrap(), 3);
    }

    #[test]
    fn test_delete_requires_collection() {
        let result = build_cli().try_get_matches_from(["docload", "delete", "x1"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_store_value_is_validated() {
        let result =
            build_cli().try_get_matches_from(["docload", "--store", "cassandra", "list-collections"]);
        assert!(result.is_err());
    }
}
