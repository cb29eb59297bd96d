//! `kindtree` command-line front end.
//!
//! # Responsibility
//! - Expose each ontology service operation as one subcommand.
//! - Resolve database and logging settings from env and flags.
//!
//! Sentinel failures (unknown kind, missing property) exit with status 1.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kindtree_core::db::open_db;
use kindtree_core::{init_logging, CoreConfig, OntologyService, SqliteOntologyStore, ROOT_KIND};
use std::path::PathBuf;
use std::process::ExitCode;

/// Manage a persisted taxonomy of kinds and their properties.
#[derive(Parser)]
#[command(name = "kindtree", version, about)]
struct Args {
    /// SQLite database file (overrides KINDTREE_DB_PATH).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level (overrides KINDTREE_LOG_LEVEL).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory for rolling log files (overrides KINDTREE_LOG_DIR).
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a kind; a missing parent is added under the root first.
    Create {
        kind: String,
        #[arg(long, default_value = ROOT_KIND)]
        parent: String,
        #[arg(long = "property")]
        properties: Vec<String>,
    },
    /// Remove a kind and all of its descendants.
    Remove { kind: String },
    /// Rename properties of a kind pairwise.
    RenameProperties {
        kind: String,
        #[arg(long = "old", required = true)]
        old: Vec<String>,
        #[arg(long = "new", required = true)]
        new: Vec<String>,
    },
    /// List direct children of a kind.
    Children { kind: String },
    /// List properties of a kind.
    Properties { kind: String },
    /// Check that a kind has all given properties.
    Check {
        kind: String,
        #[arg(required = true)]
        properties: Vec<String>,
    },
    /// Print the whole tree as JSON.
    Show,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let config = resolve_config(&args);
    init_logging(&config.log_level, config.log_target()).context("logging setup failed")?;

    let conn = open_db(&config.db_path)
        .with_context(|| format!("cannot open `{}`", config.db_path.display()))?;
    let store = SqliteOntologyStore::try_new(&conn)?;
    let service = OntologyService::new(store);

    let ok = run(&service, args.command)?;
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn resolve_config(args: &Args) -> CoreConfig {
    let mut config = CoreConfig::from_env();
    if let Some(db) = &args.db {
        config.db_path = db.clone();
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = Some(dir.clone());
    }
    config
}

fn run(service: &OntologyService<SqliteOntologyStore<'_>>, command: Command) -> Result<bool> {
    match command {
        Command::Create {
            kind,
            parent,
            properties,
        } => {
            let tree = service.create_kind(&kind, &parent, properties)?;
            println!("{} kind(s) in ontology", tree.kind_count());
            Ok(true)
        }
        Command::Remove { kind } => report(service.remove_kind(&kind)?, "removed"),
        Command::RenameProperties { kind, old, new } => report(
            service.update_properties_of_kind(&kind, old.as_slice(), new.as_slice())?,
            "properties updated",
        ),
        Command::Children { kind } => match service.get_descendant_kinds(&kind)? {
            Some(children) => {
                children.iter().for_each(|child| println!("{child}"));
                Ok(true)
            }
            None => report(false, ""),
        },
        Command::Properties { kind } => match service.get_kind_properties(&kind)? {
            Some(properties) => {
                properties.iter().for_each(|property| println!("{property}"));
                Ok(true)
            }
            None => report(false, ""),
        },
        Command::Check { kind, properties } => {
            let ok = service.are_properties_in_kind(properties.as_slice(), &kind)?;
            println!("{ok}");
            Ok(ok)
        }
        Command::Show => {
            let tree = service.ontology_graph()?;
            println!("{}", serde_json::to_string_pretty(&tree)?);
            Ok(true)
        }
    }
}

fn report(ok: bool, success_message: &str) -> Result<bool> {
    if ok {
        println!("{success_message}");
    } else {
        eprintln!("operation failed; see log for details");
    }
    Ok(ok)
}
