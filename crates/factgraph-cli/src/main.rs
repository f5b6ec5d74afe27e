//! Fact graph toolchain: inspect a dictionary, read and write facts against
//! a store file, and serve the HTTP boundary.

mod loader;
mod serve;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use factgraph::{Dictionary, FactGraphError, FactResult, Graph, MigrationRegistry, Store};

/// Environment variable naming the dictionary file when `--dictionary` is
/// not passed.
const DICTIONARY_ENV: &str = "FACTGRAPH_DICTIONARY";

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Fact graph toolchain.
#[derive(Parser)]
#[command(name = "factgraph", version, about = "Fact graph toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Dictionary JSON file; falls back to $FACTGRAPH_DICTIONARY
    #[arg(long, global = true)]
    dictionary: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the facts a dictionary declares
    Inspect,

    /// Evaluate one fact against a store file
    Get {
        /// Fact path, e.g. /total
        path: String,
        /// Store JSON file (omitted: empty store)
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Write a fact value (plain JSON) into a store file
    Set {
        /// Fact path, e.g. /income
        path: String,
        /// Plain JSON value, e.g. 50000 or '"2024-02-29"'
        value: String,
        /// Store JSON file; created when missing
        #[arg(long)]
        store: PathBuf,
    },

    /// Evaluate every writable's limits against a store file
    Save {
        #[arg(long)]
        store: PathBuf,
    },

    /// Print the derivation trace of a fact
    Explain {
        path: String,
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Serve the HTTP boundary
    Serve {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(message) = run(&cli) {
        eprintln!("error: {}", message);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let dictionary = load_dictionary(cli)?;
    match &cli.command {
        Commands::Inspect => inspect(cli, &dictionary),
        Commands::Get { path, store } => {
            let graph = open_graph(dictionary, store.as_deref())?;
            let result = graph.get(path).map_err(fmt_err)?;
            print_result(cli, path, &result);
            Ok(())
        }
        Commands::Set { path, value, store } => {
            let mut graph = open_graph(dictionary.clone(), Some(store.as_path()))?;
            let raw: serde_json::Value =
                serde_json::from_str(value).map_err(|e| format!("bad value JSON: {}", e))?;
            let parsed = factgraph::Path::parse(path).map_err(fmt_err)?;
            let typed = dictionary.coerce_plain(&parsed, &raw).map_err(fmt_err)?;
            let outcome = graph.set(path, typed).map_err(fmt_err)?;
            std::fs::write(store, graph.to_json(true))
                .map_err(|e| format!("cannot write {}: {}", store.display(), e))?;
            print_outcome(cli, &outcome);
            Ok(())
        }
        Commands::Save { store } => {
            let mut graph = open_graph(dictionary, Some(store.as_path()))?;
            let outcome = graph.save().map_err(fmt_err)?;
            print_outcome(cli, &outcome);
            if !outcome.ok {
                return Err("save reported violations".to_string());
            }
            Ok(())
        }
        Commands::Explain { path, store } => {
            let graph = open_graph(dictionary, store.as_deref())?;
            let trace = graph.explain(path).map_err(fmt_err)?;
            match cli.output {
                OutputFormat::Text => print!("{}", trace),
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "trace": trace }));
                }
            }
            Ok(())
        }
        Commands::Serve { listen } => {
            let graph = Graph::new(dictionary.clone(), Store::new());
            let runtime = tokio::runtime::Runtime::new()
                .map_err(|e| format!("cannot start runtime: {}", e))?;
            runtime
                .block_on(serve::run(
                    listen,
                    dictionary,
                    graph,
                    MigrationRegistry::empty(),
                ))
                .map_err(|e| e.to_string())
        }
    }
}

fn load_dictionary(cli: &Cli) -> Result<Arc<Dictionary>, String> {
    let path = match &cli.dictionary {
        Some(p) => p.clone(),
        None => std::env::var(DICTIONARY_ENV)
            .map(PathBuf::from)
            .map_err(|_| format!("pass --dictionary or set ${}", DICTIONARY_ENV))?,
    };
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    loader::load_dictionary(&raw).map_err(fmt_err)
}

fn open_graph(
    dictionary: Arc<Dictionary>,
    store: Option<&std::path::Path>,
) -> Result<Graph, String> {
    let store = match store {
        Some(path) if path.exists() => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
            Store::from_json(&raw).map_err(fmt_err)?
        }
        _ => Store::new(),
    };
    Ok(Graph::new(dictionary, store))
}

fn inspect(cli: &Cli, dictionary: &Dictionary) -> Result<(), String> {
    match cli.output {
        OutputFormat::Json => {
            let facts: Vec<serde_json::Value> = dictionary
                .definitions()
                .map(|def| match def.writable() {
                    Some(w) => serde_json::json!({
                        "path": def.path.to_string(),
                        "writable": true,
                        "type": w.kind.tag(),
                    }),
                    None => serde_json::json!({
                        "path": def.path.to_string(),
                        "writable": false,
                    }),
                })
                .collect();
            println!("{}", serde_json::json!({ "facts": facts }));
        }
        OutputFormat::Text => {
            for def in dictionary.definitions() {
                match def.writable() {
                    Some(w) => println!("{}  writable {}", def.path, w.kind.tag()),
                    None => println!("{}  derived", def.path),
                }
            }
        }
    }
    Ok(())
}

fn print_result(cli: &Cli, path: &str, result: &FactResult<factgraph::Value>) {
    match cli.output {
        OutputFormat::Json => {
            let body = match result {
                FactResult::Complete(v) => {
                    serde_json::json!({ "path": path, "value": v.to_plain_json(), "complete": true })
                }
                FactResult::Placeholder(v) => {
                    serde_json::json!({ "path": path, "value": v.to_plain_json(), "complete": false })
                }
                FactResult::Incomplete => {
                    serde_json::json!({ "path": path, "complete": false })
                }
            };
            println!("{}", body);
        }
        OutputFormat::Text => match result {
            FactResult::Complete(v) => println!("{} = {}", path, v),
            FactResult::Placeholder(v) => println!("{} = {} (placeholder)", path, v),
            FactResult::Incomplete => println!("{} is incomplete", path),
        },
    }
}

fn print_outcome(cli: &Cli, outcome: &factgraph::SaveOutcome) {
    match cli.output {
        OutputFormat::Json => {
            let violations: Vec<serde_json::Value> = outcome
                .violations
                .iter()
                .map(|v| {
                    serde_json::json!({
                        "path": v.path,
                        "limit": v.limit,
                        "severity": v.severity.to_string(),
                        "message": v.message,
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::json!({ "success": outcome.ok, "violations": violations })
            );
        }
        OutputFormat::Text => {
            if outcome.violations.is_empty() {
                println!("ok");
            } else {
                for v in &outcome.violations {
                    println!("{}: {}", v.severity, v);
                }
            }
        }
    }
}

fn fmt_err(e: FactGraphError) -> String {
    e.to_string()
}
