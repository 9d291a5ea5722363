//! content-import CLI tool
//!
//! Imports source files into an in-memory content store and prints the import report.
//!
//! Files with a registered provider extension (`.json`) are decoded into node trees. Any other
//! file is stored as a binary resource. All files share one session, so references between
//! them resolve regardless of their order on the command line.

use clap::Parser;
use content_loader::{
    config::ImportOptions,
    event::ContentEvent,
    loader::ImportSession,
    paths,
    store::{ContentStore, MemoryStore, NodeHandle},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "content-import")]
#[command(author, version, about = "Import content files into a store and report the result", long_about = None)]
struct Cli {
    /// Files to import
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Import options file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Import options in manifest header form, e.g. `content;overwrite:=true`
    #[arg(long, conflicts_with = "config")]
    header: Option<String>,

    /// Store path to import below, overrides the configured target
    #[arg(short, long)]
    target: Option<String>,

    /// Replace existing nodes
    #[arg(long)]
    overwrite: bool,

    /// Print the resulting content tree
    #[arg(short, long)]
    print: bool,
}

fn load_options(cli: &Cli) -> Result<ImportOptions, Box<dyn std::error::Error>> {
    let mut options = match (&cli.config, &cli.header) {
        (Some(path), _) => ImportOptions::from_toml(&std::fs::read_to_string(path)?)?,
        (None, Some(header)) => ImportOptions::from_header(header)?,
        (None, None) => ImportOptions::default(),
    };
    if let Some(target) = &cli.target {
        options.target = Some(target.clone());
    }
    options.overwrite |= cli.overwrite;
    Ok(options)
}

fn print_tree(
    store: &MemoryStore,
    node: NodeHandle,
    depth: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let indent = "  ".repeat(depth);
    let path = store.path(node)?;
    println!(
        "{indent}{} [{}]",
        paths::name_of(&path),
        store.primary_type(node)?
    );
    for name in store.property_names(node)? {
        if let Some(value) = store.property(node, &name)? {
            println!("{indent}  @{name} = {value}");
        }
    }
    for name in store.child_names(node)? {
        if let Some(child) = store.child(node, &name)? {
            print_tree(store, child, depth + 1)?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let options = load_options(&cli)?;
    let anchor = options.target.clone().unwrap_or_else(|| "/".to_string());

    let mut store = MemoryStore::new();
    {
        let mut session = ImportSession::with_defaults(&mut store, options);
        for file in cli.files.iter() {
            let name = file.to_string_lossy().to_string();
            let content = std::fs::read(file)?;
            if session.provider_for(&name).is_some() {
                session.import_source(&anchor, &name, &content)?;
            } else {
                let file_name = paths::name_of(&name).to_string();
                session.begin(&anchor, Some(&file_name))?;
                session.apply(ContentEvent::BinaryResource {
                    name: file_name,
                    data: content,
                    media_type: None,
                    last_modified: 0,
                })?;
            }
        }
        let report = session.finish()?;

        println!("\n=== Import Report ===");
        println!("Roots: {}", report.roots.len());
        for path in report.roots.iter() {
            println!("  {path}");
        }
        println!("Created nodes: {}", report.created_nodes.len());
        for path in report.created_nodes.iter() {
            println!("  {path}");
        }
        println!("Versionable nodes: {}", report.versionables.len());
        for path in report.versionables.iter() {
            println!("  {path}");
        }
        println!("Unresolved references: {}", report.unresolved.len());
        for reference in report.unresolved.iter() {
            println!("  {reference}");
        }
    }

    if cli.print {
        println!("\n=== Content Tree ===");
        print_tree(&store, store.root(), 0)?;
    }

    Ok(())
}
