//! API Surface CLI
//!
//! Print the public API of .NET assemblies, or list what they reference.

use anyhow::{Context, Result};
use api_surface::{
    print_references, ApiPrinter, OutputFormat, PrintConfig, PrintOptions, RefOptions, SymbolKind,
};
use clap::{Args, Parser, Subcommand};
use log::debug;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "api-surface")]
#[command(author, version, about = "Public API surface extractor for .NET assemblies")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the public API of assemblies
    Print(PrintArgs),

    /// List the assemblies referenced by assemblies
    Refs {
        /// Assembly files or directories of assemblies
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Print simple names only
        #[arg(short, long)]
        name_only: bool,
    },
}

#[derive(Args)]
struct PrintArgs {
    /// Assembly files or directories of assemblies
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (default: standard output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (plain, csv, json)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Print types
    #[arg(long)]
    types: bool,

    /// Print fields
    #[arg(long)]
    fields: bool,

    /// Print properties
    #[arg(long)]
    properties: bool,

    /// Print events
    #[arg(long)]
    events: bool,

    /// Print methods
    #[arg(long)]
    methods: bool,

    /// Include symbols hidden from documentation
    #[arg(long)]
    hidden: bool,

    /// Category written into every JSON entry
    #[arg(long)]
    category: Option<String>,

    /// Drop repeated privilege and feature tokens
    #[arg(long)]
    dedupe_tokens: bool,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl PrintArgs {
    /// Defaults, then the configuration file, then flags
    fn resolve(&self) -> Result<PrintOptions> {
        let mut options = PrintOptions::default();
        if let Some(ref path) = self.config {
            PrintConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?
                .apply(&mut options);
        }

        if let Some(format) = self.format {
            options.format = format;
        }
        if let Some(ref output) = self.output {
            options.output = Some(output.clone());
        }
        let kinds: Vec<SymbolKind> = [
            (self.types, SymbolKind::Type),
            (self.fields, SymbolKind::Field),
            (self.properties, SymbolKind::Property),
            (self.events, SymbolKind::Event),
            (self.methods, SymbolKind::Method),
        ]
        .into_iter()
        .filter_map(|(on, kind)| on.then_some(kind))
        .collect();
        if !kinds.is_empty() {
            options.kinds = kinds.into_iter().collect();
        }
        if self.hidden {
            options.include_hidden = true;
        }
        if let Some(ref category) = self.category {
            options.category = Some(category.clone());
        }
        if self.dedupe_tokens {
            options.dedupe_tokens = true;
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Print(args) => cmd_print(&args),
        Commands::Refs { inputs, name_only } => cmd_refs(&inputs, name_only),
    }
}

fn cmd_print(args: &PrintArgs) -> Result<()> {
    let options = args.resolve()?;
    let summary = ApiPrinter::new(options)
        .run(&args.inputs)
        .context("Failed to print API")?;
    debug!(
        "Printed {} entries from {} modules",
        summary.emitted, summary.modules
    );
    Ok(())
}

fn cmd_refs(inputs: &[PathBuf], name_only: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    print_references(inputs, RefOptions { name_only }, &mut out)
        .context("Failed to list references")?;
    Ok(())
}
