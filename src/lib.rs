//! API Surface - public contract extraction for .NET assemblies
//!
//! This library reads a compiled .NET module, decides which of its types
//! and members form the public contract, names each of them with its
//! documentation identifier, and renders the result as plain identifiers,
//! CSV or JSON. An XML documentation sidecar next to the module contributes
//! privileges, features and the version a symbol was introduced in.
//!
//! # Features
//!
//! - Self-contained ECMA-335 metadata reader (no runtime required)
//! - Visibility and hidden-status classification
//! - Documentation identifiers matching compiler-generated XML docs
//! - Streaming plain, CSV and JSON encoders
//! - Assembly reference listing
//!
//! # Example
//!
//! ```no_run
//! use api_surface::{ApiPrinter, OutputFormat, PrintOptions};
//!
//! let options = PrintOptions {
//!     format: OutputFormat::Json,
//!     ..PrintOptions::default()
//! };
//!
//! let summary = ApiPrinter::new(options).run(&["Tizen.Network.dll"]).unwrap();
//! eprintln!("{} entries", summary.emitted);
//! ```

pub mod classify;
pub mod docid;
pub mod docs;
pub mod metadata;
pub mod options;
pub mod printer;
pub mod refs;
pub mod types;
pub mod walker;
pub mod writer;

pub use classify::{Classifier, Decision};
pub use docid::doc_id;
pub use docs::{AssemblyDocument, DocRecord};
pub use metadata::{load_module, MetadataError};
pub use options::{KindFilter, OutputFormat, PrintConfig, PrintOptions};
pub use printer::{ApiPrinter, PrintSummary};
pub use refs::{print_references, RefOptions};
pub use types::{Module, Symbol, SymbolKind};
pub use walker::{walk, WalkStats};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while extracting an API surface
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read module {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: MetadataError,
    },

    #[error("Malformed documentation file {}: {message}", .path.display())]
    Sidecar { path: PathBuf, message: String },

    #[error("Cannot write output {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;
