//! Reader for .NET metadata modules
//!
//! `dotscope` parses the PE image, the metadata root, the heaps and the
//! table stream. This module maps the raw definition tables into a
//! [`Module`]. Only what the API surface needs is read; method bodies and
//! resources are ignored.

mod loader;
mod signature;

use crate::types::Module;
use dotscope::{CilObject, ValidationConfig};
use log::info;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading a module
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("{0}")]
    Dotscope(#[from] dotscope::Error),

    #[error("Missing metadata stream {0}")]
    MissingStream(&'static str),

    #[error("Truncated data at offset {offset} (needed {needed} more bytes)")]
    Truncated { offset: usize, needed: usize },

    #[error("Invalid {table} index {index}")]
    InvalidIndex { table: &'static str, index: u32 },

    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
}

/// Read a module from disk
pub fn load_module<P: AsRef<Path>>(path: P) -> Result<Module, MetadataError> {
    let path = path.as_ref();
    let object = CilObject::from_path_with_validation(path, ValidationConfig::minimal())?;
    let module = build_module(&object, path)?;
    info!(
        "Loaded module {} ({} types, {} references)",
        module.name,
        module.types.len(),
        module.assembly_refs.len()
    );
    Ok(module)
}

/// Build a module from an in-memory image; `path` is recorded on the result
pub fn read_module(bytes: &[u8], path: &Path) -> Result<Module, MetadataError> {
    let object = CilObject::from_mem_with_validation(bytes.to_vec(), ValidationConfig::minimal())?;
    build_module(&object, path)
}

fn build_module(object: &CilObject, path: &Path) -> Result<Module, MetadataError> {
    let mut module = loader::Loader::new(object)?.load()?;
    module.path = path.to_path_buf();
    Ok(module)
}
