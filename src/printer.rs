//! Print pipeline: load, join documentation, walk, encode

use crate::classify::{is_obsolete, Decision};
use crate::docid::doc_id;
use crate::docs::AssemblyDocument;
use crate::metadata::load_module;
use crate::options::{OutputFormat, PrintOptions};
use crate::types::{Module, Symbol, TypeSig};
use crate::walker::walk;
use crate::writer::{create_writer, output_error, ApiEntry, Sink};
use crate::{ApiError, Result};
use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Expand directory arguments to the `.dll` files directly inside them,
/// sorted by file name. Other paths pass through untouched.
pub fn collect_inputs<P: AsRef<Path>>(paths: &[P]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if !path.is_dir() {
            files.push(path.to_path_buf());
            continue;
        }
        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && is_module_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    files
}

fn is_module_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("dll"))
}

/// Read a module, attaching the path to any failure
pub fn read_input(path: &Path) -> Result<Module> {
    load_module(path).map_err(|source| ApiError::Metadata {
        path: path.to_path_buf(),
        source,
    })
}

/// Totals for one print run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrintSummary {
    pub modules: usize,
    pub emitted: usize,
}

pub struct ApiPrinter {
    options: PrintOptions,
}

impl ApiPrinter {
    pub fn new(options: PrintOptions) -> Self {
        Self { options }
    }

    /// Print every input into the configured destination.
    ///
    /// The destination is opened first, then all inputs and their sidecars
    /// are loaded. It is only truncated once everything has loaded, so a
    /// bad input leaves the previous output in place.
    pub fn run<P: AsRef<Path>>(&self, inputs: &[P]) -> Result<PrintSummary> {
        let options = &self.options;
        debug!(
            "Print options: format={} kinds={} hidden={} output={}",
            options.format,
            options.kinds,
            options.include_hidden,
            options
                .output
                .as_deref()
                .map_or_else(|| "<stdout>".to_string(), |p| p.display().to_string())
        );

        let sink = Sink::open(options.output.as_deref())?;
        let path = sink.path.clone();
        let sink_path = path.as_deref();

        let mut loaded = Vec::new();
        for input in collect_inputs(inputs) {
            let module = read_input(&input)?;
            let docs = match options.format {
                OutputFormat::Plain => AssemblyDocument::empty(),
                _ => AssemblyDocument::load_for(&module.path, options.dedupe_tokens)?,
            };
            loaded.push((module, docs));
        }

        let writer = sink.into_writer()?;

        let mut out = create_writer(options.format, options.category.clone(), writer);
        let mut summary = PrintSummary::default();

        out.begin_document().map_err(|e| output_error(sink_path, e))?;
        for (module, docs) in &loaded {
            out.begin_assembly(module).map_err(|e| output_error(sink_path, e))?;
            let stats = walk(module, options, |symbol, decision| {
                let entry = build_entry(module, docs, &symbol, decision);
                out.write_member(&entry).map_err(|e| output_error(sink_path, e))
            })?;
            out.end_assembly(module).map_err(|e| output_error(sink_path, e))?;
            summary.modules += 1;
            summary.emitted += stats.emitted;
        }
        out.end_document().map_err(|e| output_error(sink_path, e))?;
        out.flush().map_err(|e| output_error(sink_path, e))?;

        Ok(summary)
    }
}

/// Assemble the encoder record for an emitted symbol
pub fn build_entry(
    module: &Module,
    docs: &AssemblyDocument,
    symbol: &Symbol<'_>,
    decision: Decision,
) -> ApiEntry {
    let id = doc_id(module, symbol);
    let record = docs.lookup(&id).cloned().unwrap_or_default();
    let declaring = symbol.declaring_type();

    let (base_type, return_type, constant) = match symbol {
        Symbol::Type { def, .. } => (def.base_type.as_ref().map(TypeSig::full_name), None, None),
        Symbol::Field { def, .. } => (
            None,
            Some(def.field_type.full_name()),
            def.constant.as_ref().map(|c| c.to_string()),
        ),
        Symbol::Property { def, .. } => (None, Some(def.property_type.full_name()), None),
        Symbol::Event { def, .. } => (None, Some(def.event_type.full_name()), None),
        Symbol::Method { def, .. } => (None, Some(def.return_type.full_name()), None),
    };

    let namespace = match (symbol, declaring) {
        (_, Some(outer)) => module.ty(outer).namespace.clone(),
        (Symbol::Type { def, .. }, None) => def.namespace.clone(),
        _ => String::new(),
    };

    ApiEntry {
        kind: symbol.kind(),
        signature: signature(module, symbol),
        doc_id: id,
        base_type,
        return_type,
        declaring_type: declaring.map(|outer| module.type_full_name(outer)),
        namespace: Some(namespace).filter(|ns| !ns.is_empty()),
        constant,
        is_static: symbol.is_static(),
        is_hidden: decision.hidden,
        is_obsolete: is_obsolete(symbol),
        since: record.since,
        privileges: record.privileges,
        features: record.features,
    }
}

/// Reader-style member full name
///
/// `System.Void NS.A::Run(System.Int32)` for methods, the plain type full
/// name for types.
pub fn signature(module: &Module, symbol: &Symbol<'_>) -> String {
    let owner = |id| module.type_full_name(id);
    match symbol {
        Symbol::Type { id, .. } => module.type_full_name(*id),
        Symbol::Field { owner: o, def } => {
            format!("{} {}::{}", def.field_type.full_name(), owner(*o), def.name)
        }
        Symbol::Event { owner: o, def } => {
            format!("{} {}::{}", def.event_type.full_name(), owner(*o), def.name)
        }
        Symbol::Property { owner: o, def } => format!(
            "{} {}::{}({})",
            def.property_type.full_name(),
            owner(*o),
            def.name,
            join_types(def.parameters.iter())
        ),
        Symbol::Method { owner: o, def } => format!(
            "{} {}::{}({})",
            def.return_type.full_name(),
            owner(*o),
            def.name,
            join_types(def.parameters.iter().map(|p| &p.ty))
        ),
    }
}

fn join_types<'a>(types: impl Iterator<Item = &'a TypeSig>) -> String {
    types.map(TypeSig::full_name).collect::<Vec<_>>().join(",")
}
