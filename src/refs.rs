//! Assembly reference listing

use crate::printer::{collect_inputs, read_input};
use crate::types::{AssemblyName, Module};
use crate::Result;
use log::debug;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefOptions {
    /// Print simple names instead of display names
    pub name_only: bool,
}

/// Reference lines of one module: sorted by simple name, repeats dropped
pub fn reference_lines(module: &Module, options: RefOptions) -> Vec<String> {
    let mut refs: Vec<&AssemblyName> = module.assembly_refs.iter().collect();
    refs.sort_by(|a, b| a.name.cmp(&b.name));

    let mut lines: Vec<String> = Vec::with_capacity(refs.len());
    for r in refs {
        let line = if options.name_only {
            r.name.clone()
        } else {
            r.display_name()
        };
        if !lines.contains(&line) {
            lines.push(line);
        }
    }
    lines
}

/// Print the references of every input to `out`
pub fn print_references<P, W>(inputs: &[P], options: RefOptions, out: &mut W) -> Result<()>
where
    P: AsRef<Path>,
    W: Write,
{
    for input in collect_inputs(inputs) {
        debug!("Target file: {}", input.display());
        let module = read_input(&input)?;
        if let Some(ref assembly) = module.assembly {
            debug!("Target assembly: {}", assembly.display_name());
        }
        for line in reference_lines(&module, options) {
            writeln!(out, "{}", line)?;
        }
    }
    out.flush()?;
    Ok(())
}
