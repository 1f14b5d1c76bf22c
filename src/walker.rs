//! Traversal over a module's symbol tree
//!
//! Top-level types are visited in definition order. Within a type the order
//! is fields, properties, events, methods, then nested types, recursively.
//! Members of a type are only surfaced when the type itself is surfaced;
//! the kind filter never stops the descent.

use crate::classify::{Classifier, Decision};
use crate::options::PrintOptions;
use crate::types::{Module, Symbol, TypeId};
use crate::Result;
use log::debug;

/// Counters for one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub emitted: usize,
    /// Not part of the contract, hidden, or inside a type that is either
    pub excluded: usize,
    /// Surfaced but rejected by the kind filter
    pub filtered: usize,
}

/// Visit every symbol of `module`, calling `emit` for those that pass the
/// emission test. An error from `emit` stops the walk.
pub fn walk<'m, F>(module: &'m Module, options: &PrintOptions, emit: F) -> Result<WalkStats>
where
    F: FnMut(Symbol<'m>, Decision) -> Result<()>,
{
    let mut walker = Walker {
        module,
        options,
        classifier: Classifier::new(module),
        emit,
        stats: WalkStats::default(),
    };
    for id in module.top_level_types() {
        walker.visit_type(id, true)?;
    }
    debug!(
        "Walked {}: {} emitted, {} excluded, {} filtered",
        module.name, walker.stats.emitted, walker.stats.excluded, walker.stats.filtered
    );
    Ok(walker.stats)
}

struct Walker<'o, 'm, F> {
    module: &'m Module,
    options: &'o PrintOptions,
    classifier: Classifier<'m>,
    emit: F,
    stats: WalkStats,
}

impl<'o, 'm, F> Walker<'o, 'm, F>
where
    F: FnMut(Symbol<'m>, Decision) -> Result<()>,
{
    /// Offer a symbol; returns whether it is surfaced, ignoring the kind filter
    fn offer(&mut self, symbol: Symbol<'m>, open: bool) -> Result<bool> {
        if !open {
            self.stats.excluded += 1;
            return Ok(false);
        }
        let decision = self.classifier.classify(&symbol);
        if !decision.included || (decision.hidden && !self.options.include_hidden) {
            self.stats.excluded += 1;
            return Ok(false);
        }
        if decision.should_emit(symbol.kind(), self.options) {
            self.stats.emitted += 1;
            (self.emit)(symbol, decision)?;
        } else {
            self.stats.filtered += 1;
        }
        Ok(true)
    }

    /// `open` is false when an enclosing type was not surfaced
    fn visit_type(&mut self, id: TypeId, open: bool) -> Result<()> {
        let module = self.module;
        let def = module.ty(id);
        let open = self.offer(Symbol::Type { id, def }, open)?;

        for field in &def.fields {
            self.offer(Symbol::Field { owner: id, def: field }, open)?;
        }
        for property in &def.properties {
            self.offer(Symbol::Property { owner: id, def: property }, open)?;
        }
        for event in &def.events {
            self.offer(Symbol::Event { owner: id, def: event }, open)?;
        }
        for method in &def.methods {
            self.offer(Symbol::Method { owner: id, def: method }, open)?;
        }
        for &nested in &def.nested_types {
            self.visit_type(nested, open)?;
        }
        Ok(())
    }
}
