//! Visibility classification
//!
//! Decides whether a symbol belongs to the public contract and whether it
//! is hidden from documentation. Hidden status is inherited through the
//! declaring-type chain only; a type's hidden flag is computed once and
//! cached for the lifetime of the classifier.

use crate::options::PrintOptions;
use crate::types::{AttributeArg, CustomAttribute, MethodDef, Module, Symbol, TypeId};
use log::trace;
use std::cell::OnceCell;

const EDITOR_BROWSABLE: &str = "System.ComponentModel.EditorBrowsableAttribute";
const OBSOLETE: &str = "System.ObsoleteAttribute";
/// `EditorBrowsableState.Never`
const BROWSABLE_NEVER: i64 = 1;

/// Outcome of classifying one symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub included: bool,
    pub hidden: bool,
}

impl Decision {
    /// Final emission test for a symbol of the given decision
    pub fn should_emit(&self, kind: crate::types::SymbolKind, options: &PrintOptions) -> bool {
        self.included && (options.include_hidden || !self.hidden) && options.kinds.allows(kind)
    }
}

pub struct Classifier<'m> {
    module: &'m Module,
    hidden_types: Vec<OnceCell<bool>>,
}

impl<'m> Classifier<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            hidden_types: (0..module.types.len()).map(|_| OnceCell::new()).collect(),
        }
    }

    pub fn classify(&self, symbol: &Symbol<'m>) -> Decision {
        let decision = Decision {
            included: self.is_included(symbol),
            hidden: self.is_hidden(symbol),
        };
        trace!(
            "{} {}: included={} hidden={}",
            symbol.kind(),
            symbol.name(),
            decision.included,
            decision.hidden
        );
        decision
    }

    pub fn is_included(&self, symbol: &Symbol<'m>) -> bool {
        match symbol {
            Symbol::Type { def, .. } => def.accessibility == crate::types::Accessibility::Public,
            Symbol::Field { def, .. } => {
                def.accessibility.is_public_or_protected() && !def.is_special_name
            }
            Symbol::Property { owner, def } => {
                let ty = self.module.ty(*owner);
                accessor_visible(ty.method(def.getter)) || accessor_visible(ty.method(def.setter))
            }
            Symbol::Event { owner, def } => {
                let ty = self.module.ty(*owner);
                accessor_visible(ty.method(def.add_method)) || accessor_visible(ty.method(def.remove_method))
            }
            Symbol::Method { def, .. } => {
                (def.accessibility.is_public_or_protected() || is_explicit_implementation(def))
                    && !def.semantics.is_accessor()
            }
        }
    }

    pub fn is_hidden(&self, symbol: &Symbol<'m>) -> bool {
        if never_browsable(symbol.attributes()) {
            return true;
        }
        symbol
            .declaring_type()
            .is_some_and(|outer| self.is_type_hidden(outer))
    }

    pub fn is_type_hidden(&self, id: TypeId) -> bool {
        *self.hidden_types[id.0].get_or_init(|| {
            let def = self.module.ty(id);
            never_browsable(&def.attributes)
                || def
                    .declaring_type
                    .is_some_and(|outer| self.is_type_hidden(outer))
        })
    }
}

/// The symbol carries `ObsoleteAttribute` itself
pub fn is_obsolete(symbol: &Symbol<'_>) -> bool {
    symbol.attributes().iter().any(|a| a.type_name == OBSOLETE)
}

fn accessor_visible(method: Option<&MethodDef>) -> bool {
    method.is_some_and(|m| m.accessibility.is_public_or_protected())
}

/// A method whose name starts with the full name of an interface it overrides
fn is_explicit_implementation(method: &MethodDef) -> bool {
    method
        .overrides
        .iter()
        .any(|o| method.name.starts_with(&o.declaring_type.full_name()))
}

fn never_browsable(attributes: &[CustomAttribute]) -> bool {
    attributes
        .iter()
        .find(|a| a.type_name == EDITOR_BROWSABLE)
        .and_then(|a| a.args.first())
        .and_then(AttributeArg::as_i64)
        == Some(BROWSABLE_NEVER)
}
