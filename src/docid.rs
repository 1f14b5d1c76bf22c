//! Canonical documentation identifiers
//!
//! Produces the `T:`/`F:`/`P:`/`E:`/`M:` member ids that the C# compiler
//! writes into XML documentation files, so sidecar entries join by plain
//! string equality.
//!
//! - nested types are joined with `.`; definitions keep their `` `N `` arity
//! - member names have `.` `<` `>` `,` replaced by `#` `{` `}` `@`
//! - generic methods append ``` ``N ``` before the parameter list
//! - parameter types spell generic instances as `List{System.Int32}`,
//!   type parameters as `` `N `` and method parameters as ``` ``N ```
//! - by-ref is `@`, pointers `*`, vectors `[]`, general arrays `[0:,0:]`
//! - conversion operators append `~` and the return type
//! - custom modifiers are not part of the id

use crate::types::{GenericOwner, MethodDef, Module, Symbol, TypeName, TypeSig};

/// Canonical id of a symbol
pub fn doc_id(module: &Module, symbol: &Symbol<'_>) -> String {
    let mut out = String::new();
    out.push(symbol.kind().prefix());
    out.push(':');
    match symbol {
        Symbol::Type { id, .. } => {
            write_definition_name(&module.type_name(*id), &mut out);
        }
        Symbol::Field { owner, def } => {
            write_member_prefix(module, *owner, &def.name, &mut out);
        }
        Symbol::Event { owner, def } => {
            write_member_prefix(module, *owner, &def.name, &mut out);
        }
        Symbol::Property { owner, def } => {
            write_member_prefix(module, *owner, &def.name, &mut out);
            write_parameters(def.parameters.iter(), &mut out);
        }
        Symbol::Method { owner, def } => {
            write_member_prefix(module, *owner, &def.name, &mut out);
            if !def.generic_params.is_empty() {
                out.push_str("``");
                out.push_str(&def.generic_params.len().to_string());
            }
            write_parameters(def.parameters.iter().map(|p| &p.ty), &mut out);
            if is_conversion_operator(def) {
                out.push('~');
                write_type(&def.return_type, &mut out);
            }
        }
    }
    out
}

fn write_member_prefix(module: &Module, owner: crate::types::TypeId, name: &str, out: &mut String) {
    write_definition_name(&module.type_name(owner), out);
    out.push('.');
    for c in name.chars() {
        out.push(match c {
            '.' => '#',
            '<' => '{',
            '>' => '}',
            ',' => '@',
            other => other,
        });
    }
}

fn is_conversion_operator(method: &MethodDef) -> bool {
    method.is_special_name && (method.name == "op_Implicit" || method.name == "op_Explicit")
}

/// `NS.Outer`1.Inner`
fn write_definition_name(name: &TypeName, out: &mut String) {
    if let Some(ref enclosing) = name.enclosing {
        write_definition_name(enclosing, out);
        out.push('.');
    } else if !name.namespace.is_empty() {
        out.push_str(&name.namespace);
        out.push('.');
    }
    out.push_str(&name.name);
}

fn write_parameters<'a>(params: impl Iterator<Item = &'a TypeSig>, out: &mut String) {
    let mut first = true;
    for param in params {
        out.push(if first { '(' } else { ',' });
        first = false;
        write_type(param, out);
    }
    if !first {
        out.push(')');
    }
}

fn write_type(sig: &TypeSig, out: &mut String) {
    match sig {
        TypeSig::Named(name) => write_definition_name(name, out),
        TypeSig::GenericInst { base, args } => {
            write_instance_level(base, args, out);
        }
        TypeSig::GenericParam { owner, position, .. } => {
            out.push_str(match owner {
                GenericOwner::Type => "`",
                GenericOwner::Method => "``",
            });
            out.push_str(&position.to_string());
        }
        TypeSig::SzArray(element) => {
            write_type(element, out);
            out.push_str("[]");
        }
        TypeSig::Array { element, dims } => {
            write_type(element, out);
            if sig.is_vector() {
                out.push_str("[]");
                return;
            }
            out.push('[');
            for (i, dim) in dims.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                if let Some(lower) = dim.lower {
                    out.push_str(&lower.to_string());
                    out.push(':');
                    if let Some(upper) = dim.upper {
                        out.push_str(&(i64::from(upper) - i64::from(lower) + 1).to_string());
                    }
                }
            }
            out.push(']');
        }
        TypeSig::Pointer(element) => {
            write_type(element, out);
            out.push('*');
        }
        TypeSig::ByRef(element) => {
            write_type(element, out);
            out.push('@');
        }
        TypeSig::FnPtr(fn_ptr) => {
            out.push_str("=FUNC:");
            write_type(&fn_ptr.return_type, out);
            write_parameters(fn_ptr.parameters.iter(), out);
        }
    }
}

/// Writes one nesting level of a generic instance and returns how many
/// type arguments the enclosing levels consumed
fn write_instance_level(name: &TypeName, args: &[TypeSig], out: &mut String) -> usize {
    let consumed = match name.enclosing {
        Some(ref enclosing) => {
            let consumed = write_instance_level(enclosing, args, out);
            out.push('.');
            consumed
        }
        None => {
            if !name.namespace.is_empty() {
                out.push_str(&name.namespace);
                out.push('.');
            }
            0
        }
    };

    let arity = name.arity();
    if arity == 0 {
        out.push_str(&name.name);
        return consumed;
    }
    out.push_str(name.name_without_arity());
    out.push('{');
    let end = (consumed + arity).min(args.len());
    for (i, arg) in args[consumed.min(end)..end].iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_type(arg, out);
    }
    out.push('}');
    end
}
