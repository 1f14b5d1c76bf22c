//! Symbol model for a loaded module
//!
//! A read-only projection of a module's type and member tables. Nothing in
//! here decides visibility or builds identifiers; see [`crate::classify`]
//! and [`crate::docid`] for that.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of an API symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SymbolKind {
    Type,
    Field,
    Property,
    Event,
    Method,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 5] = [
        SymbolKind::Type,
        SymbolKind::Field,
        SymbolKind::Property,
        SymbolKind::Event,
        SymbolKind::Method,
    ];

    /// One-letter prefix used in canonical identifiers
    pub fn prefix(self) -> char {
        match self {
            SymbolKind::Type => 'T',
            SymbolKind::Field => 'F',
            SymbolKind::Property => 'P',
            SymbolKind::Event => 'E',
            SymbolKind::Method => 'M',
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Type => "type",
            SymbolKind::Field => "field",
            SymbolKind::Property => "property",
            SymbolKind::Event => "event",
            SymbolKind::Method => "method",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for SymbolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "type" | "types" => Ok(SymbolKind::Type),
            "field" | "fields" => Ok(SymbolKind::Field),
            "property" | "properties" => Ok(SymbolKind::Property),
            "event" | "events" => Ok(SymbolKind::Event),
            "method" | "methods" => Ok(SymbolKind::Method),
            _ => Err(format!("Unknown symbol kind: {}", s)),
        }
    }
}

impl TryFrom<String> for SymbolKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Declared accessibility of a type or member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Accessibility {
    Public,
    Protected,
    Internal,
    Private,
    ProtectedInternal,
    PrivateProtected,
}

impl Accessibility {
    /// Public or protected, the two levels visible outside the assembly
    pub fn is_public_or_protected(self) -> bool {
        matches!(self, Accessibility::Public | Accessibility::Protected)
    }
}

/// Index of a type within [`Module::types`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub usize);

/// Name of a type definition or reference, with its enclosing chain
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    /// Namespace as declared; empty for nested types
    pub namespace: String,
    /// Simple name including any generic arity suffix (`List`1`)
    pub name: String,
    /// Enclosing type for nested types
    pub enclosing: Option<Box<TypeName>>,
}

impl TypeName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            enclosing: None,
        }
    }

    pub fn nested(enclosing: TypeName, name: impl Into<String>) -> Self {
        Self {
            namespace: String::new(),
            name: name.into(),
            enclosing: Some(Box::new(enclosing)),
        }
    }

    /// Number of generic parameters this level declares, from the arity suffix
    pub fn arity(&self) -> usize {
        self.name
            .rfind('`')
            .and_then(|idx| self.name[idx + 1..].parse().ok())
            .unwrap_or(0)
    }

    /// Name with the generic arity suffix removed
    pub fn name_without_arity(&self) -> &str {
        match self.name.rfind('`') {
            Some(idx) if idx > 0 => &self.name[..idx],
            _ => &self.name,
        }
    }

    /// Reader-style full name: `NS.Outer/Inner`
    pub fn full_name(&self) -> String {
        let mut out = String::new();
        self.write_full_name(&mut out);
        out
    }

    fn write_full_name(&self, out: &mut String) {
        if let Some(ref enclosing) = self.enclosing {
            enclosing.write_full_name(out);
            out.push('/');
        } else if !self.namespace.is_empty() {
            out.push_str(&self.namespace);
            out.push('.');
        }
        out.push_str(&self.name);
    }
}

/// Who declares a generic parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericOwner {
    Type,
    Method,
}

/// One dimension of a general (non-vector) array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArrayDim {
    pub lower: Option<i32>,
    pub upper: Option<i32>,
}

impl ArrayDim {
    pub fn is_sized(&self) -> bool {
        self.lower.is_some() || self.upper.is_some()
    }
}

/// Function pointer signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FnPtrSig {
    pub return_type: TypeSig,
    pub parameters: Vec<TypeSig>,
}

/// A type as it appears in a signature
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSig {
    /// Plain named type; primitives are represented as their `System` type
    Named(TypeName),
    GenericInst {
        base: TypeName,
        args: Vec<TypeSig>,
    },
    GenericParam {
        owner: GenericOwner,
        position: u32,
        name: String,
    },
    SzArray(Box<TypeSig>),
    Array {
        element: Box<TypeSig>,
        dims: Vec<ArrayDim>,
    },
    Pointer(Box<TypeSig>),
    ByRef(Box<TypeSig>),
    FnPtr(Box<FnPtrSig>),
}

impl TypeSig {
    /// A type in the `System` namespace
    pub fn system(name: &str) -> Self {
        TypeSig::Named(TypeName::new("System", name))
    }

    pub fn void() -> Self {
        TypeSig::system("Void")
    }

    pub fn is_vector(&self) -> bool {
        match self {
            TypeSig::SzArray(_) => true,
            TypeSig::Array { dims, .. } => dims.len() == 1 && !dims[0].is_sized(),
            _ => false,
        }
    }

    /// Reader-style full name (`System.Collections.Generic.List`1<System.String>`)
    pub fn full_name(&self) -> String {
        let mut out = String::new();
        self.write_full_name(&mut out);
        out
    }

    fn write_full_name(&self, out: &mut String) {
        match self {
            TypeSig::Named(name) => name.write_full_name(out),
            TypeSig::GenericInst { base, args } => {
                base.write_full_name(out);
                out.push('<');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    arg.write_full_name(out);
                }
                out.push('>');
            }
            TypeSig::GenericParam { name, .. } => out.push_str(name),
            TypeSig::SzArray(element) => {
                element.write_full_name(out);
                out.push_str("[]");
            }
            TypeSig::Array { element, dims } => {
                element.write_full_name(out);
                if self.is_vector() {
                    out.push_str("[]");
                    return;
                }
                out.push('[');
                for (i, dim) in dims.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    if dim.is_sized() {
                        if let Some(lower) = dim.lower {
                            out.push_str(&lower.to_string());
                        }
                        out.push_str("...");
                        if let Some(upper) = dim.upper {
                            out.push_str(&upper.to_string());
                        }
                    }
                }
                out.push(']');
            }
            TypeSig::Pointer(element) => {
                element.write_full_name(out);
                out.push('*');
            }
            TypeSig::ByRef(element) => {
                element.write_full_name(out);
                out.push('&');
            }
            TypeSig::FnPtr(sig) => {
                out.push_str("method ");
                sig.return_type.write_full_name(out);
                out.push_str(" *(");
                for (i, param) in sig.parameters.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    param.write_full_name(out);
                }
                out.push(')');
            }
        }
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Decoded fixed argument of a custom attribute constructor
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeArg {
    Bool(bool),
    Char(char),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(Option<String>),
    Type(Option<String>),
    Array(Option<Vec<AttributeArg>>),
}

impl AttributeArg {
    /// Integral value, used for enum-typed arguments
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttributeArg::Int(v) => Some(*v),
            AttributeArg::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

/// A custom attribute applied to a type or member
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttribute {
    /// Full name of the attribute type
    pub type_name: String,
    /// Fixed constructor arguments; empty when none or not decodable
    pub args: Vec<AttributeArg>,
}

impl CustomAttribute {
    pub fn new(type_name: impl Into<String>, args: Vec<AttributeArg>) -> Self {
        Self {
            type_name: type_name.into(),
            args,
        }
    }
}

/// Literal value of a constant field
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Bool(bool),
    Char(u16),
    I1(i8),
    U1(u8),
    I2(i16),
    U2(u16),
    I4(i32),
    U4(u32),
    I8(i64),
    U8(u64),
    R4(f32),
    R8(f64),
    String(String),
    /// Null reference constant
    Null,
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Bool(true) => f.write_str("True"),
            Constant::Bool(false) => f.write_str("False"),
            Constant::Char(c) => {
                let ch = char::from_u32(u32::from(*c)).unwrap_or(char::REPLACEMENT_CHARACTER);
                write!(f, "{}", ch)
            }
            Constant::I1(v) => write!(f, "{}", v),
            Constant::U1(v) => write!(f, "{}", v),
            Constant::I2(v) => write!(f, "{}", v),
            Constant::U2(v) => write!(f, "{}", v),
            Constant::I4(v) => write!(f, "{}", v),
            Constant::U4(v) => write!(f, "{}", v),
            Constant::I8(v) => write!(f, "{}", v),
            Constant::U8(v) => write!(f, "{}", v),
            Constant::R4(v) => {
                let shortest = format!("{:e}", v);
                f.write_str(&format_real(*v as f64, v.is_sign_negative(), &shortest, 7))
            }
            Constant::R8(v) => {
                let shortest = format!("{:e}", v);
                f.write_str(&format_real(*v, v.is_sign_negative(), &shortest, 15))
            }
            Constant::String(s) => f.write_str(s),
            Constant::Null => Ok(()),
        }
    }
}

/// Render a float the way the runtime's invariant `ToString()` does.
///
/// `shortest` is Rust's shortest round-trip scientific form (`1.5e-7`);
/// `precision` is the exponent at which output switches to `E+XX` form.
fn format_real(value: f64, negative: bool, shortest: &str, precision: i32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if negative { "-Infinity" } else { "Infinity" }.to_string();
    }

    let (mantissa, exponent) = match shortest.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (shortest, 0),
    };
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let sign = if negative { "-" } else { "" };

    if digits.chars().all(|c| c == '0') {
        return format!("{}0", sign);
    }

    if exponent >= precision || exponent < -4 {
        let (head, tail) = digits.split_at(1);
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        let mut out = format!("{}{}", sign, head);
        if !tail.is_empty() {
            out.push('.');
            out.push_str(tail);
        }
        out.push('E');
        out.push(exp_sign);
        out.push_str(&format!("{:02}", exponent.abs()));
        return out;
    }

    let mut out = String::from(sign);
    if exponent >= 0 {
        let int_len = exponent as usize + 1;
        if digits.len() <= int_len {
            out.push_str(&digits);
            out.push_str(&"0".repeat(int_len - digits.len()));
        } else {
            out.push_str(&digits[..int_len]);
            out.push('.');
            out.push_str(&digits[int_len..]);
        }
    } else {
        out.push_str("0.");
        out.push_str(&"0".repeat((-exponent - 1) as usize));
        out.push_str(&digits);
    }
    out
}

/// Accessor roles a method plays for a property or event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MethodSemantics(pub u16);

impl MethodSemantics {
    pub const SETTER: u16 = 0x0001;
    pub const GETTER: u16 = 0x0002;
    pub const OTHER: u16 = 0x0004;
    pub const ADD_ON: u16 = 0x0008;
    pub const REMOVE_ON: u16 = 0x0010;
    pub const FIRE: u16 = 0x0020;

    pub fn contains(self, flag: u16) -> bool {
        self.0 & flag != 0
    }

    /// Getter, setter, add or remove accessor
    pub fn is_accessor(self) -> bool {
        self.contains(Self::GETTER | Self::SETTER | Self::ADD_ON | Self::REMOVE_ON)
    }
}

/// An interface (or base) method that a method explicitly overrides
#[derive(Debug, Clone, PartialEq)]
pub struct MethodOverride {
    pub declaring_type: TypeSig,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeSig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub accessibility: Accessibility,
    pub is_static: bool,
    /// Compiler-synthesized special name (enum `value__`, backing fields)
    pub is_special_name: bool,
    pub field_type: TypeSig,
    pub constant: Option<Constant>,
    pub attributes: Vec<CustomAttribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    pub name: String,
    pub accessibility: Accessibility,
    pub is_static: bool,
    pub is_special_name: bool,
    pub semantics: MethodSemantics,
    pub return_type: TypeSig,
    pub parameters: Vec<Parameter>,
    pub generic_params: Vec<String>,
    pub overrides: Vec<MethodOverride>,
    pub attributes: Vec<CustomAttribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub name: String,
    pub property_type: TypeSig,
    /// Indexer parameter types
    pub parameters: Vec<TypeSig>,
    /// Index into the declaring type's methods
    pub getter: Option<usize>,
    pub setter: Option<usize>,
    pub attributes: Vec<CustomAttribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventDef {
    pub name: String,
    pub event_type: TypeSig,
    /// Index into the declaring type's methods
    pub add_method: Option<usize>,
    pub remove_method: Option<usize>,
    pub attributes: Vec<CustomAttribute>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub namespace: String,
    pub accessibility: Accessibility,
    pub declaring_type: Option<TypeId>,
    pub base_type: Option<TypeSig>,
    pub generic_params: Vec<String>,
    pub attributes: Vec<CustomAttribute>,
    pub fields: Vec<FieldDef>,
    pub properties: Vec<PropertyDef>,
    pub events: Vec<EventDef>,
    pub methods: Vec<MethodDef>,
    pub nested_types: Vec<TypeId>,
}

impl TypeDef {
    /// Method linked by an accessor index, if the index is in range
    pub fn method(&self, index: Option<usize>) -> Option<&MethodDef> {
        index.and_then(|i| self.methods.get(i))
    }
}

/// Identity of an assembly or assembly reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyName {
    pub name: String,
    pub version: (u16, u16, u16, u16),
    pub culture: String,
    pub public_key_token: Option<[u8; 8]>,
}

impl AssemblyName {
    /// `Name, Version=1.0.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089`
    pub fn display_name(&self) -> String {
        let (major, minor, build, revision) = self.version;
        let culture = if self.culture.is_empty() {
            "neutral"
        } else {
            &self.culture
        };
        let token = self
            .public_key_token
            .map(hex::encode)
            .unwrap_or_else(|| "null".to_string());
        format!(
            "{}, Version={}.{}.{}.{}, Culture={}, PublicKeyToken={}",
            self.name, major, minor, build, revision, culture, token
        )
    }
}

/// A loaded module: every type definition plus its references
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Module name as recorded in metadata (`Foo.dll`)
    pub name: String,
    /// Path the module was loaded from
    pub path: PathBuf,
    pub assembly: Option<AssemblyName>,
    /// Types in definition order, nested types included
    pub types: Vec<TypeDef>,
    pub assembly_refs: Vec<AssemblyName>,
}

impl Module {
    pub fn ty(&self, id: TypeId) -> &TypeDef {
        &self.types[id.0]
    }

    /// Types without a declaring type, in definition order
    pub fn top_level_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.types
            .iter()
            .enumerate()
            .filter(|(_, t)| t.declaring_type.is_none())
            .map(|(i, _)| TypeId(i))
    }

    /// Name of a type definition with its enclosing chain
    pub fn type_name(&self, id: TypeId) -> TypeName {
        let def = self.ty(id);
        match def.declaring_type {
            Some(outer) => TypeName::nested(self.type_name(outer), def.name.clone()),
            None => TypeName::new(def.namespace.clone(), def.name.clone()),
        }
    }

    pub fn type_full_name(&self, id: TypeId) -> String {
        self.type_name(id).full_name()
    }
}

/// A borrowed view of one type or member, tagged by kind
#[derive(Debug, Clone, Copy)]
pub enum Symbol<'m> {
    Type { id: TypeId, def: &'m TypeDef },
    Field { owner: TypeId, def: &'m FieldDef },
    Property { owner: TypeId, def: &'m PropertyDef },
    Event { owner: TypeId, def: &'m EventDef },
    Method { owner: TypeId, def: &'m MethodDef },
}

impl<'m> Symbol<'m> {
    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::Type { .. } => SymbolKind::Type,
            Symbol::Field { .. } => SymbolKind::Field,
            Symbol::Property { .. } => SymbolKind::Property,
            Symbol::Event { .. } => SymbolKind::Event,
            Symbol::Method { .. } => SymbolKind::Method,
        }
    }

    pub fn name(&self) -> &'m str {
        match self {
            Symbol::Type { def, .. } => &def.name,
            Symbol::Field { def, .. } => &def.name,
            Symbol::Property { def, .. } => &def.name,
            Symbol::Event { def, .. } => &def.name,
            Symbol::Method { def, .. } => &def.name,
        }
    }

    /// Declaring type; `None` only for top-level types
    pub fn declaring_type(&self) -> Option<TypeId> {
        match self {
            Symbol::Type { def, .. } => def.declaring_type,
            Symbol::Field { owner, .. }
            | Symbol::Property { owner, .. }
            | Symbol::Event { owner, .. }
            | Symbol::Method { owner, .. } => Some(*owner),
        }
    }

    pub fn attributes(&self) -> &'m [CustomAttribute] {
        match self {
            Symbol::Type { def, .. } => &def.attributes,
            Symbol::Field { def, .. } => &def.attributes,
            Symbol::Property { def, .. } => &def.attributes,
            Symbol::Event { def, .. } => &def.attributes,
            Symbol::Method { def, .. } => &def.attributes,
        }
    }

    /// Static flag as reported in output; only fields and methods carry it
    pub fn is_static(&self) -> bool {
        match self {
            Symbol::Field { def, .. } => def.is_static,
            Symbol::Method { def, .. } => def.is_static,
            _ => false,
        }
    }
}
