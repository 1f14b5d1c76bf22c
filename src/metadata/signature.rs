//! Signature mapping and custom attribute values
//!
//! Signature blobs are parsed by `dotscope`; this module resolves the tokens
//! they carry into [`TypeSig`] names. Custom attribute fixed arguments
//! (II.23.3) are decoded here against the constructor's parameter types.

use super::MetadataError;
use crate::types::{AttributeArg, ArrayDim, FnPtrSig, GenericOwner, TypeName, TypeSig};
use dotscope::prelude::{
    parse_field_signature, parse_method_signature, parse_property_signature,
    parse_type_spec_signature, SignatureMethod, SignatureParameter, TypeSignature,
};
use dotscope::prelude::{TableId, Token};

type Result<T> = std::result::Result<T, MetadataError>;

const MAX_DEPTH: usize = 64;

const TOKEN_TYPE_REF: u8 = 0x01;
const TOKEN_TYPE_DEF: u8 = 0x02;
const TOKEN_TYPE_SPEC: u8 = 0x1B;

mod element {
    pub const BOOLEAN: u8 = 0x02;
    pub const CHAR: u8 = 0x03;
    pub const I1: u8 = 0x04;
    pub const U1: u8 = 0x05;
    pub const I2: u8 = 0x06;
    pub const U2: u8 = 0x07;
    pub const I4: u8 = 0x08;
    pub const U4: u8 = 0x09;
    pub const I8: u8 = 0x0A;
    pub const U8: u8 = 0x0B;
    pub const R4: u8 = 0x0C;
    pub const R8: u8 = 0x0D;
    pub const STRING: u8 = 0x0E;
    pub const SZARRAY: u8 = 0x1D;
    pub const SYSTEM_TYPE: u8 = 0x50;
    pub const BOXED: u8 = 0x51;
    pub const ENUM: u8 = 0x55;
}

/// Looks up the types a signature refers to
pub(crate) trait TypeResolver {
    /// Name of a TypeDef or TypeRef row
    fn named_type(&self, table: TableId, rid: u32) -> Result<TypeName>;

    /// Signature blob of a TypeSpec row
    fn type_spec(&self, rid: u32) -> Result<&[u8]>;

    /// Underlying integral type of an enum, when the enum is known
    fn enum_underlying(&self, _name: &TypeName) -> Option<TypeSig> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MethodSig {
    pub return_type: TypeSig,
    pub params: Vec<TypeSig>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PropertySig {
    pub property_type: TypeSig,
    pub params: Vec<TypeSig>,
}

/// Maps parsed signatures against a resolver and the generic names in scope
pub(crate) struct SigDecoder<'r> {
    resolver: &'r dyn TypeResolver,
    type_params: &'r [String],
    method_params: &'r [String],
}

impl<'r> SigDecoder<'r> {
    pub fn new(
        resolver: &'r dyn TypeResolver,
        type_params: &'r [String],
        method_params: &'r [String],
    ) -> Self {
        Self {
            resolver,
            type_params,
            method_params,
        }
    }

    pub fn field(&self, blob: &[u8]) -> Result<TypeSig> {
        let sig = parse_field_signature(blob)?;
        self.ty(&sig.base, 0)
    }

    pub fn method(&self, blob: &[u8]) -> Result<MethodSig> {
        let sig = parse_method_signature(blob)?;
        self.method_sig(&sig, 0)
    }

    pub fn property(&self, blob: &[u8]) -> Result<PropertySig> {
        let sig = parse_property_signature(blob)?;
        Ok(PropertySig {
            property_type: self.ty(&sig.base, 0)?,
            params: sig
                .params
                .iter()
                .map(|p| self.parameter(p, 0))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    pub fn type_spec(&self, blob: &[u8]) -> Result<TypeSig> {
        self.type_spec_at(blob, 0)
    }

    fn type_spec_at(&self, blob: &[u8], depth: usize) -> Result<TypeSig> {
        let sig = parse_type_spec_signature(blob)?;
        self.ty(&sig.base, depth + 1)
    }

    fn method_sig(&self, sig: &SignatureMethod, depth: usize) -> Result<MethodSig> {
        Ok(MethodSig {
            return_type: self.parameter(&sig.return_type, depth + 1)?,
            params: sig
                .params
                .iter()
                .map(|p| self.parameter(p, depth + 1))
                .collect::<Result<Vec<_>>>()?,
        })
    }

    fn parameter(&self, param: &SignatureParameter, depth: usize) -> Result<TypeSig> {
        let ty = self.ty(&param.base, depth)?;
        Ok(if param.by_ref {
            TypeSig::ByRef(Box::new(ty))
        } else {
            ty
        })
    }

    /// Type named by a `TypeDefOrRefOrSpec` token
    fn token_type(&self, token: &Token, depth: usize) -> Result<TypeSig> {
        match token.table() {
            TOKEN_TYPE_DEF => Ok(TypeSig::Named(
                self.resolver.named_type(TableId::TypeDef, token.row())?,
            )),
            TOKEN_TYPE_REF => Ok(TypeSig::Named(
                self.resolver.named_type(TableId::TypeRef, token.row())?,
            )),
            TOKEN_TYPE_SPEC => {
                let blob = self.resolver.type_spec(token.row())?;
                self.type_spec_at(blob, depth)
            }
            other => Err(malformed(format!("invalid type token table 0x{:02x}", other))),
        }
    }

    fn token_name(&self, token: &Token, depth: usize) -> Result<TypeName> {
        match self.token_type(token, depth)? {
            TypeSig::Named(name) => Ok(name),
            other => Err(malformed(format!("expected a named type, got {}", other))),
        }
    }

    fn generic_name(&self, owner: GenericOwner, position: u32) -> String {
        let (names, prefix) = match owner {
            GenericOwner::Type => (self.type_params, "!"),
            GenericOwner::Method => (self.method_params, "!!"),
        };
        names
            .get(position as usize)
            .cloned()
            .unwrap_or_else(|| format!("{}{}", prefix, position))
    }

    fn generic_param(&self, owner: GenericOwner, position: u32) -> TypeSig {
        TypeSig::GenericParam {
            owner,
            position,
            name: self.generic_name(owner, position),
        }
    }

    fn ty(&self, sig: &TypeSignature, depth: usize) -> Result<TypeSig> {
        if depth > MAX_DEPTH {
            return Err(malformed("signature nesting too deep".to_string()));
        }
        let next = depth + 1;
        let mapped = match sig {
            TypeSignature::Void => TypeSig::void(),
            TypeSignature::Boolean => TypeSig::system("Boolean"),
            TypeSignature::Char => TypeSig::system("Char"),
            TypeSignature::I1 => TypeSig::system("SByte"),
            TypeSignature::U1 => TypeSig::system("Byte"),
            TypeSignature::I2 => TypeSig::system("Int16"),
            TypeSignature::U2 => TypeSig::system("UInt16"),
            TypeSignature::I4 => TypeSig::system("Int32"),
            TypeSignature::U4 => TypeSig::system("UInt32"),
            TypeSignature::I8 => TypeSig::system("Int64"),
            TypeSignature::U8 => TypeSig::system("UInt64"),
            TypeSignature::R4 => TypeSig::system("Single"),
            TypeSignature::R8 => TypeSig::system("Double"),
            TypeSignature::String => TypeSig::system("String"),
            TypeSignature::Object => TypeSig::system("Object"),
            TypeSignature::I => TypeSig::system("IntPtr"),
            TypeSignature::U => TypeSig::system("UIntPtr"),
            TypeSignature::TypedByRef => TypeSig::system("TypedReference"),
            TypeSignature::Ptr(pointer) => TypeSig::Pointer(Box::new(self.ty(&pointer.base, next)?)),
            TypeSignature::ByRef(inner) => TypeSig::ByRef(Box::new(self.ty(inner, next)?)),
            TypeSignature::SzArray(array) => TypeSig::SzArray(Box::new(self.ty(&array.base, next)?)),
            TypeSignature::ValueType(token) | TypeSignature::Class(token) => {
                self.token_type(token, next)?
            }
            TypeSignature::GenericParamType(position) => {
                self.generic_param(GenericOwner::Type, *position)
            }
            TypeSignature::GenericParamMethod(position) => {
                self.generic_param(GenericOwner::Method, *position)
            }
            TypeSignature::Array(array) => {
                if array.rank > 32 {
                    return Err(malformed(format!("array rank {} out of range", array.rank)));
                }
                let dims = (0..array.rank as usize)
                    .map(|i| {
                        let dim = array.dimensions.get(i);
                        let lower = dim.and_then(|d| d.lower_bound).map(|l| l as i32);
                        let upper = match (lower, dim.and_then(|d| d.size)) {
                            (Some(lower), Some(size)) => {
                                Some(lower.wrapping_add(size as i32).wrapping_sub(1))
                            }
                            _ => None,
                        };
                        ArrayDim { lower, upper }
                    })
                    .collect();
                TypeSig::Array {
                    element: Box::new(self.ty(&array.base, next)?),
                    dims,
                }
            }
            TypeSignature::GenericInst(base, args) => {
                let base = match &**base {
                    TypeSignature::ValueType(token) | TypeSignature::Class(token) => {
                        self.token_name(token, next)?
                    }
                    other => {
                        return Err(malformed(format!("generic instance of {:?}", other)));
                    }
                };
                let args = args
                    .iter()
                    .map(|arg| self.ty(arg, next))
                    .collect::<Result<Vec<_>>>()?;
                TypeSig::GenericInst { base, args }
            }
            TypeSignature::FnPtr(method) => {
                let sig = self.method_sig(method, next)?;
                TypeSig::FnPtr(Box::new(FnPtrSig {
                    return_type: sig.return_type,
                    parameters: sig.params,
                }))
            }
            other => return Err(malformed(format!("unsupported signature element {:?}", other))),
        };
        Ok(mapped)
    }

    /// Fixed constructor arguments of a custom attribute blob
    pub fn attribute_args(&self, blob: &[u8], params: &[TypeSig]) -> Result<Vec<AttributeArg>> {
        if blob.is_empty() {
            return Ok(Vec::new());
        }
        let mut r = ValueReader::new(blob);
        let prolog = r.u16()?;
        if prolog != 0x0001 {
            return Err(malformed(format!("bad custom attribute prolog 0x{:04x}", prolog)));
        }
        params
            .iter()
            .map(|param| self.fixed_arg(&mut r, param, 0))
            .collect()
    }

    fn fixed_arg(&self, r: &mut ValueReader<'_>, ty: &TypeSig, depth: usize) -> Result<AttributeArg> {
        if depth > MAX_DEPTH {
            return Err(malformed("attribute value nesting too deep".to_string()));
        }
        match ty {
            TypeSig::SzArray(element) => {
                let count = r.u32()?;
                if count == u32::MAX {
                    return Ok(AttributeArg::Array(None));
                }
                let items = (0..count)
                    .map(|_| self.fixed_arg(r, element, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                Ok(AttributeArg::Array(Some(items)))
            }
            TypeSig::Named(name) if name.namespace == "System" && name.enclosing.is_none() => {
                match name.name.as_str() {
                    "Boolean" => primitive(r, element::BOOLEAN),
                    "Char" => primitive(r, element::CHAR),
                    "SByte" => primitive(r, element::I1),
                    "Byte" => primitive(r, element::U1),
                    "Int16" => primitive(r, element::I2),
                    "UInt16" => primitive(r, element::U2),
                    "Int32" => primitive(r, element::I4),
                    "UInt32" => primitive(r, element::U4),
                    "Int64" => primitive(r, element::I8),
                    "UInt64" => primitive(r, element::U8),
                    "Single" => primitive(r, element::R4),
                    "Double" => primitive(r, element::R8),
                    "String" => Ok(AttributeArg::String(r.ser_string()?)),
                    "Type" => Ok(AttributeArg::Type(r.ser_string()?)),
                    "Object" => self.boxed_arg(r, depth + 1),
                    _ => self.enum_arg(r, name),
                }
            }
            TypeSig::Named(name) => self.enum_arg(r, name),
            other => Err(malformed(format!("unsupported attribute argument type {}", other))),
        }
    }

    /// Enums outside the module are read as `Int32`
    fn enum_arg(&self, r: &mut ValueReader<'_>, name: &TypeName) -> Result<AttributeArg> {
        let underlying = self
            .resolver
            .enum_underlying(name)
            .unwrap_or_else(|| TypeSig::system("Int32"));
        let tag = match underlying.full_name().as_str() {
            "System.SByte" => element::I1,
            "System.Byte" => element::U1,
            "System.Int16" => element::I2,
            "System.UInt16" => element::U2,
            "System.UInt32" => element::U4,
            "System.Int64" => element::I8,
            "System.UInt64" => element::U8,
            _ => element::I4,
        };
        primitive(r, tag)
    }

    fn boxed_arg(&self, r: &mut ValueReader<'_>, depth: usize) -> Result<AttributeArg> {
        let tag = r.u8()?;
        self.tagged_arg(r, tag, depth)
    }

    fn tagged_arg(&self, r: &mut ValueReader<'_>, tag: u8, depth: usize) -> Result<AttributeArg> {
        if depth > MAX_DEPTH {
            return Err(malformed("attribute value nesting too deep".to_string()));
        }
        match tag {
            element::STRING => Ok(AttributeArg::String(r.ser_string()?)),
            element::SYSTEM_TYPE => Ok(AttributeArg::Type(r.ser_string()?)),
            element::BOXED => self.boxed_arg(r, depth + 1),
            element::ENUM => {
                let _enum_name = r.ser_string()?;
                primitive(r, element::I4)
            }
            element::SZARRAY => {
                let element_tag = r.u8()?;
                let count = r.u32()?;
                if count == u32::MAX {
                    return Ok(AttributeArg::Array(None));
                }
                let items = (0..count)
                    .map(|_| self.tagged_arg(r, element_tag, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                Ok(AttributeArg::Array(Some(items)))
            }
            other => primitive(r, other),
        }
    }
}

/// Little-endian cursor over an attribute value blob
struct ValueReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ValueReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let raw = &self.data[self.pos..end];
                self.pos = end;
                Ok(raw)
            }
            None => Err(malformed(format!(
                "attribute value truncated at offset {} (needed {} bytes)",
                self.pos, len
            ))),
        }
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn peek_u8(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| malformed(format!("attribute value truncated at offset {}", self.pos)))
    }

    /// ECMA-335 compressed unsigned integer (II.23.2)
    fn compressed_u32(&mut self) -> Result<u32> {
        let first = self.u8()?;
        if first & 0x80 == 0 {
            Ok(u32::from(first))
        } else if first & 0xC0 == 0x80 {
            Ok((u32::from(first & 0x3F) << 8) | u32::from(self.u8()?))
        } else if first & 0xE0 == 0xC0 {
            let rest = self.array::<3>()?;
            Ok((u32::from(first & 0x1F) << 24)
                | (u32::from(rest[0]) << 16)
                | (u32::from(rest[1]) << 8)
                | u32::from(rest[2]))
        } else {
            Err(malformed(format!("bad compressed integer 0x{:02x}", first)))
        }
    }

    /// `SerString`: 0xFF for null, otherwise a compressed length and UTF-8 bytes
    fn ser_string(&mut self) -> Result<Option<String>> {
        if self.peek_u8()? == 0xFF {
            self.pos += 1;
            return Ok(None);
        }
        let len = self.compressed_u32()? as usize;
        let raw = self.bytes(len)?;
        Ok(Some(String::from_utf8_lossy(raw).into_owned()))
    }
}

fn primitive(r: &mut ValueReader<'_>, tag: u8) -> Result<AttributeArg> {
    let arg = match tag {
        element::BOOLEAN => AttributeArg::Bool(r.u8()? != 0),
        element::CHAR => {
            let unit = r.u16()?;
            AttributeArg::Char(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER))
        }
        element::I1 => AttributeArg::Int(i64::from(i8::from_le_bytes(r.array()?))),
        element::U1 => AttributeArg::UInt(u64::from(r.u8()?)),
        element::I2 => AttributeArg::Int(i64::from(i16::from_le_bytes(r.array()?))),
        element::U2 => AttributeArg::UInt(u64::from(r.u16()?)),
        element::I4 => AttributeArg::Int(i64::from(i32::from_le_bytes(r.array()?))),
        element::U4 => AttributeArg::UInt(u64::from(r.u32()?)),
        element::I8 => AttributeArg::Int(i64::from_le_bytes(r.array()?)),
        element::U8 => AttributeArg::UInt(u64::from_le_bytes(r.array()?)),
        element::R4 => AttributeArg::Float(f64::from(f32::from_le_bytes(r.array()?))),
        element::R8 => AttributeArg::Float(f64::from_le_bytes(r.array()?)),
        other => {
            return Err(malformed(format!("unsupported attribute element 0x{:02x}", other)));
        }
    };
    Ok(arg)
}

fn malformed(message: String) -> MetadataError {
    MetadataError::MalformedSignature(message)
}
