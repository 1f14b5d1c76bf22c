//! Builds a [`Module`] from the raw definition tables

use super::signature::{SigDecoder, TypeResolver};
use super::MetadataError;
use crate::types::{
    Accessibility, AssemblyName, Constant, CustomAttribute, EventDef, FieldDef, MethodDef,
    MethodOverride, MethodSemantics, Module, Parameter, PropertyDef, TypeDef, TypeId, TypeName,
    TypeSig,
};
use dotscope::prelude::{
    AssemblyRaw, AssemblyRefRaw, Blob, CodedIndex, ConstantRaw, CustomAttributeRaw, EventMapRaw,
    EventRaw, FieldRaw, GenericParamRaw, MemberRefRaw, MethodDefRaw, MethodImplRaw,
    MethodSemanticsRaw, ModuleRaw, NestedClassRaw, ParamRaw, PropertyMapRaw, PropertyRaw, Strings,
    TableId, TypeDefRaw, TypeRefRaw, TypeSpecRaw,
};
use dotscope::CilObject;
use log::{debug, warn};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::ops::Range;

type Result<T> = std::result::Result<T, MetadataError>;

const MAX_NESTING: usize = 64;

const TYPE_VISIBILITY_MASK: u32 = 0x0007;
const MEMBER_ACCESS_MASK: u16 = 0x0007;
const MEMBER_STATIC: u16 = 0x0010;
const FIELD_SPECIAL_NAME: u16 = 0x0200;
const METHOD_SPECIAL_NAME: u16 = 0x0800;
const ASSEMBLY_PUBLIC_KEY: u32 = 0x0001;

/// Every row of one table, in row order
macro_rules! rows {
    ($object:expr, $raw:ty) => {
        $object
            .tables()
            .and_then(|tables| tables.table::<$raw>())
            .map(|table| table.iter().collect::<Vec<$raw>>())
            .unwrap_or_default()
    };
}

/// Where a member row landed: (type index, index within the type)
type Slot = (usize, usize);

#[derive(Default)]
struct Slots {
    fields: HashMap<u32, Slot>,
    methods: HashMap<u32, Slot>,
    properties: HashMap<u32, Slot>,
    events: HashMap<u32, Slot>,
}

/// Row `rid` (1-based) of a collected table
fn row<'r, T>(rows: &'r [T], table: &'static str, rid: u32) -> Result<&'r T> {
    (rid as usize)
        .checked_sub(1)
        .and_then(|index| rows.get(index))
        .ok_or(MetadataError::InvalidIndex { table, index: rid })
}

/// Rows owned by entry `index` of a table with a list column
fn list_range(start: u32, next: Option<u32>, count: usize) -> Range<u32> {
    let limit = count as u32 + 1;
    let start = start.clamp(1, limit);
    let end = next.unwrap_or(limit).clamp(start, limit);
    start..end
}

pub(crate) struct Loader<'o> {
    strings: &'o Strings<'o>,
    blobs: &'o Blob<'o>,
    module: Vec<ModuleRaw>,
    type_refs: Vec<TypeRefRaw>,
    type_defs: Vec<TypeDefRaw>,
    type_specs: Vec<TypeSpecRaw>,
    fields: Vec<FieldRaw>,
    methods: Vec<MethodDefRaw>,
    params: Vec<ParamRaw>,
    member_refs: Vec<MemberRefRaw>,
    constants: Vec<ConstantRaw>,
    attributes: Vec<CustomAttributeRaw>,
    property_maps: Vec<PropertyMapRaw>,
    properties: Vec<PropertyRaw>,
    event_maps: Vec<EventMapRaw>,
    events: Vec<EventRaw>,
    semantics: Vec<MethodSemanticsRaw>,
    method_impls: Vec<MethodImplRaw>,
    assembly: Vec<AssemblyRaw>,
    assembly_refs: Vec<AssemblyRefRaw>,
    /// Enclosing TypeDef row of each nested TypeDef row
    enclosing: HashMap<u32, u32>,
    type_generics: HashMap<u32, Vec<String>>,
    method_generics: HashMap<u32, Vec<String>>,
    enum_underlying: HashMap<TypeName, TypeSig>,
}

impl<'o> Loader<'o> {
    pub fn new(object: &'o CilObject) -> Result<Self> {
        if object.tables().is_none() {
            return Err(MetadataError::MissingStream("#~"));
        }
        let strings = object.strings().ok_or(MetadataError::MissingStream("#Strings"))?;
        let blobs = object.blob().ok_or(MetadataError::MissingStream("#Blob"))?;

        let type_defs = rows!(object, TypeDefRaw);
        let type_count = type_defs.len() as u32;
        let mut enclosing = HashMap::new();
        for nested in rows!(object, NestedClassRaw) {
            let valid = |rid: u32| rid >= 1 && rid <= type_count;
            if valid(nested.nested_class) && valid(nested.enclosing_class) {
                enclosing.insert(nested.nested_class, nested.enclosing_class);
            }
        }
        let cyclic: Vec<u32> = enclosing
            .keys()
            .copied()
            .filter(|rid| nesting_too_deep(&enclosing, *rid))
            .collect();
        for rid in cyclic {
            warn!("Dropping cyclic nesting of TypeDef row {}", rid);
            enclosing.remove(&rid);
        }

        let mut type_params: HashMap<u32, Vec<(u32, String)>> = HashMap::new();
        let mut method_params: HashMap<u32, Vec<(u32, String)>> = HashMap::new();
        for param in rows!(object, GenericParamRaw) {
            let name = strings.get(param.name as usize)?.to_string();
            let number = param.number as u32;
            match param.owner.tag {
                TableId::TypeDef => type_params.entry(param.owner.row).or_default().push((number, name)),
                TableId::MethodDef => {
                    method_params.entry(param.owner.row).or_default().push((number, name))
                }
                _ => {}
            }
        }

        let mut loader = Self {
            strings,
            blobs,
            module: rows!(object, ModuleRaw),
            type_refs: rows!(object, TypeRefRaw),
            type_defs,
            type_specs: rows!(object, TypeSpecRaw),
            fields: rows!(object, FieldRaw),
            methods: rows!(object, MethodDefRaw),
            params: rows!(object, ParamRaw),
            member_refs: rows!(object, MemberRefRaw),
            constants: rows!(object, ConstantRaw),
            attributes: rows!(object, CustomAttributeRaw),
            property_maps: rows!(object, PropertyMapRaw),
            properties: rows!(object, PropertyRaw),
            event_maps: rows!(object, EventMapRaw),
            events: rows!(object, EventRaw),
            semantics: rows!(object, MethodSemanticsRaw),
            method_impls: rows!(object, MethodImplRaw),
            assembly: rows!(object, AssemblyRaw),
            assembly_refs: rows!(object, AssemblyRefRaw),
            enclosing,
            type_generics: ordered_names(type_params),
            method_generics: ordered_names(method_params),
            enum_underlying: HashMap::new(),
        };
        loader.enum_underlying = loader.find_enums()?;
        Ok(loader)
    }

    pub fn load(&self) -> Result<Module> {
        let mut slots = Slots::default();
        let mut types = Vec::with_capacity(self.type_defs.len());
        for index in 0..self.type_defs.len() {
            let def = self.type_def(index, &mut slots)?;
            types.push(def);
        }
        for rid in 1..=self.type_defs.len() as u32 {
            if let Some(outer) = self.enclosing.get(&rid) {
                types[*outer as usize - 1].nested_types.push(TypeId(rid as usize - 1));
            }
        }

        self.load_properties(&mut types, &mut slots)?;
        self.load_events(&mut types, &mut slots)?;
        self.link_semantics(&mut types, &slots);
        self.load_overrides(&mut types, &slots)?;
        self.load_constants(&mut types, &slots)?;
        self.load_attributes(&mut types, &slots)?;

        let name = match self.module.first() {
            Some(module) => self.string(module.name)?,
            None => String::new(),
        };
        let module = Module {
            name,
            path: Default::default(),
            assembly: self.assembly()?,
            types,
            assembly_refs: self.assembly_refs()?,
        };
        debug!(
            "{}: {} fields, {} methods, {} properties, {} events",
            module.name,
            slots.fields.len(),
            slots.methods.len(),
            slots.properties.len(),
            slots.events.len()
        );
        Ok(module)
    }

    fn string(&self, index: u32) -> Result<String> {
        Ok(self.strings.get(index as usize)?.to_string())
    }

    fn blob(&self, index: u32) -> Result<&'o [u8]> {
        if index == 0 {
            return Ok(&[]);
        }
        Ok(self.blobs.get(index as usize)?)
    }

    fn generics_of_type(&self, rid: u32) -> &[String] {
        self.type_generics.get(&rid).map(Vec::as_slice).unwrap_or(&[])
    }

    fn generics_of_method(&self, rid: u32) -> &[String] {
        self.method_generics.get(&rid).map(Vec::as_slice).unwrap_or(&[])
    }

    fn decoder<'s>(&'s self, type_params: &'s [String], method_params: &'s [String]) -> SigDecoder<'s> {
        SigDecoder::new(self, type_params, method_params)
    }

    fn type_def_name(&self, rid: u32) -> Result<TypeName> {
        let def = row(&self.type_defs, "TypeDef", rid)?;
        let name = self.string(def.type_name)?;
        match self.enclosing.get(&rid) {
            Some(outer) => Ok(TypeName::nested(self.type_def_name(*outer)?, name)),
            None => Ok(TypeName::new(self.string(def.type_namespace)?, name)),
        }
    }

    fn type_ref_name(&self, rid: u32, depth: usize) -> Result<TypeName> {
        if depth > MAX_NESTING {
            return Err(MetadataError::MalformedSignature(format!(
                "TypeRef row {} nests too deeply",
                rid
            )));
        }
        let type_ref = row(&self.type_refs, "TypeRef", rid)?;
        let name = self.string(type_ref.type_name)?;
        let scope = &type_ref.resolution_scope;
        match scope.tag {
            TableId::TypeRef if scope.row != 0 => {
                Ok(TypeName::nested(self.type_ref_name(scope.row, depth + 1)?, name))
            }
            _ => Ok(TypeName::new(self.string(type_ref.type_namespace)?, name)),
        }
    }

    /// Type referenced by a `TypeDefOrRef` or `MemberRefParent` column
    fn coded_type(&self, coded: &CodedIndex, type_params: &[String]) -> Result<TypeSig> {
        match coded.tag {
            TableId::TypeDef | TableId::TypeRef => {
                Ok(TypeSig::Named(self.named_type(coded.tag, coded.row)?))
            }
            TableId::TypeSpec => {
                let blob = self.type_spec(coded.row)?;
                self.decoder(type_params, &[]).type_spec(blob)
            }
            _ => Err(MetadataError::InvalidIndex {
                table: "TypeDefOrRef",
                index: coded.row,
            }),
        }
    }

    fn field_rows(&self, index: usize) -> Range<u32> {
        list_range(
            self.type_defs[index].field_list,
            self.type_defs.get(index + 1).map(|next| next.field_list),
            self.fields.len(),
        )
    }

    fn method_rows(&self, index: usize) -> Range<u32> {
        list_range(
            self.type_defs[index].method_list,
            self.type_defs.get(index + 1).map(|next| next.method_list),
            self.methods.len(),
        )
    }

    fn param_rows(&self, rid: u32) -> Result<Range<u32>> {
        let method = row(&self.methods, "MethodDef", rid)?;
        Ok(list_range(
            method.param_list,
            self.methods.get(rid as usize).map(|next| next.param_list),
            self.params.len(),
        ))
    }

    fn find_enums(&self) -> Result<HashMap<TypeName, TypeSig>> {
        let mut enums = HashMap::new();
        for index in 0..self.type_defs.len() {
            for rid in self.field_rows(index) {
                let field = row(&self.fields, "Field", rid)?;
                if self.strings.get(field.name as usize)? == "value__" {
                    let underlying = self.decoder(&[], &[]).field(self.blob(field.signature)?)?;
                    enums.insert(self.type_def_name(index as u32 + 1)?, underlying);
                    break;
                }
            }
        }
        Ok(enums)
    }

    fn type_def(&self, index: usize, slots: &mut Slots) -> Result<TypeDef> {
        let rid = index as u32 + 1;
        let def = &self.type_defs[index];
        let flags = def.flags as u32;
        let generic_params = self.generics_of_type(rid).to_vec();

        let base_type = if def.extends.row != 0 {
            Some(self.coded_type(&def.extends, &generic_params)?)
        } else {
            None
        };

        let mut fields = Vec::new();
        for field in self.field_rows(index) {
            slots.fields.insert(field, (index, fields.len()));
            fields.push(self.field(field, &generic_params)?);
        }

        let mut methods = Vec::new();
        for method in self.method_rows(index) {
            slots.methods.insert(method, (index, methods.len()));
            methods.push(self.method(method, &generic_params)?);
        }

        Ok(TypeDef {
            name: self.string(def.type_name)?,
            namespace: self.string(def.type_namespace)?,
            accessibility: type_accessibility(flags),
            declaring_type: self.enclosing.get(&rid).map(|outer| TypeId(*outer as usize - 1)),
            base_type,
            generic_params,
            attributes: Vec::new(),
            fields,
            properties: Vec::new(),
            events: Vec::new(),
            methods,
            nested_types: Vec::new(),
        })
    }

    fn field(&self, rid: u32, type_params: &[String]) -> Result<FieldDef> {
        let field = row(&self.fields, "Field", rid)?;
        let flags = field.flags as u16;
        Ok(FieldDef {
            name: self.string(field.name)?,
            accessibility: member_accessibility(flags),
            is_static: flags & MEMBER_STATIC != 0,
            is_special_name: flags & FIELD_SPECIAL_NAME != 0,
            field_type: self.decoder(type_params, &[]).field(self.blob(field.signature)?)?,
            constant: None,
            attributes: Vec::new(),
        })
    }

    fn method(&self, rid: u32, type_params: &[String]) -> Result<MethodDef> {
        let method = row(&self.methods, "MethodDef", rid)?;
        let flags = method.flags as u16;
        let generic_params = self.generics_of_method(rid);
        let sig = self
            .decoder(type_params, generic_params)
            .method(self.blob(method.signature)?)?;

        let mut names = HashMap::new();
        for param in self.param_rows(rid)? {
            let param = row(&self.params, "Param", param)?;
            names.insert(param.sequence as u32, self.string(param.name)?);
        }
        let parameters = sig
            .params
            .into_iter()
            .enumerate()
            .map(|(i, ty)| Parameter {
                name: names.remove(&(i as u32 + 1)).unwrap_or_default(),
                ty,
            })
            .collect();

        Ok(MethodDef {
            name: self.string(method.name)?,
            accessibility: member_accessibility(flags),
            is_static: flags & MEMBER_STATIC != 0,
            is_special_name: flags & METHOD_SPECIAL_NAME != 0,
            semantics: MethodSemantics::default(),
            return_type: sig.return_type,
            parameters,
            generic_params: generic_params.to_vec(),
            overrides: Vec::new(),
            attributes: Vec::new(),
        })
    }

    /// Type index of the TypeDef row a map table points at
    fn map_parent(&self, rid: u32, types: &[TypeDef]) -> Option<usize> {
        (rid >= 1 && rid as usize <= types.len()).then(|| rid as usize - 1)
    }

    fn load_properties(&self, types: &mut [TypeDef], slots: &mut Slots) -> Result<()> {
        for (map, entry) in self.property_maps.iter().enumerate() {
            let Some(owner) = self.map_parent(entry.parent, types) else {
                continue;
            };
            let type_params = types[owner].generic_params.clone();
            let next = self.property_maps.get(map + 1).map(|next| next.property_list);
            for property in list_range(entry.property_list, next, self.properties.len()) {
                let raw = row(&self.properties, "Property", property)?;
                let sig = self.decoder(&type_params, &[]).property(self.blob(raw.signature)?)?;
                slots.properties.insert(property, (owner, types[owner].properties.len()));
                types[owner].properties.push(PropertyDef {
                    name: self.string(raw.name)?,
                    property_type: sig.property_type,
                    parameters: sig.params,
                    getter: None,
                    setter: None,
                    attributes: Vec::new(),
                });
            }
        }
        Ok(())
    }

    fn load_events(&self, types: &mut [TypeDef], slots: &mut Slots) -> Result<()> {
        for (map, entry) in self.event_maps.iter().enumerate() {
            let Some(owner) = self.map_parent(entry.parent, types) else {
                continue;
            };
            let type_params = types[owner].generic_params.clone();
            let next = self.event_maps.get(map + 1).map(|next| next.event_list);
            for event in list_range(entry.event_list, next, self.events.len()) {
                let raw = row(&self.events, "Event", event)?;
                let event_type = if raw.event_type.row != 0 {
                    self.coded_type(&raw.event_type, &type_params)?
                } else {
                    TypeSig::system("Object")
                };
                slots.events.insert(event, (owner, types[owner].events.len()));
                types[owner].events.push(EventDef {
                    name: self.string(raw.name)?,
                    event_type,
                    add_method: None,
                    remove_method: None,
                    attributes: Vec::new(),
                });
            }
        }
        Ok(())
    }

    fn link_semantics(&self, types: &mut [TypeDef], slots: &Slots) {
        for entry in &self.semantics {
            let semantics = entry.semantics as u16;
            let Some(&(owner, method)) = slots.methods.get(&entry.method) else {
                continue;
            };
            types[owner].methods[method].semantics.0 |= semantics;

            let association = &entry.association;
            match association.tag {
                TableId::Property => {
                    if let Some(&(prop_owner, prop)) = slots.properties.get(&association.row) {
                        if prop_owner != owner {
                            continue;
                        }
                        let def = &mut types[owner].properties[prop];
                        if semantics & MethodSemantics::GETTER != 0 {
                            def.getter = Some(method);
                        }
                        if semantics & MethodSemantics::SETTER != 0 {
                            def.setter = Some(method);
                        }
                    }
                }
                TableId::Event => {
                    if let Some(&(event_owner, event)) = slots.events.get(&association.row) {
                        if event_owner != owner {
                            continue;
                        }
                        let def = &mut types[owner].events[event];
                        if semantics & MethodSemantics::ADD_ON != 0 {
                            def.add_method = Some(method);
                        }
                        if semantics & MethodSemantics::REMOVE_ON != 0 {
                            def.remove_method = Some(method);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn load_overrides(&self, types: &mut [TypeDef], slots: &Slots) -> Result<()> {
        for entry in &self.method_impls {
            if entry.method_body.tag != TableId::MethodDef {
                continue;
            }
            let Some(&(owner, method)) = slots.methods.get(&entry.method_body.row) else {
                continue;
            };
            let type_params = types[owner].generic_params.clone();
            if let Some(decl) = self.method_override(&entry.method_declaration, &type_params, types, slots)? {
                types[owner].methods[method].overrides.push(decl);
            }
        }
        Ok(())
    }

    fn method_override(
        &self,
        declaration: &CodedIndex,
        type_params: &[String],
        types: &[TypeDef],
        slots: &Slots,
    ) -> Result<Option<MethodOverride>> {
        match declaration.tag {
            TableId::MethodDef => {
                let Some(&(owner, method)) = slots.methods.get(&declaration.row) else {
                    return Ok(None);
                };
                Ok(Some(MethodOverride {
                    declaring_type: TypeSig::Named(self.type_def_name(owner as u32 + 1)?),
                    name: types[owner].methods[method].name.clone(),
                }))
            }
            TableId::MemberRef => {
                let member = row(&self.member_refs, "MemberRef", declaration.row)?;
                let declaring_type = match member.class.tag {
                    TableId::TypeDef | TableId::TypeRef | TableId::TypeSpec => {
                        self.coded_type(&member.class, type_params)?
                    }
                    _ => return Ok(None),
                };
                Ok(Some(MethodOverride {
                    declaring_type,
                    name: self.string(member.name)?,
                }))
            }
            _ => Ok(None),
        }
    }

    fn load_constants(&self, types: &mut [TypeDef], slots: &Slots) -> Result<()> {
        for entry in &self.constants {
            if entry.parent.tag != TableId::Field {
                continue;
            }
            let Some(&(owner, index)) = slots.fields.get(&entry.parent.row) else {
                continue;
            };
            let value = decode_constant(entry.base as u8, self.blob(entry.value)?)?;
            types[owner].fields[index].constant = Some(value);
        }
        Ok(())
    }

    /// Attribute type name and constructor parameter types
    fn attribute_ctor(
        &self,
        constructor: &CodedIndex,
        types: &[TypeDef],
        slots: &Slots,
    ) -> Result<Option<(String, Vec<TypeSig>)>> {
        match constructor.tag {
            TableId::MethodDef => {
                let Some(&(owner, method)) = slots.methods.get(&constructor.row) else {
                    return Ok(None);
                };
                let params = types[owner].methods[method]
                    .parameters
                    .iter()
                    .map(|p| p.ty.clone())
                    .collect();
                Ok(Some((self.type_def_name(owner as u32 + 1)?.full_name(), params)))
            }
            TableId::MemberRef => {
                let member = row(&self.member_refs, "MemberRef", constructor.row)?;
                let attribute_type = match member.class.tag {
                    TableId::TypeDef | TableId::TypeRef | TableId::TypeSpec => {
                        self.coded_type(&member.class, &[])?
                    }
                    _ => return Ok(None),
                };
                let sig = self.decoder(&[], &[]).method(self.blob(member.signature)?)?;
                let name = match attribute_type {
                    TypeSig::GenericInst { base, .. } => base.full_name(),
                    other => other.full_name(),
                };
                Ok(Some((name, sig.params)))
            }
            _ => Ok(None),
        }
    }

    fn load_attributes(&self, types: &mut [TypeDef], slots: &Slots) -> Result<()> {
        for entry in &self.attributes {
            let Some((type_name, params)) = self.attribute_ctor(&entry.constructor, types, slots)? else {
                continue;
            };
            let blob = self.blob(entry.value)?;
            let args = match self.decoder(&[], &[]).attribute_args(blob, &params) {
                Ok(args) => args,
                Err(e) => {
                    warn!("Cannot decode arguments of {}: {}", type_name, e);
                    Vec::new()
                }
            };
            let attribute = CustomAttribute::new(type_name, args);

            let rid = entry.parent.row;
            let slot = |map: &HashMap<u32, Slot>| map.get(&rid).copied();
            match entry.parent.tag {
                TableId::TypeDef if rid >= 1 && rid as usize <= types.len() => {
                    types[rid as usize - 1].attributes.push(attribute);
                }
                TableId::Field => {
                    if let Some((owner, i)) = slot(&slots.fields) {
                        types[owner].fields[i].attributes.push(attribute);
                    }
                }
                TableId::MethodDef => {
                    if let Some((owner, i)) = slot(&slots.methods) {
                        types[owner].methods[i].attributes.push(attribute);
                    }
                }
                TableId::Property => {
                    if let Some((owner, i)) = slot(&slots.properties) {
                        types[owner].properties[i].attributes.push(attribute);
                    }
                }
                TableId::Event => {
                    if let Some((owner, i)) = slot(&slots.events) {
                        types[owner].events[i].attributes.push(attribute);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn assembly(&self) -> Result<Option<AssemblyName>> {
        let Some(assembly) = self.assembly.first() else {
            return Ok(None);
        };
        let key = self.blob(assembly.public_key)?;
        Ok(Some(AssemblyName {
            name: self.string(assembly.name)?,
            version: (
                assembly.major_version as u16,
                assembly.minor_version as u16,
                assembly.build_number as u16,
                assembly.revision_number as u16,
            ),
            culture: self.string(assembly.culture)?,
            public_key_token: (!key.is_empty()).then(|| public_key_token(key)),
        }))
    }

    fn assembly_refs(&self) -> Result<Vec<AssemblyName>> {
        self.assembly_refs
            .iter()
            .map(|reference| {
                let key = self.blob(reference.public_key_or_token)?;
                let public_key_token = if reference.flags as u32 & ASSEMBLY_PUBLIC_KEY != 0 && !key.is_empty() {
                    Some(public_key_token(key))
                } else {
                    <[u8; 8]>::try_from(key).ok()
                };
                Ok(AssemblyName {
                    name: self.string(reference.name)?,
                    version: (
                        reference.major_version as u16,
                        reference.minor_version as u16,
                        reference.build_number as u16,
                        reference.revision_number as u16,
                    ),
                    culture: self.string(reference.culture)?,
                    public_key_token,
                })
            })
            .collect()
    }
}

impl TypeResolver for Loader<'_> {
    fn named_type(&self, table: TableId, rid: u32) -> Result<TypeName> {
        match table {
            TableId::TypeDef => self.type_def_name(rid),
            TableId::TypeRef => self.type_ref_name(rid, 0),
            _ => Err(MetadataError::InvalidIndex {
                table: "TypeDefOrRef",
                index: rid,
            }),
        }
    }

    fn type_spec(&self, rid: u32) -> Result<&[u8]> {
        let spec = row(&self.type_specs, "TypeSpec", rid)?;
        self.blob(spec.signature)
    }

    fn enum_underlying(&self, name: &TypeName) -> Option<TypeSig> {
        self.enum_underlying.get(name).cloned()
    }
}

fn nesting_too_deep(enclosing: &HashMap<u32, u32>, rid: u32) -> bool {
    let mut current = rid;
    for _ in 0..MAX_NESTING {
        match enclosing.get(&current) {
            Some(outer) if *outer == rid => return true,
            Some(outer) => current = *outer,
            None => return false,
        }
    }
    true
}

fn ordered_names(params: HashMap<u32, Vec<(u32, String)>>) -> HashMap<u32, Vec<String>> {
    params
        .into_iter()
        .map(|(owner, mut list)| {
            list.sort_by_key(|(number, _)| *number);
            (owner, list.into_iter().map(|(_, name)| name).collect())
        })
        .collect()
}

fn type_accessibility(flags: u32) -> Accessibility {
    match flags & TYPE_VISIBILITY_MASK {
        1 | 2 => Accessibility::Public,
        3 => Accessibility::Private,
        4 => Accessibility::Protected,
        6 => Accessibility::PrivateProtected,
        7 => Accessibility::ProtectedInternal,
        _ => Accessibility::Internal,
    }
}

fn member_accessibility(flags: u16) -> Accessibility {
    match flags & MEMBER_ACCESS_MASK {
        2 => Accessibility::PrivateProtected,
        3 => Accessibility::Internal,
        4 => Accessibility::Protected,
        5 => Accessibility::ProtectedInternal,
        6 => Accessibility::Public,
        _ => Accessibility::Private,
    }
}

/// Token of a full public key: the last eight bytes of its SHA-1, reversed
pub(crate) fn public_key_token(key: &[u8]) -> [u8; 8] {
    let hash = Sha1::digest(key);
    let mut token = [0u8; 8];
    for (slot, byte) in token.iter_mut().zip(hash.iter().rev()) {
        *slot = *byte;
    }
    token
}

/// Decode a `Constant` table value blob for the given element type
fn decode_constant(element_type: u8, blob: &[u8]) -> Result<Constant> {
    let fixed = |len: usize| -> Result<&[u8]> {
        blob.get(..len).ok_or(MetadataError::Truncated {
            offset: 0,
            needed: len,
        })
    };
    let value = match element_type {
        0x02 => Constant::Bool(fixed(1)?[0] != 0),
        0x03 => Constant::Char(u16::from_le_bytes([fixed(2)?[0], blob[1]])),
        0x04 => Constant::I1(fixed(1)?[0] as i8),
        0x05 => Constant::U1(fixed(1)?[0]),
        0x06 => Constant::I2(i16::from_le_bytes([fixed(2)?[0], blob[1]])),
        0x07 => Constant::U2(u16::from_le_bytes([fixed(2)?[0], blob[1]])),
        0x08 => Constant::I4(i32::from_le_bytes(array4(fixed(4)?))),
        0x09 => Constant::U4(u32::from_le_bytes(array4(fixed(4)?))),
        0x0A => Constant::I8(i64::from_le_bytes(array8(fixed(8)?))),
        0x0B => Constant::U8(u64::from_le_bytes(array8(fixed(8)?))),
        0x0C => Constant::R4(f32::from_le_bytes(array4(fixed(4)?))),
        0x0D => Constant::R8(f64::from_le_bytes(array8(fixed(8)?))),
        0x0E => {
            let units: Vec<u16> = blob
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            Constant::String(String::from_utf16_lossy(&units))
        }
        0x12 => Constant::Null,
        other => {
            return Err(MetadataError::MalformedSignature(format!(
                "unsupported constant type 0x{:02x}",
                other
            )))
        }
    };
    Ok(value)
}

fn array4(raw: &[u8]) -> [u8; 4] {
    [raw[0], raw[1], raw[2], raw[3]]
}

fn array8(raw: &[u8]) -> [u8; 8] {
    [raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7]]
}
