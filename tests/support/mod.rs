//! Synthetic .NET module images
//!
//! Builds a PE32 DLL with one `.text` section holding the CLI header and a
//! metadata root with `#~`, `#Strings`, `#US`, `#GUID` and `#Blob` streams.
//! Every heap and table stays small, so all index columns are two bytes wide.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const TYPE_PUBLIC: u32 = 0x0001;
pub const TYPE_NESTED_PUBLIC: u32 = 0x0002;

pub const PRIVATE: u16 = 0x0001;
pub const FAMILY: u16 = 0x0004;
pub const PUBLIC: u16 = 0x0006;
pub const STATIC: u16 = 0x0010;
pub const LITERAL: u16 = 0x0040;
pub const SPECIAL_NAME: u16 = 0x0800;

pub const VOID: &[u8] = &[0x01];
pub const BOOL: &[u8] = &[0x02];
pub const I4: &[u8] = &[0x08];
pub const STRING: &[u8] = &[0x0E];

const MODULE: u8 = 0x00;
const TYPE_REF: u8 = 0x01;
const TYPE_DEF: u8 = 0x02;
const FIELD: u8 = 0x04;
const METHOD_DEF: u8 = 0x06;
const MEMBER_REF: u8 = 0x0A;
const CONSTANT: u8 = 0x0B;
const CUSTOM_ATTRIBUTE: u8 = 0x0C;
const PROPERTY_MAP: u8 = 0x15;
const PROPERTY: u8 = 0x17;
const METHOD_SEMANTICS: u8 = 0x18;
const ASSEMBLY: u8 = 0x20;
const ASSEMBLY_REF: u8 = 0x23;
const NESTED_CLASS: u8 = 0x29;

const SECTION_RVA: u32 = 0x2000;
const SECTION_ALIGNMENT: u32 = 0x2000;
const FILE_ALIGNMENT: usize = 0x200;
const SECTION_OFFSET: usize = 0x200;
const CLI_HEADER_SIZE: usize = 72;
const COMIMAGE_FLAGS_ILONLY: u32 = 0x0001;

/// Module version id stored in the `#GUID` heap
const MVID: [u8; 16] = [
    0x6d, 0x2e, 0x1b, 0x0c, 0x42, 0x8a, 0x4e, 0x53, 0x9f, 0x21, 0x7c, 0x3d, 0x58, 0x06, 0xa1, 0x94,
];

/// ECMA standard public key; its token is `b77a5c561934e089`
pub const ECMA_KEY: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 4, 0, 0, 0, 0, 0, 0, 0];

/// Something a custom attribute can be attached to
#[derive(Debug, Clone, Copy)]
pub enum Target {
    Type(u32),
    Field(u32),
    Method(u32),
}

impl Target {
    fn coded(self) -> u16 {
        let (rid, tag) = match self {
            Target::Method(rid) => (rid, 0),
            Target::Field(rid) => (rid, 1),
            Target::Type(rid) => (rid, 3),
        };
        ((rid << 5) | tag) as u16
    }
}

enum Cell {
    W(u16),
    D(u32),
}

pub struct ImageBuilder {
    strings: Vec<u8>,
    string_index: HashMap<String, u16>,
    blobs: Vec<u8>,
    /// Row count and encoded rows per table
    tables: BTreeMap<u8, (u32, Vec<u8>)>,
    property_owner: Option<u32>,
    browsable_ctor: u32,
    obsolete_ctor: u32,
}

impl ImageBuilder {
    /// A module with one assembly reference (`System.Runtime`) and the
    /// attribute types needed to hide or obsolete symbols
    pub fn new(module_name: &str, assembly_name: &str) -> Self {
        let mut b = Self {
            strings: vec![0],
            string_index: HashMap::new(),
            blobs: vec![0],
            tables: BTreeMap::new(),
            property_owner: None,
            browsable_ctor: 0,
            obsolete_ctor: 0,
        };

        let name = b.string(module_name);
        b.row(MODULE, &[Cell::W(0), Cell::W(name), Cell::W(1), Cell::W(0), Cell::W(0)]);

        let name = b.string(assembly_name);
        b.row(
            ASSEMBLY,
            &[
                Cell::D(0x8004),
                Cell::W(1),
                Cell::W(0),
                Cell::W(0),
                Cell::W(0),
                Cell::D(0),
                Cell::W(0),
                Cell::W(name),
                Cell::W(0),
            ],
        );

        let runtime = b.assembly_ref(
            "System.Runtime",
            (4, 2, 1, 0),
            &[0xb0, 0x3f, 0x5f, 0x7f, 0x11, 0xd5, 0x0a, 0x3a],
            false,
        );
        let scope = ((runtime << 2) | 2) as u16;
        b.type_ref(scope, "System", "Object");
        let browsable = b.type_ref(scope, "System.ComponentModel", "EditorBrowsableAttribute");
        let state = b.type_ref(scope, "System.ComponentModel", "EditorBrowsableState");
        let obsolete = b.type_ref(scope, "System", "ObsoleteAttribute");

        let state_sig = [0x20, 1, 0x01, 0x11, ((state << 2) | 1) as u8];
        b.browsable_ctor = b.member_ref(browsable, ".ctor", &state_sig);
        b.obsolete_ctor = b.member_ref(obsolete, ".ctor", &[0x20, 0, 0x01]);

        // `<Module>` pseudo type
        let name = b.string("<Module>");
        b.row(
            TYPE_DEF,
            &[Cell::D(0), Cell::W(name), Cell::W(0), Cell::W(0), Cell::W(1), Cell::W(1)],
        );
        b
    }

    fn string(&mut self, value: &str) -> u16 {
        if value.is_empty() {
            return 0;
        }
        if let Some(index) = self.string_index.get(value) {
            return *index;
        }
        let index = self.strings.len() as u16;
        self.strings.extend_from_slice(value.as_bytes());
        self.strings.push(0);
        self.string_index.insert(value.to_string(), index);
        index
    }

    fn blob(&mut self, value: &[u8]) -> u16 {
        assert!(value.len() < 0x80, "test blobs use one-byte lengths");
        let index = self.blobs.len() as u16;
        self.blobs.push(value.len() as u8);
        self.blobs.extend_from_slice(value);
        index
    }

    fn row(&mut self, table: u8, cells: &[Cell]) -> u32 {
        let entry = self.tables.entry(table).or_insert((0, Vec::new()));
        for cell in cells {
            match cell {
                Cell::W(v) => entry.1.extend_from_slice(&v.to_le_bytes()),
                Cell::D(v) => entry.1.extend_from_slice(&v.to_le_bytes()),
            }
        }
        entry.0 += 1;
        entry.0
    }

    fn count(&self, table: u8) -> u32 {
        self.tables.get(&table).map_or(0, |t| t.0)
    }

    fn type_ref(&mut self, scope: u16, namespace: &str, name: &str) -> u32 {
        let name = self.string(name);
        let namespace = self.string(namespace);
        self.row(TYPE_REF, &[Cell::W(scope), Cell::W(name), Cell::W(namespace)])
    }

    fn member_ref(&mut self, type_ref: u32, name: &str, sig: &[u8]) -> u32 {
        let class = ((type_ref << 3) | 1) as u16;
        let name = self.string(name);
        let sig = self.blob(sig);
        self.row(MEMBER_REF, &[Cell::W(class), Cell::W(name), Cell::W(sig)])
    }

    /// `key` is a token, or a full public key when `full_key` is set
    pub fn assembly_ref(&mut self, name: &str, version: (u16, u16, u16, u16), key: &[u8], full_key: bool) -> u32 {
        let key = self.blob(key);
        let name = self.string(name);
        self.row(
            ASSEMBLY_REF,
            &[
                Cell::W(version.0),
                Cell::W(version.1),
                Cell::W(version.2),
                Cell::W(version.3),
                Cell::D(u32::from(full_key)),
                Cell::W(key),
                Cell::W(name),
                Cell::W(0),
                Cell::W(0),
            ],
        )
    }

    /// A class deriving from `System.Object`; members added next belong to it
    pub fn type_def(&mut self, namespace: &str, name: &str, flags: u32) -> u32 {
        let name = self.string(name);
        let namespace = self.string(namespace);
        let fields = self.count(FIELD) + 1;
        let methods = self.count(METHOD_DEF) + 1;
        self.row(
            TYPE_DEF,
            &[
                Cell::D(flags),
                Cell::W(name),
                Cell::W(namespace),
                Cell::W((1 << 2) | 1),
                Cell::W(fields as u16),
                Cell::W(methods as u16),
            ],
        )
    }

    pub fn nested_type(&mut self, outer: u32, name: &str, flags: u32) -> u32 {
        let rid = self.type_def("", name, flags);
        self.row(NESTED_CLASS, &[Cell::W(rid as u16), Cell::W(outer as u16)]);
        rid
    }

    pub fn field(&mut self, name: &str, flags: u16, ty: &[u8]) -> u32 {
        let name = self.string(name);
        let mut sig = vec![0x06];
        sig.extend_from_slice(ty);
        let sig = self.blob(&sig);
        self.row(FIELD, &[Cell::W(flags), Cell::W(name), Cell::W(sig)])
    }

    pub fn constant_i4(&mut self, field: u32, value: i32) {
        let value = self.blob(&value.to_le_bytes());
        self.row(
            CONSTANT,
            &[Cell::W(0x08), Cell::W((field << 2) as u16), Cell::W(value)],
        );
    }

    pub fn method(&mut self, name: &str, flags: u16, ret: &[u8], params: &[&[u8]]) -> u32 {
        let name = self.string(name);
        let mut sig = vec![if flags & STATIC != 0 { 0x00 } else { 0x20 }, params.len() as u8];
        sig.extend_from_slice(ret);
        for param in params {
            sig.extend_from_slice(param);
        }
        let sig = self.blob(&sig);
        self.row(
            METHOD_DEF,
            &[Cell::D(0), Cell::W(0), Cell::W(flags), Cell::W(name), Cell::W(sig), Cell::W(1)],
        )
    }

    /// Read-only property of `owner` backed by a new `get_` method
    pub fn property(&mut self, owner: u32, name: &str, getter_flags: u16, ty: &[u8]) -> u32 {
        let getter = self.method(&format!("get_{}", name), getter_flags | SPECIAL_NAME, ty, &[]);
        if self.property_owner != Some(owner) {
            let first = self.count(PROPERTY) + 1;
            self.row(PROPERTY_MAP, &[Cell::W(owner as u16), Cell::W(first as u16)]);
            self.property_owner = Some(owner);
        }
        let name = self.string(name);
        let mut sig = vec![0x28, 0];
        sig.extend_from_slice(ty);
        let sig = self.blob(&sig);
        let property = self.row(PROPERTY, &[Cell::W(0), Cell::W(name), Cell::W(sig)]);
        self.row(
            METHOD_SEMANTICS,
            &[Cell::W(0x0002), Cell::W(getter as u16), Cell::W(((property << 1) | 1) as u16)],
        );
        property
    }

    /// `[EditorBrowsable(EditorBrowsableState.Never)]`
    pub fn hide(&mut self, target: Target) {
        let ctor = ((self.browsable_ctor << 3) | 3) as u16;
        let value = self.blob(&[0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
        self.row(CUSTOM_ATTRIBUTE, &[Cell::W(target.coded()), Cell::W(ctor), Cell::W(value)]);
    }

    /// `[Obsolete]`
    pub fn obsolete(&mut self, target: Target) {
        let ctor = ((self.obsolete_ctor << 3) | 3) as u16;
        let value = self.blob(&[0x01, 0x00, 0x00, 0x00]);
        self.row(CUSTOM_ATTRIBUTE, &[Cell::W(target.coded()), Cell::W(ctor), Cell::W(value)]);
    }

    fn table_stream(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0u32.to_le_bytes());
        out.push(2);
        out.push(0);
        out.push(0);
        out.push(1);
        let valid = self.tables.keys().fold(0u64, |bits, id| bits | (1u64 << id));
        out.extend_from_slice(&valid.to_le_bytes());
        out.extend_from_slice(&0u64.to_le_bytes());
        for (count, _) in self.tables.values() {
            out.extend_from_slice(&count.to_le_bytes());
        }
        for (_, rows) in self.tables.values() {
            out.extend_from_slice(rows);
        }
        out
    }

    fn metadata(&self) -> Vec<u8> {
        let streams: [(&str, Vec<u8>); 5] = [
            ("#~", padded(self.table_stream())),
            ("#Strings", padded(self.strings.clone())),
            ("#US", padded(vec![0])),
            ("#GUID", MVID.to_vec()),
            ("#Blob", padded(self.blobs.clone())),
        ];

        let version = b"v4.0.30319\0\0";
        let mut out = Vec::new();
        out.extend_from_slice(&0x424A_5342u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(version.len() as u32).to_le_bytes());
        out.extend_from_slice(version);
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&(streams.len() as u16).to_le_bytes());

        let headers: usize = streams
            .iter()
            .map(|(name, _)| 8 + (name.len() + 1).div_ceil(4) * 4)
            .sum();
        let mut offset = out.len() + headers;
        for (name, body) in &streams {
            out.extend_from_slice(&(offset as u32).to_le_bytes());
            out.extend_from_slice(&(body.len() as u32).to_le_bytes());
            let mut raw = name.as_bytes().to_vec();
            raw.push(0);
            out.extend_from_slice(&padded(raw));
            offset += body.len();
        }
        for (_, body) in &streams {
            out.extend_from_slice(body);
        }
        out
    }

    /// Complete PE32 image
    pub fn build(&self) -> Vec<u8> {
        let metadata = self.metadata();
        let metadata_rva = SECTION_RVA + CLI_HEADER_SIZE as u32;

        let mut section = Vec::new();
        section.extend_from_slice(&(CLI_HEADER_SIZE as u32).to_le_bytes());
        section.extend_from_slice(&2u16.to_le_bytes());
        section.extend_from_slice(&5u16.to_le_bytes());
        section.extend_from_slice(&metadata_rva.to_le_bytes());
        section.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
        section.extend_from_slice(&COMIMAGE_FLAGS_ILONLY.to_le_bytes());
        section.resize(CLI_HEADER_SIZE, 0);
        section.extend_from_slice(&metadata);
        let virtual_size = section.len() as u32;
        section.resize(section.len().div_ceil(FILE_ALIGNMENT) * FILE_ALIGNMENT, 0);
        let raw_size = section.len() as u32;
        let image_size = SECTION_RVA + virtual_size.div_ceil(SECTION_ALIGNMENT) * SECTION_ALIGNMENT;

        let mut image = vec![0u8; SECTION_OFFSET];
        let mut put = |at: usize, bytes: &[u8]| image[at..at + bytes.len()].copy_from_slice(bytes);
        put(0, b"MZ");
        put(0x3C, &0x80u32.to_le_bytes());

        // COFF header: i386, one section, executable DLL
        let pe = 0x80;
        put(pe, b"PE\0\0");
        put(pe + 4, &0x014Cu16.to_le_bytes());
        put(pe + 6, &1u16.to_le_bytes());
        put(pe + 20, &224u16.to_le_bytes());
        put(pe + 22, &0x2102u16.to_le_bytes());

        let optional = pe + 24;
        put(optional, &0x010Bu16.to_le_bytes());
        put(optional + 2, &[8, 0]);
        put(optional + 4, &raw_size.to_le_bytes());
        put(optional + 20, &SECTION_RVA.to_le_bytes());
        put(optional + 28, &0x0040_0000u32.to_le_bytes());
        put(optional + 32, &SECTION_ALIGNMENT.to_le_bytes());
        put(optional + 36, &(FILE_ALIGNMENT as u32).to_le_bytes());
        put(optional + 40, &4u16.to_le_bytes());
        put(optional + 48, &4u16.to_le_bytes());
        put(optional + 56, &image_size.to_le_bytes());
        put(optional + 60, &(SECTION_OFFSET as u32).to_le_bytes());
        put(optional + 68, &3u16.to_le_bytes());
        put(optional + 70, &0x8540u16.to_le_bytes());
        put(optional + 72, &0x0010_0000u32.to_le_bytes());
        put(optional + 76, &0x1000u32.to_le_bytes());
        put(optional + 80, &0x0010_0000u32.to_le_bytes());
        put(optional + 84, &0x1000u32.to_le_bytes());
        put(optional + 92, &16u32.to_le_bytes());
        let cli = optional + 96 + 14 * 8;
        put(cli, &SECTION_RVA.to_le_bytes());
        put(cli + 4, &(CLI_HEADER_SIZE as u32).to_le_bytes());

        let header = optional + 224;
        put(header, b".text\0\0\0");
        put(header + 8, &virtual_size.to_le_bytes());
        put(header + 12, &SECTION_RVA.to_le_bytes());
        put(header + 16, &raw_size.to_le_bytes());
        put(header + 20, &(SECTION_OFFSET as u32).to_le_bytes());
        put(header + 36, &0x6000_0020u32.to_le_bytes());

        image.extend_from_slice(&section);
        image
    }

    pub fn write(&self, path: &Path) {
        std::fs::write(path, self.build()).unwrap();
    }
}

fn padded(mut bytes: Vec<u8>) -> Vec<u8> {
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
}

/// `Demo.dll`:
///
/// ```csharp
/// namespace Demo {
///     public class A {
///         protected int X;
///         private int Y;
///         public const int Max = 10;
///         public int Count { get; }
///         public void Run(int a, string b);
///         public class Inner { }
///     }
///     internal class Impl { public int Z; }
///     [EditorBrowsable(EditorBrowsableState.Never)]
///     public class Secret { public static bool Go(); }
///     [Obsolete] public class Old { }
/// }
/// ```
pub fn demo_module() -> ImageBuilder {
    let mut b = ImageBuilder::new("Demo.dll", "Demo");

    let a = b.type_def("Demo", "A", TYPE_PUBLIC);
    b.field("X", FAMILY, I4);
    b.field("Y", PRIVATE, I4);
    let max = b.field("Max", PUBLIC | STATIC | LITERAL, I4);
    b.constant_i4(max, 10);
    b.property(a, "Count", PUBLIC, I4);
    b.method("Run", PUBLIC, VOID, &[I4, STRING]);
    b.nested_type(a, "Inner", TYPE_NESTED_PUBLIC);

    b.type_def("Demo", "Impl", 0);
    b.field("Z", PUBLIC, I4);

    let secret = b.type_def("Demo", "Secret", TYPE_PUBLIC);
    b.method("Go", PUBLIC | STATIC, BOOL, &[]);
    b.hide(Target::Type(secret));

    let old = b.type_def("Demo", "Old", TYPE_PUBLIC);
    b.obsolete(Target::Type(old));
    b
}
