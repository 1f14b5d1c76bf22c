//! XML documentation sidecar lookup
//!
//! The sidecar sits next to the module with an `.xml` extension:
//!
//! ```xml
//! <doc>
//!   <members>
//!     <member name="M:Tizen.Demo.A.Run">
//!       <privilege>http://tizen.org/privilege/internet</privilege>
//!       <feature>http://tizen.org/feature/network.wifi</feature>
//!       <since_tizen>4</since_tizen>
//!     </member>
//!   </members>
//! </doc>
//! ```

use crate::{ApiError, Result};
use log::{debug, info, warn};
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Documentation attached to one canonical id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocRecord {
    /// Sorted privilege tokens
    pub privileges: Vec<String>,
    /// Sorted feature tokens
    pub features: Vec<String>,
    /// Trimmed `since_tizen` text; empty when absent
    pub since: String,
}

impl DocRecord {
    fn from_member(node: Node, dedupe: bool) -> Self {
        let mut record = DocRecord::default();
        for child in node.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "privilege" => record.privileges.extend(tokens(child)),
                "feature" => record.features.extend(tokens(child)),
                "since_tizen" => record.since = inner_text(child).trim().to_string(),
                _ => {}
            }
        }
        record.privileges.sort();
        record.features.sort();
        if dedupe {
            record.privileges.dedup();
            record.features.dedup();
        }
        record
    }
}

/// Concatenated text of all descendants
fn inner_text(node: Node) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

fn tokens(node: Node) -> Vec<String> {
    inner_text(node)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Lookup from canonical id to its documentation record
#[derive(Debug, Clone, Default)]
pub struct AssemblyDocument {
    members: HashMap<String, DocRecord>,
}

impl AssemblyDocument {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sidecar location for a module path
    pub fn sidecar_path(module_path: &Path) -> PathBuf {
        module_path.with_extension("xml")
    }

    /// Load the sidecar beside `module_path`; a missing sidecar is empty
    pub fn load_for(module_path: &Path, dedupe: bool) -> Result<Self> {
        let path = Self::sidecar_path(module_path);
        debug!("Probing documentation sidecar {}", path.display());
        if !path.is_file() {
            return Ok(Self::empty());
        }

        let text = std::fs::read_to_string(&path).map_err(|e| ApiError::Sidecar {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let document = Self::parse(&text, dedupe).map_err(|message| ApiError::Sidecar {
            path: path.clone(),
            message,
        })?;
        info!(
            "Loaded documentation {} ({} members)",
            path.display(),
            document.len()
        );
        Ok(document)
    }

    /// Parse sidecar text; later entries for the same id replace earlier ones
    pub fn parse(xml: &str, dedupe: bool) -> std::result::Result<Self, String> {
        let doc = Document::parse(xml).map_err(|e| format!("XML parse error: {}", e))?;
        let mut members = HashMap::new();

        for group in doc.root_element().children().filter(Node::is_element) {
            for member in group.children().filter(|n| n.has_tag_name("member")) {
                match member.attribute("name") {
                    Some(name) => {
                        members.insert(name.to_string(), DocRecord::from_member(member, dedupe));
                    }
                    None => {
                        let pos = doc.text_pos_at(member.range().start);
                        warn!("Skipping <member> without a name at line {}", pos.row);
                    }
                }
            }
        }

        Ok(Self { members })
    }

    pub fn lookup(&self, doc_id: &str) -> Option<&DocRecord> {
        self.members.get(doc_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
