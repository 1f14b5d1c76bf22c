//! JSON output
//!
//! A single array spanning every input. Entries are written one at a time
//! with a fixed layout, so the document is never built in memory:
//!
//! ```json
//! [
//!   {
//!     "DocId": "F:A.X",
//!     "Info": {
//!       "Signature": "System.Int32 A::X",
//!       "DeclaringType": "A",
//!       "ReturnType": "System.Int32",
//!       "IsStatic": false,
//!       "IsHidden": false,
//!       "IsObsolete": false,
//!       "Since": "none",
//!       "Privileges": [
//!         "http://x"
//!       ]
//!     }
//!   }
//! ]
//! ```

use super::{ApiEntry, MemberWriter};
use std::io::{self, Write};

pub struct JsonWriter<W: Write> {
    out: W,
    category: Option<String>,
    first: bool,
}

impl<W: Write> JsonWriter<W> {
    /// A non-empty `category` is written into every entry as `Category`
    pub fn new(out: W, category: Option<String>) -> Self {
        Self {
            out,
            category: category.filter(|c| !c.is_empty()),
            first: true,
        }
    }

    fn write_optional(&mut self, key: &str, value: Option<&str>) -> io::Result<()> {
        match value {
            Some(value) if !value.is_empty() => {
                writeln!(self.out, "      \"{}\": {},", key, quote(value)?)
            }
            _ => Ok(()),
        }
    }

    fn write_list(&mut self, key: &str, items: &[String], more: bool) -> io::Result<()> {
        writeln!(self.out, "      \"{}\": [", key)?;
        for (i, item) in items.iter().enumerate() {
            let sep = if i + 1 < items.len() { "," } else { "" };
            writeln!(self.out, "        {}{}", quote(item)?, sep)?;
        }
        writeln!(self.out, "      ]{}", if more { "," } else { "" })
    }
}

fn quote(value: &str) -> io::Result<String> {
    Ok(serde_json::to_string(value)?)
}

impl<W: Write> MemberWriter for JsonWriter<W> {
    fn begin_document(&mut self) -> io::Result<()> {
        self.first = true;
        writeln!(self.out, "[")?;
        self.out.flush()
    }

    fn end_document(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(self.out, "]")?;
        self.out.flush()
    }

    fn write_member(&mut self, entry: &ApiEntry) -> io::Result<()> {
        if !self.first {
            writeln!(self.out, ",")?;
        }
        self.first = false;

        writeln!(self.out, "  {{")?;
        writeln!(self.out, "    \"DocId\": {},", quote(&entry.doc_id)?)?;
        writeln!(self.out, "    \"Info\": {{")?;
        writeln!(self.out, "      \"Signature\": {},", quote(&entry.signature)?)?;
        self.write_optional("BaseType", entry.base_type.as_deref())?;
        self.write_optional("DeclaringType", entry.declaring_type.as_deref())?;
        self.write_optional("Namespace", entry.namespace.as_deref())?;
        self.write_optional("ReturnType", entry.return_type.as_deref())?;
        self.write_optional("Constant", entry.constant.as_deref())?;
        let category = self.category.clone();
        self.write_optional("Category", category.as_deref())?;
        writeln!(self.out, "      \"IsStatic\": {},", entry.is_static)?;
        writeln!(self.out, "      \"IsHidden\": {},", entry.is_hidden)?;
        writeln!(self.out, "      \"IsObsolete\": {},", entry.is_obsolete)?;

        let since = if entry.since.is_empty() { "none" } else { &entry.since };
        let has_lists = !entry.privileges.is_empty() || !entry.features.is_empty();
        writeln!(
            self.out,
            "      \"Since\": {}{}",
            quote(since)?,
            if has_lists { "," } else { "" }
        )?;
        if !entry.privileges.is_empty() {
            self.write_list("Privileges", &entry.privileges, !entry.features.is_empty())?;
        }
        if !entry.features.is_empty() {
            self.write_list("Features", &entry.features, false)?;
        }
        writeln!(self.out, "    }}")?;
        write!(self.out, "  }}")?;
        self.out.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
