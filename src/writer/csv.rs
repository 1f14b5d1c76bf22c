//! CSV output
//!
//! Ten columns, no header row:
//! `"DocId",RefType,DeclaringType,Constant,static,hidden,obsolete,Since,Privileges,Features`.
//! Only the identifier is quoted; token lists are space separated.

use super::{ApiEntry, MemberWriter};
use std::io::{self, Write};

pub struct CsvWriter<W: Write> {
    out: W,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn format_row(entry: &ApiEntry) -> String {
        let flag = |on: bool, name: &'static str| if on { name } else { "" };
        format!(
            "\"{}\",{},{},{},{},{},{},{},{},{}",
            entry.doc_id,
            entry.referenced_type().unwrap_or_default(),
            entry.declaring_type.as_deref().unwrap_or_default(),
            entry.constant.as_deref().unwrap_or_default(),
            flag(entry.is_static, "static"),
            flag(entry.is_hidden, "hidden"),
            flag(entry.is_obsolete, "obsolete"),
            entry.since,
            entry.privileges.join(" "),
            entry.features.join(" "),
        )
    }
}

impl<W: Write> MemberWriter for CsvWriter<W> {
    fn write_member(&mut self, entry: &ApiEntry) -> io::Result<()> {
        writeln!(self.out, "{}", Self::format_row(entry))?;
        self.out.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
