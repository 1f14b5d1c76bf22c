//! Plain output: one canonical identifier per line

use super::{ApiEntry, MemberWriter};
use std::io::{self, Write};

pub struct PlainWriter<W: Write> {
    out: W,
}

impl<W: Write> PlainWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> MemberWriter for PlainWriter<W> {
    fn write_member(&mut self, entry: &ApiEntry) -> io::Result<()> {
        writeln!(self.out, "{}", entry.doc_id)?;
        self.out.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
