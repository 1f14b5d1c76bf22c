//! Output encoders for API entries
//!
//! Every encoder streams to its sink and flushes after each entry, so a
//! large module never sits in memory as rendered text.

mod csv;
mod json;
mod plain;

pub use self::csv::CsvWriter;
pub use self::json::JsonWriter;
pub use self::plain::PlainWriter;

use crate::options::OutputFormat;
use crate::types::{Module, SymbolKind};
use crate::{ApiError, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One emitted symbol with everything an encoder may print
#[derive(Debug, Clone, PartialEq)]
pub struct ApiEntry {
    pub kind: SymbolKind,
    pub doc_id: String,
    /// Reader-style full name (`System.Void NS.A::Run(System.Int32)`)
    pub signature: String,
    /// Base type of a type definition
    pub base_type: Option<String>,
    /// Return, field, property or event type of a member
    pub return_type: Option<String>,
    pub declaring_type: Option<String>,
    pub namespace: Option<String>,
    pub constant: Option<String>,
    pub is_static: bool,
    pub is_hidden: bool,
    pub is_obsolete: bool,
    /// Empty when the sidecar has no `since_tizen`
    pub since: String,
    pub privileges: Vec<String>,
    pub features: Vec<String>,
}

impl ApiEntry {
    /// Base type for types, value type for members
    pub fn referenced_type(&self) -> Option<&str> {
        match self.kind {
            SymbolKind::Type => self.base_type.as_deref(),
            _ => self.return_type.as_deref(),
        }
    }
}

/// Streaming encoder driven by the printer
///
/// The document brackets the whole run, each assembly brackets one input.
pub trait MemberWriter {
    fn begin_document(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn end_document(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn begin_assembly(&mut self, _module: &Module) -> io::Result<()> {
        Ok(())
    }

    fn end_assembly(&mut self, _module: &Module) -> io::Result<()> {
        Ok(())
    }

    fn write_member(&mut self, entry: &ApiEntry) -> io::Result<()>;

    /// Flush whatever the sink still buffers
    fn flush(&mut self) -> io::Result<()>;
}

/// Destination of a print run
pub struct Sink {
    /// `None` for standard output
    pub path: Option<PathBuf>,
    file: Option<File>,
}

impl Sink {
    /// Open the destination up front so an unwritable path fails early.
    /// Existing content is left alone until [`Sink::into_writer`].
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Some(
                OpenOptions::new()
                    .write(true)
                    .create(true)
                    .open(path)
                    .map_err(|source| output_error(Some(path), source))?,
            ),
            None => None,
        };
        Ok(Self {
            path: path.map(Path::to_path_buf),
            file,
        })
    }

    /// Truncate the destination and hand out its buffered writer
    pub fn into_writer(self) -> Result<Box<dyn Write>> {
        let Sink { path, file } = self;
        match file {
            Some(file) => {
                file.set_len(0)
                    .map_err(|source| output_error(path.as_deref(), source))?;
                Ok(Box::new(BufWriter::new(file)))
            }
            None => Ok(Box::new(BufWriter::new(io::stdout()))),
        }
    }
}

/// Wrap an I/O failure on the sink at `path`
pub fn output_error(path: Option<&Path>, source: io::Error) -> ApiError {
    ApiError::Output {
        path: path.map_or_else(|| PathBuf::from("<stdout>"), Path::to_path_buf),
        source,
    }
}

/// Build the encoder for a format around an opened sink
pub fn create_writer<'w>(
    format: OutputFormat,
    category: Option<String>,
    out: Box<dyn Write + 'w>,
) -> Box<dyn MemberWriter + 'w> {
    match format {
        OutputFormat::Plain => Box::new(PlainWriter::new(out)),
        OutputFormat::Csv => Box::new(CsvWriter::new(out)),
        OutputFormat::Json => Box::new(JsonWriter::new(out, category)),
    }
}
