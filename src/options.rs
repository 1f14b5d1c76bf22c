//! Print options and the YAML configuration file
//!
//! Options resolve once per run, lowest precedence first: built-in
//! defaults, then a configuration file, then command line flags.
//!
//! ```yaml
//! format: json
//! output: api.json
//! kinds: [types, methods]
//! include_hidden: false
//! category: public
//! dedupe_tokens: true
//! ```

use crate::types::SymbolKind;
use crate::{ApiError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Output encoding selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum OutputFormat {
    /// One canonical identifier per line
    #[default]
    Plain,
    Csv,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "text" => Ok(OutputFormat::Plain),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl TryFrom<String> for OutputFormat {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Plain => "plain",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        };
        f.write_str(name)
    }
}

/// Which symbol kinds to print; an empty filter prints every kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindFilter(BTreeSet<SymbolKind>);

impl KindFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn allows(&self, kind: SymbolKind) -> bool {
        self.0.is_empty() || self.0.contains(&kind)
    }
}

impl FromIterator<SymbolKind> for KindFilter {
    fn from_iter<I: IntoIterator<Item = SymbolKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for KindFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("all");
        }
        let names: Vec<String> = self.0.iter().map(|k| k.to_string()).collect();
        f.write_str(&names.join(","))
    }
}

/// Resolved options for one print run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrintOptions {
    pub format: OutputFormat,
    /// Destination file; standard output when `None`
    pub output: Option<PathBuf>,
    pub kinds: KindFilter,
    pub include_hidden: bool,
    /// Discriminator written into every JSON entry
    pub category: Option<String>,
    /// Remove repeated privilege and feature tokens
    pub dedupe_tokens: bool,
}

/// Configuration file contents; absent keys leave options untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintConfig {
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub kinds: Vec<SymbolKind>,
    pub include_hidden: Option<bool>,
    pub category: Option<String>,
    pub dedupe_tokens: Option<bool>,
}

impl PrintConfig {
    pub fn parse(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| ApiError::Config(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("{}: {}", path.display(), e)))?;
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Self::parse(&text).map_err(|e| match e {
            ApiError::Config(msg) => ApiError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Overlay the keys this file sets onto `options`
    pub fn apply(&self, options: &mut PrintOptions) {
        if let Some(format) = self.format {
            options.format = format;
        }
        if let Some(ref output) = self.output {
            options.output = Some(output.clone());
        }
        if !self.kinds.is_empty() {
            options.kinds = self.kinds.iter().copied().collect();
        }
        if let Some(include_hidden) = self.include_hidden {
            options.include_hidden = include_hidden;
        }
        if let Some(ref category) = self.category {
            options.category = Some(category.clone());
        }
        if let Some(dedupe) = self.dedupe_tokens {
            options.dedupe_tokens = dedupe;
        }
    }
}
