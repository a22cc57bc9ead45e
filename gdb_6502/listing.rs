// Copyright 2025 The Pigweed Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License. You may obtain a copy of
// the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations under
// the License.

//! Assembler listing documents.
//!
//! A listing is a sequence of sections, each opened by a `Name: arg` header
//! line and closed by a blank line:
//!
//! ```text
//! Sections:
//! 00: "CODE" (8000-80FF)
//!
//! Source: "main.s"
//!  ; continuation lines start with a space
//! 00:8000 A9FF reset: lda #$ff
//! 00:8002 8D0260 : sta $6002
//!
//! Symbols by name:
//! reset A:8000
//!
//! Symbols by value:
//! 8000 reset
//! ```

use std::collections::BTreeMap;
use std::str::FromStr;

use hashlink::LinkedHashMap;
use thiserror::Error;
use tracing::debug;

/// Lines of context shown on each side of a window's center line.
pub const DEFAULT_CONTEXT: usize = 2;

/// A malformed listing document.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("listing line {line}: {kind}")]
pub struct FormatError {
    /// 1-based line number within the document.
    pub line: usize,
    pub kind: FormatErrorKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatErrorKind {
    #[error("unknown section `{0}`")]
    UnknownSection(String),
    #[error("missing `{0}` separator")]
    MissingSeparator(char),
    #[error("invalid hex value `{0}`")]
    InvalidHex(String),
}

/// Section kinds recognized by header name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Section {
    Sections,
    Source { file: String },
    SymbolsByName,
    SymbolsByValue,
}

impl Section {
    fn from_header(line: &str) -> Result<Self, FormatErrorKind> {
        let (name, arg) = line.split_once(':').unwrap_or((line, ""));
        match name {
            "Sections" => Ok(Section::Sections),
            "Source" => Ok(Section::Source {
                file: unquote(arg.trim()).to_string(),
            }),
            "Symbols by name" => Ok(Section::SymbolsByName),
            "Symbols by value" => Ok(Section::SymbolsByValue),
            _ => Err(FormatErrorKind::UnknownSection(name.to_string())),
        }
    }
}

/// Where an address was assembled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    pub file: String,
    /// Zero-based index into the file's source lines.
    pub line: usize,
    pub section: String,
    pub bytes: Vec<u8>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub address: u16,
    /// Symbol type as written by the assembler, e.g. `A` or `E`.
    pub kind: String,
}

/// One line of a [`SourceWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLine<'a> {
    /// Zero-based line index.
    pub index: usize,
    pub text: &'a str,
}

/// A line of source together with its surrounding context.
///
/// Lookups that miss produce an empty window rather than an error.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SourceWindow<'a> {
    pub before: Vec<SourceLine<'a>>,
    pub center: Option<SourceLine<'a>>,
    pub after: Vec<SourceLine<'a>>,
}

impl<'a> SourceWindow<'a> {
    pub fn is_empty(&self) -> bool {
        self.center.is_none()
    }

    /// All lines in file order.
    pub fn lines(&self) -> impl Iterator<Item = &SourceLine<'a>> {
        self.before
            .iter()
            .chain(self.center.iter())
            .chain(self.after.iter())
    }
}

/// A parsed listing. Immutable once built.
#[derive(Debug, Default)]
pub struct ListingDocument {
    sections: LinkedHashMap<String, String>,
    sources: LinkedHashMap<String, Vec<String>>,
    addresses: BTreeMap<u16, AddressRecord>,
    symbols_by_name: LinkedHashMap<String, Symbol>,
    symbols_by_value: BTreeMap<u16, String>,
}

impl ListingDocument {
    /// Parses a listing in a single forward pass.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let mut builder = Builder::default();
        for (index, line) in text.lines().enumerate() {
            builder.line(line.trim_end()).map_err(|kind| FormatError {
                line: index + 1,
                kind,
            })?;
        }
        let doc = builder.doc;
        debug!(
            files = doc.sources.len(),
            addresses = doc.addresses.len(),
            symbols = doc.symbols_by_name.len(),
            "parsed listing"
        );
        Ok(doc)
    }

    /// Looks up a symbol's address by name.
    pub fn symbol(&self, name: &str) -> Option<u16> {
        self.symbols_by_name.get(name).map(|symbol| symbol.address)
    }

    pub fn symbol_entry(&self, name: &str) -> Option<&Symbol> {
        self.symbols_by_name.get(name)
    }

    /// Looks up the name recorded for an address in the by-value table.
    pub fn symbol_at(&self, address: u16) -> Option<&str> {
        self.symbols_by_value.get(&address).map(String::as_str)
    }

    pub fn location(&self, address: u16) -> Option<&AddressRecord> {
        self.addresses.get(&address)
    }

    /// Number of addresses with a known source line.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Section codes and names in document order.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sections
            .iter()
            .map(|(code, name)| (code.as_str(), name.as_str()))
    }

    /// Source file names in the order they were first seen.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn source(&self, file: &str) -> Option<&[String]> {
        self.sources.get(file).map(Vec::as_slice)
    }

    /// Returns line `index` of `file` with up to `radius` lines either side.
    ///
    /// `file` defaults to the first file in the listing. Context is clipped
    /// at the start and end of the file.
    pub fn source_window(
        &self,
        index: usize,
        file: Option<&str>,
        radius: usize,
    ) -> SourceWindow<'_> {
        let lines = match file {
            Some(file) => self.sources.get(file),
            None => self.sources.values().next(),
        };
        let Some(lines) = lines.filter(|lines| index < lines.len()) else {
            return SourceWindow::default();
        };

        let line = move |i: usize| SourceLine {
            index: i,
            text: lines[i].as_str(),
        };
        let end = index.saturating_add(radius).saturating_add(1).min(lines.len());
        SourceWindow {
            before: (index.saturating_sub(radius)..index).map(line).collect(),
            center: Some(line(index)),
            after: (index + 1..end).map(line).collect(),
        }
    }

    /// Returns the source window for the line that assembled `address`.
    pub fn source_window_for_address(&self, address: u16, radius: usize) -> SourceWindow<'_> {
        match self.addresses.get(&address) {
            Some(record) => self.source_window(record.line, Some(record.file.as_str()), radius),
            None => SourceWindow::default(),
        }
    }
}

impl FromStr for ListingDocument {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Default)]
struct Builder {
    doc: ListingDocument,
    section: Option<Section>,
}

impl Builder {
    fn line(&mut self, line: &str) -> Result<(), FormatErrorKind> {
        if line.is_empty() {
            self.section = None;
            return Ok(());
        }

        match &self.section {
            None => {
                let section = Section::from_header(line)?;
                debug!(?section, "listing section");
                self.section = Some(section);
            }
            Some(Section::Sections) => {
                let (code, name) = split(line, ':')?;
                self.doc
                    .sections
                    .insert(code.trim().to_string(), name.trim().to_string());
            }
            Some(Section::Source { file }) => add_source_line(&mut self.doc, file, line)?,
            Some(Section::SymbolsByName) => {
                let (name, rest) = split(line, ' ')?;
                let (kind, value) = split(rest.trim(), ':')?;
                let symbol = Symbol {
                    address: parse_address(value.trim())?,
                    kind: kind.to_string(),
                };
                self.doc.symbols_by_name.insert(name.to_string(), symbol);
            }
            Some(Section::SymbolsByValue) => {
                let (value, name) = split(line, ' ')?;
                self.doc
                    .symbols_by_value
                    .insert(parse_address(value)?, name.trim().to_string());
            }
        }
        Ok(())
    }
}

/// Records a `Source` line.
///
/// Lines starting with a space continue the previous statement and carry no
/// address. Other lines have the form
/// `<section>:<address> <machine-code-hex> <label?>: <source-text>`.
fn add_source_line(
    doc: &mut ListingDocument,
    file: &str,
    line: &str,
) -> Result<(), FormatErrorKind> {
    let lines = doc.sources.entry(file.to_string()).or_insert_with(Vec::new);
    if line.starts_with(' ') {
        lines.push(line.to_string());
        return Ok(());
    }

    let (location, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let (section, address) = split(location, ':')?;
    let address = parse_address(address)?;
    let (fields, text) = split(rest, ':')?;
    let (bytes, label) = parse_code_fields(fields)?;

    let index = lines.len();
    lines.push(text.trim_start().to_string());
    doc.addresses.insert(
        address,
        AddressRecord {
            file: file.to_string(),
            line: index,
            section: section.to_string(),
            bytes,
            label: label.map(str::to_string),
        },
    );
    Ok(())
}

/// Splits `<machine-code-hex> <label?>`. A lone token that is not a byte
/// string is taken as a label on a line that assembled no code.
fn parse_code_fields(fields: &str) -> Result<(Vec<u8>, Option<&str>), FormatErrorKind> {
    let mut tokens = fields.split_whitespace();
    match (tokens.next(), tokens.next_back()) {
        (None, _) => Ok((Vec::new(), None)),
        (Some(token), None) => match hex::decode(token) {
            Ok(bytes) => Ok((bytes, None)),
            Err(_) => Ok((Vec::new(), Some(token))),
        },
        (Some(code), Some(label)) => {
            let bytes =
                hex::decode(code).map_err(|_| FormatErrorKind::InvalidHex(code.to_string()))?;
            Ok((bytes, Some(label)))
        }
    }
}

fn split(line: &str, separator: char) -> Result<(&str, &str), FormatErrorKind> {
    line.split_once(separator)
        .ok_or(FormatErrorKind::MissingSeparator(separator))
}

fn parse_address(value: &str) -> Result<u16, FormatErrorKind> {
    u16::from_str_radix(value, 16).map_err(|_| FormatErrorKind::InvalidHex(value.to_string()))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
