//! The parser collaborator that turns the cached dictionary file into a
//! [`Dictionary`].
//!
//! The loader treats the parser as an opaque capability behind the
//! [`DictionaryParser`] trait, so host applications can plug in a full mmCIF
//! implementation. [`CifParser`] is the default collaborator and reads just
//! the `_chem_comp` category the lookups need.

use std::io::BufRead;

use crate::caching::{CacheContents, CacheError};
use crate::types::{ChemComp, Dictionary};

/// Consumes the (decompressed) byte stream of a dictionary file and
/// materializes the in-memory [`Dictionary`].
pub trait DictionaryParser: Send + Sync + 'static {
    fn parse(&self, reader: &mut dyn BufRead) -> CacheContents<Dictionary>;
}

/// A minimal reader for the `_chem_comp` category of mmCIF data blocks.
///
/// Each component in `components.cif` lives in its own `data_<ID>` block with
/// single-line `_chem_comp.<field> <value>` items. Everything else in the
/// file (atom tables, bond tables, loops) is skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct CifParser;

impl DictionaryParser for CifParser {
    fn parse(&self, reader: &mut dyn BufRead) -> CacheContents<Dictionary> {
        let mut dictionary = Dictionary::default();
        let mut current: Option<ChemComp> = None;

        for line in reader.lines() {
            // Read errors at this point are more likely a corrupt (e.g.
            // truncated gzip) file than a local I/O problem.
            let line = line.map_err(|e| CacheError::Malformed(e.to_string()))?;
            let line = line.trim();

            if line.starts_with("data_") {
                flush(&mut dictionary, current.take());
                current = Some(ChemComp {
                    id: String::new(),
                    name: String::new(),
                    comp_type: String::new(),
                    formula: String::new(),
                });
            } else if let Some(item) = line.strip_prefix("_chem_comp.") {
                let Some(component) = current.as_mut() else {
                    return Err(CacheError::Malformed(
                        "chem_comp item outside of a data block".into(),
                    ));
                };

                let mut parts = item.splitn(2, char::is_whitespace);
                let key = parts.next().unwrap_or_default();
                let value = unquote(parts.next().unwrap_or_default().trim());

                match key {
                    "id" => component.id = value.to_owned(),
                    "name" => component.name = value.to_owned(),
                    "type" => component.comp_type = value.to_owned(),
                    "formula" => component.formula = value.to_owned(),
                    _ => {}
                }
            }
        }
        flush(&mut dictionary, current.take());

        if dictionary.is_empty() {
            return Err(CacheError::Malformed(
                "no chemical components found".into(),
            ));
        }

        Ok(dictionary)
    }
}

fn flush(dictionary: &mut Dictionary, component: Option<ChemComp>) {
    if let Some(component) = component
        && !component.id.is_empty()
    {
        dictionary.insert(component);
    }
}

fn unquote(value: &str) -> &str {
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}
