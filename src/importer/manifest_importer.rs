// ==========================================
// ITS Stock Ledger - cargo manifest importer
// ==========================================
// Maps manifest rows to NewCargoLine values.
// Header matching ignores case, surrounding blanks and French accents.
// ==========================================

use crate::domain::shipment::NewCargoLine;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{RawRecord, UniversalFileParser};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const PRODUCT_ALIASES: &[&str] = &["produit", "product", "product_reference"];
const QUANTITY_ALIASES: &[&str] = &["quantite", "quantity", "declared_quantity"];
const UNIT_ALIASES: &[&str] = &["unite", "unit"];
const ORIGIN_ALIASES: &[&str] = &["origine", "origin"];

/// Canonical form of a header: lowercase, accents folded, blanks and
/// dashes turned into underscores
pub fn normalize_header(raw: &str) -> String {
    raw
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            ' ' | '-' => '_',
            other => other,
        })
        .collect()
}

/// Parse a quantity cell: accepts a decimal comma and digit-group spaces
fn parse_quantity(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok()
}

// ==========================================
// ManifestImporter
// ==========================================
pub struct ManifestImporter {
    parser: UniversalFileParser,
}

impl Default for ManifestImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestImporter {
    pub fn new() -> Self {
        Self {
            parser: UniversalFileParser,
        }
    }

    /// Read a manifest file into cargo lines (nothing is persisted)
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> ImportResult<Vec<NewCargoLine>> {
        let path = path.as_ref();
        let records = self.parser.parse(path)?;
        debug!(path = %path.display(), rows = records.len(), "manifest rows read");

        let lines = self.map_records(&records)?;
        info!(path = %path.display(), cargo_lines = lines.len(), "manifest parsed");
        Ok(lines)
    }

    /// Map raw rows to cargo lines
    ///
    /// # Errors
    /// - `MissingColumn` when no product or quantity column is found
    /// - row-level errors name the spreadsheet row (header = row 1)
    pub fn map_records(&self, records: &[RawRecord]) -> ImportResult<Vec<NewCargoLine>> {
        if records.is_empty() {
            return Err(ImportError::EmptyManifest);
        }

        let mut lines = Vec::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            let row = idx + 2;
            let fields: HashMap<String, &str> = record
                .iter()
                .map(|(k, v)| (normalize_header(k), v.as_str()))
                .collect();

            let product = lookup(&fields, PRODUCT_ALIASES)
                .ok_or_else(|| ImportError::MissingColumn("produit / product".to_string()))?;
            let quantity_raw = lookup(&fields, QUANTITY_ALIASES)
                .ok_or_else(|| ImportError::MissingColumn("quantite / quantity".to_string()))?;

            let product = product.trim();
            if product.is_empty() {
                return Err(ImportError::FieldMappingError {
                    row,
                    message: "product is blank".to_string(),
                });
            }

            let quantity = parse_quantity(quantity_raw).ok_or_else(|| ImportError::TypeConversionError {
                row,
                field: "quantity".to_string(),
                message: format!("not a number: '{}'", quantity_raw),
            })?;
            if !(quantity.is_finite() && quantity > 0.0) {
                return Err(ImportError::ValueRangeError {
                    row,
                    field: "quantity".to_string(),
                    value: quantity,
                });
            }

            lines.push(NewCargoLine {
                product_reference: product.to_string(),
                declared_quantity: quantity,
                unit: non_blank(lookup(&fields, UNIT_ALIASES)),
                origin: non_blank(lookup(&fields, ORIGIN_ALIASES)),
            });
        }

        Ok(lines)
    }
}

fn lookup<'a>(fields: &HashMap<String, &'a str>, aliases: &[&str]) -> Option<&'a str> {
    aliases.iter().find_map(|alias| fields.get(*alias).copied())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
