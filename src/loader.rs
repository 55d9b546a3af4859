//! Inventory loading
//!
//! Reads `.yaml` inventory files (an optional `general` header plus an
//! `assets` list) and hands decoded records, with their source file
//! attached, to the working set. Walks directories recursively; a path
//! that is a single file is read as-is.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::asset::RawRecord;
use crate::error::Result;
use crate::inventory::Inventory;

/// Optional `general` section of an inventory file
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralInfo {
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct InventoryFile {
    #[serde(default)]
    general: Option<GeneralInfo>,
    #[serde(default)]
    assets: Vec<RawRecord>,
}

/// One decoded record plus the file that defined it
#[derive(Debug, Clone)]
pub struct SourcedRecord {
    pub record: RawRecord,
    pub file: PathBuf,
}

/// All records decoded from one or more inventory files, in file order
#[derive(Debug, Default)]
pub struct ParsedInventory {
    pub records: Vec<SourcedRecord>,
    /// Title from the first `general` section encountered
    pub title: Option<String>,
}

impl ParsedInventory {
    fn absorb(&mut self, mut other: ParsedInventory) {
        self.records.append(&mut other.records);
        if self.title.is_none() {
            self.title = other.title;
        }
    }
}

/// Decode one inventory document. `file` is recorded as every record's
/// source location.
pub fn parse_inventory_str(
    content: &str,
    file: impl Into<PathBuf>,
) -> Result<ParsedInventory> {
    let file = file.into();
    let doc: InventoryFile = serde_yaml::from_str(content)?;
    let records = doc
        .assets
        .into_iter()
        .map(|record| SourcedRecord {
            record,
            file: file.clone(),
        })
        .collect();
    Ok(ParsedInventory {
        records,
        title: doc.general.map(|g| g.title),
    })
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Parse every inventory file under the given paths
pub fn parse_paths(paths: &[PathBuf]) -> Result<ParsedInventory> {
    let mut parsed = ParsedInventory::default();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.path().is_file() && is_yaml(entry.path()) {
                    parsed.absorb(parse_file(entry.path())?);
                }
            }
        } else {
            parsed.absorb(parse_file(path)?);
        }
    }
    info!(records = parsed.records.len(), "inventory parsed");
    Ok(parsed)
}

fn parse_file(path: &Path) -> Result<ParsedInventory> {
    debug!(file = %path.display(), "reading inventory file");
    let content = fs::read_to_string(path)?;
    parse_inventory_str(&content, path)
}

/// Load and index a full working set from the given paths
pub fn load_inventory(paths: &[PathBuf]) -> Result<Inventory> {
    Inventory::from_parsed(parse_paths(paths)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_title_and_records() {
        let parsed = parse_inventory_str(
            "
general:
  title: Office infrastructure
assets:
  - id: srv_1
    type: physical/server
  - id: srv_2
    type: physical/server
",
            "office.yaml",
        )
        .unwrap();
        assert_eq!(parsed.title.as_deref(), Some("Office infrastructure"));
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].file, PathBuf::from("office.yaml"));
    }

    #[test]
    fn test_empty_document_is_empty_inventory() {
        let parsed = parse_inventory_str("{}", "empty.yaml").unwrap();
        assert!(parsed.records.is_empty());
        assert!(parsed.title.is_none());
    }
}
