//! Asset records and dependency declarations
//!
//! One `Asset` is one inventory entry: a typed record with free-text scalar
//! fields, list fields, tags, and an ordered list of dependency
//! declarations. Records are constructed once from loader input and never
//! mutated afterward; validation results live alongside them, not on them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Canonical asset identifier (the `id` field, case-sensitive, no
/// normalization)
pub type AssetId = String;

/// Tag that removes an asset from the working set entirely
pub const ARCHIVED_TAG: &str = "archived";

/// Tag that flags an asset for attention in graph styling and reports
pub const NEEDS_WORK_TAG: &str = "needs_work";

/// Annotation token marking a declared dependency as known-incomplete
const INSUFFICIENT_TOKEN: &str = "INSUF";

/// Fields rendered as labeled groups on reports. Sequence or mapping fields
/// outside this set are retained on the record but never rendered.
/// `depends_on` is recognized but renders as the dependency table instead.
pub const LIST_FIELDS: &[&str] = &[
    "closed_issues",
    "depends_on",
    "links",
    "notes",
    "open_issues",
    "tags",
];

/// What one `depends_on` line points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyTarget {
    /// References another asset by id
    Asset(AssetId),
    /// `^pattern`: waives the requirement whose pattern text equals
    /// `pattern`; references no asset
    Waiver(String),
}

/// One parsed `depends_on` declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub target: DependencyTarget,
    /// Free text after the first token; shown on reports, never interpreted
    pub annotation: String,
    /// Annotation opens with the `INSUF` token: listed and graphed, but
    /// never satisfies a requirement
    pub insufficient: bool,
}

impl Dependency {
    /// Parse one raw `depends_on` line. The first whitespace-delimited
    /// token is the target (or a `^` waiver pattern), the remainder is
    /// commentary. Returns `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let token = parts.next().filter(|t| !t.is_empty())?;
        let annotation = parts.next().map(str::trim_start).unwrap_or("");

        let target = match token.strip_prefix('^') {
            Some(pattern) => DependencyTarget::Waiver(pattern.to_string()),
            None => DependencyTarget::Asset(token.to_string()),
        };

        let insufficient =
            annotation.split_whitespace().next() == Some(INSUFFICIENT_TOKEN);

        Some(Self {
            target,
            annotation: annotation.to_string(),
            insufficient,
        })
    }

    /// Target asset id, if this declaration references an asset
    pub fn target_id(&self) -> Option<&str> {
        match &self.target {
            DependencyTarget::Asset(id) => Some(id),
            DependencyTarget::Waiver(_) => None,
        }
    }

    /// Waiver pattern text, if this declaration is a `^` waiver
    pub fn waiver_pattern(&self) -> Option<&str> {
        match &self.target {
            DependencyTarget::Waiver(pattern) => Some(pattern),
            DependencyTarget::Asset(_) => None,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            DependencyTarget::Asset(id) => write!(f, "{}", id)?,
            DependencyTarget::Waiver(pattern) => write!(f, "^{}", pattern)?,
        }
        if !self.annotation.is_empty() {
            write!(f, " {}", self.annotation)?;
        }
        Ok(())
    }
}

/// Where an asset was defined: the `(source-file-path, asset-id)` pair used
/// for report cross-links and editor integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub asset_id: AssetId,
}

impl SourceLocation {
    /// Custom-protocol URL for jumping to the defining location in an
    /// editor
    pub fn edit_url(&self) -> String {
        format!("assetmap://{}#{}", self.file.display(), self.asset_id)
    }
}

/// One record as decoded from an inventory file, before any index checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub open_issues: Vec<String>,
    #[serde(default)]
    pub closed_issues: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// One inventory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    /// Slash-delimited category string, e.g. `container/docker`. Drives
    /// rule-table lookup. Empty when the record declared no type.
    #[serde(rename = "type")]
    pub kind: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub owner: Option<String>,
    pub location: Option<String>,
    pub depends_on: Vec<Dependency>,
    pub tags: Vec<String>,
    pub notes: Vec<String>,
    pub open_issues: Vec<String>,
    pub closed_issues: Vec<String>,
    pub links: Vec<String>,
    /// Unrecognized fields, retained but excluded from report rendering
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_yaml::Value>,
    pub source: SourceLocation,
}

impl Asset {
    /// Build an asset from a decoded record. A record without an `id` is a
    /// fatal load error.
    pub fn from_record(record: RawRecord, file: &Path) -> crate::Result<Self> {
        let id = record.id.ok_or_else(|| crate::InventoryError::MissingId {
            file: file.to_path_buf(),
        })?;

        let depends_on = record
            .depends_on
            .iter()
            .filter_map(|line| Dependency::parse(line))
            .collect();

        Ok(Self {
            source: SourceLocation {
                file: file.to_path_buf(),
                asset_id: id.clone(),
            },
            id,
            kind: record.kind.unwrap_or_default(),
            name: record.name,
            description: record.description,
            owner: record.owner,
            location: record.location,
            depends_on,
            tags: record.tags,
            notes: record.notes,
            open_issues: record.open_issues,
            closed_issues: record.closed_issues,
            links: record.links,
            extra: record.extra,
        })
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_archived(&self) -> bool {
        self.has_tag(ARCHIVED_TAG)
    }

    pub fn needs_work(&self) -> bool {
        self.has_tag(NEEDS_WORK_TAG)
    }

    /// Display label: asset name, falling back to id
    pub fn display_label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Stable per-asset page name for the external report renderer (the
    /// exporter picks the extension)
    pub fn report_stem(&self) -> String {
        self.id.split_whitespace().collect::<Vec<_>>().join("_")
    }

    /// Ids of all declarations that reference an asset (waivers excluded)
    pub fn dependency_ids(&self) -> impl Iterator<Item = &str> {
        self.depends_on.iter().filter_map(|d| d.target_id())
    }

    /// Named scalar field, recognized or extra. Non-string extra values
    /// are not scalars.
    pub fn scalar_field(&self, field: &str) -> Option<&str> {
        match field {
            "name" => self.name.as_deref(),
            "description" => self.description.as_deref(),
            "owner" => self.owner.as_deref(),
            "location" => self.location.as_deref(),
            "type" => (!self.kind.is_empty()).then_some(self.kind.as_str()),
            _ => self.extra.get(field).and_then(|v| v.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_dependency() {
        let dep = Dependency::parse("srv_web01").unwrap();
        assert_eq!(dep.target, DependencyTarget::Asset("srv_web01".into()));
        assert_eq!(dep.annotation, "");
        assert!(!dep.insufficient);
    }

    #[test]
    fn test_parse_annotation() {
        let dep = Dependency::parse("srv_web01  primary host").unwrap();
        assert_eq!(dep.target_id(), Some("srv_web01"));
        assert_eq!(dep.annotation, "primary host");
        assert!(!dep.insufficient);
    }

    #[test]
    fn test_parse_insufficient_token() {
        let dep = Dependency::parse("db_main INSUF replica missing").unwrap();
        assert!(dep.insufficient);
        assert_eq!(dep.annotation, "INSUF replica missing");
    }

    #[test]
    fn test_insufficient_must_be_exact_first_token() {
        // a longer word containing the token does not count
        let dep = Dependency::parse("db_main INSUFFICIENT").unwrap();
        assert!(!dep.insufficient);
        // nor does the token later in the annotation
        let dep = Dependency::parse("db_main see INSUF note").unwrap();
        assert!(!dep.insufficient);
    }

    #[test]
    fn test_parse_waiver() {
        let dep = Dependency::parse("^storage/.* local only").unwrap();
        assert_eq!(dep.waiver_pattern(), Some("storage/.*"));
        assert_eq!(dep.target_id(), None);
        assert_eq!(dep.annotation, "local only");
    }

    #[test]
    fn test_parse_blank_line() {
        assert!(Dependency::parse("   ").is_none());
    }

    #[test]
    fn test_label_falls_back_to_id() {
        let record = RawRecord {
            id: Some("srv_1".into()),
            ..serde_yaml::from_str("{}").unwrap()
        };
        let asset = Asset::from_record(record, Path::new("a.yaml")).unwrap();
        assert_eq!(asset.display_label(), "srv_1");
    }

    #[test]
    fn test_missing_id_is_load_error() {
        let record: RawRecord = serde_yaml::from_str("name: Orphan").unwrap();
        let err = Asset::from_record(record, Path::new("a.yaml")).unwrap_err();
        assert!(matches!(err, crate::InventoryError::MissingId { .. }));
    }

    #[test]
    fn test_extra_fields_retained() {
        let record: RawRecord = serde_yaml::from_str(
            "id: srv_1\ntype: physical/server\nrack: B12\nports: [22, 443]",
        )
        .unwrap();
        let asset = Asset::from_record(record, Path::new("a.yaml")).unwrap();
        assert!(asset.extra.contains_key("rack"));
        assert!(asset.extra.contains_key("ports"));
    }

    #[test]
    fn test_edit_url() {
        let loc = SourceLocation {
            file: PathBuf::from("inventory/servers.yaml"),
            asset_id: "srv_1".into(),
        };
        assert_eq!(loc.edit_url(), "assetmap://inventory/servers.yaml#srv_1");
    }
}
