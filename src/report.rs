//! Report data builder
//!
//! Flattens a validated asset into display-ready data for the external
//! page renderer: ordered field rows, the dependency table, validation
//! errors and warnings, and the source-location pointer for editor links.
//! No markup is produced here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::asset::{Asset, AssetId, SourceLocation, LIST_FIELDS};
use crate::inventory::Inventory;
use crate::resolver::{RequirementOutcome, ValidationReport, ValidationResult};

/// A field's rendering kind and value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReportValue {
    /// Label/value pair
    Scalar(String),
    /// Labeled group header followed by one line per element
    List(Vec<String>),
}

/// One ordered row of the flattened field list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportField {
    pub label: String,
    #[serde(flatten)]
    pub value: ReportValue,
}

/// One row of the rendered dependency table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRow {
    /// Target id, or `^pattern` for waivers
    pub target: String,
    pub annotation: String,
    pub insufficient: bool,
    /// True when the target id exists in the working set
    pub resolved: bool,
    pub waiver: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
    /// Report stem of the target, for cross-links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_report: Option<String>,
}

/// Everything the external renderer needs for one asset's page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetReport {
    pub id: AssetId,
    pub label: String,
    pub report_stem: String,
    pub source: SourceLocation,
    pub edit_url: String,
    pub valid: bool,
    pub archived: bool,
    pub fields: Vec<ReportField>,
    pub dependencies: Vec<DependencyRow>,
    /// Ids of assets that declare a dependency on this one
    pub dependents: Vec<AssetId>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub requirements: Vec<RequirementOutcome>,
}

/// Flatten an asset into ordered (label, kind, value) rows. Scalars come
/// first (empty ones omitted), then the recognized list fields in a fixed
/// order; unrecognized sequence and mapping fields are dropped.
/// `depends_on` is recognized but rendered as the dependency table.
pub fn flatten(asset: &Asset) -> Vec<ReportField> {
    let mut fields = Vec::new();

    let mut scalar = |label: &str, value: Option<&str>| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            fields.push(ReportField {
                label: label.to_string(),
                value: ReportValue::Scalar(value.to_string()),
            });
        }
    };

    scalar("name", asset.name.as_deref());
    scalar("type", Some(asset.kind.as_str()));
    scalar("owner", asset.owner.as_deref());
    scalar("location", asset.location.as_deref());
    scalar("description", asset.description.as_deref());
    for (key, value) in &asset.extra {
        scalar(key, value.as_str());
    }

    for field in LIST_FIELDS {
        if *field == "depends_on" {
            continue;
        }
        let items = match *field {
            "closed_issues" => &asset.closed_issues,
            "links" => &asset.links,
            "notes" => &asset.notes,
            "open_issues" => &asset.open_issues,
            "tags" => &asset.tags,
            _ => continue,
        };
        if !items.is_empty() {
            fields.push(ReportField {
                label: field.to_string(),
                value: ReportValue::List(items.clone()),
            });
        }
    }

    fields
}

/// The dependency table for one asset: every declaration, resolved or
/// not, insufficient included, with waivers marked
pub fn dependency_table(asset: &Asset, inventory: &Inventory) -> Vec<DependencyRow> {
    asset
        .depends_on
        .iter()
        .map(|dep| match dep.target_id() {
            Some(id) => {
                let target = inventory.get(id);
                DependencyRow {
                    target: id.to_string(),
                    annotation: dep.annotation.clone(),
                    insufficient: dep.insufficient,
                    resolved: target.is_some(),
                    waiver: false,
                    target_type: target.map(|t| t.kind.clone()),
                    target_report: target.map(|t| t.report_stem()),
                }
            }
            None => DependencyRow {
                target: format!("^{}", dep.waiver_pattern().unwrap_or("")),
                annotation: dep.annotation.clone(),
                insufficient: dep.insufficient,
                resolved: false,
                waiver: true,
                target_type: None,
                target_report: None,
            },
        })
        .collect()
}

fn build_one(
    asset: &Asset,
    inventory: &Inventory,
    result: Option<&ValidationResult>,
    dependents: &HashMap<AssetId, Vec<AssetId>>,
) -> AssetReport {
    let mut direct: Vec<AssetId> =
        dependents.get(&asset.id).cloned().unwrap_or_default();
    direct.sort();

    AssetReport {
        id: asset.id.clone(),
        label: asset.display_label().to_string(),
        report_stem: asset.report_stem(),
        source: asset.source.clone(),
        edit_url: asset.source.edit_url(),
        valid: result.map_or(true, |r| r.is_valid()),
        archived: asset.is_archived(),
        fields: flatten(asset),
        dependencies: dependency_table(asset, inventory),
        dependents: direct,
        errors: result
            .map(|r| r.errors.iter().map(ToString::to_string).collect())
            .unwrap_or_default(),
        warnings: result
            .map(|r| r.warnings.iter().map(ToString::to_string).collect())
            .unwrap_or_default(),
        requirements: result.map(|r| r.requirements.clone()).unwrap_or_default(),
    }
}

/// Report documents for the whole snapshot, working set first, archived
/// listings after (archived assets are never validated; their documents
/// carry record data only)
pub fn build_reports(
    inventory: &Inventory,
    report: &ValidationReport,
) -> Vec<AssetReport> {
    let dependents = inventory.dependents();
    let mut documents: Vec<AssetReport> = inventory
        .assets()
        .iter()
        .map(|asset| {
            build_one(asset, inventory, report.get(&asset.id), &dependents)
        })
        .collect();
    documents.extend(
        inventory
            .archived()
            .iter()
            .map(|asset| build_one(asset, inventory, None, &dependents)),
    );
    documents
}
