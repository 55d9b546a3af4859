//! Dependency resolver
//!
//! Evaluates every rule-table requirement against an asset's declared
//! dependencies, applying waiver and insufficiency semantics, and produces
//! one immutable `ValidationResult` per asset. Per-asset problems never
//! abort a run; they accumulate here and surface through graph styling and
//! report content.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::asset::{Asset, AssetId, DependencyTarget};
use crate::inventory::Inventory;
use crate::rules::RuleTable;

/// Outcome of checking one requirement against an asset's declarations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementStatus {
    /// Some resolved, non-insufficient dependency's type matches
    Satisfied,
    /// A `^` waiver names exactly this pattern: no error, not satisfied
    /// either
    Waived,
    /// Nothing satisfies it; a missing-dependency error was recorded
    Unmet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementOutcome {
    pub pattern: String,
    pub status: RequirementStatus,
}

/// Errors that make an asset invalid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// A `depends_on` target id does not exist among non-archived assets
    UnresolvedReference { target: AssetId },
    /// A required dependency category has no satisfying, non-insufficient,
    /// non-waived declaration
    MissingDependency { requirement: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedReference { target } => {
                write!(f, "Depends on undefined asset id={}", target)
            }
            Self::MissingDependency { requirement } => {
                write!(f, "Missing required '{}' dependency", requirement)
            }
        }
    }
}

/// Advisory data-quality notes; never affect validity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    UnknownType { declared: String },
    UnknownIdPrefix,
    MissingField { field: String },
    HasOpenIssues,
    TaggedNeedsWork,
    NoDependents,
    NoDependencies,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType { declared } => {
                write!(f, "Has unknown type '{}'", declared)
            }
            Self::UnknownIdPrefix => write!(f, "Has unknown id prefix"),
            Self::MissingField { field } => {
                write!(f, "Definition missing '{}' field", field)
            }
            Self::HasOpenIssues => write!(f, "Has open issues"),
            Self::TaggedNeedsWork => write!(f, "Has 'needs_work' tag"),
            Self::NoDependents => {
                write!(f, "Non-top-level asset has no dependents")
            }
            Self::NoDependencies => {
                write!(f, "Non-bottom-level asset has no dependencies")
            }
        }
    }
}

/// The immutable validation outcome for one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub asset_id: AssetId,
    /// Ordered: unresolved-reference errors first, then missing-dependency
    /// errors in requirement order
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub requirements: Vec<RequirementOutcome>,
}

impl ValidationResult {
    /// Valid iff zero unresolved references and zero unmet requirements
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Evaluates assets against a rule table
pub struct Resolver<'a> {
    rules: &'a RuleTable,
    prefixes: HashSet<&'a str>,
}

impl<'a> Resolver<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self {
            prefixes: rules.known_prefixes().into_iter().collect(),
            rules,
        }
    }

    /// Validate one asset against the working set. `inventory` is the
    /// id-indexed collection of all non-archived assets; `dependents` maps
    /// each id to the ids that declare a dependency on it.
    pub fn validate(
        &self,
        asset: &Asset,
        inventory: &Inventory,
        dependents: &HashMap<AssetId, Vec<AssetId>>,
    ) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // Partition declarations: resolved non-insufficient targets can
        // satisfy requirements, waivers collect their patterns, and every
        // unresolved reference is one error. Insufficient declarations are
        // resolved for reporting but satisfy nothing.
        let mut satisfying: Vec<&Asset> = Vec::new();
        let mut waivers: Vec<&str> = Vec::new();
        for dep in &asset.depends_on {
            match &dep.target {
                DependencyTarget::Waiver(pattern) => waivers.push(pattern),
                DependencyTarget::Asset(id) => match inventory.get(id) {
                    Some(target) if !dep.insufficient => {
                        satisfying.push(target)
                    }
                    Some(_) => {}
                    None => errors.push(ValidationError::UnresolvedReference {
                        target: id.clone(),
                    }),
                },
            }
        }

        let rule = self.rules.lookup(&asset.kind);

        let mut requirements = Vec::new();
        for req in rule.map(|r| r.requires.as_slice()).unwrap_or(&[]) {
            // Waiver matching is textual: the waiver's pattern must equal
            // the requirement's pattern, not merely overlap it.
            let status = if waivers.iter().any(|w| *w == req.pattern()) {
                RequirementStatus::Waived
            } else if satisfying.iter().any(|t| req.matches_type(&t.kind)) {
                RequirementStatus::Satisfied
            } else {
                errors.push(ValidationError::MissingDependency {
                    requirement: req.pattern().to_string(),
                });
                RequirementStatus::Unmet
            };
            requirements.push(RequirementOutcome {
                pattern: req.pattern().to_string(),
                status,
            });
        }

        match rule {
            None => warnings.push(ValidationWarning::UnknownType {
                declared: asset.kind.clone(),
            }),
            Some(rule) => {
                for field in &rule.fields {
                    let empty = asset
                        .scalar_field(field)
                        .map_or(true, |v| v.is_empty());
                    if empty {
                        warnings.push(ValidationWarning::MissingField {
                            field: field.clone(),
                        });
                    }
                }
                let has_dependents = dependents
                    .get(&asset.id)
                    .map_or(false, |d| !d.is_empty());
                if !rule.is_top() && !has_dependents {
                    warnings.push(ValidationWarning::NoDependents);
                }
                if !rule.is_bottom() && asset.depends_on.is_empty() {
                    warnings.push(ValidationWarning::NoDependencies);
                }
            }
        }

        let prefix = asset.id.split('_').next().unwrap_or("");
        if !self.prefixes.contains(prefix) {
            warnings.push(ValidationWarning::UnknownIdPrefix);
        }
        if !asset.open_issues.is_empty() {
            warnings.push(ValidationWarning::HasOpenIssues);
        }
        if asset.needs_work() {
            warnings.push(ValidationWarning::TaggedNeedsWork);
        }

        ValidationResult {
            asset_id: asset.id.clone(),
            errors,
            warnings,
            requirements,
        }
    }
}

/// Validation results for a whole working set, in inventory order
#[derive(Debug, Clone)]
pub struct ValidationReport {
    results: Vec<ValidationResult>,
    by_id: HashMap<AssetId, usize>,
}

impl ValidationReport {
    pub fn new(results: Vec<ValidationResult>) -> Self {
        let by_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.asset_id.clone(), i))
            .collect();
        Self { results, by_id }
    }

    pub fn get(&self, id: &str) -> Option<&ValidationResult> {
        self.by_id.get(id).map(|&i| &self.results[i])
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter()
    }

    pub fn invalid_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_valid()).count()
    }

    pub fn error_count(&self) -> usize {
        self.results.iter().map(|r| r.errors.len()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.results.iter().map(|r| r.warnings.len()).sum()
    }

    pub fn is_all_valid(&self) -> bool {
        self.results.iter().all(|r| r.is_valid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Inventory;
    use crate::loader::parse_inventory_str;

    fn validate_one(yaml: &str, id: &str) -> ValidationResult {
        let inventory = inventory(yaml);
        let rules = RuleTable::builtin();
        inventory.validate(&rules).get(id).unwrap().clone()
    }

    fn inventory(yaml: &str) -> Inventory {
        let records = parse_inventory_str(yaml, "test.yaml").unwrap();
        Inventory::from_records(records.records).unwrap()
    }

    const CONTAINER_STACK: &str = "
assets:
  - id: srv_host
    type: physical/server
    name: Host
  - id: dply_img
    type: resource/deployment
    name: Dockerfile
    location: git
  - id: con_app
    type: container/docker
    name: App Container
    depends_on:
      - srv_host
      - dply_img
      - '^storage/.*'
";

    #[test]
    fn test_waived_container_is_valid() {
        let result = validate_one(CONTAINER_STACK, "con_app");
        assert!(result.is_valid(), "errors: {:?}", result.errors);
        let statuses: Vec<_> =
            result.requirements.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                RequirementStatus::Satisfied,
                RequirementStatus::Satisfied,
                RequirementStatus::Waived,
            ]
        );
    }

    #[test]
    fn test_missing_storage_requirement() {
        let yaml = "
assets:
  - id: srv_host
    type: physical/server
  - id: dply_img
    type: resource/deployment
    location: git
  - id: con_app
    type: container/docker
    depends_on: [srv_host, dply_img]
";
        let result = validate_one(yaml, "con_app");
        assert!(!result.is_valid());
        assert_eq!(
            result.errors,
            vec![ValidationError::MissingDependency {
                requirement: "storage/.*".into()
            }]
        );
    }

    #[test]
    fn test_insufficient_never_satisfies() {
        let yaml = "
assets:
  - id: dply_src
    type: resource/deployment
    location: git
  - id: csvc_db
    type: cloud/service
    location: eu-west
    depends_on:
      - dply_src INSUF migrating to terraform
";
        let result = validate_one(yaml, "csvc_db");
        assert!(!result.is_valid());
        assert_eq!(
            result.errors,
            vec![ValidationError::MissingDependency {
                requirement: "resource/deployment".into()
            }]
        );
        assert_eq!(result.requirements[0].status, RequirementStatus::Unmet);
    }

    #[test]
    fn test_unresolved_reference() {
        let yaml = "
assets:
  - id: srv_a
    type: physical/server
    depends_on: [ghost_id]
";
        let result = validate_one(yaml, "srv_a");
        assert_eq!(
            result.errors,
            vec![ValidationError::UnresolvedReference {
                target: "ghost_id".into()
            }]
        );
    }

    #[test]
    fn test_unmatched_type_never_missing_dependency() {
        let yaml = "
assets:
  - id: x_unknown
    type: quantum/mainframe
    depends_on: [ghost_id]
";
        let result = validate_one(yaml, "x_unknown");
        assert!(result.requirements.is_empty());
        assert!(result
            .errors
            .iter()
            .all(|e| matches!(e, ValidationError::UnresolvedReference { .. })));
        assert!(result
            .warnings
            .contains(&ValidationWarning::UnknownType {
                declared: "quantum/mainframe".into()
            }));
    }

    #[test]
    fn test_inert_waiver_is_not_an_error() {
        let yaml = "
assets:
  - id: srv_a
    type: physical/server
    depends_on:
      - '^nonexistent/category'
";
        let result = validate_one(yaml, "srv_a");
        assert!(result.is_valid());
    }

    #[test]
    fn test_one_dependency_satisfies_multiple_requirements() {
        // vm/virtualbox requires physical/server and storage/.*; a target
        // typed to match both patterns satisfies both at once
        let rules = RuleTable::from_toml_str(
            r#"
            [[rule]]
            type = "^app$"
            prefix = "app"
            requires = ["server", "storage"]
            "#,
        )
        .unwrap();
        let inventory = inventory(
            "
assets:
  - id: both_1
    type: server/storage
  - id: app_1
    type: app
    depends_on: [both_1]
",
        );
        let report = inventory.validate(&rules);
        let result = report.get("app_1").unwrap();
        assert!(result.is_valid(), "errors: {:?}", result.errors);
    }

    #[test]
    fn test_waiver_match_is_textual_not_semantic() {
        // "storage/local" would be accepted by the requirement pattern
        // "storage/.*" as a type, but as a waiver it must equal the
        // pattern text to waive anything
        let yaml = "
assets:
  - id: srv_host
    type: physical/server
  - id: dply_img
    type: resource/deployment
    location: git
  - id: con_app
    type: container/docker
    depends_on:
      - srv_host
      - dply_img
      - '^storage/local'
";
        let result = validate_one(yaml, "con_app");
        assert!(!result.is_valid());
        assert_eq!(
            result.errors,
            vec![ValidationError::MissingDependency {
                requirement: "storage/.*".into()
            }]
        );
    }

    #[test]
    fn test_advisory_warnings_do_not_invalidate() {
        let yaml = "
assets:
  - id: weird_prefix
    type: physical/server
    tags: [needs_work]
    open_issues:
      - replace PSU
";
        let result = validate_one(yaml, "weird_prefix");
        assert!(result.is_valid());
        assert!(result.warnings.contains(&ValidationWarning::UnknownIdPrefix));
        assert!(result.warnings.contains(&ValidationWarning::HasOpenIssues));
        assert!(result.warnings.contains(&ValidationWarning::TaggedNeedsWork));
    }

    #[test]
    fn test_missing_recommended_field_warns() {
        let yaml = "
assets:
  - id: sto_nas
    type: storage/local
    depends_on: ['^backup', '^drive']
";
        let result = validate_one(yaml, "sto_nas");
        assert!(result.is_valid());
        assert!(result.warnings.contains(&ValidationWarning::MissingField {
            field: "location".into()
        }));
    }
}
