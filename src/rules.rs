//! Dependency rule table
//!
//! Static policy mapping asset-type patterns to the dependency categories
//! assets of that type must declare. The table is ordered data, not
//! behavior: lookup walks the rules in declared order and the first
//! type-pattern that matches wins. A type matching no rule has no required
//! dependencies.
//!
//! A builtin table covers the standard asset types; `RuleTable::from_path`
//! loads a replacement from TOML so the policy is extensible without
//! touching resolver logic.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

/// Rule tag marking a type as top-level (applications etc.); top-level
/// assets are not expected to have dependents
pub const TOP_TAG: &str = "top";

/// Rule tag marking a type as bottom-level (hardware etc.); bottom-level
/// assets are not expected to declare dependencies
pub const BOTTOM_TAG: &str = "bottom";

/// One required dependency category: a pattern over asset `type` strings
/// that at least one resolved, non-insufficient declaration must match
#[derive(Debug, Clone)]
pub struct Requirement {
    pattern: String,
    regex: Regex,
}

impl Requirement {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern).map_err(|source| {
            InventoryError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// The pattern text, as declared. Waiver matching compares against
    /// this text, not against what the pattern would accept.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Unanchored search over an asset type string
    pub fn matches_type(&self, kind: &str) -> bool {
        self.regex.is_match(kind)
    }
}

/// Policy for one asset-type pattern
#[derive(Debug, Clone)]
pub struct TypeRule {
    /// Pattern matched against asset `type` strings (unanchored search)
    pub type_pattern: String,
    regex: Regex,
    pub description: String,
    /// GraphViz attribute fragment for nodes of this type
    pub style: String,
    /// Conventional id prefix for assets of this type
    pub prefix: String,
    /// Dependency categories assets of this type must declare
    pub requires: Vec<Requirement>,
    /// Scalar fields assets of this type should carry (advisory)
    pub fields: Vec<String>,
    /// Level markers: `top`, `bottom`
    pub tags: Vec<String>,
}

impl TypeRule {
    pub fn matches(&self, kind: &str) -> bool {
        self.regex.is_match(kind)
    }

    pub fn is_top(&self) -> bool {
        self.tags.iter().any(|t| t == TOP_TAG)
    }

    pub fn is_bottom(&self) -> bool {
        self.tags.iter().any(|t| t == BOTTOM_TAG)
    }
}

/// Serialized form of one `[[rule]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleDoc {
    #[serde(rename = "type")]
    type_pattern: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    style: String,
    #[serde(default)]
    prefix: String,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RuleTableDoc {
    #[serde(default, rename = "rule")]
    rules: Vec<RuleDoc>,
}

/// The ordered rule table
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<TypeRule>,
}

impl RuleTable {
    /// First rule whose type-pattern matches, or `None`: assets with
    /// unrecognized types have no required dependencies
    pub fn lookup(&self, kind: &str) -> Option<&TypeRule> {
        self.rules.iter().find(|r| r.matches(kind))
    }

    /// Requirement list for an asset type (empty when no rule matches)
    pub fn requirements_for(&self, kind: &str) -> &[Requirement] {
        self.lookup(kind).map(|r| r.requires.as_slice()).unwrap_or(&[])
    }

    pub fn rules(&self) -> &[TypeRule] {
        &self.rules
    }

    /// All conventional id prefixes declared by the table
    pub fn known_prefixes(&self) -> Vec<&str> {
        self.rules
            .iter()
            .map(|r| r.prefix.as_str())
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// Load a rule table from a TOML document of `[[rule]]` entries
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let doc: RuleTableDoc = toml::from_str(content)?;
        let mut rules = Vec::with_capacity(doc.rules.len());
        for raw in doc.rules {
            let regex = Regex::new(&raw.type_pattern).map_err(|source| {
                InventoryError::InvalidPattern {
                    pattern: raw.type_pattern.clone(),
                    source,
                }
            })?;
            let requires = raw
                .requires
                .iter()
                .map(|p| Requirement::new(p))
                .collect::<Result<Vec<_>>>()?;
            rules.push(TypeRule {
                type_pattern: raw.type_pattern,
                regex,
                description: raw.description,
                style: raw.style,
                prefix: raw.prefix,
                requires,
                fields: raw.fields,
                tags: raw.tags,
            });
        }
        Ok(Self { rules })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// The builtin policy table for the standard asset types. Patterns are
    /// anchored so each rule matches exactly one type.
    pub fn builtin() -> Self {
        let rules = vec![
            rule(
                "^application/external$",
                "\"Terminal\" asset type, that users use",
                "shape=oval, width=1.5, rank=max",
                "app",
                &[
                    "(cloud/service|container/.*|vm/virtualbox|\
                     physical/server/service$|website/static)",
                ],
                &["location", "owner"],
                &[TOP_TAG],
            ),
            rule(
                "^application/internal$",
                "\"Terminal\" asset type, that users use",
                "shape=oval, width=1.5, rank=max, peripheries=2",
                "app",
                &[
                    "(cloud/service|container/.*|vm/virtualbox|\
                     physical/server/service$|website/static)",
                ],
                &["location", "owner"],
                &[TOP_TAG],
            ),
            rule(
                "^backup$",
                "A backup solution",
                "shape=component, width=1.5",
                "bak",
                &[],
                &["location"],
                &[],
            ),
            rule(
                "^cloud/service$",
                "A service (web-server, RDMS) running in the cloud",
                "shape=polygon, width=1.25, sides=9",
                "csvc",
                &["resource/deployment"],
                &["location"],
                &[],
            ),
            rule(
                "^container/docker$",
                "A docker container (image instance)",
                "shape=\"box3d\", width=1.5",
                "con",
                &[
                    "resource/deployment",
                    "(physical/server|cloud/service)",
                    "storage/.*",
                ],
                &[],
                &[],
            ),
            rule(
                "^database$",
                "A database on a server",
                "shape=house",
                "db",
                &[
                    "(cloud/service|container/.*|vm/virtualbox|\
                     physical/server/service$)",
                    "backup",
                ],
                &[],
                &[],
            ),
            rule(
                "^drive$",
                "A physical drive",
                "shape=cylinder, width=1.25",
                "drv",
                &["physical/server"],
                &["location", "size"],
                &[],
            ),
            rule(
                "^physical/server$",
                "A real physical server",
                "shape=box, width=1",
                "srv",
                &[],
                &[],
                &[BOTTOM_TAG],
            ),
            rule(
                "^physical/server/service$",
                "A service (Django, web app. etc.) running directly on a \
                 physical server",
                "shape=pentagon, width=1.25",
                "psvc",
                &["physical/server", "resource/deployment", "storage/.*"],
                &[],
                &[],
            ),
            rule(
                "^physical/server/service/infrastructure$",
                "A service (web-server, RDMS) running directly on a \
                 physical server",
                "shape=octagon, width=1.25",
                "psvc",
                &["physical/server", "resource/deployment", "storage/.*"],
                &[],
                &[],
            ),
            rule(
                "^resource/deployment$",
                "The source / deployment resource for an asset, e.g. the \
                 Dockerfile for a Docker image",
                "shape=note, width=1.5",
                "dply",
                &[],
                &["location"],
                &[BOTTOM_TAG],
            ),
            rule(
                "^storage/local$",
                "A local storage solution, requires backup",
                "shape=folder,width=1.5",
                "sto",
                &["backup", "drive"],
                &["location"],
                &[],
            ),
            rule(
                "^vm/virtualbox$",
                "A VirtualBox VM",
                "shape=box, peripheries=\"2\", width=1.4",
                "vbx",
                &["physical/server", "storage/.*"],
                &[],
                &[],
            ),
            rule(
                "^website/static$",
                "A static website, may include javascript",
                "shape=tab,width=1",
                "wss",
                &["resource/deployment", "storage/.*", "physical/server/service"],
                &["location"],
                &[],
            ),
        ];
        Self { rules }
    }
}

/// Builtin-table constructor; all patterns are static and known-good
fn rule(
    type_pattern: &str,
    description: &str,
    style: &str,
    prefix: &str,
    requires: &[&str],
    fields: &[&str],
    tags: &[&str],
) -> TypeRule {
    TypeRule {
        type_pattern: type_pattern.to_string(),
        regex: Regex::new(type_pattern).unwrap(),
        description: description.to_string(),
        style: style.to_string(),
        prefix: prefix.to_string(),
        requires: requires
            .iter()
            .map(|p| Requirement::new(p).unwrap())
            .collect(),
        fields: fields.iter().map(|s| s.to_string()).collect(),
        tags: tags.iter().map(|s| s.to_string()).collect(),
    }
}
