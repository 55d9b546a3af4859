//! The working set
//!
//! All non-archived assets of one input snapshot, indexed by id. This is
//! explicit, process-scoped state for the duration of one run: the
//! resolver and the graph assembler receive it as a value, never as
//! ambient globals, so repeated runs are trivially isolated.

use std::collections::HashMap;
use std::path::PathBuf;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::asset::{Asset, AssetId};
use crate::error::{InventoryError, Result};
use crate::loader::{ParsedInventory, SourcedRecord};
use crate::resolver::{Resolver, ValidationReport};
use crate::rules::RuleTable;

/// Fuzzy-search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: AssetId,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub file: PathBuf,
    pub score: i64,
}

/// One snapshot's non-archived assets, indexed by id
#[derive(Debug, Clone)]
pub struct Inventory {
    assets: Vec<Asset>,
    archived: Vec<Asset>,
    index: HashMap<AssetId, usize>,
    title: Option<String>,
    snapshot_hash: String,
}

impl Inventory {
    /// Build the working set from decoded records. Duplicate ids anywhere
    /// in the snapshot (archived included) are fatal; archived assets are
    /// split off before indexing so they are neither validated, graphed,
    /// nor resolvable as dependency targets.
    pub fn from_parsed(parsed: ParsedInventory) -> Result<Self> {
        let snapshot_hash = hash_records(&parsed.records)?;

        let mut assets = Vec::new();
        let mut archived = Vec::new();
        let mut seen: HashMap<AssetId, PathBuf> = HashMap::new();

        for SourcedRecord { record, file } in parsed.records {
            let asset = Asset::from_record(record, &file)?;
            if let Some(first) = seen.get(&asset.id) {
                return Err(InventoryError::DuplicateId {
                    id: asset.id,
                    first: first.clone(),
                    duplicate: file,
                });
            }
            seen.insert(asset.id.clone(), file);
            if asset.is_archived() {
                archived.push(asset);
            } else {
                assets.push(asset);
            }
        }

        let index = assets
            .iter()
            .enumerate()
            .map(|(i, a)| (a.id.clone(), i))
            .collect();

        Ok(Self {
            assets,
            archived,
            index,
            title: parsed.title,
            snapshot_hash,
        })
    }

    pub fn from_records(records: Vec<SourcedRecord>) -> Result<Self> {
        Self::from_parsed(ParsedInventory {
            records,
            title: None,
        })
    }

    /// Non-archived asset by id
    pub fn get(&self, id: &str) -> Option<&Asset> {
        self.index.get(id).map(|&i| &self.assets[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Non-archived assets, in load order
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn archived(&self) -> &[Asset] {
        &self.archived
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// SHA-256 over the canonicalized record stream; identical snapshots
    /// hash identically
    pub fn snapshot_hash(&self) -> &str {
        &self.snapshot_hash
    }

    /// Map from target id to the ids that declare a dependency on it.
    /// Insufficient declarations count; waivers reference nothing.
    pub fn dependents(&self) -> HashMap<AssetId, Vec<AssetId>> {
        let mut map: HashMap<AssetId, Vec<AssetId>> = HashMap::new();
        for asset in &self.assets {
            for target in asset.dependency_ids() {
                map.entry(target.to_string())
                    .or_default()
                    .push(asset.id.clone());
            }
        }
        map
    }

    /// Validate every non-archived asset against the rule table
    pub fn validate(&self, rules: &RuleTable) -> ValidationReport {
        let resolver = Resolver::new(rules);
        let dependents = self.dependents();
        let results = self
            .assets
            .iter()
            .map(|asset| resolver.validate(asset, self, &dependents))
            .collect();
        ValidationReport::new(results)
    }

    /// Fuzzy-search assets by name or id
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let matcher = SkimMatcherV2::default();
        let mut hits: Vec<(i64, &Asset)> = self
            .assets
            .iter()
            .filter_map(|asset| {
                let name_score = asset
                    .name
                    .as_deref()
                    .and_then(|n| matcher.fuzzy_match(n, query));
                let id_score = matcher.fuzzy_match(&asset.id, query);
                name_score.max(id_score).map(|score| (score, asset))
            })
            .collect();

        hits.sort_by(|a, b| b.0.cmp(&a.0));

        hits.into_iter()
            .take(limit)
            .map(|(score, asset)| SearchResult {
                id: asset.id.clone(),
                name: asset.name.clone(),
                kind: asset.kind.clone(),
                file: asset.source.file.clone(),
                score,
            })
            .collect()
    }
}

/// Canonical digest of the record stream, for snapshot identity
fn hash_records(records: &[SourcedRecord]) -> Result<String> {
    let mut hasher = Sha256::new();
    for sourced in records {
        hasher.update(serde_json::to_string(&sourced.record)?.as_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_inventory_str;

    fn parse(yaml: &str, file: &str) -> ParsedInventory {
        parse_inventory_str(yaml, file).unwrap()
    }

    #[test]
    fn test_duplicate_id_is_fatal() {
        let mut parsed = parse("assets: [{id: srv_1}]", "a.yaml");
        parsed
            .records
            .extend(parse("assets: [{id: srv_1}]", "b.yaml").records);
        let err = Inventory::from_parsed(parsed).unwrap_err();
        match err {
            InventoryError::DuplicateId { id, first, duplicate } => {
                assert_eq!(id, "srv_1");
                assert_eq!(first, PathBuf::from("a.yaml"));
                assert_eq!(duplicate, PathBuf::from("b.yaml"));
            }
            other => panic!("expected DuplicateId, got {other}"),
        }
    }

    #[test]
    fn test_duplicate_detection_covers_archived() {
        let parsed = parse(
            "
assets:
  - id: srv_1
    tags: [archived]
  - id: srv_1
",
            "a.yaml",
        );
        assert!(Inventory::from_parsed(parsed).is_err());
    }

    #[test]
    fn test_archived_excluded_from_working_set() {
        let parsed = parse(
            "
assets:
  - id: srv_old
    type: physical/server
    tags: [archived]
  - id: srv_new
    type: physical/server
",
            "a.yaml",
        );
        let inventory = Inventory::from_parsed(parsed).unwrap();
        assert_eq!(inventory.len(), 1);
        assert!(inventory.get("srv_old").is_none());
        assert_eq!(inventory.archived().len(), 1);
    }

    #[test]
    fn test_archived_target_is_unresolved() {
        let parsed = parse(
            "
assets:
  - id: srv_old
    type: physical/server
    tags: [archived]
  - id: vbx_vm
    type: vm/virtualbox
    depends_on: [srv_old]
",
            "a.yaml",
        );
        let inventory = Inventory::from_parsed(parsed).unwrap();
        let report = inventory.validate(&RuleTable::builtin());
        let result = report.get("vbx_vm").unwrap();
        assert!(result.errors.iter().any(|e| matches!(
            e,
            crate::resolver::ValidationError::UnresolvedReference { target }
                if target == "srv_old"
        )));
    }

    #[test]
    fn test_snapshot_hash_is_stable() {
        let yaml = "assets: [{id: srv_1, type: physical/server}]";
        let a = Inventory::from_parsed(parse(yaml, "a.yaml")).unwrap();
        let b = Inventory::from_parsed(parse(yaml, "a.yaml")).unwrap();
        assert_eq!(a.snapshot_hash(), b.snapshot_hash());

        let changed = "assets: [{id: srv_2, type: physical/server}]";
        let c = Inventory::from_parsed(parse(changed, "a.yaml")).unwrap();
        assert_ne!(a.snapshot_hash(), c.snapshot_hash());
    }

    #[test]
    fn test_dependents_map() {
        let parsed = parse(
            "
assets:
  - id: srv_1
    type: physical/server
  - id: vbx_a
    type: vm/virtualbox
    depends_on: [srv_1, '^storage/.*']
  - id: vbx_b
    type: vm/virtualbox
    depends_on:
      - srv_1 INSUF shared host
      - '^storage/.*'
",
            "a.yaml",
        );
        let inventory = Inventory::from_parsed(parsed).unwrap();
        let dependents = inventory.dependents();
        let mut of_srv = dependents.get("srv_1").cloned().unwrap();
        of_srv.sort();
        assert_eq!(of_srv, vec!["vbx_a".to_string(), "vbx_b".to_string()]);
    }

    #[test]
    fn test_search_by_name() {
        let parsed = parse(
            "
assets:
  - id: srv_1
    type: physical/server
    name: Rack server alpha
  - id: srv_2
    type: physical/server
    name: Rack server beta
",
            "a.yaml",
        );
        let inventory = Inventory::from_parsed(parsed).unwrap();
        let hits = inventory.search("alpha", 5);
        assert_eq!(hits[0].id, "srv_1");
    }
}
