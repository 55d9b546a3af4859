//! Asset dependency graph
//!
//! Directed graph over the validated working set using petgraph, with
//! HashMap id indexes for fast lookup. One node per non-archived asset,
//! one edge per resolved dependency declaration (insufficient included;
//! waivers reference no asset and produce no edge). Nodes carry the
//! annotations the external renderer needs: label, validation status,
//! styling class, tooltip lines, and the report/editor link handles.
//!
//! The assembler renders nothing itself; `dot` turns the abstract graph
//! into GraphViz text for the external layout tool.

pub mod dot;

pub use dot::Theme;

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::asset::{Asset, AssetId, SourceLocation, LIST_FIELDS};
use crate::error::{InventoryError, Result};
use crate::inventory::Inventory;
use crate::resolver::{ValidationReport, ValidationResult};
use crate::rules::RuleTable;

/// Node styling class. Invalid status visually dominates `needs_work`,
/// which dominates the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleClass {
    Invalid,
    NeedsWork,
    Ok,
}

/// One fully-annotated graph node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: AssetId,
    /// Asset name, falling back to id
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub valid: bool,
    /// Display-ready error lines for tooltip / hover
    pub errors: Vec<String>,
    pub style_class: StyleClass,
    /// Per-type GraphViz attribute fragment from the rule table
    pub type_style: String,
    pub tooltip: Vec<String>,
    /// Report page stem for the external page renderer
    pub report_stem: String,
    pub edit_url: String,
    pub source: SourceLocation,
}

/// One resolved dependency declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub insufficient: bool,
}

/// The assembled, annotated dependency graph
pub struct AssetGraph {
    /// Edges run dependency target -> declaring asset, the map-rendering
    /// convention ("supports" direction)
    graph: DiGraph<AssetId, DependencyEdge>,
    nodes: HashMap<AssetId, GraphNode>,
    node_indices: HashMap<AssetId, NodeIndex>,
    title: Option<String>,
}

impl AssetGraph {
    /// Assemble the graph for a validated working set
    pub fn build(
        inventory: &Inventory,
        report: &ValidationReport,
        rules: &RuleTable,
    ) -> Self {
        let count = inventory.len();
        let mut graph = DiGraph::with_capacity(count, count * 2);
        let mut nodes = HashMap::with_capacity(count);
        let mut node_indices = HashMap::with_capacity(count);

        for asset in inventory.assets() {
            let idx = graph.add_node(asset.id.clone());
            node_indices.insert(asset.id.clone(), idx);
        }

        for asset in inventory.assets() {
            let declarer = node_indices[&asset.id];
            for dep in &asset.depends_on {
                let Some(target_id) = dep.target_id() else { continue };
                // unresolved targets have no node and therefore no edge
                if let Some(&target) = node_indices.get(target_id) {
                    graph.add_edge(
                        target,
                        declarer,
                        DependencyEdge {
                            insufficient: dep.insufficient,
                        },
                    );
                }
            }
        }

        for asset in inventory.assets() {
            let result = report.get(&asset.id);
            nodes.insert(asset.id.clone(), annotate(asset, result, rules));
        }

        Self {
            graph,
            nodes,
            node_indices,
            title: inventory.title().map(str::to_string),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    /// Nodes in working-set order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph
            .node_indices()
            .filter_map(move |idx| self.nodes.get(&self.graph[idx]))
    }

    /// All edges as (dependency target id, declaring asset id, edge)
    pub fn edges(&self) -> impl Iterator<Item = (&AssetId, &AssetId, DependencyEdge)> {
        self.graph.edge_references().map(move |e| {
            (
                &self.graph[e.source()],
                &self.graph[e.target()],
                *e.weight(),
            )
        })
    }

    /// Assets that directly declare a dependency on `id`
    pub fn direct_dependents(&self, id: &str) -> Vec<AssetId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Everything `id` transitively depends on
    pub fn dependency_closure(&self, id: &str) -> Vec<AssetId> {
        self.closure(id, Direction::Incoming)
    }

    /// Everything transitively depending on `id`
    pub fn dependent_closure(&self, id: &str) -> Vec<AssetId> {
        self.closure(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> Vec<AssetId> {
        let Some(&idx) = self.node_indices.get(id) else {
            return Vec::new();
        };
        let mut ids: Vec<AssetId> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    fn closure(&self, id: &str, direction: Direction) -> Vec<AssetId> {
        let Some(&start) = self.node_indices.get(id) else {
            return Vec::new();
        };
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        let mut result = Vec::new();

        while let Some(idx) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            if idx != start {
                result.push(self.graph[idx].clone());
            }
            stack.extend(self.graph.neighbors_directed(idx, direction));
        }

        result.sort();
        result
    }

    /// Node subset for a trimmed map: assets that support (are in the
    /// dependency closure of) an asset whose type matches `pattern`,
    /// those assets included. With `negate`, the complement, closed over
    /// its own dependencies so support chains stay visible.
    pub fn leads_to(&self, pattern: &str, negate: bool) -> Result<HashSet<AssetId>> {
        let regex = Regex::new(pattern).map_err(|source| {
            InventoryError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;

        let mut keep: HashSet<AssetId> = HashSet::new();
        for node in self.nodes.values() {
            if regex.is_match(&node.kind) {
                keep.insert(node.id.clone());
                keep.extend(self.dependency_closure(&node.id));
            }
        }

        if !negate {
            return Ok(keep);
        }

        let mut kept: HashSet<AssetId> = self
            .nodes
            .keys()
            .filter(|id| !keep.contains(*id))
            .cloned()
            .collect();
        let mut frontier: Vec<AssetId> = kept.iter().cloned().collect();
        while let Some(id) = frontier.pop() {
            for dep in self.neighbors(&id, Direction::Incoming) {
                if kept.insert(dep.clone()) {
                    frontier.push(dep);
                }
            }
        }
        Ok(kept)
    }
}

/// Annotate one asset as a graph node
fn annotate(
    asset: &Asset,
    result: Option<&ValidationResult>,
    rules: &RuleTable,
) -> GraphNode {
    let valid = result.map_or(true, |r| r.is_valid());
    let style_class = if !valid {
        StyleClass::Invalid
    } else if asset.needs_work() {
        StyleClass::NeedsWork
    } else {
        StyleClass::Ok
    };

    GraphNode {
        id: asset.id.clone(),
        label: asset.display_label().to_string(),
        kind: asset.kind.clone(),
        valid,
        errors: result
            .map(|r| r.errors.iter().map(ToString::to_string).collect())
            .unwrap_or_default(),
        style_class,
        type_style: rules
            .lookup(&asset.kind)
            .map(|r| r.style.clone())
            .unwrap_or_default(),
        tooltip: tooltip_lines(asset, result),
        report_stem: asset.report_stem(),
        edit_url: asset.source.edit_url(),
        source: asset.source.clone(),
    }
}

/// Hover text: issues first, then scalar fields, then list fields, then
/// the defining file
fn tooltip_lines(asset: &Asset, result: Option<&ValidationResult>) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(result) = result {
        for error in &result.errors {
            lines.push(format!("ERROR {}", error));
        }
        for warning in &result.warnings {
            lines.push(format!("WARNING {}", warning));
        }
    }

    lines.push(format!("id: {}", asset.id));
    for (label, value) in [
        ("type", Some(asset.kind.as_str()).filter(|k| !k.is_empty())),
        ("name", asset.name.as_deref()),
        ("owner", asset.owner.as_deref()),
        ("location", asset.location.as_deref()),
        ("description", asset.description.as_deref()),
    ] {
        if let Some(value) = value {
            lines.push(format!("{}: {}", label, value));
        }
    }
    for (key, value) in &asset.extra {
        if let Some(value) = value.as_str() {
            lines.push(format!("{}: {}", key, value));
        }
    }

    for field in LIST_FIELDS {
        let items: Vec<&str> = match *field {
            "tags" => asset.tags.iter().map(String::as_str).collect(),
            "notes" => asset.notes.iter().map(String::as_str).collect(),
            "open_issues" => {
                asset.open_issues.iter().map(String::as_str).collect()
            }
            "closed_issues" => {
                asset.closed_issues.iter().map(String::as_str).collect()
            }
            "links" => asset.links.iter().map(String::as_str).collect(),
            _ => continue,
        };
        if !items.is_empty() {
            lines.push(field.to_uppercase());
            for item in items {
                lines.push(format!("  {}", item));
            }
        }
    }

    lines.push(format!("Defined in {}", asset.source.file.display()));
    lines
}
