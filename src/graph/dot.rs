//! GraphViz DOT rendering
//!
//! Turns the assembled graph into DOT text for the external layout tool.
//! Node shapes come from the rule table's per-type style fragments; the
//! styling class decides the fill (invalid dominates `needs_work`, which
//! dominates the plain style). Every node links to its report page and
//! carries an editor link on its first edge.

use std::collections::HashSet;
use std::fmt::Write;

use crate::asset::AssetId;

use super::{AssetGraph, StyleClass};

/// Color theme for the rendered map
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    graph_attrs: &'static str,
    node_attrs: &'static str,
    edge_attrs: &'static str,
    edit_color: &'static str,
    error_fill: &'static str,
    needs_work_fill: &'static str,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            name: "light",
            graph_attrs: "rankdir=LR, concentrate=true",
            node_attrs: "fontname=FreeSans, fontsize=10",
            edge_attrs: "fontname=FreeSans, fontsize=10",
            edit_color: "#c0c0c0",
            error_fill: "pink",
            needs_work_fill: "khaki",
        }
    }

    pub fn dark() -> Self {
        Self {
            name: "dark",
            graph_attrs: "rankdir=LR, concentrate=true, bgcolor=black",
            node_attrs: "fontname=FreeSans, fontsize=10, \
                         color=\"#808080\", fontcolor=\"#808080\"",
            edge_attrs: "fontname=FreeSans, fontsize=10, color=\"#808080\"",
            edit_color: "#303030",
            error_fill: "#200000",
            needs_work_fill: "#202000",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "light" => Some(Self::light()),
            "dark" => Some(Self::dark()),
            _ => None,
        }
    }
}

impl AssetGraph {
    /// Render the whole graph as DOT
    pub fn to_dot(&self, theme: &Theme) -> String {
        self.to_dot_subset(theme, None)
    }

    /// Render a node subset (both edge endpoints must be in the subset);
    /// `None` renders everything
    pub fn to_dot_subset(
        &self,
        theme: &Theme,
        subset: Option<&HashSet<AssetId>>,
    ) -> String {
        let included =
            |id: &AssetId| subset.map_or(true, |keep| keep.contains(id));

        let mut out = String::new();
        out.push_str("digraph Assets {\n");
        let _ = writeln!(
            out,
            "  graph [{}, URL=\"index.html\", label=\"{}\", tooltip=\" \"]",
            theme.graph_attrs,
            escape(self.title().unwrap_or("")),
        );
        let _ = writeln!(out, "  node [{}]", theme.node_attrs);
        let _ = writeln!(out, "  edge [{}]", theme.edge_attrs);

        // stable numeric handles, working-set order
        let mut handles = std::collections::HashMap::new();
        for (i, node) in self.nodes().enumerate() {
            handles.insert(node.id.clone(), format!("n{}", i));
        }

        for node in self.nodes() {
            if !included(&node.id) {
                continue;
            }
            let mut attrs = vec![
                format!("label=\"{}\"", escape(&wrap_label(&node.label))),
                format!("URL=\"{}.html\"", node.report_stem),
                format!("target=\"_{}\"", node.id),
            ];
            if !node.type_style.is_empty() {
                attrs.push(node.type_style.clone());
            }
            match node.style_class {
                StyleClass::Invalid => {
                    attrs.push("style=filled".to_string());
                    attrs.push(format!("fillcolor=\"{}\"", theme.error_fill));
                }
                StyleClass::NeedsWork => {
                    attrs.push("style=filled".to_string());
                    attrs.push(format!(
                        "fillcolor=\"{}\"",
                        theme.needs_work_fill
                    ));
                }
                StyleClass::Ok => {}
            }
            attrs.push(format!(
                "tooltip=\"{}\"",
                escape(&node.tooltip.join("\\n"))
            ));
            let _ = writeln!(
                out,
                "  {} [{}]",
                handles[&node.id],
                attrs.join(", ")
            );
        }

        let mut edit_linked: HashSet<&AssetId> = HashSet::new();
        for (source, target, edge) in self.edges() {
            if !included(source) || !included(target) {
                continue;
            }
            let mut attrs = vec![format!("fontcolor=\"{}\"", theme.edit_color)];
            if edge.insufficient {
                attrs.push("style=dashed".to_string());
            }
            // first edge touching an asset carries its editor link
            if edit_linked.insert(target) {
                let node = self.node(target).expect("edge endpoint has node");
                attrs.push(format!("headURL=\"{}\"", escape(&node.edit_url)));
                attrs.push("headlabel=\"edit\"".to_string());
                attrs.push("headtooltip=\"Edit\"".to_string());
            }
            if edit_linked.insert(source) {
                let node = self.node(source).expect("edge endpoint has node");
                attrs.push(format!("tailURL=\"{}\"", escape(&node.edit_url)));
                attrs.push("taillabel=\"edit\"".to_string());
                attrs.push("tailtooltip=\"Edit\"".to_string());
            }
            let _ = writeln!(
                out,
                "  {} -> {} [{}]",
                handles[source],
                handles[target],
                attrs.join(", ")
            );
        }

        out.push_str("}\n");
        out
    }
}

fn escape(text: &str) -> String {
    text.replace('"', "\\\"")
}

/// Break wide labels near the middle, preferring an existing separator
fn wrap_label(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let half = chars.len() / 2;
    if half <= 8 {
        return text.to_string();
    }
    let breakable = |c: char| c == ' ' || c == '_' || c == '-';
    let mut at = None;
    for i in 0..half - 1 {
        if half + i < chars.len() && breakable(chars[half + i]) {
            at = Some(half + i);
            break;
        }
        if breakable(chars[half - i]) {
            at = Some(half - i);
            break;
        }
    }
    match at {
        Some(at) => {
            let head: String = chars[..at].iter().collect();
            let tail: String = chars[at..].iter().collect();
            format!("{}\\n{}", head, tail)
        }
        None => text.to_string(),
    }
}
