//! End-to-end pipeline tests over a realistic inventory fixture

use std::path::PathBuf;

use asset_mapper::{
    loader, report, AssetGraph, Inventory, RequirementStatus, RuleTable,
    StyleClass, Theme, ValidationError, ValidationReport,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load_office() -> (Inventory, ValidationReport) {
    let inventory = loader::load_inventory(&[fixture("office.yaml")]).unwrap();
    let report = inventory.validate(&RuleTable::builtin());
    (inventory, report)
}

#[test]
fn test_title_and_counts() {
    let (inventory, report) = load_office();
    assert_eq!(inventory.title(), Some("Office infrastructure"));
    assert_eq!(inventory.len(), 11);
    assert_eq!(inventory.archived().len(), 1);
    // con_broken, csvc_insuf, con_ghost, vbx_old
    assert_eq!(report.invalid_count(), 4);
}

#[test]
fn test_container_with_waiver_is_valid() {
    let (_, report) = load_office();
    let result = report.get("con_waived").unwrap();
    assert!(result.is_valid(), "errors: {:?}", result.errors);
    assert!(result
        .requirements
        .iter()
        .any(|r| r.status == RequirementStatus::Waived));
}

#[test]
fn test_missing_storage_is_one_error() {
    let (_, report) = load_office();
    let result = report.get("con_broken").unwrap();
    assert_eq!(
        result.errors,
        vec![ValidationError::MissingDependency {
            requirement: "storage/.*".into()
        }]
    );
}

#[test]
fn test_insufficient_dependency_fails_but_is_reported() {
    let (inventory, validation) = load_office();
    let result = validation.get("csvc_insuf").unwrap();
    assert_eq!(
        result.errors,
        vec![ValidationError::MissingDependency {
            requirement: "resource/deployment".into()
        }]
    );

    let documents = report::build_reports(&inventory, &validation);
    let doc = documents.iter().find(|d| d.id == "csvc_insuf").unwrap();
    assert_eq!(doc.dependencies.len(), 1);
    assert_eq!(doc.dependencies[0].target, "dply_webapp");
    assert!(doc.dependencies[0].insufficient);
    assert!(doc.dependencies[0].resolved);
    assert_eq!(
        doc.dependencies[0].annotation,
        "INSUF terraform migration pending"
    );
}

#[test]
fn test_ghost_reference_masks_no_other_errors() {
    let (_, report) = load_office();
    let result = report.get("con_ghost").unwrap();
    assert_eq!(
        result.errors,
        vec![ValidationError::UnresolvedReference {
            target: "srv_gone".into()
        }]
    );
}

#[test]
fn test_archived_asset_fully_excluded() {
    let (inventory, report) = load_office();
    assert!(inventory.get("srv_archived").is_none());
    assert!(report.get("srv_archived").is_none());

    // a dependency on the archived server behaves as unresolved, so the
    // physical/server requirement is also unmet
    let result = report.get("vbx_old").unwrap();
    assert_eq!(
        result.errors,
        vec![
            ValidationError::UnresolvedReference {
                target: "srv_archived".into()
            },
            ValidationError::MissingDependency {
                requirement: "physical/server".into()
            },
        ]
    );

    let rules = RuleTable::builtin();
    let graph = AssetGraph::build(&inventory, &report, &rules);
    assert!(graph.node("srv_archived").is_none());
}

#[test]
fn test_graph_shape_and_styling() {
    let (inventory, report) = load_office();
    let rules = RuleTable::builtin();
    let graph = AssetGraph::build(&inventory, &report, &rules);

    assert_eq!(graph.node_count(), 11);
    // every resolved declaration edges, waivers and ghosts do not
    assert_eq!(graph.edge_count(), 12);

    // invalid dominates needs_work dominates ok
    assert_eq!(
        graph.node("vbx_old").unwrap().style_class,
        StyleClass::Invalid
    );
    assert_eq!(
        graph.node("con_waived").unwrap().style_class,
        StyleClass::NeedsWork
    );
    assert_eq!(graph.node("sto_nas").unwrap().style_class, StyleClass::Ok);
}

#[test]
fn test_report_documents_cover_snapshot() {
    let (inventory, validation) = load_office();
    let documents = report::build_reports(&inventory, &validation);
    // working set plus the archived listing
    assert_eq!(documents.len(), 12);
    let archived = documents.iter().find(|d| d.id == "srv_archived").unwrap();
    assert!(archived.archived);
    assert!(archived.errors.is_empty());

    let nas = documents.iter().find(|d| d.id == "sto_nas").unwrap();
    assert_eq!(nas.dependents, vec!["con_webapp".to_string()]);
    assert_eq!(
        nas.source.edit_url(),
        format!("assetmap://{}#sto_nas", fixture("office.yaml").display())
    );
}

#[test]
fn test_pipeline_is_idempotent() {
    let (inv_a, rep_a) = load_office();
    let (inv_b, rep_b) = load_office();
    assert_eq!(inv_a.snapshot_hash(), inv_b.snapshot_hash());

    let rules = RuleTable::builtin();
    let dot_a =
        AssetGraph::build(&inv_a, &rep_a, &rules).to_dot(&Theme::dark());
    let dot_b =
        AssetGraph::build(&inv_b, &rep_b, &rules).to_dot(&Theme::dark());
    assert_eq!(dot_a, dot_b);

    let docs_a = report::build_reports(&inv_a, &rep_a);
    let docs_b = report::build_reports(&inv_b, &rep_b);
    assert_eq!(
        serde_json::to_string(&docs_a).unwrap(),
        serde_json::to_string(&docs_b).unwrap()
    );
}

#[test]
fn test_directory_loading_merges_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("servers.yaml"),
        "assets: [{id: srv_a, type: physical/server}]",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("vms.yaml"),
        "assets:
  - id: vbx_a
    type: vm/virtualbox
    depends_on: [srv_a, '^storage/.*']
",
    )
    .unwrap();

    let inventory =
        loader::load_inventory(&[dir.path().to_path_buf()]).unwrap();
    assert_eq!(inventory.len(), 2);

    let report = inventory.validate(&RuleTable::builtin());
    assert!(report.get("vbx_a").unwrap().is_valid());
}

#[test]
fn test_duplicate_id_across_files_aborts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("a.yaml"),
        "assets: [{id: srv_a, type: physical/server}]",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("b.yaml"),
        "assets: [{id: srv_a, type: physical/server}]",
    )
    .unwrap();

    let err = loader::load_inventory(&[dir.path().to_path_buf()]).unwrap_err();
    assert!(matches!(
        err,
        asset_mapper::InventoryError::DuplicateId { .. }
    ));
}

#[test]
fn test_custom_rule_table_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let rules_path = dir.path().join("rules.toml");
    std::fs::write(
        &rules_path,
        r#"
[[rule]]
type = "^physical/server$"
prefix = "srv"
requires = ["rack/slot"]
"#,
    )
    .unwrap();

    let rules = RuleTable::from_path(&rules_path).unwrap();
    let inventory = loader::load_inventory(&[fixture("office.yaml")]).unwrap();
    let report = inventory.validate(&rules);
    // under the replacement policy the rack server now misses a slot
    let result = report.get("srv_rack01").unwrap();
    assert_eq!(
        result.errors,
        vec![ValidationError::MissingDependency {
            requirement: "rack/slot".into()
        }]
    );
}
