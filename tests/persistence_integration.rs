//! Integration tests for snapshot persistence.
//!
//! These tests write models to disk with tempfile, read them back, and check
//! that identity lookups and detection results survive the round trip.

use tempfile::TempDir;

use evograph::core::types::ElementId;
use evograph::evolution::{DetectOptions, DetectorRegistry};
use evograph::model::snapshot::{parse_snapshot, SnapshotError};
use evograph::model::{DesignModel, ElementKind, ModelView, Multiplicity, Scope};

// =============================================================================
// Test Helpers
// =============================================================================

/// Three versions with additions, a removal, an edit and a reorder.
fn history() -> DesignModel {
    let mut model = DesignModel::new("initial");
    let v1 = model.root_version();
    let person = model.add_class(v1, "Person").unwrap();
    let nickname = model
        .add_attribute(person, "nickname", None, Multiplicity::OPTIONAL)
        .unwrap();
    let head = model
        .add_component(person, ElementKind::ContentContainer, "head")
        .unwrap();
    model
        .add_component(person, ElementKind::ContentChoice, "body")
        .unwrap();

    let v2 = model.branch(v1, "second").unwrap();
    let person2 = model.get_in_version(person, v2).unwrap();
    let nickname2 = model.get_in_version(nickname, v2).unwrap();
    model.pull_out(person2, Scope::Attributes, nickname2).unwrap();
    model
        .add_attribute(person2, "age", Some("int"), Multiplicity::ONE)
        .unwrap();

    let v3 = model.branch(v2, "third").unwrap();
    let head3 = model.get_in_version(head, v3).unwrap();
    let person3 = model.get_in_version(person, v3).unwrap();
    model.move_component(person3, head3, 1).unwrap();
    model
}

fn all_lookups(model: &DesignModel) -> Vec<Option<ElementId>> {
    let versions: Vec<_> = model.versions().iter().map(|v| v.id).collect();
    (0..model.len())
        .flat_map(|i| {
            versions
                .iter()
                .map(move |v| model.get_in_version(ElementId::new(i as u32), *v))
        })
        .collect()
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn save_and_load_preserves_lookups() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("model.json");
    let model = history();

    model.save(&path)?;
    let loaded = DesignModel::load(&path)?;

    assert_eq!(all_lookups(&loaded), all_lookups(&model));
    assert_eq!(loaded.versions().len(), 3);
    for (a, b) in loaded.versions().iter().zip(model.versions().iter()) {
        assert_eq!(a, b);
    }
    Ok(())
}

#[test]
fn detection_survives_round_trip() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    let path = temp.path().join("model.json");
    let model = history();
    model.save(&path)?;
    let loaded = DesignModel::load(&path)?;

    let registry = DetectorRegistry::standard();
    let options = DetectOptions::verified();
    let versions: Vec<_> = model.versions().iter().map(|v| v.id).collect();
    for pair in versions.windows(2) {
        for container in model.elements_in(pair[1]) {
            let before = registry.detect(&model, pair[0], pair[1], container, &options)?;
            let after = registry.detect(&loaded, pair[0], pair[1], container, &options)?;
            assert_eq!(before, after);
        }
    }
    Ok(())
}

#[test]
fn loaded_model_accepts_further_edits() -> anyhow::Result<()> {
    let model = history();
    let mut loaded = DesignModel::from_snapshot(&model.to_snapshot())?;

    let v3 = loaded.versions().iter().last().map(|v| v.id).unwrap();
    let v4 = loaded.branch(v3, "fourth")?;
    let person = loaded.find(v4, ElementKind::Class, "Person").unwrap();
    let email = loaded.add_attribute(person, "email", None, Multiplicity::OPTIONAL)?;

    assert_eq!(loaded.get_in_version(email, v3), None);
    assert_eq!(loaded.tracker().version_of(email), Some(v4));
    assert!(loaded.tracker().is_branch_root(email));
    Ok(())
}

#[test]
fn snapshot_json_is_self_describing() -> anyhow::Result<()> {
    let json = history().to_snapshot().to_json()?;
    let value: serde_json::Value = serde_json::from_str(&json)?;

    assert_eq!(value["kind"], "evograph.model-snapshot");
    assert_eq!(value["schema_version"], 1);
    assert_eq!(value["versions"][1]["created_from"], 1);
    assert_eq!(value["elements"][0]["kind"], "class");
    assert_eq!(value["fingerprint"].as_str().map(str::len), Some(64));
    Ok(())
}

// =============================================================================
// Rejections
// =============================================================================

#[test]
fn edited_structure_is_rejected() -> anyhow::Result<()> {
    let mut value = serde_json::to_value(history().to_snapshot())?;
    value["elements"][0]["version"] = serde_json::json!(2);

    let err = parse_snapshot(&value.to_string()).unwrap_err();
    assert!(matches!(err, SnapshotError::FingerprintMismatch { .. }));
    Ok(())
}

#[test]
fn edited_labels_are_accepted() -> anyhow::Result<()> {
    let mut value = serde_json::to_value(history().to_snapshot())?;
    value["versions"][0]["label"] = serde_json::json!("renamed");

    let snapshot = parse_snapshot(&value.to_string())?;
    let loaded = DesignModel::from_snapshot(&snapshot)?;
    let root = loaded.root_version();
    assert_eq!(loaded.versions().get(root).map(|v| v.label.as_str()), Some("renamed"));
    Ok(())
}

#[test]
fn missing_file_reports_path() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("absent.json");
    match DesignModel::load(&path) {
        Err(SnapshotError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected io error, got {other:?}"),
    }
}
