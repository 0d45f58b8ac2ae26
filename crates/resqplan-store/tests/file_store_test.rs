//! Integration tests for the file-backed project store.

use chrono::{Duration, Utc};
use serde_json::json;

use resqplan_store::models::{ConsEntry, ConstraintSense, ObjectiveEntry, ObjectiveSense};
use resqplan_store::{
    ConstraintRecord, FileProjectStore, ModelState, NewProject, ProjectStore, StoreError,
    VarEntry, VarKind,
};

fn new_project(name: &str) -> NewProject {
    NewProject {
        name: name.to_string(),
        context: format!("context for {name}"),
    }
}

#[tokio::test]
async fn list_on_missing_dir_is_empty() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = FileProjectStore::new(tmp.path().join("does-not-exist"));
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_writes_a_json_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = FileProjectStore::new(tmp.path());

    let record = store.create(new_project("retenes")).await.unwrap();
    let path = tmp.path().join(format!("{}.json", record.id));
    assert!(path.exists(), "expected {} to exist", path.display());

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["name"], json!("retenes"));
    assert_eq!(raw["gurobiState"]["vars"], json!([]));
}

#[tokio::test]
async fn update_round_trips_full_record() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = FileProjectStore::new(tmp.path());

    let mut record = store.create(new_project("horario")).await.unwrap();
    record.manual_constraints = vec![
        ConstraintRecord::new("no more than 4 hours per day"),
        ConstraintRecord {
            text: "fridays off".into(),
            active: false,
        },
    ];
    record.variables = json!({"dias": 5, "franjas": 6});
    record.gurobi_state = ModelState {
        vars: vec![
            VarEntry {
                name: "x_A_0_0".into(),
                lb: 0.0,
                ub: 1.0,
                kind: VarKind::Binary,
            },
            VarEntry {
                name: "load".into(),
                lb: 0.0,
                ub: f64::INFINITY,
                kind: VarKind::Continuous,
            },
        ],
        cons: vec![ConsEntry {
            expr: "1*x_A_0_0 + -1*load".into(),
            sense: ConstraintSense::Equal,
            rhs: 0.0,
            name: Some("load_def".into()),
        }],
        objective: ObjectiveEntry {
            expr: "1*load".into(),
            sense: ObjectiveSense::Minimize,
        },
    };
    record.saved_at = Some(Utc::now());

    store.update(&record).await.unwrap();
    let back = store.get(&record.id).await.unwrap().expect("exists");
    assert_eq!(back, record);
}

#[tokio::test]
async fn update_unknown_project_fails() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = FileProjectStore::new(tmp.path());
    let ghost = resqplan_store::ProjectRecord::new("ghost", new_project("ghost"));

    let err = store.update(&ghost).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)), "got: {err}");
}

#[tokio::test]
async fn list_sorts_by_saved_at_and_skips_garbage() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = FileProjectStore::new(tmp.path());

    let mut old = store.create(new_project("old")).await.unwrap();
    let mut recent = store.create(new_project("recent")).await.unwrap();
    let _never = store.create(new_project("never-saved")).await.unwrap();

    old.saved_at = Some(Utc::now() - Duration::hours(2));
    recent.saved_at = Some(Utc::now());
    store.update(&old).await.unwrap();
    store.update(&recent).await.unwrap();

    std::fs::write(tmp.path().join("broken.json"), b"{not json").unwrap();
    std::fs::write(tmp.path().join("notes.txt"), b"ignored").unwrap();

    let names: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["recent", "old", "never-saved"]);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = FileProjectStore::new(tmp.path());
    let record = store.create(new_project("gone")).await.unwrap();

    assert!(store.delete(&record.id).await.unwrap());
    assert!(!store.delete(&record.id).await.unwrap());
    assert!(store.get(&record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn path_traversal_ids_are_rejected() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = FileProjectStore::new(tmp.path());

    let err = store.get("../secrets").await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidId(_)), "got: {err}");
}
