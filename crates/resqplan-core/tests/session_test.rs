//! Project session lifecycle, constraint editing and optimize.

use std::sync::Arc;

use serde_json::json;

use resqplan_core::backend::{ActionResponse, BackendError, OptimizeResponse, SolutionPayload};
use resqplan_core::grid::FILTER_ALL;
use resqplan_core::{
    ConversionPipeline, DanglingPolicy, OptimizeError, ProjectSession, RetryPolicy,
    SessionError, optimize,
};
use resqplan_store::{
    ConsEntry, ConstraintRecord, ConstraintSense, MemoryProjectStore, ModelState, NewProject,
    ProjectRecord, ProjectStore, VarEntry, VarKind,
};
use resqplan_test_utils::{BackendCall, ScriptedBackend};

fn new_project(name: &str) -> NewProject {
    NewProject {
        name: name.to_string(),
        context: String::new(),
    }
}

fn session() -> (ProjectSession, Arc<MemoryProjectStore>, Arc<ScriptedBackend>) {
    let store = Arc::new(MemoryProjectStore::new());
    let backend = Arc::new(ScriptedBackend::new());
    let session = ProjectSession::new(store.clone(), backend.clone());
    (session, store, backend)
}

fn stored_model() -> ModelState {
    ModelState {
        vars: vec![
            VarEntry {
                name: "x_Ana_0_0".into(),
                lb: 0.0,
                ub: 1.0,
                kind: VarKind::Binary,
            },
            VarEntry {
                name: "x_Luis_0_0".into(),
                lb: 0.0,
                ub: 1.0,
                kind: VarKind::Binary,
            },
        ],
        cons: vec![ConsEntry {
            expr: "1*x_Ana_0_0 + 1*x_Luis_0_0".into(),
            sense: ConstraintSense::GreaterEqual,
            rhs: 1.0,
            name: None,
        }],
        ..ModelState::default()
    }
}

#[tokio::test]
async fn open_reconstructs_model_and_constraints() {
    let mut record = ProjectRecord::new("p1", new_project("ward"));
    record.manual_constraints = vec![ConstraintRecord::new("someone each morning")];
    record.gurobi_state = stored_model();
    let store = Arc::new(MemoryProjectStore::with_projects([record]));
    let mut session = ProjectSession::new(store, Arc::new(ScriptedBackend::new()));

    let active = session.open("p1").await.unwrap();
    assert_eq!(active.model.num_variables(), 2);
    assert_eq!(active.model.num_constraints(), 1);
    assert_eq!(active.active_constraints(), vec!["someone each morning"]);
}

#[tokio::test]
async fn open_unknown_project_is_not_found() {
    let (mut session, _, _) = session();
    let err = session.open("nope").await.unwrap_err();
    assert!(matches!(err, SessionError::NotFound(_)), "got: {err}");
}

#[tokio::test]
async fn strict_policy_surfaces_dangling_references() {
    let mut record = ProjectRecord::new("p1", new_project("ward"));
    let mut state = stored_model();
    state.cons[0].expr = "1*x_Ana_0_0 + 1*gone".into();
    record.gurobi_state = state;
    let store = Arc::new(MemoryProjectStore::with_projects([record]));

    let mut lenient = ProjectSession::new(store.clone(), Arc::new(ScriptedBackend::new()));
    assert!(lenient.open("p1").await.is_ok());

    let mut strict = ProjectSession::new(store, Arc::new(ScriptedBackend::new()))
        .with_dangling_policy(DanglingPolicy::Strict);
    let err = strict.open("p1").await.unwrap_err();
    assert!(matches!(err, SessionError::Codec { .. }), "got: {err}");
}

#[tokio::test]
async fn switching_projects_flushes_the_outgoing_one() {
    let (mut session, store, _) = session();
    let first_id = session.create(new_project("first")).await.unwrap().id().to_string();
    session
        .active_mut()
        .unwrap()
        .constraints
        .insert_if_absent("no nights")
        .unwrap();

    let second_id = session.create(new_project("second")).await.unwrap().id().to_string();
    assert_eq!(session.active().unwrap().id(), second_id);

    let flushed = store.get(&first_id).await.unwrap().unwrap();
    assert_eq!(flushed.manual_constraints, vec![ConstraintRecord::new("no nights")]);
    assert!(flushed.saved_at.is_some());

    let reopened = session.open(&first_id).await.unwrap();
    assert_eq!(reopened.active_constraints(), vec!["no nights"]);
}

#[tokio::test]
async fn save_round_trips_the_live_model() {
    let mut record = ProjectRecord::new("p1", new_project("ward"));
    record.gurobi_state = stored_model();
    let store = Arc::new(MemoryProjectStore::with_projects([record]));
    let mut session = ProjectSession::new(store.clone(), Arc::new(ScriptedBackend::new()));

    session.open("p1").await.unwrap();
    session.save().await.unwrap();

    let saved = store.get("p1").await.unwrap().unwrap();
    assert_eq!(saved.gurobi_state, stored_model());
}

#[tokio::test]
async fn close_saves_and_clears() {
    let (mut session, store, _) = session();
    let id = session.create(new_project("p")).await.unwrap().id().to_string();
    session.close().await.unwrap();
    assert!(session.active().is_none());
    assert!(store.get(&id).await.unwrap().unwrap().saved_at.is_some());
    assert!(matches!(session.save().await, Err(SessionError::NoActiveProject)));
}

#[tokio::test]
async fn deleting_the_open_project_closes_it() {
    let (mut session, _, _) = session();
    let id = session.create(new_project("p")).await.unwrap().id().to_string();
    assert!(session.delete(&id).await.unwrap());
    assert!(session.active().is_none());
    assert!(session.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn edit_applies_only_after_backend_agrees() {
    let (mut session, _, backend) = session();
    session.create(new_project("p")).await.unwrap();
    session
        .active_mut()
        .unwrap()
        .constraints
        .insert_if_absent("old text")
        .unwrap();

    backend.set_edit(Ok(ActionResponse::failed("model rejected it")));
    let err = session.edit_constraint("old text", "new text").await.unwrap_err();
    assert!(matches!(err, SessionError::Refused(ref m) if m == "model rejected it"));
    assert_eq!(session.active().unwrap().active_constraints(), vec!["old text"]);

    backend.set_edit(Ok(ActionResponse::ok()));
    session.edit_constraint("old text", "new text").await.unwrap();
    assert_eq!(session.active().unwrap().active_constraints(), vec!["new text"]);
}

#[tokio::test]
async fn invalid_edit_is_caught_before_the_backend() {
    let (mut session, _, backend) = session();
    session.create(new_project("p")).await.unwrap();
    let err = session.edit_constraint("missing", "x").await.unwrap_err();
    assert!(matches!(err, SessionError::Constraint(_)), "got: {err}");
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn delete_constraint_goes_through_backend() {
    let (mut session, _, backend) = session();
    session.create(new_project("p")).await.unwrap();
    session
        .active_mut()
        .unwrap()
        .constraints
        .insert_if_absent("a")
        .unwrap();

    backend.set_delete(Err(BackendError::Transport("down".into())));
    assert!(matches!(
        session.delete_constraint("a").await,
        Err(SessionError::Backend(_))
    ));
    assert_eq!(session.active().unwrap().constraints.len(), 1);

    backend.set_delete(Ok(ActionResponse::ok()));
    session.delete_constraint("a").await.unwrap();
    assert!(session.active().unwrap().constraints.is_empty());
    assert_eq!(backend.calls().last(), Some(&BackendCall::Delete("a".into())));
}

#[tokio::test]
async fn toggle_is_local() {
    let (mut session, _, backend) = session();
    session.create(new_project("p")).await.unwrap();
    session
        .active_mut()
        .unwrap()
        .constraints
        .insert_if_absent("a")
        .unwrap();

    assert!(!session.toggle_constraint("a").unwrap());
    assert!(session.active().unwrap().active_constraints().is_empty());
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn set_context_stores_variables() {
    let (mut session, _, backend) = session();
    backend.set_translate(Ok(json!({
        "variables": {"dias": 5},
        "detected_constraints": ["no more than 8 hours"]
    })));
    session.create(new_project("p")).await.unwrap();

    session.set_context("5 days, 3 shifts").await.unwrap();
    let record = &session.active().unwrap().record;
    assert_eq!(record.context, "5 days, 3 shifts");
    assert_eq!(record.variables["variables"]["dias"], 5);
    assert_eq!(record.detected_constraints, vec!["no more than 8 hours"]);
}

#[tokio::test]
async fn optimize_sends_active_constraints_and_builds_grid() {
    let (mut session, _, backend) = session();
    session.create(new_project("p")).await.unwrap();
    let pipeline = ConversionPipeline::new(backend.clone(), RetryPolicy::default());
    let texts = vec!["a".to_string(), "b".to_string()];
    pipeline
        .convert_batch(
            &texts,
            &mut session.active_mut().unwrap().constraints,
            |_, _| {},
        )
        .await;
    session.toggle_constraint("b").unwrap();

    backend.set_solution(
        &[("x(Ana, 0, 1)", 1.0), ("x(Luis, 2, 0)", 0.2), ("junk", 1.0)],
        &["a", "a"],
    );
    let report = optimize(backend.as_ref(), session.active().unwrap(), 0.5)
        .await
        .unwrap();

    assert_eq!(
        backend.calls().last(),
        Some(&BackendCall::Optimize(vec!["a".to_string()]))
    );
    assert_eq!(report.relaxed, vec!["a"]);
    assert_eq!(report.stats.dropped, 1);
    assert_eq!(report.grid.slot_count(), 2);
    assert_eq!(report.grid.day_count(), 1);
    let rendered = report.grid.render(FILTER_ALL);
    assert_eq!(rendered.rows[1][0].text, "Ana");
}

#[tokio::test]
async fn optimize_without_solution_is_an_error() {
    let (mut session, _, backend) = session();
    session.create(new_project("p")).await.unwrap();
    backend.set_optimize(Ok(OptimizeResponse {
        solution: SolutionPayload::Message("No se encontró una solución óptima.".into()),
        relaxed_constraints: Vec::new(),
    }));

    let err = optimize(backend.as_ref(), session.active().unwrap(), 0.5)
        .await
        .unwrap_err();
    assert!(matches!(err, OptimizeError::NoSolution(_)));
}
