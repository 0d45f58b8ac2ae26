use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use resqplan_core::backend::{
    ActionResponse, Backend, BackendError, ConvertResponse, OptimizeResponse, SolutionPayload,
    ViewResponse,
};

/// One recorded call to a [`ScriptedBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Translate(String),
    Convert(String),
    Optimize(Vec<String>),
    Edit { old: String, new: String },
    Delete(String),
    View(String),
}

#[derive(Default)]
struct Script {
    convert: VecDeque<Result<ConvertResponse, BackendError>>,
    rejections: HashMap<String, String>,
    optimize: Option<Result<OptimizeResponse, BackendError>>,
    edit: Option<Result<ActionResponse, BackendError>>,
    delete: Option<Result<ActionResponse, BackendError>>,
    translate: Option<Result<Value, BackendError>>,
    calls: Vec<BackendCall>,
}

/// In-process backend with scripted answers.
///
/// Unscripted calls succeed: convert accepts, edit/delete report success,
/// optimize returns an empty solution, translate echoes an empty object.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut script)
    }

    /// Queue the next convert answer. Queued answers are used before any
    /// per-text rejection.
    pub fn push_convert(&self, result: Result<ConvertResponse, BackendError>) -> &Self {
        self.with(|s| s.convert.push_back(result));
        self
    }

    /// Make the next `n` convert calls fail with a transport error.
    pub fn fail_converts(&self, n: usize) -> &Self {
        for i in 0..n {
            self.push_convert(Err(BackendError::Transport(format!(
                "injected failure {}",
                i + 1
            ))));
        }
        self
    }

    /// Answer `valid: false` whenever `text` is converted.
    pub fn reject(&self, text: &str, message: &str) -> &Self {
        self.with(|s| s.rejections.insert(text.to_string(), message.to_string()));
        self
    }

    pub fn set_optimize(&self, result: Result<OptimizeResponse, BackendError>) -> &Self {
        self.with(|s| s.optimize = Some(result));
        self
    }

    pub fn set_solution(&self, pairs: &[(&str, f64)], relaxed: &[&str]) -> &Self {
        let values = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        self.set_optimize(Ok(OptimizeResponse {
            solution: SolutionPayload::Values(values),
            relaxed_constraints: relaxed.iter().map(|s| s.to_string()).collect(),
        }))
    }

    pub fn set_edit(&self, result: Result<ActionResponse, BackendError>) -> &Self {
        self.with(|s| s.edit = Some(result));
        self
    }

    pub fn set_delete(&self, result: Result<ActionResponse, BackendError>) -> &Self {
        self.with(|s| s.delete = Some(result));
        self
    }

    pub fn set_translate(&self, result: Result<Value, BackendError>) -> &Self {
        self.with(|s| s.translate = Some(result));
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.with(|s| s.calls.clone())
    }

    pub fn convert_calls(&self) -> usize {
        self.with(|s| {
            s.calls
                .iter()
                .filter(|c| matches!(c, BackendCall::Convert(_)))
                .count()
        })
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn translate(&self, context: &str) -> Result<Value, BackendError> {
        self.with(|s| {
            s.calls.push(BackendCall::Translate(context.to_string()));
            s.translate.clone().unwrap_or_else(|| Ok(json!({})))
        })
    }

    async fn convert(&self, constraint: &str) -> Result<ConvertResponse, BackendError> {
        self.with(|s| {
            s.calls.push(BackendCall::Convert(constraint.to_string()));
            if let Some(next) = s.convert.pop_front() {
                return next;
            }
            match s.rejections.get(constraint) {
                Some(message) => Ok(ConvertResponse::rejected(message.clone())),
                None => Ok(ConvertResponse::accepted()),
            }
        })
    }

    async fn optimize(
        &self,
        active_constraints: &[String],
    ) -> Result<OptimizeResponse, BackendError> {
        self.with(|s| {
            s.calls
                .push(BackendCall::Optimize(active_constraints.to_vec()));
            s.optimize.clone().unwrap_or_else(|| {
                Ok(OptimizeResponse {
                    solution: SolutionPayload::Values(Default::default()),
                    relaxed_constraints: Vec::new(),
                })
            })
        })
    }

    async fn edit_constraint(
        &self,
        old_nl: &str,
        new_nl: &str,
    ) -> Result<ActionResponse, BackendError> {
        self.with(|s| {
            s.calls.push(BackendCall::Edit {
                old: old_nl.to_string(),
                new: new_nl.to_string(),
            });
            s.edit.clone().unwrap_or_else(|| Ok(ActionResponse::ok()))
        })
    }

    async fn delete_constraint(&self, nl: &str) -> Result<ActionResponse, BackendError> {
        self.with(|s| {
            s.calls.push(BackendCall::Delete(nl.to_string()));
            s.delete.clone().unwrap_or_else(|| Ok(ActionResponse::ok()))
        })
    }

    async fn view_constraint(&self, nl: &str) -> Result<ViewResponse, BackendError> {
        self.with(|s| {
            s.calls.push(BackendCall::View(nl.to_string()));
            Ok(ViewResponse {
                code: format!("# {nl}"),
            })
        })
    }
}
