//! Natural-language constraint conversion.
//!
//! Each constraint text is sent to the backend's convert endpoint. Transport
//! and backend errors are retried under a [`RetryPolicy`]; an explicit
//! "does not apply" answer is final. Accepted texts go into the project's
//! [`ConstraintSet`] only if an identical active record is not already there.
//!
//! Batches run strictly in submission order, one request at a time, so the
//! duplicate check always sees every earlier acceptance.

pub mod state;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::backend::{Backend, BackendError};
use crate::constraints::{ConstraintError, ConstraintSet};

pub use state::{ConversionState, ConversionStateMachine, ConversionTrace};

/// Bounded retry for transport and backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}

/// Terminal result of one conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutcome {
    /// The backend accepted the text. `inserted` is `false` when an identical
    /// active record already existed.
    Accepted { inserted: bool },
    /// The text does not apply to the current context.
    Rejected { message: String },
    /// Every attempt failed.
    Failed { attempts: u32, error: BackendError },
}

impl ConversionOutcome {
    pub fn state(&self) -> ConversionState {
        match self {
            Self::Accepted { .. } => ConversionState::Accepted,
            Self::Rejected { .. } => ConversionState::Rejected,
            Self::Failed { .. } => ConversionState::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Human-readable result of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)
    }
}

/// Everything known about one finished conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub text: String,
    pub outcome: ConversionOutcome,
    pub trace: ConversionTrace,
}

impl ConversionReport {
    pub fn notification(&self) -> Notification {
        match &self.outcome {
            ConversionOutcome::Accepted { inserted: true } => {
                Notification::success(format!("Constraint added: {}", self.text))
            }
            ConversionOutcome::Accepted { inserted: false } => {
                Notification::warning(format!("Constraint already present: {}", self.text))
            }
            ConversionOutcome::Rejected { message } => {
                Notification::warning(format!("Constraint not applicable: {message}"))
            }
            ConversionOutcome::Failed { attempts, error } => Notification::error(format!(
                "Could not convert constraint after {attempts} attempt(s): {error}"
            )),
        }
    }
}

/// Results of a batch, in submission order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchReport {
    pub items: Vec<ConversionReport>,
}

impl BatchReport {
    pub fn count(&self, state: ConversionState) -> usize {
        self.items
            .iter()
            .filter(|item| item.outcome.state() == state)
            .count()
    }

    /// Records actually added or switched back on.
    pub fn inserted(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, ConversionOutcome::Accepted { inserted: true }))
            .count()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.items.iter().map(ConversionReport::notification).collect()
    }

    /// One line for the whole batch.
    pub fn summary(&self) -> Notification {
        let total = self.items.len();
        let accepted = self.count(ConversionState::Accepted);
        let failed = self.count(ConversionState::Failed);
        let message = format!(
            "{accepted}/{total} constraint(s) accepted, {} new, {} rejected, {failed} failed",
            self.inserted(),
            self.count(ConversionState::Rejected),
        );
        if failed > 0 {
            Notification::error(message)
        } else if accepted < total {
            Notification::warning(message)
        } else {
            Notification::success(message)
        }
    }
}

/// Drives conversions against a [`Backend`].
#[derive(Clone)]
pub struct ConversionPipeline {
    backend: Arc<dyn Backend>,
    policy: RetryPolicy,
}

impl ConversionPipeline {
    pub fn new(backend: Arc<dyn Backend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Convert one text and, if accepted, add it to `constraints`. Empty text
    /// is rejected without contacting the backend.
    pub async fn convert_one(&self, text: &str, constraints: &mut ConstraintSet) -> ConversionReport {
        let text = text.trim().to_string();
        let mut trace = ConversionTrace::new();

        if text.is_empty() {
            return ConversionReport {
                outcome: ConversionOutcome::Rejected {
                    message: ConstraintError::Empty.to_string(),
                },
                text,
                trace,
            };
        }

        trace.advance(ConversionState::Converting);
        let max_attempts = self.policy.attempts();
        let mut attempt = 1;

        let outcome = loop {
            match self.backend.convert(&text).await {
                Ok(resp) if resp.valid => {
                    trace.advance(ConversionState::Accepted);
                    // Text is non-empty, so insertion cannot fail.
                    let inserted = constraints
                        .insert_if_absent(&text)
                        .map(|o| o.changed())
                        .unwrap_or(false);
                    debug!(attempt, inserted, "constraint accepted");
                    break ConversionOutcome::Accepted { inserted };
                }
                Ok(resp) => {
                    trace.advance(ConversionState::Rejected);
                    let message = resp
                        .message
                        .unwrap_or_else(|| "constraint does not apply to this context".to_string());
                    info!(message = %message, "constraint rejected by backend");
                    break ConversionOutcome::Rejected { message };
                }
                Err(error) => {
                    trace.advance(ConversionState::Failed);
                    if attempt >= max_attempts {
                        error!(attempts = attempt, error = %error, "constraint conversion failed");
                        break ConversionOutcome::Failed {
                            attempts: attempt,
                            error,
                        };
                    }
                    warn!(
                        attempt,
                        max_attempts,
                        error = %error,
                        "conversion attempt failed, retrying"
                    );
                    tokio::time::sleep(self.policy.delay).await;
                    trace.advance(ConversionState::Converting);
                    attempt += 1;
                }
            }
        };

        ConversionReport {
            text,
            outcome,
            trace,
        }
    }

    /// Convert `texts` one after another. `progress` is called with
    /// `(completed, total)` after each item.
    pub async fn convert_batch<F>(
        &self,
        texts: &[String],
        constraints: &mut ConstraintSet,
        mut progress: F,
    ) -> BatchReport
    where
        F: FnMut(usize, usize),
    {
        let total = texts.len();
        let mut report = BatchReport::default();
        for (index, text) in texts.iter().enumerate() {
            let item = self.convert_one(text, constraints).await;
            report.items.push(item);
            progress(index + 1, total);
        }
        info!(
            total,
            accepted = report.count(ConversionState::Accepted),
            failed = report.count(ConversionState::Failed),
            "conversion batch finished"
        );
        report
    }
}

impl fmt::Debug for ConversionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionPipeline")
            .field("backend", &self.backend.name())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_three_attempts_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(1));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
    }

    fn report(outcome: ConversionOutcome) -> ConversionReport {
        ConversionReport {
            text: "no nights".into(),
            outcome,
            trace: ConversionTrace::new(),
        }
    }

    #[test]
    fn notifications_per_outcome() {
        let n = report(ConversionOutcome::Accepted { inserted: true }).notification();
        assert_eq!(n.level, NotificationLevel::Success);
        assert_eq!(n.to_string(), "[success] Constraint added: no nights");

        let n = report(ConversionOutcome::Accepted { inserted: false }).notification();
        assert_eq!(n.level, NotificationLevel::Warning);

        let n = report(ConversionOutcome::Rejected {
            message: "no such worker".into(),
        })
        .notification();
        assert_eq!(n.level, NotificationLevel::Warning);
        assert!(n.message.contains("no such worker"));

        let n = report(ConversionOutcome::Failed {
            attempts: 3,
            error: BackendError::Transport("connection refused".into()),
        })
        .notification();
        assert_eq!(n.level, NotificationLevel::Error);
        assert!(n.message.contains("3 attempt(s)"));
    }

    #[test]
    fn batch_summary_levels() {
        let mut batch = BatchReport::default();
        batch.items.push(report(ConversionOutcome::Accepted { inserted: true }));
        assert_eq!(batch.summary().level, NotificationLevel::Success);

        batch.items.push(report(ConversionOutcome::Rejected {
            message: "x".into(),
        }));
        assert_eq!(batch.summary().level, NotificationLevel::Warning);

        batch.items.push(report(ConversionOutcome::Failed {
            attempts: 1,
            error: BackendError::Decode("bad".into()),
        }));
        let summary = batch.summary();
        assert_eq!(summary.level, NotificationLevel::Error);
        assert_eq!(
            summary.message,
            "1/3 constraint(s) accepted, 1 new, 1 rejected, 1 failed"
        );
    }
}
