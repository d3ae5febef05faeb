//! Step executor.
//!
//! Generic machinery for running a finite ordered sequence of named, timed
//! operations under a global deadline. The coordinator supplies the step
//! bodies; the executor owns timing, budget derivation, skip semantics, and
//! the per-step records that end up in the sealed failover record.

use crate::error::ErrorKind;
use crate::models::{StepDetail, StepName, StepOutcome, StepRecord};
use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Failure produced by a step body, already mapped to a public error kind.
#[derive(Debug, Clone, PartialEq)]
pub struct StepFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl StepFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

pub type StepResult = Result<Option<StepDetail>, StepFailure>;
type StepBody = Pin<Box<dyn Future<Output = StepResult> + Send>>;

/// One entry of the ordered sequence: a named body with its own budget.
pub struct StepDefinition {
    pub name: StepName,
    pub critical: bool,
    pub budget: Duration,
    body: StepBody,
}

impl StepDefinition {
    pub fn new(
        name: StepName,
        critical: bool,
        budget: Duration,
        body: impl Future<Output = StepResult> + Send + 'static,
    ) -> Self {
        Self {
            name,
            critical,
            budget,
            body: Box::pin(body),
        }
    }
}

/// Outcome of one executed sequence.
#[derive(Debug)]
pub struct ExecutionReport {
    pub steps: Vec<StepRecord>,
    pub succeeded: bool,
    pub total_duration: Duration,
    /// First fatal failure, with the step it occurred in.
    pub first_failure: Option<(StepName, StepFailure)>,
}

pub struct StepExecutor {
    overall_budget: Duration,
}

impl StepExecutor {
    pub fn new(overall_budget: Duration) -> Self {
        Self { overall_budget }
    }

    /// Run the sequence. `on_step_start` fires before each executed (not
    /// skipped) step, letting the caller track progress.
    pub async fn run<F>(&self, steps: Vec<StepDefinition>, mut on_step_start: F) -> ExecutionReport
    where
        F: FnMut(StepName),
    {
        let start = Instant::now();
        let deadline = start + self.overall_budget;

        let mut records = Vec::with_capacity(steps.len());
        let mut first_failure: Option<(StepName, StepFailure)> = None;

        for step in steps {
            if first_failure.is_some() {
                records.push(StepRecord {
                    name: step.name,
                    started_at: Utc::now(),
                    duration_ms: 0,
                    outcome: StepOutcome::Skipped,
                    detail: None,
                });
                continue;
            }

            let now = Instant::now();
            if now > deadline {
                let failure = StepFailure::new(
                    ErrorKind::DeadlineExceeded,
                    "overall budget exhausted before step start",
                );
                records.push(StepRecord {
                    name: step.name,
                    started_at: Utc::now(),
                    duration_ms: 0,
                    outcome: StepOutcome::Skipped,
                    detail: Some(StepDetail::failed(failure.kind, failure.message.clone())),
                });
                first_failure = Some((step.name, failure));
                continue;
            }

            on_step_start(step.name);
            let budget = step.budget.min(deadline - now);
            let started_at = Utc::now();
            let step_start = Instant::now();

            let (outcome, detail, failure) =
                match tokio::time::timeout(budget, step.body).await {
                    Ok(Ok(detail)) => (StepOutcome::Ok, detail, None),
                    Ok(Err(failure)) => (
                        StepOutcome::Failed,
                        Some(StepDetail::failed(failure.kind, failure.message.clone())),
                        Some(failure),
                    ),
                    Err(_) => {
                        let failure = StepFailure::new(
                            ErrorKind::DeadlineExceeded,
                            format!("step budget of {} ms exhausted", budget.as_millis()),
                        );
                        (
                            StepOutcome::Failed,
                            Some(StepDetail::failed(failure.kind, failure.message.clone())),
                            Some(failure),
                        )
                    }
                };

            let duration = step_start.elapsed();
            debug!(
                step = %step.name,
                outcome = %outcome,
                duration_ms = duration.as_millis() as u64,
                "Step completed"
            );

            records.push(StepRecord {
                name: step.name,
                started_at,
                duration_ms: duration.as_millis() as u64,
                outcome,
                detail,
            });

            if let Some(failure) = failure {
                if step.critical {
                    warn!(step = %step.name, kind = %failure.kind, message = %failure.message, "Critical step failed, aborting sequence");
                    first_failure = Some((step.name, failure));
                }
            }
        }

        ExecutionReport {
            steps: records,
            succeeded: first_failure.is_none(),
            total_duration: start.elapsed(),
            first_failure,
        }
    }
}
