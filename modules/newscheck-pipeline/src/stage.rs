use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::PipelineError;

/// Stages of one run, in the only order they may be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    Preprocessed,
    Scored,
    ContextRetrieved,
    SignalsComplete,
    Verdicted,
    Done,
}

impl PipelineStage {
    pub fn next(self) -> Option<PipelineStage> {
        use PipelineStage::*;
        match self {
            Start => Some(Preprocessed),
            Preprocessed => Some(Scored),
            Scored => Some(ContextRetrieved),
            ContextRetrieved => Some(SignalsComplete),
            SignalsComplete => Some(Verdicted),
            Verdicted => Some(Done),
            Done => None,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Start => "start",
            PipelineStage::Preprocessed => "preprocessed",
            PipelineStage::Scored => "scored",
            PipelineStage::ContextRetrieved => "context_retrieved",
            PipelineStage::SignalsComplete => "signals_complete",
            PipelineStage::Verdicted => "verdicted",
            PipelineStage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: PipelineStage,
    pub entered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    /// Last stage reached before the failure.
    pub at: PipelineStage,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Forward-only state machine for one run. Once failed it stays failed.
#[derive(Debug, Clone)]
pub struct StageTracker {
    run_id: Uuid,
    current: PipelineStage,
    trace: Vec<StageRecord>,
    failure: Option<StageFailure>,
}

impl StageTracker {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            current: PipelineStage::Start,
            trace: vec![StageRecord {
                stage: PipelineStage::Start,
                entered_at: Utc::now(),
            }],
            failure: None,
        }
    }

    pub fn current(&self) -> PipelineStage {
        self.current
    }

    pub fn trace(&self) -> &[StageRecord] {
        &self.trace
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        self.failure.as_ref()
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Enter `to`, which must be the stage right after the current one.
    /// Anything else fails the run.
    pub fn advance(&mut self, to: PipelineStage) -> Result<(), PipelineError> {
        if let Some(failure) = &self.failure {
            return Err(PipelineError::AlreadyFailed(failure.reason.clone()));
        }
        if self.current.next() != Some(to) {
            let err = PipelineError::InvalidTransition {
                from: self.current,
                to,
            };
            self.fail(err.to_string());
            return Err(err);
        }

        self.current = to;
        self.trace.push(StageRecord {
            stage: to,
            entered_at: Utc::now(),
        });
        info!(run_id = %self.run_id, stage = %to, "Stage entered");
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.failure.is_some() {
            return;
        }
        let reason = reason.into();
        error!(run_id = %self.run_id, stage = %self.current, %reason, "Run failed");
        self.failure = Some(StageFailure {
            at: self.current,
            reason,
            failed_at: Utc::now(),
        });
    }
}
