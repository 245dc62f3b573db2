use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use newscheck_common::{
    AlignmentLabel, ContextSet, CorroborationCount, HeadlineSubject, Signal, TopicResult, Verdict,
    VerdictSource, VeracitySignal,
};

use crate::stage::StageRecord;

/// Everything one run produced, ready to print as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub headline: String,
    /// Domain supplied with the article, if any.
    pub domain: Option<u32>,
    pub stages: Vec<StageRecord>,
    pub topic: Signal<TopicResult>,
    pub veracity: Signal<VeracitySignal>,
    pub context: Signal<ContextSet>,
    pub subject: Signal<HeadlineSubject>,
    pub alignment: Signal<AlignmentLabel>,
    pub corroboration: Signal<CorroborationCount>,
    /// Names of the signals that could not be computed.
    pub degraded: Vec<String>,
    pub verdict: Verdict,
    pub verdict_source: VerdictSource,
}

impl PipelineReport {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty() || self.verdict_source == VerdictSource::Fallback
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
