use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Input ---

/// A news article submitted for verification. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub headline: String,
    pub body: String,
    /// Outlet/platform id used to condition the veracity classifier.
    #[serde(default)]
    pub domain: Option<u32>,
}

impl Article {
    pub fn new(headline: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            body: body.into(),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: u32) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Headline followed by body, the text the verdict agent reads.
    pub fn full_text(&self) -> String {
        if self.headline.is_empty() {
            return self.body.clone();
        }
        format!("{}\n\n{}", self.headline, self.body)
    }
}

// --- Model signals ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicResult {
    pub topic_id: usize,
    pub probability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VeracitySignal {
    /// Probability that the article is authentic, in [0, 1].
    pub probability: f32,
    /// Domain the classifier was actually conditioned on.
    pub domain: u32,
    /// True when the caller gave no usable domain and the default was used.
    pub domain_substituted: bool,
}

// --- Retrieved context ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub title: String,
    pub snippet: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl ContextEntry {
    pub fn new(title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// The text searched for corroboration: title and snippet.
    pub fn text(&self) -> String {
        match (self.title.is_empty(), self.snippet.is_empty()) {
            (true, _) => self.snippet.clone(),
            (false, true) => self.title.clone(),
            (false, false) => format!("{}\n{}", self.title, self.snippet),
        }
    }
}

/// Ordered search results for a headline. Empty means nothing corroborates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextSet {
    entries: Vec<ContextEntry>,
}

impl ContextSet {
    pub fn new(entries: Vec<ContextEntry>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ContextEntry] {
        &self.entries
    }
}

impl FromIterator<ContextEntry> for ContextSet {
    fn from_iter<I: IntoIterator<Item = ContextEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// --- Agent signals ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CorroborationCount {
    pub times: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum AlignmentLabel {
    Aligned,
    #[serde(alias = "Not Aligned", alias = "not Aligned")]
    NotAligned,
}

impl fmt::Display for AlignmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentLabel::Aligned => write!(f, "Aligned"),
            AlignmentLabel::NotAligned => write!(f, "NotAligned"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum TopicCategory {
    Politics,
    Economics,
    Social,
}

/// What a headline is about, as judged by the classification agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HeadlineSubject {
    /// Who or what the news is about
    pub subject: String,
    /// The event described
    pub event: String,
    /// Field the news belongs to
    pub topic: TopicCategory,
}

// --- Verdict ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum VerdictCategory {
    Fake,
    Real,
}

impl fmt::Display for VerdictCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictCategory::Fake => write!(f, "Fake"),
            VerdictCategory::Real => write!(f, "Real"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub category: VerdictCategory,
    pub reasoning: String,
}

/// Who produced the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictSource {
    Agent,
    /// The aggregator was unavailable; the verdict was derived from the signals.
    Fallback,
}

// --- Signal ---

/// An upstream input to the verdict: either computed, or explicitly degraded
/// with the reason it could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Signal<T> {
    Computed { value: T },
    Degraded { reason: String },
}

impl<T> Signal<T> {
    pub fn computed(value: T) -> Self {
        Signal::Computed { value }
    }

    pub fn degraded(reason: impl Into<String>) -> Self {
        Signal::Degraded {
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Signal::Computed { value } => Some(value),
            Signal::Degraded { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Signal::Computed { value } => Some(value),
            Signal::Degraded { .. } => None,
        }
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Signal::Computed { .. } => None,
            Signal::Degraded { reason } => Some(reason),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Signal::Degraded { .. })
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Signal<U> {
        match self {
            Signal::Computed { value } => Signal::Computed { value: f(value) },
            Signal::Degraded { reason } => Signal::Degraded { reason },
        }
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for Signal<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Signal::computed(value),
            Err(e) => Signal::degraded(e.to_string()),
        }
    }
}
