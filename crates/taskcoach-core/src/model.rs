//! Core data model types for taskcoach.
//!
//! Every record that crosses a stage boundary is an explicit type here. Wire
//! names are camelCase so the JSON shapes match what callers and stored
//! documents already use.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Pass threshold for a graded quiz (inclusive).
pub const PASS_THRESHOLD: f64 = 0.8;

/// A task as supplied by the caller, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// A resource the user is working from; quizzes should be based on it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_url: Option<String>,
    /// Free-form profile of the user (name, bio, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile: Option<serde_json::Value>,
}

/// Canonical, validated form of a task.
///
/// `normalized_title` is also the mastery key: two tasks with the same
/// normalized title are the same skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTask {
    pub normalized_title: String,
    pub normalized_description: String,
    pub category: String,
    pub keywords: Vec<String>,
    /// Estimated complexity, 1 to 10.
    pub complexity: u8,
    pub next_agent: NextAgent,
}

/// Stage the normalizer selected for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NextAgent {
    QuizAgent,
    HelpAgent,
    /// Declared by the schema but has no producer; routed to help.
    NetworkingAgent,
    /// Any other value the model produced.
    Unknown(String),
}

impl From<String> for NextAgent {
    fn from(s: String) -> Self {
        match s.as_str() {
            "QuizAgent" => NextAgent::QuizAgent,
            "HelpAgent" => NextAgent::HelpAgent,
            "NetworkingAgent" => NextAgent::NetworkingAgent,
            _ => NextAgent::Unknown(s),
        }
    }
}

impl From<NextAgent> for String {
    fn from(agent: NextAgent) -> Self {
        agent.to_string()
    }
}

impl fmt::Display for NextAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextAgent::QuizAgent => write!(f, "QuizAgent"),
            NextAgent::HelpAgent => write!(f, "HelpAgent"),
            NextAgent::NetworkingAgent => write!(f, "NetworkingAgent"),
            NextAgent::Unknown(other) => write!(f, "{other}"),
        }
    }
}

/// A multiple-choice quiz for one normalized task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub questions: Vec<Question>,
}

/// One quiz question with exactly four options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: u32,
}

impl Question {
    /// Number of options every question must carry.
    pub const OPTION_COUNT: usize = 4;

    /// Whether the question has four options and an in-range answer.
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == Self::OPTION_COUNT
            && (self.correct_index as usize) < Self::OPTION_COUNT
    }
}

/// Outcome of grading a quiz attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    /// Fraction of questions answered correctly, 0.0 to 1.0.
    pub score: f64,
    pub passed: bool,
    pub details: Vec<AnswerDetail>,
    pub next_agent: GradeRoute,
}

/// Per-question grading detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetail {
    pub question: String,
    pub user_answer: Option<i64>,
    pub correct_answer: u32,
    pub is_correct: bool,
}

/// Where a graded quiz goes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeRoute {
    MemoryAgent,
    HelpAgent,
}

/// Help content shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpContent {
    pub summary: String,
    pub steps: Vec<String>,
    pub resources: Vec<Resource>,
}

/// An external resource referenced by help content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub title: String,
    pub url: String,
}

/// Persistent mastery document: attempt history plus per-topic mastery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    /// Append-only log of graded attempts.
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
    /// Topic key (normalized title) to mastery in [0, 1].
    #[serde(default)]
    pub skills: BTreeMap<String, f64>,
}

/// One graded attempt recorded in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub title: String,
    pub score: f64,
    pub passed: bool,
    /// Written as RFC 3339; timestamps without an offset are read as UTC.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Parse an RFC 3339 timestamp, or a local ISO 8601 one with no offset
/// (`2025-01-01T10:00:00.123456`), which is taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|t| t.and_utc())
        })
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

/// Result of applying a quiz result to the mastery store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryUpdate {
    pub mastery: f64,
    pub passed: bool,
    pub next_agent: FollowUp,
}

/// What should follow a mastery update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowUp {
    None,
    HelpAgent,
}

/// A suggested next task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub reason: String,
}
