//! The task pipeline state machine.
//!
//! ```text
//! Intake -> Normalized -> Quizzing -> (caller answers) -> Graded -> MemoryUpdate
//!                     \-> Helping                              \-> Helping
//! ```
//!
//! The orchestrator keeps no state between [`Orchestrator::process`] and
//! [`Orchestrator::submit_quiz`]; the normalized task and quiz are handed to
//! the caller and come back with the answers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::StoreError;
use crate::generation::Generator;
use crate::grader;
use crate::help::HelpProducer;
use crate::mastery::MasteryTracker;
use crate::model::{
    HelpContent, MasteryUpdate, NextAgent, NormalizedTask, Quiz, QuizResult, RawTask,
};
use crate::normalizer::TaskNormalizer;
use crate::quiz::QuizProducer;

/// Pipeline states, used for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Intake,
    Normalized,
    Quizzing,
    Helping,
    Graded,
    MemoryUpdate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Intake => write!(f, "intake"),
            Stage::Normalized => write!(f, "normalized"),
            Stage::Quizzing => write!(f, "quizzing"),
            Stage::Helping => write!(f, "helping"),
            Stage::Graded => write!(f, "graded"),
            Stage::MemoryUpdate => write!(f, "memory_update"),
        }
    }
}

/// Result of [`Orchestrator::process`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum ProcessOutcome {
    /// Waiting for the caller's answers.
    Quiz {
        normalized: NormalizedTask,
        quiz: Quiz,
    },
    /// Terminal.
    Help {
        normalized: NormalizedTask,
        help: HelpContent,
    },
}

impl ProcessOutcome {
    pub fn normalized(&self) -> &NormalizedTask {
        match self {
            ProcessOutcome::Quiz { normalized, .. } | ProcessOutcome::Help { normalized, .. } => {
                normalized
            }
        }
    }
}

/// Result of [`Orchestrator::submit_quiz`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "lowercase")]
pub enum SubmitOutcome {
    Memory {
        memory: MasteryUpdate,
        grade: QuizResult,
    },
    Help {
        help: HelpContent,
        grade: QuizResult,
    },
}

impl SubmitOutcome {
    pub fn grade(&self) -> &QuizResult {
        match self {
            SubmitOutcome::Memory { grade, .. } | SubmitOutcome::Help { grade, .. } => grade,
        }
    }
}

/// Stage that follows normalization. Anything but a quiz request gets help,
/// including the `NetworkingAgent` route, which has no producer of its own.
pub fn route(next_agent: &NextAgent) -> Stage {
    match next_agent {
        NextAgent::QuizAgent => Stage::Quizzing,
        NextAgent::HelpAgent => Stage::Helping,
        NextAgent::NetworkingAgent | NextAgent::Unknown(_) => {
            tracing::info!(next_agent = %next_agent, "no producer for route, defaulting to help");
            Stage::Helping
        }
    }
}

fn enter(stage: Stage) {
    tracing::info!(stage = %stage, "stage entered");
}

/// Drives tasks through normalization, quiz or help, grading and mastery.
pub struct Orchestrator {
    normalizer: TaskNormalizer,
    quiz: QuizProducer,
    help: HelpProducer,
    tracker: Arc<MasteryTracker>,
}

impl Orchestrator {
    pub fn new(generator: Generator, tracker: Arc<MasteryTracker>) -> Self {
        Self {
            normalizer: TaskNormalizer::new(generator.clone()),
            quiz: QuizProducer::new(generator.clone()),
            help: HelpProducer::new(generator),
            tracker,
        }
    }

    pub fn tracker(&self) -> &Arc<MasteryTracker> {
        &self.tracker
    }

    /// Normalize a task and produce either a quiz or help.
    #[instrument(skip_all, fields(request_id = %Uuid::new_v4(), title = %raw.title))]
    pub async fn process(&self, raw: &RawTask) -> ProcessOutcome {
        enter(Stage::Intake);
        let normalized = self.normalizer.normalize(raw).await;
        enter(Stage::Normalized);

        match route(&normalized.next_agent) {
            Stage::Quizzing => {
                enter(Stage::Quizzing);
                let context_url = raw.context_url.as_deref();
                let quiz = self.quiz.produce(&normalized, context_url).await;
                ProcessOutcome::Quiz { normalized, quiz }
            }
            _ => {
                enter(Stage::Helping);
                let help = self.help.produce(&normalized).await;
                ProcessOutcome::Help { normalized, help }
            }
        }
    }

    /// Grade answers, then record mastery on a pass or produce help on a fail.
    ///
    /// Only a failed mastery save is returned as an error.
    #[instrument(
        skip_all,
        fields(request_id = %Uuid::new_v4(), title = %normalized.normalized_title)
    )]
    pub async fn submit_quiz(
        &self,
        normalized: &NormalizedTask,
        quiz: &Quiz,
        answers: &[Option<i64>],
    ) -> Result<SubmitOutcome, StoreError> {
        let grade = grader::grade(quiz, answers);
        enter(Stage::Graded);
        tracing::info!(score = grade.score, passed = grade.passed, "quiz graded");

        if grade.passed {
            enter(Stage::MemoryUpdate);
            let memory = self.tracker.update_from_quiz(normalized, &grade).await?;
            Ok(SubmitOutcome::Memory { memory, grade })
        } else {
            enter(Stage::Helping);
            let help = self.help.produce(normalized).await;
            Ok(SubmitOutcome::Help { help, grade })
        }
    }
}
