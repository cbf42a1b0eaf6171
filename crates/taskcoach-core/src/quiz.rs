//! Quiz generation.

use serde_json::json;
use tracing::instrument;

use crate::error::GenerationError;
use crate::generation::Generator;
use crate::model::{NormalizedTask, Question, Quiz};

const STAGE: &str = "quiz";

const REQUIRED_KEYS: &[&str] = &["questions"];

/// Number of questions requested per quiz.
pub const QUESTION_COUNT: usize = 5;

/// Produces a multiple-choice quiz for a normalized task.
pub struct QuizProducer {
    generator: Generator,
}

impl QuizProducer {
    pub fn new(generator: Generator) -> Self {
        Self { generator }
    }

    /// Always returns a gradeable quiz; see [`fallback`].
    ///
    /// When `context_url` is given the questions are based on that resource.
    #[instrument(skip_all, fields(title = %task.normalized_title))]
    pub async fn produce(&self, task: &NormalizedTask, context_url: Option<&str>) -> Quiz {
        let prompt = build_prompt(task, context_url);
        let generated = self
            .generator
            .generate_record::<Quiz>(STAGE, prompt, schema(), REQUIRED_KEYS)
            .await
            .and_then(keep_well_formed);

        match generated {
            Ok(quiz) => {
                tracing::debug!(questions = quiz.questions.len(), "quiz generated");
                quiz
            }
            Err(e) => {
                tracing::warn!(error = %e, "quiz generation failed, using fallback");
                fallback()
            }
        }
    }
}

/// One-question quiz used whenever generation fails.
pub fn fallback() -> Quiz {
    Quiz {
        questions: vec![Question {
            question: "Fallback question: Which option is correct?".to_string(),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_index: 0,
        }],
    }
}

/// Drop questions without exactly four options or with an out-of-range
/// answer; a quiz left with no questions is rejected.
fn keep_well_formed(quiz: Quiz) -> Result<Quiz, GenerationError> {
    let total = quiz.questions.len();
    let questions: Vec<Question> = quiz
        .questions
        .into_iter()
        .filter(Question::is_well_formed)
        .collect();

    if questions.len() < total {
        tracing::warn!(
            dropped = total - questions.len(),
            "dropped malformed quiz questions"
        );
    }
    if questions.is_empty() {
        return Err(GenerationError::Rejected("quiz has no usable questions".into()));
    }
    Ok(Quiz { questions })
}

fn build_prompt(task: &NormalizedTask, context_url: Option<&str>) -> String {
    let mut prompt = format!(
        "Write a {QUESTION_COUNT}-question multiple-choice quiz that checks real understanding \
         of the task below. Every question has exactly 4 options and one correct answer, given \
         as a 0-based correctIndex.\n\n\
         Return JSON: {{\"questions\": [{{\"question\": string, \"options\": [4 strings], \
         \"correctIndex\": integer}}]}}\n\n\
         Task:\nTitle: {}\nDescription: {}\nKeywords: {}\n",
        task.normalized_title,
        task.normalized_description,
        task.keywords.join(", ")
    );
    if let Some(url) = context_url.map(str::trim).filter(|u| !u.is_empty()) {
        prompt.push_str(&format!(
            "\nThe user is working from this resource: {url}\nBase the questions on it.\n"
        ));
    }
    prompt
}

fn schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "questions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "question": {"type": "string"},
                        "options": {"type": "array", "items": {"type": "string"}},
                        "correctIndex": {"type": "integer"}
                    },
                    "required": ["question", "options", "correctIndex"]
                }
            }
        },
        "required": REQUIRED_KEYS,
    })
}
