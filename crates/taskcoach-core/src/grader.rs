//! Quiz grading.
//!
//! Pure and deterministic: no IO, no generation calls.

use crate::model::{AnswerDetail, GradeRoute, Quiz, QuizResult, PASS_THRESHOLD};

/// Grade `answers` against `quiz`.
///
/// Answers are index-aligned with the questions. A missing trailing answer
/// counts as unanswered, extra answers are ignored, and an absent or
/// out-of-range answer is simply incorrect.
pub fn grade(quiz: &Quiz, answers: &[Option<i64>]) -> QuizResult {
    let details: Vec<AnswerDetail> = quiz
        .questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let user_answer = answers.get(i).copied().flatten();
            AnswerDetail {
                question: q.question.clone(),
                user_answer,
                correct_answer: q.correct_index,
                is_correct: user_answer == Some(i64::from(q.correct_index)),
            }
        })
        .collect();

    let correct = details.iter().filter(|d| d.is_correct).count();
    let score = if details.is_empty() {
        0.0
    } else {
        correct as f64 / details.len() as f64
    };
    let passed = score >= PASS_THRESHOLD;

    QuizResult {
        score,
        passed,
        details,
        next_agent: if passed {
            GradeRoute::MemoryAgent
        } else {
            GradeRoute::HelpAgent
        },
    }
}

/// Parse a comma-separated answer list such as `0,2,-,1`.
///
/// `-`, `_` and empty entries are unanswered.
pub fn parse_answers(input: &str) -> Result<Vec<Option<i64>>, String> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    input
        .split(',')
        .map(|s| match s.trim() {
            "" | "-" | "_" => Ok(None),
            n => n
                .parse::<i64>()
                .map(Some)
                .map_err(|_| format!("invalid answer: '{n}'")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Question;
    use proptest::prelude::*;

    fn quiz_with_answers(correct: &[u32]) -> Quiz {
        Quiz {
            questions: correct
                .iter()
                .enumerate()
                .map(|(i, &c)| Question {
                    question: format!("Q{i}"),
                    options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                    correct_index: c,
                })
                .collect(),
        }
    }

    #[test]
    fn four_of_four_passes() {
        let quiz = quiz_with_answers(&[0, 1, 2, 3]);
        let result = grade(&quiz, &[Some(0), Some(1), Some(2), Some(3)]);
        assert_eq!(result.score, 1.0);
        assert!(result.passed);
        assert_eq!(result.next_agent, GradeRoute::MemoryAgent);
    }

    #[test]
    fn four_of_five_is_exactly_threshold() {
        let quiz = quiz_with_answers(&[0, 1, 2, 3, 0]);
        let result = grade(&quiz, &[Some(0), Some(1), Some(2), Some(3), Some(1)]);
        assert_eq!(result.score, 0.8);
        assert!(result.passed);
    }

    #[test]
    fn three_of_five_fails() {
        let quiz = quiz_with_answers(&[0, 1, 2, 3, 0]);
        let result = grade(&quiz, &[Some(0), Some(1), Some(2), None, Some(3)]);
        assert_eq!(result.score, 0.6);
        assert!(!result.passed);
        assert_eq!(result.next_agent, GradeRoute::HelpAgent);
    }

    #[test]
    fn zero_questions_scores_zero() {
        let result = grade(&Quiz { questions: vec![] }, &[Some(0)]);
        assert_eq!(result.score, 0.0);
        assert!(!result.passed);
        assert!(result.details.is_empty());
    }

    #[test]
    fn missing_trailing_answers_are_unanswered() {
        let quiz = quiz_with_answers(&[1, 1, 1]);
        let result = grade(&quiz, &[Some(1)]);
        assert_eq!(result.details[1].user_answer, None);
        assert!(!result.details[2].is_correct);
        assert!((result.score - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_answers_are_incorrect() {
        let quiz = quiz_with_answers(&[0, 3]);
        let result = grade(&quiz, &[Some(-1), Some(7)]);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.details[0].user_answer, Some(-1));
        assert_eq!(result.details[1].correct_answer, 3);
    }

    #[test]
    fn parse_answer_list() {
        assert_eq!(
            parse_answers("0, 2,-,1,").unwrap(),
            vec![Some(0), Some(2), None, Some(1), None]
        );
        assert!(parse_answers("").unwrap().is_empty());
        assert!(parse_answers("a,1").is_err());
    }

    proptest! {
        #[test]
        fn score_is_exact_fraction_of_correct(
            pairs in proptest::collection::vec((0u32..4, any::<bool>()), 1..20)
        ) {
            let correct: Vec<u32> = pairs.iter().map(|(c, _)| *c).collect();
            let answers: Vec<Option<i64>> = pairs
                .iter()
                .map(|(c, right)| Some(if *right { *c as i64 } else { (*c as i64 + 1) % 4 }))
                .collect();
            let expected = pairs.iter().filter(|(_, right)| *right).count();

            let result = grade(&quiz_with_answers(&correct), &answers);
            prop_assert_eq!(result.score, expected as f64 / pairs.len() as f64);
            prop_assert_eq!(result.passed, result.score >= 0.8);
        }
    }
}
