use serde::Serialize;
use serde_json::{Map, Value};

use crate::db::Question;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub score: usize,
    pub total: usize,
}

/// Submission key for a question: `q<id>`.
pub fn answer_key(question_id: i64) -> String {
    format!("q{question_id}")
}

/// Counts exact matches between submitted letters and stored correct options.
/// Missing, null or non-string answers are simply wrong.
pub fn score_submission(questions: &[Question], answers: &Map<String, Value>) -> Score {
    let score = questions
        .iter()
        .filter(|q| {
            let submitted = answers.get(&answer_key(q.id)).and_then(Value::as_str);
            match (submitted, q.correct_option) {
                (Some(given), Some(correct)) => given == correct.as_str(),
                _ => false,
            }
        })
        .count();
    Score {
        score,
        total: questions.len(),
    }
}

/// Lenient body parsing: anything but a JSON object counts as no answers.
pub fn parse_answers(body: &[u8]) -> Map<String, Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}
