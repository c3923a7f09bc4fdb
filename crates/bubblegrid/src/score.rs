//! Position-wise comparison of detected answers against the key.
//!
//! Binary per question: no partial credit, no negative marking. Blank
//! answers never match.

use std::fmt;

use crate::error::GradeError;
use crate::key::AnswerKey;
use crate::DetectionResult;

/// What to do when a sheet has a different number of questions than the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthPolicy {
    /// Compare over the shorter length; unmatched positions count as wrong.
    #[default]
    Truncate,
    /// Fail the sheet with [`GradeError::LengthMismatch`].
    Strict,
}

/// Correctness of one question.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuestionOutcome {
    /// 1-based question id.
    pub question: u32,
    /// Detected label; `None` for a blank answer or a question past the sheet.
    pub detected: Option<String>,
    /// Key label; `None` for a question past the key.
    pub expected: Option<String>,
    pub correct: bool,
}

/// Score of one sheet.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScoreRecord {
    /// Number of positions where detection and key agree.
    pub correct: usize,
    /// Number of key entries.
    pub total: usize,
    /// Per-question breakdown over the longer of the two sequences.
    pub outcomes: Vec<QuestionOutcome>,
}

impl ScoreRecord {
    /// `correct / total`, or 0 for an empty key.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

impl fmt::Display for ScoreRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

/// Count positions where `detected` equals `key`, over the shorter length.
pub fn count_matches<'a, D, K>(detected: D, key: K) -> usize
where
    D: IntoIterator<Item = Option<&'a str>>,
    K: IntoIterator<Item = &'a str>,
{
    detected
        .into_iter()
        .zip(key)
        .filter(|(d, k)| *d == Some(*k))
        .count()
}

/// Score a detection against the key.
pub fn score(
    detection: &DetectionResult,
    key: &AnswerKey,
    policy: LengthPolicy,
) -> Result<ScoreRecord, GradeError> {
    let n_detected = detection.answers.len();
    let n_key = key.len();

    if n_detected != n_key {
        match policy {
            LengthPolicy::Strict => {
                return Err(GradeError::LengthMismatch {
                    sheet: detection.sheet.clone(),
                    detected: n_detected,
                    key: n_key,
                });
            }
            LengthPolicy::Truncate => tracing::warn!(
                sheet = %detection.sheet,
                detected = n_detected,
                key = n_key,
                "answer count differs from key; scoring the common prefix"
            ),
        }
    }

    let correct = count_matches(
        detection.answers.iter().map(|a| a.label.as_deref()),
        key.answers().iter().map(String::as_str),
    );

    let outcomes = (0..n_detected.max(n_key))
        .map(|i| {
            let detected = detection.answers.get(i).and_then(|a| a.label.clone());
            let expected = key.answers().get(i).cloned();
            let correct = matches!((&detected, &expected), (Some(d), Some(e)) if d == e);
            QuestionOutcome {
                question: i as u32 + 1,
                detected,
                expected,
                correct,
            }
        })
        .collect();

    Ok(ScoreRecord {
        correct,
        total: n_key,
        outcomes,
    })
}
