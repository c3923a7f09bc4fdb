//! bubblegrid — bubble-sheet (optical mark) answer detection and scoring.
//!
//! Bubble coordinates are fixed by a pre-registered sheet template; there is no
//! alignment step. The pipeline stages are:
//!
//! 1. **Sample** – mean grayscale intensity over every layout rectangle.
//! 2. **Resolve** – darkest bubble per question, lowest index on ties, with
//!    optional blank / ambiguous gates.
//! 3. **Score** – position-wise comparison against the answer key.
//! 4. **Annotate** – optional overlay of the chosen bubbles for review.
//!
//! # Public API
//! - [`Grader`] as the primary entry point (one per grading session)
//! - [`BubbleLayout`] and [`AnswerKey`] as session inputs
//! - [`GradeConfig`] for tuning
//! - [`sample_layout`], [`resolve`] and [`score`] as standalone stages

mod annotate;
mod config;
mod error;
mod grader;
mod key;
mod layout;
mod resolve;
mod sampler;
mod score;

#[cfg(test)]
pub(crate) mod test_utils;

pub use annotate::{annotate, encode_png, AnnotateConfig};
pub use config::{BatchStrategy, GradeConfig};
pub use error::{ConfigError, GradeError, KeyFormatError, LayoutError};
pub use grader::{BatchReport, GradedSheet, Grader, SheetInput, SheetOutcome, SummaryRow};
pub use key::AnswerKey;
pub use layout::{BubbleLayout, BubbleRect, GridSpec, OptionLabels, Question};
pub use resolve::{argmin_first, resolve, MarkStatus, Resolution, ResolveConfig};
pub use sampler::{check_bounds, decode_sheet, sample_layout, to_gray, BoundsViolation, QuestionSample};
pub use score::{count_matches, score, LengthPolicy, QuestionOutcome, ScoreRecord};

/// Placeholder shown for a blank answer in joined answer strings.
pub const BLANK_ANSWER: &str = "-";

/// Resolved answer for one question.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectedAnswer {
    /// 1-based question id.
    pub question: u32,
    /// Chosen option index, or None for a blank answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<usize>,
    /// Chosen option label, or None for a blank answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub status: MarkStatus,
    /// Mean intensity per option bubble (lower = darker).
    pub darkness: Vec<f64>,
    /// Runner-up minus darkest intensity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
}

/// Detected answers for a single sheet.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DetectionResult {
    /// Caller-supplied sheet identifier (file name or similar).
    pub sheet: String,
    /// Image dimensions [width, height].
    pub image_size: [u32; 2],
    /// One entry per layout question, in question order.
    pub answers: Vec<DetectedAnswer>,
}

impl DetectionResult {
    /// Detected labels in question order; blank answers are `None`.
    pub fn labels(&self) -> Vec<Option<&str>> {
        self.answers.iter().map(|a| a.label.as_deref()).collect()
    }

    /// Space-joined labels with [`BLANK_ANSWER`] for blanks.
    pub fn joined(&self) -> String {
        self.answers
            .iter()
            .map(|a| a.label.as_deref().unwrap_or(BLANK_ANSWER))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Number of answers with the given status.
    pub fn count_status(&self, status: MarkStatus) -> usize {
        self.answers.iter().filter(|a| a.status == status).count()
    }
}
