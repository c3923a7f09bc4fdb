//! Grading session API.
//!
//! [`Grader`] owns the layout, the answer key and the configuration for one
//! grading session. Create it once (the key is validated up front), then grade
//! any number of sheets. A `Grader` holds no per-sheet state, so sheets can be
//! graded concurrently from shared references.

use image::{DynamicImage, GrayImage, RgbImage};
use rayon::prelude::*;

use crate::annotate::annotate;
use crate::config::GradeConfig;
use crate::error::GradeError;
use crate::key::AnswerKey;
use crate::layout::BubbleLayout;
use crate::resolve::{resolve, MarkStatus};
use crate::sampler::{decode_sheet, sample_layout, to_gray};
use crate::score::{score, ScoreRecord};
use crate::{DetectedAnswer, DetectionResult};

/// Raw sheet handed over by the upload/storage layer.
#[derive(Debug, Clone)]
pub struct SheetInput {
    /// Display identifier, usually the file name.
    pub sheet: String,
    /// Encoded image bytes (PNG, JPEG, ...).
    pub bytes: Vec<u8>,
}

impl SheetInput {
    pub fn new(sheet: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            sheet: sheet.into(),
            bytes,
        }
    }
}

/// Successful grading of one sheet.
#[derive(Debug, Clone)]
pub struct GradedSheet {
    pub detection: DetectionResult,
    pub score: ScoreRecord,
    /// Review overlay, when annotation is enabled.
    pub annotated: Option<RgbImage>,
}

/// Per-sheet batch entry; failures do not stop the batch.
#[derive(Debug)]
pub struct SheetOutcome {
    pub sheet: String,
    pub result: Result<GradedSheet, GradeError>,
}

/// One row of the cross-sheet summary table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SummaryRow {
    pub sheet: String,
    /// Space-joined detected answers; empty for a failed sheet.
    pub detected: String,
    /// `correct/total`; empty for a failed sheet.
    pub score: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<SheetOutcome>,
}

impl BatchReport {
    pub fn n_graded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn n_failed(&self) -> usize {
        self.outcomes.len() - self.n_graded()
    }

    /// Successfully graded sheets, in input order.
    pub fn graded(&self) -> impl Iterator<Item = &GradedSheet> + '_ {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    /// Tabular summary: one row per sheet, failures included.
    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        self.outcomes
            .iter()
            .map(|o| match &o.result {
                Ok(graded) => SummaryRow {
                    sheet: o.sheet.clone(),
                    detected: graded.detection.joined(),
                    score: graded.score.to_string(),
                    error: None,
                },
                Err(e) => SummaryRow {
                    sheet: o.sheet.clone(),
                    detected: String::new(),
                    score: String::new(),
                    error: Some(error_chain(e)),
                },
            })
            .collect()
    }
}

/// `Display` of an error followed by its sources.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        source = s.source();
    }
    msg
}

/// Grading session.
///
/// # Examples
///
/// ```no_run
/// use bubblegrid::{BubbleLayout, GradeConfig, Grader};
///
/// let grader = Grader::from_key_text(BubbleLayout::default(), "C\nA\n", GradeConfig::default())
///     .expect("valid key");
/// let bytes = std::fs::read("sheet.png").unwrap();
/// let graded = grader.grade_bytes("sheet.png", &bytes).unwrap();
/// println!("{} -> {}", graded.detection.joined(), graded.score);
/// ```
#[derive(Debug, Clone)]
pub struct Grader {
    layout: BubbleLayout,
    key: AnswerKey,
    config: GradeConfig,
}

impl Grader {
    /// Start a session. Fails with [`GradeError::KeyFormat`] when the key uses
    /// labels the layout does not define.
    pub fn new(layout: BubbleLayout, key: AnswerKey, config: GradeConfig) -> Result<Self, GradeError> {
        key.check_labels(layout.options())?;
        if key.len() != layout.n_questions() {
            tracing::warn!(
                key = key.len(),
                layout = layout.n_questions(),
                policy = ?config.length_policy,
                "answer key length differs from layout question count"
            );
        }
        tracing::info!(
            layout = %layout.name,
            questions = layout.n_questions(),
            options = %layout.options().joined(),
            key = key.len(),
            "grading session ready"
        );
        Ok(Self {
            layout,
            key,
            config,
        })
    }

    /// Parse the key text and start a session.
    pub fn from_key_text(
        layout: BubbleLayout,
        key_text: &str,
        config: GradeConfig,
    ) -> Result<Self, GradeError> {
        let key = AnswerKey::parse(key_text)?;
        Self::new(layout, key, config)
    }

    pub fn layout(&self) -> &BubbleLayout {
        &self.layout
    }

    pub fn key(&self) -> &AnswerKey {
        &self.key
    }

    pub fn config(&self) -> &GradeConfig {
        &self.config
    }

    /// Mutable access to configuration for post-construction tuning.
    pub fn config_mut(&mut self) -> &mut GradeConfig {
        &mut self.config
    }

    /// Sample and resolve a grayscale sheet.
    pub fn detect(&self, sheet: &str, gray: &GrayImage) -> Result<DetectionResult, GradeError> {
        let (width, height) = gray.dimensions();
        let samples = sample_layout(gray, &self.layout).map_err(|v| {
            let option = self
                .layout
                .options()
                .get(v.option)
                .unwrap_or_default()
                .to_string();
            tracing::error!(
                sheet,
                question = v.question,
                option = %option,
                rect = %v.rect,
                width,
                height,
                "bubble outside image; layout does not match this sheet template"
            );
            GradeError::Bounds {
                sheet: sheet.to_string(),
                question: v.question,
                option,
                rect: v.rect,
                width,
                height,
            }
        })?;

        let options = self.layout.options();
        let answers: Vec<DetectedAnswer> = samples
            .into_iter()
            .filter_map(|s| {
                // Validated layouts never yield an empty darkness vector.
                let r = resolve(&s.darkness, &self.config.resolve)?;
                let label = r.option.and_then(|o| options.get(o)).map(str::to_string);
                Some(DetectedAnswer {
                    question: s.question,
                    option: r.option,
                    label,
                    status: r.status,
                    darkness: s.darkness,
                    margin: r.margin,
                })
            })
            .collect();

        for a in answers.iter().filter(|a| a.status != MarkStatus::Marked) {
            tracing::warn!(
                sheet,
                question = a.question,
                status = ?a.status,
                margin = ?a.margin,
                "question needs review"
            );
        }

        Ok(DetectionResult {
            sheet: sheet.to_string(),
            image_size: [width, height],
            answers,
        })
    }

    /// Grade a decoded sheet image.
    pub fn grade_image(&self, sheet: &str, image: &DynamicImage) -> Result<GradedSheet, GradeError> {
        let gray = to_gray(image);
        let detection = self.detect(sheet, &gray)?;
        let score = score(&detection, &self.key, self.config.length_policy)?;
        let annotated = self
            .config
            .annotate
            .enable
            .then(|| annotate(image, &self.layout, &detection.answers, &self.config.annotate));

        tracing::debug!(
            sheet,
            detected = %detection.joined(),
            score = %score,
            "sheet graded"
        );
        Ok(GradedSheet {
            detection,
            score,
            annotated,
        })
    }

    /// Decode and grade raw sheet bytes.
    pub fn grade_bytes(&self, sheet: &str, bytes: &[u8]) -> Result<GradedSheet, GradeError> {
        let image = decode_sheet(bytes).map_err(|source| {
            tracing::warn!(sheet, error = %source, "cannot decode sheet image");
            GradeError::Decode {
                sheet: sheet.to_string(),
                source,
            }
        })?;
        self.grade_image(sheet, &image)
    }

    /// Grade every sheet; a failing sheet becomes a failed outcome and the
    /// rest of the batch continues.
    pub fn grade_batch(&self, sheets: &[SheetInput]) -> BatchReport {
        let grade_one = |input: &SheetInput| SheetOutcome {
            sheet: input.sheet.clone(),
            result: self.grade_bytes(&input.sheet, &input.bytes),
        };

        let parallel = self.config.batch.should_use_parallel(sheets.len());
        let outcomes: Vec<SheetOutcome> = if parallel {
            sheets.par_iter().map(grade_one).collect()
        } else {
            sheets.iter().map(grade_one).collect()
        };

        let report = BatchReport { outcomes };
        tracing::info!(
            sheets = sheets.len(),
            graded = report.n_graded(),
            failed = report.n_failed(),
            parallel,
            "batch complete"
        );
        let n_bounds = report
            .outcomes
            .iter()
            .filter(|o| matches!(o.result, Err(GradeError::Bounds { .. })))
            .count();
        if n_bounds > 0 {
            tracing::error!(
                n_bounds,
                layout = %self.layout.name,
                "sheets rejected by bounds check; verify the layout matches the scanned template"
            );
        }
        report
    }
}
