//! Bubble layout: fixed per-question bubble rectangles for one sheet template.
//!
//! Layout JSON follows the `bubblegrid.layout.v1` schema. A layout lists either
//! explicit rectangles per question or a parametric `grid` from which the
//! rectangles are generated at load time:
//!
//! ```json
//! {
//!   "schema": "bubblegrid.layout.v1",
//!   "name": "quiz_4opt",
//!   "options": ["A", "B", "C", "D"],
//!   "questions": [[[10, 10, 20, 20], [40, 10, 20, 20], [70, 10, 20, 20], [100, 10, 20, 20]]]
//! }
//! ```
//!
//! Question ids are 1-based and follow list order.

use std::fmt;
use std::path::Path;

use crate::error::LayoutError;

const LAYOUT_SCHEMA_V1: &str = "bubblegrid.layout.v1";

const DEFAULT_NAME: &str = "bubblegrid_10q_4opt";
const DEFAULT_OPTIONS: [&str; 4] = ["A", "B", "C", "D"];
const DEFAULT_ORIGIN_PX: [u32; 2] = [100, 100];
const DEFAULT_N_QUESTIONS: usize = 10;
const DEFAULT_BUBBLE_SIZE_PX: [u32; 2] = [30, 30];
const DEFAULT_OPTION_PITCH_PX: u32 = 50;
const DEFAULT_QUESTION_PITCH_PX: u32 = 50;

/// Axis-aligned bubble rectangle in sheet pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct BubbleRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BubbleRect {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Exclusive right edge, or `None` on overflow.
    pub fn right(&self) -> Option<u32> {
        self.x.checked_add(self.w)
    }

    /// Exclusive bottom edge, or `None` on overflow.
    pub fn bottom(&self) -> Option<u32> {
        self.y.checked_add(self.h)
    }

    /// Number of pixels covered.
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    /// True when the whole rectangle lies inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        matches!(
            (self.right(), self.bottom()),
            (Some(r), Some(b)) if r <= width && b <= height
        )
    }
}

impl From<[u32; 4]> for BubbleRect {
    fn from(v: [u32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BubbleRect> for [u32; 4] {
    fn from(r: BubbleRect) -> Self {
        [r.x, r.y, r.w, r.h]
    }
}

impl fmt::Display for BubbleRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[x={}, y={}, w={}, h={}]", self.x, self.y, self.w, self.h)
    }
}

/// Ordered option labels; index `i` names the `i`-th bubble of every question.
///
/// Labels are trimmed and folded to uppercase on construction, so every label
/// that leaves the resolver is already in the same case as a parsed key.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct OptionLabels(Vec<String>);

impl OptionLabels {
    pub fn new<I, S>(labels: I) -> Result<Self, LayoutError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels: Vec<String> = labels
            .into_iter()
            .map(|s| normalize_label(s.as_ref()))
            .collect();

        if labels.is_empty() {
            return Err(LayoutError::invalid("options must not be empty"));
        }
        for (i, label) in labels.iter().enumerate() {
            if label.is_empty() || label.chars().any(char::is_whitespace) {
                return Err(LayoutError::invalid(format!(
                    "option {} must be a single non-empty token",
                    i
                )));
            }
            if labels[..i].contains(label) {
                return Err(LayoutError::invalid(format!(
                    "duplicate option label '{}'",
                    label
                )));
            }
        }
        Ok(Self(labels))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Label at option index `idx`.
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.0.get(idx).map(String::as_str)
    }

    /// Option index of `label` (exact match on a normalized label).
    pub fn position(&self, label: &str) -> Option<usize> {
        self.0.iter().position(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(String::as_str)
    }

    /// Labels joined with single spaces, for messages.
    pub fn joined(&self) -> String {
        self.0.join(" ")
    }
}

/// Case normalization shared by option labels and answer keys.
pub(crate) fn normalize_label(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Bubbles of one question, in option order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Question {
    /// 1-based question id.
    pub id: u32,
    pub bubbles: Vec<BubbleRect>,
}

/// Parametric grid: one question per row, options laid out left to right.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridSpec {
    /// Top-left corner of question 1, option 0.
    pub origin_px: [u32; 2],
    pub n_questions: usize,
    /// Bubble `[width, height]`.
    pub bubble_size_px: [u32; 2],
    /// Horizontal step between consecutive options.
    pub option_pitch_px: u32,
    /// Vertical step between consecutive questions.
    pub question_pitch_px: u32,
}

impl GridSpec {
    fn generate(&self, n_options: usize) -> Result<Vec<Vec<BubbleRect>>, LayoutError> {
        let overflow = || LayoutError::invalid("grid coordinates overflow u32");
        let mut questions = Vec::with_capacity(self.n_questions);
        for q in 0..self.n_questions {
            let dy = u32::try_from(q)
                .ok()
                .and_then(|q| q.checked_mul(self.question_pitch_px))
                .ok_or_else(overflow)?;
            let y = self.origin_px[1].checked_add(dy).ok_or_else(overflow)?;
            let mut bubbles = Vec::with_capacity(n_options);
            for o in 0..n_options {
                let dx = u32::try_from(o)
                    .ok()
                    .and_then(|o| o.checked_mul(self.option_pitch_px))
                    .ok_or_else(overflow)?;
                let x = self.origin_px[0].checked_add(dx).ok_or_else(overflow)?;
                bubbles.push(BubbleRect::new(
                    x,
                    y,
                    self.bubble_size_px[0],
                    self.bubble_size_px[1],
                ));
            }
            questions.push(bubbles);
        }
        Ok(questions)
    }
}

/// Immutable bubble layout for one sheet template.
///
/// Passed explicitly into the sampler; never derived from a scanned image.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BubbleLayout {
    pub name: String,
    options: OptionLabels,
    questions: Vec<Question>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct BubbleLayoutSpecV1 {
    schema: String,
    name: String,
    options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    questions: Option<Vec<Vec<BubbleRect>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grid: Option<GridSpec>,
}

impl BubbleLayout {
    /// Build a layout from explicit rectangles; question ids follow list order.
    pub fn new<S: AsRef<str>>(
        name: impl Into<String>,
        options: &[S],
        questions: Vec<Vec<BubbleRect>>,
    ) -> Result<Self, LayoutError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LayoutError::invalid("layout name must not be empty"));
        }
        let options = OptionLabels::new(options)?;
        validate_questions(&questions, options.len())?;

        let questions = questions
            .into_iter()
            .enumerate()
            .map(|(i, bubbles)| Question {
                id: i as u32 + 1,
                bubbles,
            })
            .collect();

        Ok(Self {
            name,
            options,
            questions,
        })
    }

    /// Build a layout from a parametric grid.
    pub fn from_grid<S: AsRef<str>>(
        name: impl Into<String>,
        options: &[S],
        grid: &GridSpec,
    ) -> Result<Self, LayoutError> {
        let questions = grid.generate(options.len())?;
        Self::new(name, options, questions)
    }

    /// Load a layout from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, LayoutError> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    /// Parse a layout from JSON text.
    pub fn from_json_str(data: &str) -> Result<Self, LayoutError> {
        let spec: BubbleLayoutSpecV1 = serde_json::from_str(data)?;
        Self::from_layout_spec(spec)
    }

    /// Serialize as explicit-rectangle `bubblegrid.layout.v1` JSON.
    pub fn to_json_string(&self) -> Result<String, LayoutError> {
        let spec = BubbleLayoutSpecV1 {
            schema: LAYOUT_SCHEMA_V1.to_string(),
            name: self.name.clone(),
            options: self.options.iter().map(str::to_string).collect(),
            questions: Some(self.questions.iter().map(|q| q.bubbles.clone()).collect()),
            grid: None,
        };
        Ok(serde_json::to_string_pretty(&spec)?)
    }

    fn from_layout_spec(spec: BubbleLayoutSpecV1) -> Result<Self, LayoutError> {
        if spec.schema != LAYOUT_SCHEMA_V1 {
            return Err(LayoutError::invalid(format!(
                "unsupported layout schema '{}' (expected '{}')",
                spec.schema, LAYOUT_SCHEMA_V1
            )));
        }

        match (spec.questions, spec.grid) {
            (Some(questions), None) => Self::new(spec.name, spec.options.as_slice(), questions),
            (None, Some(grid)) => Self::from_grid(spec.name, spec.options.as_slice(), &grid),
            (Some(_), Some(_)) => Err(LayoutError::invalid(
                "layout must define either 'questions' or 'grid', not both",
            )),
            (None, None) => Err(LayoutError::invalid(
                "layout must define 'questions' or 'grid'",
            )),
        }
    }

    pub fn options(&self) -> &OptionLabels {
        &self.options
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Look up a question by its 1-based id.
    pub fn question(&self, id: u32) -> Option<&Question> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.questions.get(idx)
    }

    pub fn n_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn n_options(&self) -> usize {
        self.options.len()
    }

    /// Smallest `[width, height]` image that contains every bubble.
    pub fn required_size(&self) -> [u32; 2] {
        self.bubbles().fold([0, 0], |acc, r| {
            // Overflow is rejected at construction.
            [
                acc[0].max(r.x + r.w),
                acc[1].max(r.y + r.h),
            ]
        })
    }

    /// True when every bubble lies inside a `width` x `height` image.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.bubbles().all(|r| r.fits_within(width, height))
    }

    fn bubbles(&self) -> impl Iterator<Item = &BubbleRect> + '_ {
        self.questions.iter().flat_map(|q| q.bubbles.iter())
    }
}

impl Default for BubbleLayout {
    fn default() -> Self {
        let grid = GridSpec {
            origin_px: DEFAULT_ORIGIN_PX,
            n_questions: DEFAULT_N_QUESTIONS,
            bubble_size_px: DEFAULT_BUBBLE_SIZE_PX,
            option_pitch_px: DEFAULT_OPTION_PITCH_PX,
            question_pitch_px: DEFAULT_QUESTION_PITCH_PX,
        };
        Self::from_grid(DEFAULT_NAME, &DEFAULT_OPTIONS, &grid)
            .expect("default layout spec must be valid")
    }
}

fn validate_questions(questions: &[Vec<BubbleRect>], n_options: usize) -> Result<(), LayoutError> {
    if questions.is_empty() {
        return Err(LayoutError::invalid("layout must have at least one question"));
    }
    if u32::try_from(questions.len()).is_err() {
        return Err(LayoutError::invalid("too many questions"));
    }

    for (qi, bubbles) in questions.iter().enumerate() {
        let qid = qi + 1;
        if bubbles.len() != n_options {
            return Err(LayoutError::invalid(format!(
                "question {} has {} bubbles but there are {} options",
                qid,
                bubbles.len(),
                n_options
            )));
        }
        for (oi, rect) in bubbles.iter().enumerate() {
            if rect.w == 0 || rect.h == 0 {
                return Err(LayoutError::invalid(format!(
                    "question {} option {} bubble {} has zero size",
                    qid, oi, rect
                )));
            }
            if rect.right().is_none() || rect.bottom().is_none() {
                return Err(LayoutError::invalid(format!(
                    "question {} option {} bubble {} overflows pixel coordinates",
                    qid, oi, rect
                )));
            }
        }
    }

    Ok(())
}
