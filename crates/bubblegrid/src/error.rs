//! Error types for layout loading, answer-key parsing and sheet grading.
//!
//! Per-sheet failures ([`GradeError::Decode`], [`GradeError::Bounds`],
//! [`GradeError::LengthMismatch`]) carry the sheet identifier so a batch can
//! report them as failure rows. [`KeyFormatError`] is session-level: no sheet
//! is graded without a valid key.

use thiserror::Error;

use crate::layout::BubbleRect;

/// Problems found while parsing an answer key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyFormatError {
    /// The key has no answer lines at all.
    #[error("answer key is empty")]
    Empty,

    /// The key bytes are not valid UTF-8.
    #[error("answer key is not valid UTF-8")]
    NotUtf8,

    /// A blank line appears before the last answer.
    #[error("answer key line {line} is blank")]
    BlankLine {
        /// 1-based line number.
        line: usize,
    },

    /// A line holds more than one token.
    #[error("answer key line {line} holds '{token}', expected a single option label")]
    InvalidToken {
        /// 1-based line number.
        line: usize,
        /// Offending line content after trimming.
        token: String,
    },

    /// A token is not one of the layout's option labels.
    #[error("answer key line {line} holds '{token}', which is not one of [{options}]")]
    UnknownLabel {
        /// 1-based line number.
        line: usize,
        /// Offending (normalized) token.
        token: String,
        /// Space-joined option labels accepted by the layout.
        options: String,
    },
}

/// Problems found while building or loading a bubble layout.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// Layout file could not be read.
    #[error("failed to read layout file")]
    Io(#[from] std::io::Error),

    /// Layout JSON is malformed or has unexpected fields.
    #[error("malformed layout JSON")]
    Json(#[from] serde_json::Error),

    /// Layout content violates a structural invariant.
    #[error("invalid layout: {message}")]
    Invalid {
        /// What was wrong.
        message: String,
    },
}

impl LayoutError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Problems loading a grading configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),

    #[error("malformed config JSON")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while grading a session or a single sheet.
#[derive(Error, Debug)]
pub enum GradeError {
    /// Sheet bytes are not a decodable raster image.
    #[error("sheet '{sheet}': cannot decode image")]
    Decode {
        /// Sheet identifier supplied by the caller.
        sheet: String,
        /// Underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// A layout rectangle lies outside the sheet image.
    #[error(
        "sheet '{sheet}': question {question} option {option} bubble {rect} lies outside the {width}x{height} image (layout/template mismatch)"
    )]
    Bounds {
        /// Sheet identifier supplied by the caller.
        sheet: String,
        /// 1-based question id.
        question: u32,
        /// Option label of the offending bubble.
        option: String,
        /// Offending rectangle.
        rect: BubbleRect,
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },

    /// Detection and key lengths differ under the strict length policy.
    #[error("sheet '{sheet}': detected {detected} answers but the key has {key}")]
    LengthMismatch {
        /// Sheet identifier supplied by the caller.
        sheet: String,
        /// Number of detected answers.
        detected: usize,
        /// Number of key entries.
        key: usize,
    },

    /// The answer key is unusable; the whole session is aborted.
    #[error("answer key rejected")]
    KeyFormat(#[from] KeyFormatError),

    /// The layout is unusable.
    #[error("layout rejected")]
    Layout(#[from] LayoutError),
}

impl GradeError {
    /// Sheet identifier for per-sheet errors.
    pub fn sheet(&self) -> Option<&str> {
        match self {
            Self::Decode { sheet, .. }
            | Self::Bounds { sheet, .. }
            | Self::LengthMismatch { sheet, .. } => Some(sheet),
            Self::KeyFormat(_) | Self::Layout(_) => None,
        }
    }

    /// Short machine-friendly category name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode",
            Self::Bounds { .. } => "bounds",
            Self::LengthMismatch { .. } => "length_mismatch",
            Self::KeyFormat(_) => "key_format",
            Self::Layout(_) => "layout",
        }
    }
}
