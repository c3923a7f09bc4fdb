//! Answer key: one option label per line.
//!
//! Parsing owns case folding: every token is trimmed and uppercased here, the
//! same normalization applied to layout option labels.

use crate::error::KeyFormatError;
use crate::layout::{normalize_label, OptionLabels};

/// Reference answers, one normalized label per question in question order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct AnswerKey(Vec<String>);

impl AnswerKey {
    /// Parse key text. A UTF-8 BOM and trailing blank lines are ignored.
    pub fn parse(text: &str) -> Result<Self, KeyFormatError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        let n_used = lines
            .iter()
            .rposition(|l| !l.is_empty())
            .map_or(0, |last| last + 1);
        if n_used == 0 {
            return Err(KeyFormatError::Empty);
        }

        let answers = lines[..n_used]
            .iter()
            .enumerate()
            .map(|(i, line)| check_token(i + 1, line))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(answers))
    }

    /// Parse key bytes as UTF-8 text.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyFormatError> {
        let text = std::str::from_utf8(bytes).map_err(|_| KeyFormatError::NotUtf8)?;
        Self::parse(text)
    }

    /// Build a key from labels already in memory, one answer per label.
    ///
    /// Each label is checked on its own: blank labels are errors wherever they
    /// occur, and a label holding whitespace (a newline included) is rejected.
    pub fn from_labels<I, S>(labels: I) -> Result<Self, KeyFormatError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let answers = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| check_token(i + 1, label.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        if answers.is_empty() {
            return Err(KeyFormatError::Empty);
        }
        Ok(Self(answers))
    }

    /// Reject tokens that are not among `options`.
    pub fn check_labels(&self, options: &OptionLabels) -> Result<(), KeyFormatError> {
        match self
            .0
            .iter()
            .enumerate()
            .find(|(_, token)| options.position(token).is_none())
        {
            Some((i, token)) => Err(KeyFormatError::UnknownLabel {
                line: i + 1,
                token: token.clone(),
                options: options.joined(),
            }),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Expected label for a 1-based question id.
    pub fn answer(&self, question: u32) -> Option<&str> {
        let idx = usize::try_from(question).ok()?.checked_sub(1)?;
        self.0.get(idx).map(String::as_str)
    }

    pub fn answers(&self) -> &[String] {
        &self.0
    }
}

/// Validate one answer token (1-based `line`) and normalize it.
fn check_token(line: usize, raw: &str) -> Result<String, KeyFormatError> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(KeyFormatError::BlankLine { line });
    }
    if token.chars().any(char::is_whitespace) {
        return Err(KeyFormatError::InvalidToken {
            line,
            token: token.to_string(),
        });
    }
    Ok(normalize_label(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_uppercases() {
        let key = AnswerKey::parse("c\n a \nD\r\nb\n").expect("valid key");
        assert_eq!(key.answers(), ["C", "A", "D", "B"]);
        assert_eq!(key.answer(1), Some("C"));
        assert_eq!(key.answer(4), Some("B"));
        assert_eq!(key.answer(5), None);
        assert_eq!(key.answer(0), None);
    }

    #[test]
    fn empty_content_is_rejected() {
        assert_eq!(AnswerKey::parse(""), Err(KeyFormatError::Empty));
        assert_eq!(AnswerKey::parse("\n \n\t\n"), Err(KeyFormatError::Empty));
        assert_eq!(AnswerKey::from_bytes(b""), Err(KeyFormatError::Empty));
    }

    #[test]
    fn trailing_blank_lines_are_ignored() {
        let key = AnswerKey::parse("A\nB\n\n\n").expect("valid key");
        assert_eq!(key.len(), 2);
    }

    #[test]
    fn interior_blank_line_is_rejected() {
        assert_eq!(
            AnswerKey::parse("A\n\nB\n"),
            Err(KeyFormatError::BlankLine { line: 2 })
        );
    }

    #[test]
    fn multiple_tokens_on_a_line_are_rejected() {
        assert_eq!(
            AnswerKey::parse("A\nB C\n"),
            Err(KeyFormatError::InvalidToken {
                line: 2,
                token: "B C".to_string()
            })
        );
    }

    #[test]
    fn bom_is_stripped() {
        let key = AnswerKey::from_bytes("\u{feff}a\nb".as_bytes()).expect("valid key");
        assert_eq!(key.answers(), ["A", "B"]);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        assert_eq!(
            AnswerKey::from_bytes(&[0x41, 0x0a, 0xff, 0xfe]),
            Err(KeyFormatError::NotUtf8)
        );
    }

    #[test]
    fn unknown_label_is_reported_with_line() {
        let options = OptionLabels::new(["A", "B", "C", "D"]).expect("valid labels");
        let key = AnswerKey::parse("A\nE\nB").expect("valid key");
        let err = key.check_labels(&options).expect_err("E is unknown");
        assert_eq!(
            err,
            KeyFormatError::UnknownLabel {
                line: 2,
                token: "E".to_string(),
                options: "A B C D".to_string()
            }
        );
        assert!(AnswerKey::parse("d\nc")
            .expect("valid key")
            .check_labels(&options)
            .is_ok());
    }

    #[test]
    fn from_labels_normalizes() {
        let key = AnswerKey::from_labels(["c", "A"]).expect("valid key");
        assert_eq!(key.answers(), ["C", "A"]);
        assert_eq!(
            AnswerKey::from_labels(Vec::<String>::new()),
            Err(KeyFormatError::Empty)
        );
    }

    #[test]
    fn from_labels_keeps_one_answer_per_label() {
        assert_eq!(
            AnswerKey::from_labels(["A", ""]),
            Err(KeyFormatError::BlankLine { line: 2 })
        );
        assert_eq!(
            AnswerKey::from_labels(["A", " ", ""]),
            Err(KeyFormatError::BlankLine { line: 2 })
        );
        assert_eq!(
            AnswerKey::from_labels(["A\nB"]),
            Err(KeyFormatError::InvalidToken {
                line: 1,
                token: "A\nB".to_string()
            })
        );
        let key = AnswerKey::from_labels([" b ", "d"]).expect("valid key");
        assert_eq!(key.answers(), ["B", "D"]);
    }
}
