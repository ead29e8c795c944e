use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Half-open byte range into the compiled source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompileErrorCode {
    // Lexical
    UnknownToken,
    UnterminatedString,
    // Syntactic
    UnexpectedToken,
    UnknownElementKind,
    MissingElementBody,
    // Binding / element shape
    DuplicateName,
    NameNotFound,
    BindingError,
    InvalidElementContext,
    InvalidName,
    InvalidAlias,
    InvalidBody,
    // Settings, per element kind
    UnknownTableSetting,
    UnknownColumnSetting,
    UnknownIndexSetting,
    UnknownRefSetting,
    UnknownEnumValueSetting,
    UnknownTableGroupSetting,
    UnknownTablePartialSetting,
    DuplicateTableSetting,
    DuplicateColumnSetting,
    DuplicateIndexSetting,
    DuplicateRefSetting,
    DuplicateEnumValueSetting,
    DuplicateTableGroupSetting,
    DuplicateTablePartialSetting,
    InvalidTableSettingValue,
    InvalidColumnSettingValue,
    InvalidIndexSettingValue,
    InvalidRefSettingValue,
    InvalidEnumValueSettingValue,
    InvalidTableGroupSettingValue,
    InvalidTablePartialSettingValue,
    // Records
    DuplicateRecordsForTable,
    RecordsArityMismatch,
    InvalidIntegerValue,
    NumericPrecisionExceeded,
    InvalidBooleanValue,
    InvalidDatetimeValue,
    InvalidRecordValue,
    StringLengthExceeded,
    EnumValueNotFound,
    UnqualifiedEnumValue,
    MissingPrimaryKeyColumn,
    NullInPrimaryKey,
    DuplicatePrimaryKey,
    DuplicateUniqueValue,
    NotNullViolated,
    ForeignKeyViolated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: CompileErrorCode,
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(code: CompileErrorCode, span: Span, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn warning(code: CompileErrorCode, span: Span, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Human-readable rendering in the `[line, col]` form used everywhere
    /// in this crate's messages.
    pub fn render(&self, source: &str) -> String {
        match self.span {
            Some(span) => {
                let (line, col) = line_col(source, span.start);
                format!(
                    "[line {}, col {}] {}: {} ({})",
                    line, col, self.severity, self.message, self.code
                )
            }
            None => format!("{}: {} ({})", self.severity, self.message, self.code),
        }
    }
}

/// 1-based line/column of a byte offset.
pub fn line_col(source: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_counts_from_one() {
        let src = "ab\ncd";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 3), (2, 1));
        assert_eq!(line_col(src, 4), (2, 2));
    }

    #[test]
    fn codes_render_screaming_snake() {
        assert_eq!(
            CompileErrorCode::DuplicateRecordsForTable.to_string(),
            "DUPLICATE_RECORDS_FOR_TABLE"
        );
        assert_eq!(CompileErrorCode::UnknownToken.to_string(), "UNKNOWN_TOKEN");
    }
}
