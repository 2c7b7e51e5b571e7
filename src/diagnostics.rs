//! The stable diagnostic contract consumed by hosts (CLI, editors, etc).
//!
//! This mirrors `Diagnostic`/`LabeledSpan` from the original implementation,
//! with `Serialize` derived instead of a hand-written `to_json` method.

use serde::Serialize;

use crate::source_map::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Note,
    Help,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
            Severity::Help => "help",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelStyle {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Serialize)]
pub struct Label {
    pub span: Span,
    pub text: Option<String>,
    pub style: LabelStyle,
}

impl Label {
    pub fn primary(span: Span, text: impl Into<String>) -> Self {
        Self { span, text: Some(text.into()), style: LabelStyle::Primary }
    }

    pub fn secondary(span: Span, text: impl Into<String>) -> Self {
        Self { span, text: Some(text.into()), style: LabelStyle::Secondary }
    }
}

// `Span` itself doesn't need to serialize with field names matching the
// Python `to_json` shape exactly; downstream hosts only depend on this
// crate's own `Serialize` impl, not on byte-for-byte compatibility with the
// original.
impl Serialize for Span {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Span", 3)?;
        state.serialize_field("file_id", &self.file_id)?;
        state.serialize_field("start", &self.start)?;
        state.serialize_field("end", &self.end)?;
        state.end()
    }
}

/// A structured diagnostic: stable code, severity, message, labeled spans,
/// optional help text, and ordered notes. Exactly one label is marked
/// primary (enforced at construction).
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub code: &'static str,
    pub severity: Severity,
    pub message: String,
    pub labels: Vec<Label>,
    pub help: Option<String>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn new(code: &'static str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            labels: Vec::new(),
            help: None,
            notes: Vec::new(),
        }
    }

    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message)
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self.normalize_primary();
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Ensure exactly one label is primary: promote the first if none are,
    /// demote all but the first if more than one are.
    fn normalize_primary(&mut self) {
        let mut seen_primary = false;
        for label in &mut self.labels {
            if label.style == LabelStyle::Primary {
                if seen_primary {
                    label.style = LabelStyle::Secondary;
                } else {
                    seen_primary = true;
                }
            }
        }
        if !seen_primary {
            if let Some(first) = self.labels.first_mut() {
                first.style = LabelStyle::Primary;
            }
        }
    }

    pub fn primary_span(&self) -> Option<Span> {
        self.labels
            .iter()
            .find(|l| l.style == LabelStyle::Primary)
            .map(|l| l.span)
    }

    /// Render a one-line `code: message (path:line:col)` form, the only
    /// rendering this crate performs (pretty code-frame printing is a
    /// consumer's job).
    pub fn render_compact(&self, source_map: &crate::source_map::SourceMap) -> String {
        match self
            .primary_span()
            .and_then(|span| Some((source_map.get_file(span.file_id)?, span)))
        {
            Some((file, span)) => {
                let (start, _) = source_map.span_to_positions(span).unwrap_or((
                    crate::source_map::Position { line: 0, column: 0 },
                    crate::source_map::Position { line: 0, column: 0 },
                ));
                format!(
                    "{} [{}]: {} ({}:{}:{})",
                    self.severity,
                    self.code,
                    self.message,
                    file.path.display(),
                    start.line,
                    start.column
                )
            }
            None => format!("{} [{}]: {}", self.severity, self.code, self.message),
        }
    }
}
