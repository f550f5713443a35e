use std::ops::Range;
use std::path::PathBuf;

/// Source information for where a diagnostic came from
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub file_path: PathBuf,
    pub content: String,
}

/// A diagnostic message that can be either a warning or an error
#[derive(Debug, Clone)]
pub enum Diagnostic {
    Warning(Warning),
    Error(Error),
}

/// Warning messages that don't prevent config loading
#[derive(Debug, Clone)]
pub enum Warning {
    EmptyConfig { file_path: PathBuf },
    /// A value was malformed and has been skipped or replaced by its default.
    Ignored(IgnoredEntry),
}

/// A tolerated problem with a single configuration value
#[derive(Debug, Clone)]
pub struct IgnoredEntry {
    pub field_path: String,
    pub message: String,
    pub span: Option<Range<usize>>,
    pub source: Option<SourceInfo>,
}

/// Error messages that indicate problems with the config
#[derive(Debug, Clone)]
pub enum Error {
    Validation(ValidationError),
    Load(LoadError),
}

/// Error type for validation failures
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field_path: String,
    pub message: String,
    pub span: Option<Range<usize>>,
    pub source: Option<SourceInfo>,
}

/// Error type for config loading failures (parse errors, IO errors)
#[derive(Debug, Clone)]
pub enum LoadError {
    Io {
        path: PathBuf,
        error: String, // io::Error is not Clone
    },
    Parse {
        path: PathBuf,
        error: String, // toml/serde_json errors are not Clone
    },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io { path, error } => {
                write!(
                    f,
                    "\x1b[31mError\x1b[0m: Failed to read card config\n  ┌─ {}:1:1\n  │\n  = {}\n",
                    path.display(),
                    error
                )
            }
            LoadError::Parse { path, error } => {
                write!(
                    f,
                    "\x1b[31mError\x1b[0m: Failed to parse card config\n  ┌─ {}:1:1\n  │\n  = {}\n",
                    path.display(),
                    error
                )
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// A collection of diagnostics (warnings and/or errors)
#[derive(Debug, Clone)]
pub struct Diagnostics(pub Vec<Diagnostic>);

impl Diagnostics {
    /// Returns true if any collected diagnostic is an error
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    /// Iterate over the error diagnostics only
    pub fn errors(&self) -> impl Iterator<Item = &Error> {
        self.0.iter().filter_map(|d| match d {
            Diagnostic::Error(e) => Some(e),
            Diagnostic::Warning(_) => None,
        })
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format_diagnostics(&self.0))
    }
}

impl std::error::Error for Diagnostics {}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format_diagnostics(std::slice::from_ref(self)))
    }
}

impl Diagnostic {
    /// Build a validation error without location information
    pub fn error(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic::Error(Error::Validation(ValidationError {
            field_path: field_path.into(),
            message: message.into(),
            span: None,
            source: None,
        }))
    }

    /// Build an "ignored entry" warning without location information
    pub fn ignored(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic::Warning(Warning::Ignored(IgnoredEntry {
            field_path: field_path.into(),
            message: message.into(),
            span: None,
            source: None,
        }))
    }

    /// Attach a source file and span, unless one is already present
    pub fn located(mut self, span: Option<Range<usize>>, source: Option<&SourceInfo>) -> Self {
        let (slot_span, slot_source) = match &mut self {
            Diagnostic::Error(Error::Validation(v)) => (&mut v.span, &mut v.source),
            Diagnostic::Warning(Warning::Ignored(i)) => (&mut i.span, &mut i.source),
            _ => return self,
        };
        if slot_span.is_none() {
            *slot_span = span;
        }
        if slot_source.is_none() {
            *slot_source = source.cloned();
        }
        self
    }

    /// The dotted field path this diagnostic refers to, if any
    pub fn field_path(&self) -> Option<&str> {
        match self {
            Diagnostic::Error(Error::Validation(v)) => Some(&v.field_path),
            Diagnostic::Warning(Warning::Ignored(i)) => Some(&i.field_path),
            _ => None,
        }
    }

    /// Returns true if this diagnostic is an error
    pub fn is_error(&self) -> bool {
        matches!(self, Diagnostic::Error(_))
    }

    /// Returns true if this diagnostic is a warning
    pub fn is_warning(&self) -> bool {
        matches!(self, Diagnostic::Warning(_))
    }
}

/// Write one diagnostic entry: ariadne when we can point at the source, a
/// plain framed note otherwise.
fn write_entry(
    output: &mut Vec<u8>,
    kind: ariadne::ReportKind<'static>,
    title: String,
    message: &str,
    span: &Option<Range<usize>>,
    source: &Option<SourceInfo>,
) {
    use std::io::Write;

    use ariadne::Color;
    use ariadne::Label;
    use ariadne::Report;
    use ariadne::ReportKind;
    use ariadne::Source;

    let is_warning = matches!(kind, ReportKind::Warning);

    if let (Some(span), Some(source_info)) = (span, source) {
        let file_id = source_info.file_path.to_string_lossy().to_string();
        let report = Report::build(kind, (file_id.clone(), span.clone()))
            .with_message(title)
            .with_label(
                Label::new((file_id.clone(), span.clone()))
                    .with_message(message)
                    .with_color(if is_warning { Color::Yellow } else { Color::Red }),
            )
            .finish();

        let source = Source::from(source_info.content.clone());
        report.write((file_id, source), &mut *output).ok();
    } else {
        // Format manually since ariadne doesn't render notes well without source
        let file_path = source
            .as_ref()
            .map(|s| s.file_path.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        let label = if is_warning {
            "\x1b[33mWarning\x1b[0m"
        } else {
            "\x1b[31mError\x1b[0m"
        };

        writeln!(output, "{}: {}", label, title).ok();
        writeln!(output, "  ┌─ {}:1:1", file_path).ok();
        writeln!(output, "  │").ok();
        writeln!(output, "  = {}", message).ok();
        writeln!(output).ok();
    }
}

/// Format all diagnostics for display using Ariadne
pub fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    use std::io::Write;

    use ariadne::ReportKind;

    let mut output = Vec::new();

    for diagnostic in diagnostics {
        match diagnostic {
            Diagnostic::Warning(Warning::EmptyConfig { file_path }) => {
                let path = Some(SourceInfo {
                    file_path: file_path.clone(),
                    content: String::new(),
                });
                write_entry(
                    &mut output,
                    ReportKind::Warning,
                    "Empty card configuration".to_string(),
                    &format!(
                        "Config file '{}' is empty and defines no groups",
                        file_path.display()
                    ),
                    &None,
                    &path,
                );
            }
            Diagnostic::Warning(Warning::Ignored(entry)) => write_entry(
                &mut output,
                ReportKind::Warning,
                format!("Ignored value in '{}'", entry.field_path),
                &entry.message,
                &entry.span,
                &entry.source,
            ),
            Diagnostic::Error(Error::Validation(validation_error)) => write_entry(
                &mut output,
                ReportKind::Error,
                format!("Validation error in '{}'", validation_error.field_path),
                &validation_error.message,
                &validation_error.span,
                &validation_error.source,
            ),
            Diagnostic::Error(Error::Load(load_error)) => {
                write!(&mut output, "{}", load_error).ok();
            }
        }
    }

    String::from_utf8_lossy(&output).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Strip ANSI escape sequences so snapshot output is stable and readable.
    fn strip_ansi(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c2 in chars.by_ref() {
                    if c2 == 'm' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn test_diagnostic_is_error() {
        let error = Diagnostic::error("groups", "groups must be a non-empty list");
        assert!(error.is_error());
        assert!(!error.is_warning());
        assert_eq!(error.field_path(), Some("groups"));
    }

    #[test]
    fn test_diagnostic_is_warning() {
        let warning = Diagnostic::ignored("groups[0].lights[1]", "light entry has no entity");
        assert!(warning.is_warning());
        assert!(!warning.is_error());
    }

    #[test]
    fn test_located_keeps_existing_span() {
        let source = SourceInfo {
            file_path: PathBuf::from("/tmp/card.toml"),
            content: "[[groups]]\n".to_string(),
        };
        let diagnostic = Diagnostic::error("groups[0].name", "name is required")
            .located(Some(0..10), Some(&source))
            .located(Some(3..4), None);

        match diagnostic {
            Diagnostic::Error(Error::Validation(v)) => {
                assert_eq!(v.span, Some(0..10));
                assert_eq!(v.source.unwrap().file_path, PathBuf::from("/tmp/card.toml"));
            }
            other => panic!("unexpected diagnostic: {:?}", other),
        }
    }

    #[test]
    fn test_format_empty_config_warning() {
        let diagnostics = vec![Diagnostic::Warning(Warning::EmptyConfig {
            file_path: PathBuf::from("/tmp/empty.toml"),
        })];

        let output = format_diagnostics(&diagnostics);
        let expected = "\u{1b}[33mWarning\u{1b}[0m: Empty card configuration
  ┌─ /tmp/empty.toml:1:1
  │
  = Config file '/tmp/empty.toml' is empty and defines no groups

";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_format_validation_error_without_span() {
        let diagnostics = vec![Diagnostic::Error(Error::Validation(ValidationError {
            field_path: "groups".to_string(),
            message: "groups must be a non-empty list".to_string(),
            span: None,
            source: Some(SourceInfo {
                file_path: PathBuf::from("/tmp/card.toml"),
                content: String::new(),
            }),
        }))];

        let output = format_diagnostics(&diagnostics);
        let expected = "\u{1b}[31mError\u{1b}[0m: Validation error in 'groups'\n  ┌─ /tmp/card.toml:1:1\n  │\n  = groups must be a non-empty list\n\n";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_format_validation_error_with_span_mentions_message() {
        let content = "[[groups]]\nicon = \"mdi:sofa\"\n";
        let diagnostics = vec![Diagnostic::error("groups[0].name", "name is required")
            .located(
                Some(0..10),
                Some(&SourceInfo {
                    file_path: PathBuf::from("/tmp/card.toml"),
                    content: content.to_string(),
                }),
            )];

        let output = format_diagnostics(&diagnostics);
        assert!(output.contains("Validation error in 'groups[0].name'"));
        assert!(output.contains("name is required"));
        assert!(output.contains("/tmp/card.toml:1:1"));
    }

    #[test]
    fn test_format_multiple_diagnostics() {
        let diagnostics = vec![
            Diagnostic::ignored("bar_height", "expected an integer, using 48"),
            Diagnostic::error("groups[2]", "group entry must be a table"),
        ];

        let output = strip_ansi(&format_diagnostics(&diagnostics));
        insta::assert_snapshot!(output, @r"
        Warning: Ignored value in 'bar_height'
          ┌─ <unknown>:1:1
          │
          = expected an integer, using 48

        Error: Validation error in 'groups[2]'
          ┌─ <unknown>:1:1
          │
          = group entry must be a table
        ");
    }

    #[test]
    fn test_diagnostics_has_errors() {
        let warnings = Diagnostics(vec![Diagnostic::ignored("padding", "not an integer")]);
        assert!(!warnings.has_errors());
        assert_eq!(warnings.errors().count(), 0);

        let mixed = Diagnostics(vec![
            Diagnostic::ignored("padding", "not an integer"),
            Diagnostic::error("groups", "groups must be a non-empty list"),
        ]);
        assert!(mixed.has_errors());
        assert_eq!(mixed.errors().count(), 1);
    }

    #[test]
    fn test_load_error_display_io() {
        let error = LoadError::Io {
            path: PathBuf::from("/tmp/card.toml"),
            error: "file not found".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Failed to read"));
        assert!(display.contains("/tmp/card.toml"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_load_error_display_parse() {
        let error = LoadError::Parse {
            path: PathBuf::from("/tmp/card.json"),
            error: "expected value at line 1 column 1".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Failed to parse"));
        assert!(display.contains("/tmp/card.json"));
    }
}
