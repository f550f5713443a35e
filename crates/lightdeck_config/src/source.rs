//! Document loading for card configuration.
//!
//! Configuration may arrive as a TOML file, a JSON file, or an in-memory JSON
//! value handed over by an embedding dashboard. All three are normalised into a
//! single `serde_json::Value` document so validation is written once.

use std::ops::Range;
use std::path::Path;

use crate::LoadError;
use crate::SourceInfo;

/// On-disk syntax of a configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    /// Pick the format from a file extension, defaulting to TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

/// A parsed configuration document together with where it came from
#[derive(Debug, Clone)]
pub struct Document {
    pub value: serde_json::Value,
    pub source: SourceInfo,
}

impl Document {
    /// Read and parse a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(path, content, Format::from_path(path))
    }

    /// Parse configuration text that is attributed to `path` in diagnostics
    pub fn parse(path: &Path, content: String, format: Format) -> Result<Self, LoadError> {
        let value = if content.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            match format {
                Format::Toml => toml::from_str::<serde_json::Value>(&content).map_err(|e| {
                    LoadError::Parse {
                        path: path.to_path_buf(),
                        error: e.to_string(),
                    }
                })?,
                Format::Json => serde_json::from_str(&content).map_err(|e| LoadError::Parse {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                })?,
            }
        };

        Ok(Self {
            value,
            source: SourceInfo {
                file_path: path.to_path_buf(),
                content,
            },
        })
    }

    /// True when the document has no top-level keys at all
    pub fn is_empty(&self) -> bool {
        match &self.value {
            serde_json::Value::Object(map) => map.is_empty(),
            serde_json::Value::Null => true,
            _ => false,
        }
    }
}

impl SourceInfo {
    /// Find the byte span of the first definition of `key`.
    ///
    /// Recognises TOML table headers (`[key]`, `[[key]]`), TOML assignments
    /// (`key =`) and JSON object keys (`"key":`). The search is textual and
    /// only meant to give diagnostics something to underline.
    pub fn locate(&self, key: &str) -> Option<Range<usize>> {
        self.locate_nth(key, 0)
    }

    /// Like [`SourceInfo::locate`] but returns the `n`th definition, which is
    /// how array-of-table entries such as the third `[[groups]]` are found.
    pub fn locate_nth(&self, key: &str, n: usize) -> Option<Range<usize>> {
        let patterns = [
            format!("[[{}]]", key),
            format!("[{}]", key),
            format!("\"{}\"", key),
            format!("{} =", key),
            format!("{}=", key),
        ];

        patterns.iter().find_map(|pattern| {
            self.content
                .match_indices(pattern.as_str())
                .filter(|(start, _)| is_key_boundary(&self.content, *start))
                .nth(n)
                .map(|(start, m)| start..start + m.len())
        })
    }
}

/// A match only counts when it is not the tail of a longer identifier
fn is_key_boundary(content: &str, start: usize) -> bool {
    content[..start]
        .chars()
        .next_back()
        .map(|c| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn source(content: &str) -> SourceInfo {
        SourceInfo {
            file_path: PathBuf::from("card.toml"),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("card.json")), Format::Json);
        assert_eq!(Format::from_path(Path::new("card.JSON")), Format::Json);
        assert_eq!(Format::from_path(Path::new("card.toml")), Format::Toml);
        assert_eq!(Format::from_path(Path::new("card")), Format::Toml);
    }

    #[test]
    fn test_parse_toml_document() {
        let doc = Document::parse(
            Path::new("card.toml"),
            "bar_height = 40\n[[groups]]\nname = \"Kitchen\"\n".to_string(),
            Format::Toml,
        )
        .unwrap();

        assert_eq!(doc.value["bar_height"], 40);
        assert_eq!(doc.value["groups"][0]["name"], "Kitchen");
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_parse_json_document() {
        let doc = Document::parse(
            Path::new("card.json"),
            r#"{"groups": [{"name": "Hall", "entity": "light.hall"}]}"#.to_string(),
            Format::Json,
        )
        .unwrap();

        assert_eq!(doc.value["groups"][0]["entity"], "light.hall");
    }

    #[test]
    fn test_blank_document_is_empty() {
        let doc = Document::parse(Path::new("empty.toml"), "  \n".to_string(), Format::Toml)
            .unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_parse_error_names_file() {
        let err = Document::parse(
            Path::new("broken.toml"),
            "groups = [".to_string(),
            Format::Toml,
        )
        .unwrap_err();

        match err {
            LoadError::Parse { path, .. } => assert_eq!(path, PathBuf::from("broken.toml")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_locate_array_of_tables() {
        let src = source("[[groups]]\nname = \"A\"\n\n[[groups]]\nicon = \"mdi:x\"\n");
        assert_eq!(src.locate("groups"), Some(0..10));
        assert_eq!(src.locate_nth("groups", 1), Some(23..33));
        assert_eq!(src.locate_nth("groups", 2), None);
    }

    #[test]
    fn test_locate_assignment_ignores_longer_keys() {
        let src = source("max_padding = 3\npadding = 8\n");
        let span = src.locate("padding").unwrap();
        assert_eq!(&src.content[span], "padding =");
    }

    #[test]
    fn test_locate_json_key() {
        let src = source(r#"{"bar_height": "tall"}"#);
        assert_eq!(src.locate("bar_height"), Some(1..13));
    }
}
