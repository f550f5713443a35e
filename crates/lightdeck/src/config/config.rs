use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;

use lightdeck_config::Diagnostic;
use lightdeck_config::Diagnostics;
use lightdeck_config::Document;
use lightdeck_config::LoadError;
use lightdeck_config::SourceInfo;
use lightdeck_config::Validate;
use lightdeck_config::Warning;
use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;

use super::partial;
use crate::color::Rgb;

pub const DEFAULT_BAR_HEIGHT: u32 = 48;
pub const DEFAULT_PADDING: u32 = 8;
pub const DEFAULT_GROUP_ICON: &str = "mdi:lightbulb-group";
pub const DEFAULT_BACKGROUND: Rgb = Rgb::new(0x1c, 0x1c, 0x1c);
pub const DEFAULT_ON_COLOR: Rgb = Rgb::new(0xff, 0xc1, 0x4d);

/// Declarative card configuration, immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct CardConfig {
    pub groups: Vec<GroupSpec>,

    /// Row height in px
    pub bar_height: u32,

    /// Row padding in px
    pub padding: u32,

    pub theme: ThemeConfig,
    pub logging: LoggingConfig,
}

/// One configured group row.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    /// The group entity; `None` for a purely manual collection of lights.
    pub entity: Option<String>,
    pub name: String,
    pub icon: String,
    pub lux_sensor: Option<String>,
    pub lights: Vec<ManualLight>,
}

/// A light listed by hand under a group, with optional display overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualLight {
    pub entity: String,
    pub name: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeConfig {
    /// Panel background; "off" rows are filled with a slightly lighter shade.
    pub background: Rgb,

    /// Fill for lights that are on but report no colour.
    pub on_color: Rgb,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: LogLevel,

    pub overrides: HashMap<String, LogLevel>,
}

/// Fatal configuration problem. The card must not render.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("{0}")]
    Load(#[from] LoadError),

    #[error("{0}")]
    Invalid(Diagnostics),
}

impl ConfigurationError {
    /// All diagnostics (errors and any warnings collected alongside them)
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            ConfigurationError::Load(e) => {
                vec![Diagnostic::Error(lightdeck_config::Error::Load(e.clone()))]
            }
            ConfigurationError::Invalid(d) => d.0.clone(),
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
            on_color: DEFAULT_ON_COLOR,
        }
    }
}

impl CardConfig {
    /// Config with default layout, theme and logging around `groups`.
    pub fn with_groups(groups: Vec<GroupSpec>) -> Self {
        Self {
            groups,
            bar_height: DEFAULT_BAR_HEIGHT,
            padding: DEFAULT_PADDING,
            theme: ThemeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML or JSON file
    ///
    /// Returns Ok((CardConfig, warnings)) when the config is usable. All
    /// errors are collected and reported together, compiler-style.
    pub fn from_file(path: impl AsRef<Path>) -> Result<(Self, Vec<Diagnostic>), ConfigurationError> {
        let document = Document::from_file(path)?;
        Self::from_document(&document)
    }

    /// Load configuration handed over in memory by an embedding host
    pub fn from_value(value: &serde_json::Value) -> Result<(Self, Vec<Diagnostic>), ConfigurationError> {
        Self::convert(value, None, Vec::new())
    }

    pub fn from_document(document: &Document) -> Result<(Self, Vec<Diagnostic>), ConfigurationError> {
        let mut diagnostics = Vec::new();
        if document.is_empty() {
            diagnostics.push(Diagnostic::Warning(Warning::EmptyConfig {
                file_path: document.source.file_path.clone(),
            }));
        }
        Self::convert(&document.value, Some(&document.source), diagnostics)
    }

    fn convert(
        value: &serde_json::Value,
        source: Option<&SourceInfo>,
        mut diagnostics: Vec<Diagnostic>,
    ) -> Result<(Self, Vec<Diagnostic>), ConfigurationError> {
        let (config, conversion) = partial::convert(value);
        diagnostics.extend(conversion);

        if let Some(ref config) = config {
            diagnostics.extend(config.validate());
        }

        let diagnostics: Vec<Diagnostic> = diagnostics
            .into_iter()
            .map(|d| partial::locate(d, source))
            .collect();

        match config {
            Some(config) if !diagnostics.iter().any(Diagnostic::is_error) => Ok((config, diagnostics)),
            _ => Err(ConfigurationError::Invalid(Diagnostics(diagnostics))),
        }
    }

    /// Height hint for the host layout, in dashboard grid rows.
    pub fn card_size(&self) -> usize {
        3 + self.groups.len() * 3
    }
}

impl Validate for CardConfig {
    fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for (i, group) in self.groups.iter().enumerate() {
            if group.entity.is_none() && group.lights.is_empty() {
                diagnostics.push(Diagnostic::ignored(
                    format!("groups[{}]", i),
                    "group has neither an entity nor lights and controls nothing",
                ));
            }

            let mut seen = HashSet::new();
            for (j, light) in group.lights.iter().enumerate() {
                if !seen.insert(light.entity.as_str()) {
                    diagnostics.push(Diagnostic::ignored(
                        format!("groups[{}].lights[{}]", i, j),
                        format!("light '{}' is listed more than once; the first entry is used", light.entity),
                    ));
                }
            }
        }

        diagnostics
    }
}

impl GroupSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            entity: None,
            name: name.into(),
            icon: DEFAULT_GROUP_ICON.to_string(),
            lux_sensor: None,
            lights: Vec::new(),
        }
    }

    pub fn entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity = Some(entity_id.into());
        self
    }

    pub fn lux_sensor(mut self, entity_id: impl Into<String>) -> Self {
        self.lux_sensor = Some(entity_id.into());
        self
    }

    pub fn light(mut self, light: ManualLight) -> Self {
        self.lights.push(light);
        self
    }
}

impl ManualLight {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity: entity_id.into(),
            name: None,
            icon: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}
