//! Conversion from a raw configuration document into [`CardConfig`].
//!
//! The document has already been parsed (TOML or JSON) into a
//! `serde_json::Value`; this pass walks it by hand so that every problem is
//! collected rather than stopping at the first one. Fatal problems become
//! errors, recoverable ones become warnings and the value is skipped or
//! defaulted.

use std::collections::HashMap;
use std::ops::Range;

use lightdeck_config::Diagnostic;
use lightdeck_config::SourceInfo;
use serde_json::Map;
use serde_json::Value;

use super::config::CardConfig;
use super::config::DEFAULT_BAR_HEIGHT;
use super::config::DEFAULT_GROUP_ICON;
use super::config::DEFAULT_PADDING;
use super::config::GroupSpec;
use super::config::LogLevel;
use super::config::LoggingConfig;
use super::config::ManualLight;
use super::config::ThemeConfig;
use crate::color::Rgb;

type Table = Map<String, Value>;

/// Convert a parsed document. Returns `None` when a fatal error was found;
/// the diagnostics then contain at least one error.
pub(super) fn convert(value: &Value) -> (Option<CardConfig>, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();

    let root = match value {
        Value::Object(root) => root,
        _ => {
            diagnostics.push(Diagnostic::error(
                "groups",
                "card configuration must be a table with a non-empty list of groups",
            ));
            return (None, diagnostics);
        }
    };

    let groups = convert_groups(root, &mut diagnostics);
    let bar_height = convert_dimension(root, "bar_height", 1, DEFAULT_BAR_HEIGHT, &mut diagnostics);
    let padding = convert_dimension(root, "padding", 0, DEFAULT_PADDING, &mut diagnostics);
    let theme = convert_theme(root, &mut diagnostics);
    let logging = convert_logging(root, &mut diagnostics);

    let config = groups.map(|groups| CardConfig {
        groups,
        bar_height,
        padding,
        theme,
        logging,
    });
    (config, diagnostics)
}

fn convert_groups(root: &Table, diagnostics: &mut Vec<Diagnostic>) -> Option<Vec<GroupSpec>> {
    let entries = match root.get("groups") {
        Some(Value::Array(entries)) if !entries.is_empty() => entries,
        _ => {
            diagnostics.push(Diagnostic::error("groups", "groups must be a non-empty list"));
            return None;
        }
    };

    let mut groups = Vec::with_capacity(entries.len());
    let mut failed = false;

    for (i, entry) in entries.iter().enumerate() {
        let path = format!("groups[{}]", i);
        let Value::Object(table) = entry else {
            diagnostics.push(Diagnostic::error(path, "group entry must be a table"));
            failed = true;
            continue;
        };

        match convert_group(&path, table, diagnostics) {
            Some(group) => groups.push(group),
            None => failed = true,
        }
    }

    (!failed).then_some(groups)
}

fn convert_group(path: &str, table: &Table, diagnostics: &mut Vec<Diagnostic>) -> Option<GroupSpec> {
    let name = match table.get("name") {
        Some(Value::String(name)) => Some(name.clone()),
        Some(_) => {
            diagnostics.push(Diagnostic::error(format!("{}.name", path), "name must be a string"));
            None
        }
        None => {
            diagnostics.push(Diagnostic::error(format!("{}.name", path), "name is required"));
            None
        }
    };

    let entity = optional_id(table, path, "entity", diagnostics);
    let lux_sensor = optional_id(table, path, "lux_sensor", diagnostics);
    let icon = optional_string(table, path, "icon", diagnostics).unwrap_or_else(|| DEFAULT_GROUP_ICON.to_string());

    let lights = match table.get("lights") {
        None => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .filter_map(|(j, entry)| convert_light(&format!("{}.lights[{}]", path, j), entry, diagnostics))
            .collect(),
        Some(_) => {
            diagnostics.push(Diagnostic::ignored(
                format!("{}.lights", path),
                "lights must be a list; ignoring",
            ));
            Vec::new()
        }
    };

    Some(GroupSpec {
        entity,
        name: name?,
        icon,
        lux_sensor,
        lights,
    })
}

/// A light is either a bare entity id or a table with an `entity` key.
fn convert_light(path: &str, entry: &Value, diagnostics: &mut Vec<Diagnostic>) -> Option<ManualLight> {
    match entry {
        Value::String(id) if !id.trim().is_empty() => Some(ManualLight::new(id.trim())),
        Value::Object(table) => match table.get("entity") {
            Some(Value::String(id)) if !id.trim().is_empty() => Some(ManualLight {
                entity: id.trim().to_string(),
                name: optional_string(table, path, "name", diagnostics),
                icon: optional_string(table, path, "icon", diagnostics),
            }),
            _ => {
                diagnostics.push(Diagnostic::ignored(path, "light entry has no entity id; skipping"));
                None
            }
        },
        _ => {
            diagnostics.push(Diagnostic::ignored(
                path,
                "light entry must be an entity id or a table with an entity key; skipping",
            ));
            None
        }
    }
}

/// An entity id field. Empty strings count as absent.
fn optional_id(table: &Table, path: &str, key: &str, diagnostics: &mut Vec<Diagnostic>) -> Option<String> {
    optional_string(table, path, key, diagnostics)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

fn optional_string(table: &Table, path: &str, key: &str, diagnostics: &mut Vec<Diagnostic>) -> Option<String> {
    match table.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            diagnostics.push(Diagnostic::ignored(
                format!("{}.{}", path, key),
                format!("{} must be a string; ignoring", key),
            ));
            None
        }
    }
}

fn convert_dimension(root: &Table, key: &str, min: u32, default: u32, diagnostics: &mut Vec<Diagnostic>) -> u32 {
    match root.get(key) {
        None => default,
        Some(value) => match value.as_u64().and_then(|v| u32::try_from(v).ok()) {
            Some(v) if v >= min => v,
            _ => {
                diagnostics.push(Diagnostic::ignored(
                    key,
                    format!("{} must be an integer of at least {}; using {}", key, min, default),
                ));
                default
            }
        },
    }
}

fn convert_theme(root: &Table, diagnostics: &mut Vec<Diagnostic>) -> ThemeConfig {
    let defaults = ThemeConfig::default();
    let table = match root.get("theme") {
        None => return defaults,
        Some(Value::Object(table)) => table,
        Some(_) => {
            diagnostics.push(Diagnostic::ignored("theme", "theme must be a table; using defaults"));
            return defaults;
        }
    };

    let mut color = |key: &str, default: Rgb| -> Rgb {
        let path = format!("theme.{}", key);
        match table.get(key) {
            None => default,
            Some(Value::String(hex)) => match Rgb::from_hex(hex) {
                Ok(rgb) => rgb,
                Err(e) => {
                    diagnostics.push(Diagnostic::ignored(path, format!("{}; using {}", e, default)));
                    default
                }
            },
            Some(_) => {
                diagnostics.push(Diagnostic::ignored(
                    path,
                    format!("expected a hex colour string; using {}", default),
                ));
                default
            }
        }
    };

    ThemeConfig {
        background: color("background", defaults.background),
        on_color: color("on_color", defaults.on_color),
    }
}

fn convert_logging(root: &Table, diagnostics: &mut Vec<Diagnostic>) -> LoggingConfig {
    let table = match root.get("logging") {
        None => return LoggingConfig::default(),
        Some(Value::Object(table)) => table,
        Some(_) => {
            diagnostics.push(Diagnostic::ignored("logging", "logging must be a table; using defaults"));
            return LoggingConfig::default();
        }
    };

    let level = table
        .get("level")
        .and_then(|v| parse_level("logging.level", v, diagnostics))
        .unwrap_or_default();

    let mut overrides = HashMap::new();
    match table.get("overrides") {
        None => {}
        Some(Value::Object(entries)) => {
            for (target, value) in entries {
                let path = format!("logging.overrides.{}", target);
                if let Some(level) = parse_level(&path, value, diagnostics) {
                    overrides.insert(target.clone(), level);
                }
            }
        }
        Some(_) => diagnostics.push(Diagnostic::ignored(
            "logging.overrides",
            "overrides must be a table of target = level",
        )),
    }

    LoggingConfig { level, overrides }
}

fn parse_level(path: &str, value: &Value, diagnostics: &mut Vec<Diagnostic>) -> Option<LogLevel> {
    match serde_json::from_value::<LogLevel>(value.clone()) {
        Ok(level) => Some(level),
        Err(_) => {
            diagnostics.push(Diagnostic::ignored(
                path,
                format!("unknown log level {}; expected trace, debug, info, warn or error", value),
            ));
            None
        }
    }
}

/// Attach a source span to a diagnostic by its field path.
///
/// `groups[2].lights[0]` points at the third `[[groups]]` header; anything
/// else points at its first path segment.
pub(super) fn locate(diagnostic: Diagnostic, source: Option<&SourceInfo>) -> Diagnostic {
    let Some(source) = source else {
        return diagnostic;
    };
    let span = diagnostic.field_path().and_then(|path| span_for(source, path));
    diagnostic.located(span, Some(source))
}

fn span_for(source: &SourceInfo, field_path: &str) -> Option<Range<usize>> {
    if let Some(rest) = field_path.strip_prefix("groups[") {
        let index: usize = rest.split(']').next()?.parse().ok()?;
        return source.locate_nth("groups", index);
    }

    let key = field_path.split('.').next_back()?;
    source.locate(key).or_else(|| {
        let head = field_path.split('.').next()?;
        source.locate(head)
    })
}
