//! Resolves component templates against note data into displayable content.
//!
//! Resolution is total: every template yields exactly one [`RenderedComponent`],
//! and every failure (missing path, unparsable date, unknown transform)
//! degrades to an empty or raw string instead of an error.

use crate::core::catalog::{CHART, DATE, IMAGE, TEXT_LONG, TEXT_SHORT};
use crate::core::component::{ComponentTemplate, ConfigMap, TransformName};
use crate::core::note::{ComponentData, NoteData};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

/// Maximum characters kept by the `truncate` transform before the ellipsis.
const TRUNCATE_LIMIT: usize = 100;

/// Where a rendered component's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentOrigin {
    DataMapping,
    ContentTemplate,
    Default,
    /// A `component_data` entry for the component.
    Override,
    /// Content stored inline on an instance by older records.
    Inline,
}

/// The final, displayable value of one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedComponent {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigMap>,
    pub content: String,
    pub origin: ContentOrigin,
}

/// One point consumed by the chart views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub x: Value,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    pub label: String,
    pub value: f64,
}

/// Content stored in a chart component before any data is bound to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPlaceholder {
    pub chart_type: String,
    #[serde(default)]
    pub points: Vec<ChartPoint>,
}

impl ChartPlaceholder {
    pub fn empty(chart_type: &str) -> Self {
        Self { chart_type: chart_type.to_string(), points: Vec::new() }
    }
}

/// Resolves every template against `data`, preserving order and length.
pub fn generate(templates: &[ComponentTemplate], data: &NoteData) -> Vec<RenderedComponent> {
    let tree = data.to_value();
    templates
        .iter()
        .map(|template| {
            let (content, origin) = resolve_template(template, &tree);
            RenderedComponent {
                id: template.id.clone(),
                component_type: template.component_type.clone(),
                title: template.title.clone(),
                config: template.config.clone(),
                content,
                origin,
            }
        })
        .collect()
}

/// Overwrites generated content with non-empty string values from `component_data`.
pub fn apply_overrides(rendered: &mut [RenderedComponent], component_data: &ComponentData) {
    for component in rendered.iter_mut() {
        let value = component_data
            .lookup(&component.id, &component.component_type, &component.title)
            .and_then(|entry| entry.non_empty_str());
        if let Some(value) = value {
            component.content = value.to_string();
            component.origin = ContentOrigin::Override;
        }
    }
}

/// Template defaults first, then explicit user overrides.
pub fn resolve_note(
    templates: &[ComponentTemplate],
    data: &NoteData,
    component_data: &ComponentData,
) -> Vec<RenderedComponent> {
    let mut rendered = generate(templates, data);
    apply_overrides(&mut rendered, component_data);
    rendered
}

fn resolve_template(template: &ComponentTemplate, tree: &Value) -> (String, ContentOrigin) {
    if let Some(mapping) = &template.data_mapping {
        let raw = resolve_path(tree, &mapping.source);
        let content = match mapping.transform.as_deref() {
            Some(name) => apply_transform(&raw, name),
            None => raw,
        };
        return (content, ContentOrigin::DataMapping);
    }
    if let Some(text) = &template.content_template {
        return (render_template(text, tree), ContentOrigin::ContentTemplate);
    }
    (default_content(template, tree), ContentOrigin::Default)
}

/// Looks up a dotted path (`"analysis.mood.score"`, `"images.0"`) in `tree`.
pub fn lookup_path<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(tree, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Resolves `path` and stringifies the result; a missing path yields `""`.
pub fn resolve_path(tree: &Value, path: &str) -> String {
    lookup_path(tree, path).map(stringify).unwrap_or_default()
}

/// Stringifies a JSON value for display. Arrays are comma-joined.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Applies the named transform to `raw`. Unknown names return `raw` unchanged.
pub fn apply_transform(raw: &str, name: &str) -> String {
    let Some(transform) = TransformName::parse(name) else {
        log::debug!("unknown transform '{name}', using raw value");
        return raw.to_string();
    };
    match transform {
        TransformName::Uppercase => raw.to_uppercase(),
        TransformName::Lowercase => raw.to_lowercase(),
        TransformName::Capitalize => capitalize(raw),
        TransformName::Date => format_timestamp(raw, "%Y-%m-%d"),
        TransformName::DateTime => format_timestamp(raw, "%Y-%m-%d %H:%M"),
        TransformName::Truncate => truncate(raw, TRUNCATE_LIMIT),
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([^{}]*?)\s*\}\}").expect("placeholder regex is valid"))
}

/// Substitutes every `{{path}}` in `template` from `tree`.
///
/// A single pass: substituted values are never re-scanned, so a value that
/// itself contains `{{…}}` is emitted literally.
pub fn render_template(template: &str, tree: &Value) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &regex::Captures<'_>| resolve_path(tree, &caps[1]))
        .into_owned()
}

/// Per-type fallback used when a template carries neither rule.
///
/// Text components bind to a note field when their title names one
/// (`标题`/title, `内容`/content, `来源`/source, `作者`/author, `时间`/time).
fn default_content(template: &ComponentTemplate, tree: &Value) -> String {
    match template.component_type.as_str() {
        TEXT_SHORT | TEXT_LONG => {
            let title = template.title.to_lowercase();
            let has = |keys: &[&str]| keys.iter().any(|k| title.contains(k));
            if has(&["title", "标题"]) {
                resolve_path(tree, "title")
            } else if has(&["content", "内容", "正文"]) {
                let body = resolve_path(tree, "content_text");
                if template.component_type == TEXT_SHORT {
                    first_sentence(&body)
                } else {
                    body
                }
            } else if has(&["source", "来源"]) {
                resolve_path(tree, "source")
            } else if has(&["author", "作者"]) {
                resolve_path(tree, "author")
            } else if has(&["time", "时间"]) {
                format_timestamp(&resolve_path(tree, "created_at"), "%Y-%m-%d %H:%M")
            } else {
                String::new()
            }
        }
        IMAGE => resolve_path(tree, "images"),
        DATE => {
            let upload = resolve_path(tree, "upload_time");
            if upload.is_empty() {
                resolve_path(tree, "created_at")
            } else {
                upload
            }
        }
        CHART => {
            let chart_type = template
                .config
                .as_ref()
                .and_then(|c| c.get("chartType"))
                .and_then(Value::as_str)
                .unwrap_or("bar");
            serde_json::to_string(&ChartPlaceholder::empty(chart_type)).unwrap_or_default()
        }
        _ => String::new(),
    }
}

fn first_sentence(text: &str) -> String {
    let text = text.trim();
    match text.find(['。', '！', '？', '.', '!', '?', '\n']) {
        Some(end) => {
            let terminator_len = text[end..].chars().next().map_or(0, char::len_utf8);
            text[..end + terminator_len].trim().to_string()
        }
        None => text.to_string(),
    }
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn truncate(raw: &str, limit: usize) -> String {
    if raw.chars().count() <= limit {
        return raw.to_string();
    }
    let kept: String = raw.chars().take(limit).collect();
    format!("{kept}...")
}

/// Parses RFC 3339, `YYYY-MM-DD[ HH:MM:SS]`, or Unix seconds/milliseconds.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    let n = raw.parse::<i64>().ok()?;
    // Anything past the year 5138 in seconds is taken to be milliseconds.
    let secs = if n.unsigned_abs() > 100_000_000_000 { n / 1000 } else { n };
    DateTime::<Utc>::from_timestamp(secs, 0).map(|d| d.naive_utc())
}

pub(crate) fn format_timestamp(raw: &str, format: &str) -> String {
    match parse_timestamp(raw) {
        Some(dt) => dt.format(format).to_string(),
        None => raw.to_string(),
    }
}
