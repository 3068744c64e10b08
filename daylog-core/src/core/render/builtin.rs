//! Renderers for the built-in component types.

use super::helpers::{
    badge, component_shell, field_row, html_escape, list, not_set, render_markdown_to_html, select,
    text_input, textarea, view_text,
};
use super::{route_input, ChangeSink, ComponentRenderer, ViewFragment, CONTENT_FIELD};
use crate::core::catalog::{
    ComponentCatalog, AI_CUSTOM, AUDIO, CHART, DATE, FILE, IMAGE, NUMBER, TEXT_LONG, TEXT_SHORT, VIDEO,
};
use crate::core::component::ComponentInstance;
use crate::core::content::{format_timestamp, ChartPlaceholder};
use std::sync::Arc;

pub(super) fn builtin_renderers() -> Vec<Arc<dyn ComponentRenderer>> {
    let catalog = ComponentCatalog::builtin();
    vec![
        Arc::new(TextRenderer::short()),
        Arc::new(TextRenderer::long()),
        Arc::new(DateRenderer),
        Arc::new(NumberRenderer),
        Arc::new(MediaRenderer::new(IMAGE)),
        Arc::new(MediaRenderer::new(VIDEO)),
        Arc::new(MediaRenderer::new(AUDIO)),
        Arc::new(MediaRenderer::new(FILE)),
        Arc::new(AiCustomRenderer),
        Arc::new(ChartRenderer::new(catalog)),
    ]
}

fn shell(instance: &ComponentInstance, inner: &str) -> ViewFragment {
    ViewFragment(component_shell(&instance.id, &instance.component_type, &instance.title, inner))
}

fn placeholder_for(instance: &ComponentInstance) -> String {
    instance
        .config_str("placeholder")
        .map_or_else(|| format!("请输入{}", instance.title), str::to_string)
}

/// Short (single-line) and long (Markdown) text.
#[derive(Debug, Clone, Copy)]
pub struct TextRenderer {
    component_type: &'static str,
    multiline: bool,
}

impl TextRenderer {
    pub fn short() -> Self {
        Self { component_type: TEXT_SHORT, multiline: false }
    }

    pub fn long() -> Self {
        Self { component_type: TEXT_LONG, multiline: true }
    }
}

impl ComponentRenderer for TextRenderer {
    fn component_type(&self) -> &str {
        self.component_type
    }

    fn render(&self, instance: &ComponentInstance, is_editing: bool) -> ViewFragment {
        let content = instance.content_str();
        let inner = match (is_editing, self.multiline) {
            (true, false) => text_input(&instance.id, CONTENT_FIELD, "text", content, &placeholder_for(instance)),
            (true, true) => textarea(&instance.id, CONTENT_FIELD, content, &placeholder_for(instance)),
            (false, _) if content.trim().is_empty() => not_set(),
            (false, false) => view_text(content),
            (false, true) => format!(
                "<div class=\"dl-view-markdown\">{}</div>",
                render_markdown_to_html(content)
            ),
        };
        shell(instance, &inner)
    }
}

/// ISO date-time values.
#[derive(Debug, Clone, Copy)]
pub struct DateRenderer;

impl ComponentRenderer for DateRenderer {
    fn component_type(&self) -> &str {
        DATE
    }

    fn render(&self, instance: &ComponentInstance, is_editing: bool) -> ViewFragment {
        let content = instance.content_str();
        let inner = if is_editing {
            let value = format_timestamp(content, "%Y-%m-%dT%H:%M");
            text_input(&instance.id, CONTENT_FIELD, "datetime-local", &value, "")
        } else if content.trim().is_empty() {
            not_set()
        } else {
            view_text(&format_timestamp(content, "%Y-%m-%d %H:%M"))
        };
        shell(instance, &inner)
    }
}

/// Numeric strings with an optional `unit` config key.
#[derive(Debug, Clone, Copy)]
pub struct NumberRenderer;

impl ComponentRenderer for NumberRenderer {
    fn component_type(&self) -> &str {
        NUMBER
    }

    fn render(&self, instance: &ComponentInstance, is_editing: bool) -> ViewFragment {
        let content = instance.content_str();
        let inner = if is_editing {
            text_input(&instance.id, CONTENT_FIELD, "number", content, &placeholder_for(instance))
        } else if content.trim().is_empty() {
            not_set()
        } else {
            match instance.config_str("unit") {
                Some(unit) => view_text(&format!("{content} {unit}")),
                None => view_text(content),
            }
        };
        shell(instance, &inner)
    }

    fn apply_input(&self, instance: &ComponentInstance, field: &str, value: &str, sink: &mut dyn ChangeSink) {
        if field == CONTENT_FIELD && !value.trim().is_empty() && value.trim().parse::<f64>().is_err() {
            log::debug!("ignoring non-numeric input for component {}", instance.id);
            return;
        }
        route_input(instance, field, value.trim(), sink);
    }
}

/// Image, video, audio and file components; content is a comma-joined list
/// of file names or URLs.
#[derive(Debug, Clone, Copy)]
pub struct MediaRenderer {
    component_type: &'static str,
}

impl MediaRenderer {
    pub fn new(component_type: &'static str) -> Self {
        Self { component_type }
    }
}

fn split_media(content: &str) -> Vec<&str> {
    content.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
}

impl ComponentRenderer for MediaRenderer {
    fn component_type(&self) -> &str {
        self.component_type
    }

    fn render(&self, instance: &ComponentInstance, is_editing: bool) -> ViewFragment {
        let items = split_media(instance.content_str());
        let inner = if is_editing {
            let mut out = text_input(&instance.id, CONTENT_FIELD, "text", &items.join(","), "用逗号分隔多个文件");
            if !items.is_empty() {
                out.push_str(&list(&items));
            }
            out
        } else if items.is_empty() {
            not_set()
        } else if self.component_type == IMAGE {
            let images: String = items
                .iter()
                .map(|src| format!("<img class=\"dl-view-image\" src=\"{}\">", html_escape(src)))
                .collect();
            format!("<div class=\"dl-view-gallery\">{images}</div>")
        } else {
            list(&items)
        };
        shell(instance, &inner)
    }

    fn apply_input(&self, instance: &ComponentInstance, field: &str, value: &str, sink: &mut dyn ChangeSink) {
        if field == CONTENT_FIELD {
            sink.content_changed(&instance.id, split_media(value).join(","));
        } else {
            route_input(instance, field, value, sink);
        }
    }
}

/// AI-generated block driven by a `prompt` config key.
#[derive(Debug, Clone, Copy)]
pub struct AiCustomRenderer;

impl ComponentRenderer for AiCustomRenderer {
    fn component_type(&self) -> &str {
        AI_CUSTOM
    }

    fn render(&self, instance: &ComponentInstance, is_editing: bool) -> ViewFragment {
        let prompt = instance.config_str("prompt").unwrap_or("");
        let content = instance.content_str();
        let body = if content.trim().is_empty() {
            not_set()
        } else {
            format!("<div class=\"dl-view-markdown\">{}</div>", render_markdown_to_html(content))
        };
        let inner = if is_editing {
            format!("{}{}", textarea(&instance.id, "config.prompt", prompt, "描述希望 AI 生成的内容"), body)
        } else if prompt.is_empty() {
            body
        } else {
            format!("{}{}", field_row("提示词", prompt), body)
        };
        shell(instance, &inner)
    }
}

/// Chart block; the sub-type lives in the `chartType` config key.
#[derive(Debug, Clone, Copy)]
pub struct ChartRenderer {
    catalog: ComponentCatalog,
}

impl ChartRenderer {
    pub fn new(catalog: ComponentCatalog) -> Self {
        Self { catalog }
    }
}

impl ComponentRenderer for ChartRenderer {
    fn component_type(&self) -> &str {
        CHART
    }

    fn render(&self, instance: &ComponentInstance, is_editing: bool) -> ViewFragment {
        let chart_type = instance.config_str("chartType").unwrap_or("bar");
        let inner = if is_editing {
            let options: Vec<(&str, &str)> = self.catalog.chart_types().iter().map(|c| (c.id, c.label)).collect();
            select(&instance.id, "config.chartType", &options, chart_type)
        } else {
            let label = self.catalog.resolve_chart_type(chart_type).map_or(chart_type, |c| c.label);
            match serde_json::from_str::<ChartPlaceholder>(instance.content_str()) {
                Ok(chart) if !chart.points.is_empty() => format!(
                    "<div class=\"dl-view-chart\" data-chart-type=\"{}\">{}{}</div>",
                    html_escape(chart_type),
                    badge(label, "blue"),
                    view_text(&format!("{} 个数据点", chart.points.len()))
                ),
                _ => format!("{}{}", badge(label, "gray"), not_set()),
            }
        };
        shell(instance, &inner)
    }

    fn apply_input(&self, instance: &ComponentInstance, field: &str, value: &str, sink: &mut dyn ChangeSink) {
        if field == "config.chartType" && self.catalog.resolve_chart_type(value).is_none() {
            log::debug!("ignoring unknown chart type '{value}' for component {}", instance.id);
            return;
        }
        route_input(instance, field, value, sink);
    }
}
