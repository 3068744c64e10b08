//! HTML building blocks shared by the component renderers.
//!
//! Every helper returns an HTML string styled with `dl-view-*` CSS classes.
//! Plain-text arguments are escaped here; arguments named `content` or
//! `inner` are already-built HTML and are inserted as-is. The frontend
//! sanitizes the final markup again before mounting it.

use pulldown_cmark::{html as md_html, Options, Parser};

/// Escapes HTML special characters in a user-supplied string.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Converts a CommonMark string to HTML with strikethrough and tables enabled.
pub fn render_markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(text, options);
    let mut html_output = String::new();
    md_html::push_html(&mut html_output, parser);
    html_output
}

/// Outer wrapper every renderer emits, carrying the component id and type.
pub fn component_shell(id: &str, component_type: &str, title: &str, inner: &str) -> String {
    format!(
        "<div class=\"dl-view-component\" data-component-id=\"{}\" data-component-type=\"{}\">\
           <div class=\"dl-view-component-title\">{}</div>\
           {}\
         </div>",
        html_escape(id),
        html_escape(component_type),
        html_escape(title),
        inner
    )
}

/// Whitespace-preserving paragraph.
pub fn view_text(text: &str) -> String {
    format!("<p class=\"dl-view-text\">{}</p>", html_escape(text))
}

/// Placeholder shown in display mode when a component has no value.
pub fn not_set() -> String {
    "<span class=\"dl-view-empty\">未设置</span>".to_string()
}

/// Single key-value row.
pub fn field_row(label: &str, value: &str) -> String {
    format!(
        "<div class=\"dl-view-field-row\">\
           <span class=\"dl-view-field-label\">{}</span>\
           <span class=\"dl-view-field-value\">{}</span>\
         </div>",
        html_escape(label),
        html_escape(value)
    )
}

/// Renders items as a bullet list. Items are escaped.
pub fn list(items: &[&str]) -> String {
    let mut out = String::from("<ul class=\"dl-view-list\">");
    for item in items {
        out.push_str(&format!("<li>{}</li>", html_escape(item)));
    }
    out.push_str("</ul>");
    out
}

/// Colored pill badge; unknown colors fall back to the neutral badge.
pub fn badge(text: &str, color: &str) -> String {
    let class = match color {
        "red"    => "dl-view-badge dl-view-badge-red",
        "green"  => "dl-view-badge dl-view-badge-green",
        "blue"   => "dl-view-badge dl-view-badge-blue",
        "yellow" => "dl-view-badge dl-view-badge-yellow",
        "gray"   => "dl-view-badge dl-view-badge-gray",
        _        => "dl-view-badge",
    };
    format!("<span class=\"{class}\">{}</span>", html_escape(text))
}

/// Preformatted block, used for raw JSON dumps.
pub fn code_block(text: &str) -> String {
    format!("<pre class=\"dl-view-code\">{}</pre>", html_escape(text))
}

// ── Form controls ─────────────────────────────────────────────────────────────

/// Single-line input bound to form field `field` of component `id`.
pub fn text_input(id: &str, field: &str, input_type: &str, value: &str, placeholder: &str) -> String {
    format!(
        "<input class=\"dl-edit-input\" type=\"{}\" data-component-id=\"{}\" name=\"{}\" value=\"{}\" placeholder=\"{}\">",
        html_escape(input_type),
        html_escape(id),
        html_escape(field),
        html_escape(value),
        html_escape(placeholder)
    )
}

/// Multi-line input bound to form field `field` of component `id`.
pub fn textarea(id: &str, field: &str, value: &str, placeholder: &str) -> String {
    format!(
        "<textarea class=\"dl-edit-textarea\" data-component-id=\"{}\" name=\"{}\" placeholder=\"{}\">{}</textarea>",
        html_escape(id),
        html_escape(field),
        html_escape(placeholder),
        html_escape(value)
    )
}

/// Drop-down of `(value, label)` pairs with `selected` preselected.
pub fn select(id: &str, field: &str, options: &[(&str, &str)], selected: &str) -> String {
    let mut out = format!(
        "<select class=\"dl-edit-select\" data-component-id=\"{}\" name=\"{}\">",
        html_escape(id),
        html_escape(field)
    );
    for (value, label) in options {
        let marker = if *value == selected { " selected" } else { "" };
        out.push_str(&format!(
            "<option value=\"{}\"{marker}>{}</option>",
            html_escape(value),
            html_escape(label)
        ));
    }
    out.push_str("</select>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<b>\"x\" & y</b>"), "&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;");
    }

    #[test]
    fn test_markdown_renders_tables_and_strikethrough() {
        let html = render_markdown_to_html("~~old~~\n\n| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<del>old</del>"));
        assert!(html.contains("<table>"));
    }

    #[test]
    fn test_select_marks_selected_option() {
        let html = select("c1", "config.chartType", &[("bar", "柱状图"), ("gantt", "甘特图")], "gantt");
        assert!(html.contains("<option value=\"gantt\" selected>甘特图</option>"));
        assert!(html.contains("<option value=\"bar\">柱状图</option>"));
    }

    #[test]
    fn test_badge_unknown_color_is_neutral() {
        assert_eq!(badge("x", "magenta"), "<span class=\"dl-view-badge\">x</span>");
    }
}
