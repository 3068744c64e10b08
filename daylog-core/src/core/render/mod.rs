//! Pluggable per-type renderers for component instances.
//!
//! [`RendererRegistry`] maps a component type to a [`ComponentRenderer`].
//! New types are supported by registering a renderer; dispatch falls back to
//! [`render_fallback`] for anything unregistered so unknown or future types
//! still display.
//!
//! Renderers are stateless with respect to storage: edit views emit form
//! fields, and [`ComponentRenderer::apply_input`] turns submitted values into
//! [`ChangeSink`] callbacks on the owner of the data.

mod builtin;
pub mod helpers;

pub use builtin::{
    AiCustomRenderer, ChartRenderer, DateRenderer, MediaRenderer, NumberRenderer, TextRenderer,
};

use crate::core::component::{ComponentInstance, ConfigMap};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Form field name that carries a component's content.
pub const CONTENT_FIELD: &str = "content";
/// Prefix of form field names that carry a config key (`config.prompt`).
pub const CONFIG_FIELD_PREFIX: &str = "config.";

/// A rendered HTML fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ViewFragment(pub String);

impl ViewFragment {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ViewFragment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receives edits reported by a renderer. The implementor owns the values.
pub trait ChangeSink {
    fn content_changed(&mut self, id: &str, content: String);
    /// `partial` is shallow-merged into the component's config.
    fn config_changed(&mut self, id: &str, partial: ConfigMap);
}

/// A rendering strategy for one component type.
pub trait ComponentRenderer: Send + Sync {
    /// The component type id this renderer handles.
    fn component_type(&self) -> &str;

    /// Builds the edit view when `is_editing`, the display view otherwise.
    ///
    /// Display views show an explicit "not set" placeholder for empty content.
    fn render(&self, instance: &ComponentInstance, is_editing: bool) -> ViewFragment;

    /// Routes a submitted form value to `sink`.
    ///
    /// The default handles `content` and `config.<key>` fields; other names
    /// are ignored.
    fn apply_input(&self, instance: &ComponentInstance, field: &str, value: &str, sink: &mut dyn ChangeSink) {
        route_input(instance, field, value, sink);
    }
}

/// The default input routing used by [`ComponentRenderer::apply_input`].
pub fn route_input(instance: &ComponentInstance, field: &str, value: &str, sink: &mut dyn ChangeSink) {
    if field == CONTENT_FIELD {
        sink.content_changed(&instance.id, value.to_string());
    } else if let Some(key) = field.strip_prefix(CONFIG_FIELD_PREFIX).filter(|k| !k.is_empty()) {
        let mut partial = ConfigMap::new();
        partial.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        sink.config_changed(&instance.id, partial);
    } else {
        log::debug!("ignoring unknown form field '{field}' for component {}", instance.id);
    }
}

/// Registry of renderers keyed by component type.
///
/// Owned by the application root and passed to views. Registering a second
/// renderer for a type replaces the first, which allows hot-swapping a
/// renderer during development.
#[derive(Clone, Default)]
pub struct RendererRegistry {
    renderers: Arc<RwLock<HashMap<String, Arc<dyn ComponentRenderer>>>>,
}

impl std::fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererRegistry").field("types", &self.registered_types()).finish()
    }
}

impl RendererRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with a renderer for every built-in component type.
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        for renderer in builtin::builtin_renderers() {
            registry.register(renderer);
        }
        registry
    }

    /// Registers `renderer` for its type; returns the renderer it replaced.
    pub fn register(&self, renderer: Arc<dyn ComponentRenderer>) -> Option<Arc<dyn ComponentRenderer>> {
        let key = renderer.component_type().to_string();
        let previous = self.renderers.write().unwrap().insert(key.clone(), renderer);
        if previous.is_some() {
            log::debug!("renderer for '{key}' replaced");
        }
        previous
    }

    pub fn resolve(&self, component_type: &str) -> Option<Arc<dyn ComponentRenderer>> {
        self.renderers.read().unwrap().get(component_type).cloned()
    }

    pub fn is_registered(&self, component_type: &str) -> bool {
        self.renderers.read().unwrap().contains_key(component_type)
    }

    /// Registered type ids, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.renderers.read().unwrap().keys().cloned().collect();
        types.sort();
        types
    }

    /// Renders `instance` with its registered renderer, or the generic fallback.
    pub fn render(&self, instance: &ComponentInstance, is_editing: bool) -> ViewFragment {
        match self.resolve(&instance.component_type) {
            Some(renderer) => renderer.render(instance, is_editing),
            None => {
                log::debug!("no renderer for '{}', using fallback", instance.component_type);
                render_fallback(instance)
            }
        }
    }

    /// Renders every instance in order.
    pub fn render_all(&self, instances: &[ComponentInstance], is_editing: bool) -> Vec<ViewFragment> {
        instances.iter().map(|i| self.render(i, is_editing)).collect()
    }

    /// Routes a form value through the instance's renderer.
    ///
    /// Unregistered types use the default routing, so a fallback-rendered
    /// component still accepts content edits.
    pub fn apply_input(&self, instance: &ComponentInstance, field: &str, value: &str, sink: &mut dyn ChangeSink) {
        match self.resolve(&instance.component_type) {
            Some(renderer) => renderer.apply_input(instance, field, value, sink),
            None => route_input(instance, field, value, sink),
        }
    }
}

/// Generic view for a component type with no registered renderer.
///
/// Shows the type name, raw content and a pretty-printed config dump under a
/// visible warning.
pub fn render_fallback(instance: &ComponentInstance) -> ViewFragment {
    let config_dump = instance
        .config
        .as_ref()
        .and_then(|c| serde_json::to_string_pretty(c).ok())
        .unwrap_or_else(|| "{}".to_string());
    let content = instance.content_str();
    let inner = format!(
        "<div class=\"dl-view-fallback\">{}{}{}{}</div>",
        helpers::badge(&format!("未注册的组件类型: {}", instance.component_type), "yellow"),
        helpers::field_row("类型", &instance.component_type),
        helpers::field_row("内容", if content.is_empty() { "(空)" } else { content }),
        helpers::code_block(&config_dump),
    );
    ViewFragment(helpers::component_shell(&instance.id, &instance.component_type, &instance.title, &inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{ComponentCatalog, TEXT_SHORT};
    use crate::core::component::ComponentSet;
    use serde_json::json;

    struct Shouty;

    impl ComponentRenderer for Shouty {
        fn component_type(&self) -> &str {
            TEXT_SHORT
        }

        fn render(&self, instance: &ComponentInstance, _is_editing: bool) -> ViewFragment {
            ViewFragment(instance.content_str().to_uppercase())
        }
    }

    fn instance(component_type: &str, content: Option<&str>) -> ComponentInstance {
        ComponentInstance {
            id: "c1".to_string(),
            component_type: component_type.to_string(),
            title: "T".to_string(),
            content: content.map(str::to_string),
            config: None,
        }
    }

    #[test]
    fn test_builtin_covers_catalog() {
        let registry = RendererRegistry::with_builtin();
        for descriptor in ComponentCatalog::builtin().all() {
            assert!(registry.is_registered(descriptor.id), "missing renderer for {}", descriptor.id);
        }
    }

    #[test]
    fn test_last_registration_wins() {
        let registry = RendererRegistry::with_builtin();
        let replaced = registry.register(Arc::new(Shouty));
        assert!(replaced.is_some());
        let out = registry.render(&instance(TEXT_SHORT, Some("hi")), false);
        assert_eq!(out.as_str(), "HI");
    }

    #[test]
    fn test_unregistered_type_uses_fallback() {
        let registry = RendererRegistry::with_builtin();
        assert!(registry.resolve("hologram").is_none());
        assert!(!registry.is_registered("hologram"));

        let mut unknown = instance("hologram", Some("raw <value>"));
        let mut config = ConfigMap::new();
        config.insert("depth".into(), json!(3));
        unknown.config = Some(config);

        let html = registry.render(&unknown, true).into_string();
        assert!(html.contains("hologram"));
        assert!(html.contains("raw &lt;value&gt;"));
        assert!(html.contains("&quot;depth&quot;: 3"));
        assert!(html.contains("dl-view-badge-yellow"));
    }

    #[test]
    fn test_empty_registry_falls_back_for_everything() {
        let registry = RendererRegistry::new();
        let html = registry.render(&instance(TEXT_SHORT, None), false).into_string();
        assert!(html.contains("dl-view-fallback"));
        assert!(html.contains("(空)"));
    }

    #[test]
    fn test_apply_input_routes_to_sink() {
        let registry = RendererRegistry::with_builtin();
        let catalog = ComponentCatalog::builtin();
        let mut set = ComponentSet::new(catalog, Vec::new());
        let target = set.add("ai-custom", "").clone();

        registry.apply_input(&target, "content", "summary", &mut set);
        registry.apply_input(&target, "config.prompt", "总结今天", &mut set);
        registry.apply_input(&target, "config.", "ignored", &mut set);
        registry.apply_input(&target, "bogus", "ignored", &mut set);

        let updated = set.get(&target.id).unwrap();
        assert_eq!(updated.content.as_deref(), Some("summary"));
        assert_eq!(updated.config_str("prompt"), Some("总结今天"));
        assert_eq!(updated.config.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_registry_clones_share_state() {
        let registry = RendererRegistry::new();
        let view_copy = registry.clone();
        registry.register(Arc::new(Shouty));
        assert!(view_copy.is_registered(TEXT_SHORT));
    }
}
