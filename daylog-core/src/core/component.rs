//! Component instances, content-less templates, and the per-notebook component config.

use crate::core::catalog::ComponentCatalog;
use crate::core::render::ChangeSink;
use crate::{DaylogError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Open, type-specific settings bag carried by a component (`prompt`, `chartType`, …).
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// A concrete, identified occurrence of a component type inside a notebook
/// template or a note.
///
/// Position is the index in the owning list; it is not stored on the instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInstance {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigMap>,
}

impl ComponentInstance {
    /// Creates an instance with a freshly generated id.
    ///
    /// A blank `title` falls back to the catalog label for `component_type`.
    pub fn new(catalog: &ComponentCatalog, component_type: &str, title: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            component_type: component_type.to_string(),
            title: title_or_label(catalog, component_type, title),
            content: None,
            config: None,
        }
    }

    /// Returns a copy with a new id and no content; type, title and config are kept.
    pub fn fresh_copy(&self) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            component_type: self.component_type.clone(),
            title: self.title.clone(),
            content: None,
            config: self.config.clone(),
        }
    }

    /// Shallow-merges `partial` into the config; keys absent from `partial` are kept.
    pub fn merge_config(&mut self, partial: ConfigMap) {
        let config = self.config.get_or_insert_with(ConfigMap::new);
        for (key, value) in partial {
            config.insert(key, value);
        }
    }

    /// Returns a string config value, if present.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.as_ref()?.get(key)?.as_str()
    }

    /// Returns the content, treating `None` and `""` alike.
    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Returns `title` trimmed, or the catalog label when it is blank.
pub(crate) fn title_or_label(catalog: &ComponentCatalog, component_type: &str, title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        catalog.title_for(component_type).to_string()
    } else {
        trimmed.to_string()
    }
}

/// Rule binding a component to a field of note data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMapping {
    /// Dotted path into the note data, e.g. `"analysis.mood.score"`.
    pub source: String,
    /// Optional transform name; unknown names leave the value untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
}

/// Formatting functions available to a [`DataMapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformName {
    Uppercase,
    Lowercase,
    Capitalize,
    Date,
    DateTime,
    Truncate,
}

impl TransformName {
    /// Parses a transform name; returns `None` for names that are not recognised.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "uppercase" => Some(Self::Uppercase),
            "lowercase" => Some(Self::Lowercase),
            "capitalize" => Some(Self::Capitalize),
            "date" => Some(Self::Date),
            "datetime" => Some(Self::DateTime),
            "truncate" => Some(Self::Truncate),
            _ => None,
        }
    }
}

/// A content-less projection of a [`ComponentInstance`].
///
/// Content is derived at render time, from `data_mapping`, `content_template`,
/// or a per-type default, in that order. At most one of the two rules is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentTemplate {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_mapping: Option<DataMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_template: Option<String>,
}

impl ComponentTemplate {
    /// Strips content from `instance`, keeping id, type, title and config.
    pub fn from_instance(instance: &ComponentInstance) -> Self {
        Self {
            id: instance.id.clone(),
            component_type: instance.component_type.clone(),
            title: instance.title.clone(),
            config: instance.config.clone(),
            data_mapping: None,
            content_template: None,
        }
    }

    /// Sets the data-mapping rule, clearing any content template.
    #[must_use]
    pub fn with_data_mapping(mut self, source: &str, transform: Option<&str>) -> Self {
        self.data_mapping = Some(DataMapping {
            source: source.to_string(),
            transform: transform.map(str::to_string),
        });
        self.content_template = None;
        self
    }

    /// Sets the placeholder template, clearing any data mapping.
    #[must_use]
    pub fn with_content_template(mut self, template: &str) -> Self {
        self.content_template = Some(template.to_string());
        self.data_mapping = None;
        self
    }
}

/// The ordered default component set for new notes in a notebook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentConfig {
    #[serde(default)]
    pub component_instances: Vec<ComponentInstance>,
}

impl ComponentConfig {
    pub fn new(component_instances: Vec<ComponentInstance>) -> Self {
        Self { component_instances }
    }

    /// Returns `true` if any instance has type `component_type`.
    pub fn contains_type(&self, component_type: &str) -> bool {
        self.component_instances.iter().any(|c| c.component_type == component_type)
    }

    pub fn find(&self, id: &str) -> Option<&ComponentInstance> {
        self.component_instances.iter().find(|c| c.id == id)
    }

    /// Returns the distinct types in first-occurrence order.
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for instance in &self.component_instances {
            if !types.contains(&instance.component_type.as_str()) {
                types.push(&instance.component_type);
            }
        }
        types
    }
}

/// An editable, ordered component list owned by an editor view.
///
/// Renderers report user input through [`ChangeSink`]; `ComponentSet` is the
/// parent that owns the values and applies those changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentSet {
    catalog: ComponentCatalog,
    instances: Vec<ComponentInstance>,
}

impl ComponentSet {
    pub fn new(catalog: ComponentCatalog, instances: Vec<ComponentInstance>) -> Self {
        Self { catalog, instances }
    }

    pub fn instances(&self) -> &[ComponentInstance] {
        &self.instances
    }

    pub fn into_instances(self) -> Vec<ComponentInstance> {
        self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ComponentInstance> {
        self.instances.iter().find(|c| c.id == id)
    }

    /// Appends a new instance of `component_type` and returns a reference to it.
    pub fn add(&mut self, component_type: &str, title: &str) -> &ComponentInstance {
        let instance = ComponentInstance::new(&self.catalog, component_type, title);
        self.instances.push(instance);
        &self.instances[self.instances.len() - 1]
    }

    /// Removes the instance with `id` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`DaylogError::ComponentNotFound`] if no instance has that id.
    pub fn remove(&mut self, id: &str) -> Result<ComponentInstance> {
        let index = self.index_of(id)?;
        Ok(self.instances.remove(index))
    }

    /// Moves the instance with `id` to `new_index` (clamped to the end of the list).
    ///
    /// # Errors
    ///
    /// Returns [`DaylogError::ComponentNotFound`] if no instance has that id.
    pub fn move_to(&mut self, id: &str, new_index: usize) -> Result<()> {
        let index = self.index_of(id)?;
        let instance = self.instances.remove(index);
        let new_index = new_index.min(self.instances.len());
        self.instances.insert(new_index, instance);
        Ok(())
    }

    /// Renames an instance. A blank title falls back to the type label.
    ///
    /// # Errors
    ///
    /// Returns [`DaylogError::ComponentNotFound`] if no instance has that id.
    pub fn set_title(&mut self, id: &str, title: &str) -> Result<()> {
        let index = self.index_of(id)?;
        let instance = &mut self.instances[index];
        instance.title = title_or_label(&self.catalog, &instance.component_type, title);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DaylogError::ComponentNotFound`] if no instance has that id.
    pub fn set_content(&mut self, id: &str, content: String) -> Result<()> {
        let index = self.index_of(id)?;
        self.instances[index].content = Some(content);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DaylogError::ComponentNotFound`] if no instance has that id.
    pub fn merge_config(&mut self, id: &str, partial: ConfigMap) -> Result<()> {
        let index = self.index_of(id)?;
        self.instances[index].merge_config(partial);
        Ok(())
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.instances
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| DaylogError::ComponentNotFound(id.to_string()))
    }
}

impl ChangeSink for ComponentSet {
    fn content_changed(&mut self, id: &str, content: String) {
        if let Err(e) = self.set_content(id, content) {
            log::debug!("dropping content change: {e}");
        }
    }

    fn config_changed(&mut self, id: &str, partial: ConfigMap) {
        if let Err(e) = self.merge_config(id, partial) {
            log::debug!("dropping config change: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{CHART, DATE, TEXT_SHORT};
    use serde_json::json;

    fn catalog() -> ComponentCatalog {
        ComponentCatalog::builtin()
    }

    #[test]
    fn test_blank_title_defaults_to_label() {
        let instance = ComponentInstance::new(&catalog(), TEXT_SHORT, "   ");
        assert_eq!(instance.title, "短文本");
        assert!(!instance.id.is_empty());
    }

    #[test]
    fn test_new_ids_are_unique() {
        let a = ComponentInstance::new(&catalog(), DATE, "");
        let b = ComponentInstance::new(&catalog(), DATE, "");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_merge_config_is_shallow() {
        let mut instance = ComponentInstance::new(&catalog(), CHART, "图表");
        let mut first = ConfigMap::new();
        first.insert("chartType".into(), json!("bar"));
        first.insert("source".into(), json!("mood"));
        instance.merge_config(first);

        let mut second = ConfigMap::new();
        second.insert("chartType".into(), json!("gantt"));
        instance.merge_config(second);

        assert_eq!(instance.config_str("chartType"), Some("gantt"));
        assert_eq!(instance.config_str("source"), Some("mood"));
    }

    #[test]
    fn test_fresh_copy_drops_content_and_id() {
        let mut instance = ComponentInstance::new(&catalog(), TEXT_SHORT, "标题");
        instance.content = Some("hello".to_string());
        let copy = instance.fresh_copy();
        assert_ne!(copy.id, instance.id);
        assert_eq!(copy.title, "标题");
        assert!(copy.content.is_none());
    }

    #[test]
    fn test_instance_json_shape() {
        let instance = ComponentInstance {
            id: "t1".to_string(),
            component_type: TEXT_SHORT.to_string(),
            title: "标题".to_string(),
            content: None,
            config: None,
        };
        let value = serde_json::to_value(&instance).unwrap();
        assert_eq!(value, json!({ "id": "t1", "type": "text-short", "title": "标题" }));

        let config: ComponentConfig =
            serde_json::from_value(json!({ "componentInstances": [value] })).unwrap();
        assert_eq!(config.component_instances[0], instance);
    }

    #[test]
    fn test_template_rules_are_exclusive() {
        let instance = ComponentInstance::new(&catalog(), TEXT_SHORT, "标题");
        let template = ComponentTemplate::from_instance(&instance)
            .with_content_template("{{title}}")
            .with_data_mapping("title", Some("uppercase"));
        assert!(template.content_template.is_none());
        assert_eq!(template.data_mapping.unwrap().source, "title");
    }

    #[test]
    fn test_component_set_reorder_and_remove() {
        let mut set = ComponentSet::new(catalog(), Vec::new());
        let a = set.add(TEXT_SHORT, "A").id.clone();
        let b = set.add(DATE, "B").id.clone();
        let c = set.add(CHART, "C").id.clone();

        set.move_to(&c, 0).unwrap();
        let order: Vec<&str> = set.instances().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(order, vec![c.as_str(), a.as_str(), b.as_str()]);

        set.move_to(&c, 99).unwrap();
        assert_eq!(set.instances()[2].id, c);

        let removed = set.remove(&a).unwrap();
        assert_eq!(removed.title, "A");
        assert_eq!(set.len(), 2);
        assert!(matches!(set.remove(&a), Err(DaylogError::ComponentNotFound(_))));
    }

    #[test]
    fn test_component_set_applies_sink_changes() {
        let mut set = ComponentSet::new(catalog(), Vec::new());
        let id = set.add(TEXT_SHORT, "").id.clone();

        set.content_changed(&id, "typed".to_string());
        let mut partial = ConfigMap::new();
        partial.insert("placeholder".into(), json!("…"));
        set.config_changed(&id, partial);
        set.content_changed("missing", "ignored".to_string());

        let instance = set.get(&id).unwrap();
        assert_eq!(instance.content.as_deref(), Some("typed"));
        assert_eq!(instance.config_str("placeholder"), Some("…"));

        set.set_title(&id, "").unwrap();
        assert_eq!(set.get(&id).unwrap().title, "短文本");
    }

    #[test]
    fn test_config_types_in_order() {
        let c = catalog();
        let config = ComponentConfig::new(vec![
            ComponentInstance::new(&c, DATE, ""),
            ComponentInstance::new(&c, TEXT_SHORT, ""),
            ComponentInstance::new(&c, DATE, "第二个"),
        ]);
        assert_eq!(config.types(), vec![DATE, TEXT_SHORT]);
        assert!(config.contains_type(DATE));
        assert!(!config.contains_type(CHART));
    }

    #[test]
    fn test_transform_names() {
        assert_eq!(TransformName::parse("datetime"), Some(TransformName::DateTime));
        assert_eq!(TransformName::parse("reverse"), None);
    }
}
