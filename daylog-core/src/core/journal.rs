//! High-level journal operations over a Daylog SQLite database.

use crate::core::component::{title_or_label, ComponentSet, DataMapping};
use crate::core::content::{resolve_note, ContentOrigin, RenderedComponent};
use crate::core::events::{ComponentChange, EventBus, JournalEvent};
use crate::core::note::{AnalysisRecord, ComponentDataEntry, ComponentData, NewNote};
use crate::core::sync::{validate_component_config, ComponentStore, ConfigSynchronizer, SyncDirection, SyncOutcome};
use crate::{
    ComponentCatalog, ComponentConfig, ComponentInstance, ComponentTemplate, DaylogError, Note, Notebook, Result,
    Storage,
};
use rusqlite::Connection;
use std::path::Path;
use uuid::Uuid;

/// Config key under which a component stores its data-mapping rule.
pub const DATA_MAPPING_KEY: &str = "dataMapping";
/// Config key under which a component stores its `{{path}}` template.
pub const CONTENT_TEMPLATE_KEY: &str = "contentTemplate";

/// An open Daylog journal backed by a SQLite database.
///
/// `Journal` is the primary interface for notebook and note mutations. It
/// combines a [`Storage`] connection, the [`ComponentCatalog`], and an
/// [`EventBus`] on which every template change is announced so that other
/// open views can refresh.
pub struct Journal {
    storage: Storage,
    catalog: ComponentCatalog,
    events: EventBus,
    synchronizer: ConfigSynchronizer,
}

impl Journal {
    /// Creates a new journal database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DaylogError::Database`] for any SQLite failure.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let storage = Storage::create(path)?;
        Self::init(storage)
    }

    /// Opens an existing journal, migrating older layouts in place.
    ///
    /// # Errors
    ///
    /// Returns [`DaylogError::InvalidJournal`] if the file is not a Daylog database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::with_storage(Storage::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Storage::open_in_memory()?)
    }

    fn init(storage: Storage) -> Result<Self> {
        storage.connection().execute(
            "INSERT OR REPLACE INTO journal_meta (key, value) VALUES ('created_at', ?1)",
            [chrono::Utc::now().timestamp().to_string()],
        )?;
        Ok(Self::with_storage(storage))
    }

    fn with_storage(storage: Storage) -> Self {
        Self {
            storage,
            catalog: ComponentCatalog::builtin(),
            events: EventBus::new(),
            synchronizer: ConfigSynchronizer::new(),
        }
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    /// The bus on which this journal announces template and note changes.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Returns a reference to the underlying SQLite connection.
    pub fn connection(&self) -> &Connection {
        self.storage.connection()
    }

    // ── Notebooks ─────────────────────────────────────────────────

    /// Creates a notebook whose template is `instances`.
    ///
    /// # Errors
    ///
    /// Returns [`DaylogError::ValidationFailed`] if the name is blank, an
    /// instance is missing its id, type or title, or two instances share an id.
    pub fn create_notebook(&mut self, name: &str, instances: Vec<ComponentInstance>) -> Result<Notebook> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DaylogError::ValidationFailed("Notebook name cannot be empty".to_string()));
        }
        ensure_valid(&instances)?;
        let now = chrono::Utc::now().timestamp();
        let notebook = Notebook {
            notebook_id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            note_count: 0,
            component_config: ComponentConfig::new(instances),
            created_at: now,
            modified_at: now,
        };
        self.storage.insert_notebook(&notebook)?;
        log::info!("created notebook {} ({})", notebook.notebook_id, notebook.name);
        Ok(notebook)
    }

    pub fn get_notebook(&self, notebook_id: &str) -> Result<Notebook> {
        self.storage.get_notebook(notebook_id)
    }

    pub fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        self.storage.list_notebooks()
    }

    /// Deletes a notebook together with its notes; returns how many notes went with it.
    pub fn delete_notebook(&mut self, notebook_id: &str) -> Result<usize> {
        let removed = self.storage.delete_notebook(notebook_id)?;
        self.events.emit(&JournalEvent::Refresh { notebook_id: Some(notebook_id.to_string()) });
        Ok(removed)
    }

    // ── Template editing ──────────────────────────────────────────

    /// Replaces a notebook's template and pushes new component types to its notes.
    pub fn update_notebook_components(&mut self, notebook_id: &str, instances: &[ComponentInstance]) -> SyncOutcome {
        self.sync(notebook_id, instances, SyncDirection::Notebook)
    }

    /// Appends a component of `component_type` to a notebook's template.
    ///
    /// # Errors
    ///
    /// Returns [`DaylogError::NotebookNotFound`] for an unknown notebook, or
    /// [`DaylogError::Database`] if the template cannot be written.
    pub fn add_notebook_component(
        &mut self,
        notebook_id: &str,
        component_type: &str,
        title: &str,
    ) -> Result<ComponentInstance> {
        if self.catalog.resolve(component_type).is_none() {
            log::debug!("adding component of unregistered type '{component_type}'");
        }
        let mut set = self.template_set(notebook_id)?;
        let added = set.add(component_type, title).clone();
        let instances = set.into_instances();
        self.save_template(notebook_id, &instances)?;
        self.events.emit(&JournalEvent::ComponentAdded(ComponentChange {
            notebook_id: notebook_id.to_string(),
            component_id: added.id.clone(),
            component_type: added.component_type.clone(),
            instances: Some(instances),
        }));
        Ok(added)
    }

    /// Replaces the title, content and config of the template instance that
    /// has `instance.id`. A blank title falls back to the type label.
    ///
    /// # Errors
    ///
    /// Returns [`DaylogError::ComponentNotFound`] if the template has no such
    /// instance, or [`DaylogError::ValidationFailed`] if `instance` changes its
    /// type; a different type needs a new component.
    pub fn update_notebook_component(&mut self, notebook_id: &str, mut instance: ComponentInstance) -> Result<()> {
        let mut instances = self.storage.component_config(notebook_id)?.component_instances;
        let slot = instances
            .iter_mut()
            .find(|c| c.id == instance.id)
            .ok_or_else(|| DaylogError::ComponentNotFound(instance.id.clone()))?;
        if slot.component_type != instance.component_type {
            return Err(DaylogError::ValidationFailed(format!(
                "Component type cannot change from '{}' to '{}'",
                slot.component_type, instance.component_type
            )));
        }
        instance.title = title_or_label(&self.catalog, &instance.component_type, &instance.title);
        *slot = instance.clone();
        self.save_template(notebook_id, &instances)?;
        self.events.emit(&JournalEvent::ComponentUpdated(ComponentChange {
            notebook_id: notebook_id.to_string(),
            component_id: instance.id,
            component_type: instance.component_type,
            instances: Some(instances),
        }));
        Ok(())
    }

    /// Removes a component from the template. Notes keep their own copies.
    pub fn remove_notebook_component(&mut self, notebook_id: &str, component_id: &str) -> Result<ComponentInstance> {
        let mut set = self.template_set(notebook_id)?;
        let removed = set.remove(component_id)?;
        let instances = set.into_instances();
        self.save_template(notebook_id, &instances)?;
        self.events.emit(&JournalEvent::ComponentDeleted(ComponentChange {
            notebook_id: notebook_id.to_string(),
            component_id: removed.id.clone(),
            component_type: removed.component_type.clone(),
            instances: Some(instances),
        }));
        Ok(removed)
    }

    /// Moves a template component to `new_index`.
    pub fn move_notebook_component(&mut self, notebook_id: &str, component_id: &str, new_index: usize) -> Result<()> {
        let mut set = self.template_set(notebook_id)?;
        set.move_to(component_id, new_index)?;
        let moved = set.get(component_id).cloned();
        let instances = set.into_instances();
        self.save_template(notebook_id, &instances)?;
        if let Some(moved) = moved {
            self.events.emit(&JournalEvent::ComponentUpdated(ComponentChange {
                notebook_id: notebook_id.to_string(),
                component_id: moved.id,
                component_type: moved.component_type,
                instances: Some(instances),
            }));
        }
        Ok(())
    }

    fn template_set(&self, notebook_id: &str) -> Result<ComponentSet> {
        let config = self.storage.component_config(notebook_id)?;
        Ok(ComponentSet::new(self.catalog, config.component_instances))
    }

    /// Saves a template, then pushes its new types to the notebook's notes.
    ///
    /// Validation and the template write fail with their own error; per-note
    /// failures are only logged, as in [`Journal::sync`].
    fn save_template(&mut self, notebook_id: &str, instances: &[ComponentInstance]) -> Result<()> {
        ensure_valid(instances)?;
        self.storage.save_component_config(notebook_id, &ComponentConfig::new(instances.to_vec()))?;
        let outcome = self.synchronizer.propagate_to_notes(&mut self.storage, notebook_id, instances);
        self.announce(notebook_id, &outcome);
        Ok(())
    }

    // ── Notes ─────────────────────────────────────────────────────

    /// Creates a note in `notebook_id` with fresh copies of the notebook's template.
    ///
    /// The follow-up sync into the notebook template is best-effort: its
    /// failure is logged and never fails the creation.
    ///
    /// # Errors
    ///
    /// Returns [`DaylogError::NotebookNotFound`] if the notebook does not exist.
    pub fn create_note(&mut self, notebook_id: &str, new_note: NewNote) -> Result<Note> {
        let notebook = self.storage.get_notebook(notebook_id)?;
        let now = chrono::Utc::now().timestamp();
        let note = Note {
            note_id: Uuid::new_v4().to_string(),
            notebook_id: notebook_id.to_string(),
            title: new_note.title,
            content_text: new_note.content_text,
            images: new_note.images,
            source: new_note.source,
            author: new_note.author,
            created_at: now,
            modified_at: now,
            upload_time: new_note.upload_time,
            component_instances: notebook
                .component_config
                .component_instances
                .iter()
                .map(ComponentInstance::fresh_copy)
                .collect(),
            component_data: ComponentData::default(),
            analysis: None,
        };
        self.storage.insert_note(&note)?;

        let outcome = self.sync(notebook_id, &note.component_instances, SyncDirection::Note);
        if !outcome.success {
            log::warn!("post-create sync of note {} failed: {}", note.note_id, outcome.message);
        }
        Ok(note)
    }

    pub fn get_note(&self, note_id: &str) -> Result<Note> {
        self.storage.get_note(note_id)
    }

    /// Notes in a notebook, oldest first.
    pub fn list_notes(&self, notebook_id: &str) -> Result<Vec<Note>> {
        self.storage.get_notebook(notebook_id)?;
        self.storage.list_notes_in(notebook_id)
    }

    /// Saves a note's component set, then adds any new types to its notebook's template.
    ///
    /// # Errors
    ///
    /// Returns [`DaylogError::ValidationFailed`] without writing anything if an
    /// instance is missing its id, type or title.
    pub fn update_note_components(&mut self, note_id: &str, instances: &[ComponentInstance]) -> Result<SyncOutcome> {
        ensure_valid(instances)?;
        let note = self.storage.get_note(note_id)?;
        self.storage.update_note_components(note_id, instances)?;
        Ok(self.sync(&note.notebook_id, instances, SyncDirection::Note))
    }

    /// Records a user-entered value for one component of a note.
    ///
    /// # Errors
    ///
    /// Returns [`DaylogError::ComponentNotFound`] if the note has no component `component_id`.
    pub fn set_component_value(&mut self, note_id: &str, component_id: &str, value: serde_json::Value) -> Result<()> {
        let mut note = self.storage.get_note(note_id)?;
        let instance = note
            .component_instances
            .iter()
            .find(|c| c.id == component_id)
            .ok_or_else(|| DaylogError::ComponentNotFound(component_id.to_string()))?;
        let entry = ComponentDataEntry {
            value,
            component_type: instance.component_type.clone(),
            title: instance.title.clone(),
        };
        note.component_data.insert(component_id, entry);
        self.storage.update_component_data(note_id, &note.component_data)
    }

    /// Attaches the AI extraction result to a note.
    pub fn set_analysis(&mut self, note_id: &str, analysis: &AnalysisRecord) -> Result<()> {
        self.storage.update_analysis(note_id, analysis)
    }

    pub fn delete_note(&mut self, note_id: &str) -> Result<()> {
        let note = self.storage.get_note(note_id)?;
        self.storage.delete_note(note_id)?;
        self.events.emit(&JournalEvent::Refresh { notebook_id: Some(note.notebook_id) });
        Ok(())
    }

    // ── Rendering ─────────────────────────────────────────────────

    /// Resolves the displayable content of every component of a note.
    ///
    /// Precedence: a non-empty `component_data` value, then content stored
    /// inline on the instance by older records, then the generated value.
    pub fn render_note(&self, note_id: &str) -> Result<Vec<RenderedComponent>> {
        let note = self.storage.get_note(note_id)?;
        let templates: Vec<ComponentTemplate> = note.component_instances.iter().map(template_for).collect();
        let mut rendered = resolve_note(&templates, &note.note_data(), &note.component_data);
        for (component, instance) in rendered.iter_mut().zip(&note.component_instances) {
            if component.origin == ContentOrigin::Override {
                continue;
            }
            if let Some(inline) = instance.content.as_deref().filter(|c| !c.is_empty()) {
                component.content = inline.to_string();
                component.origin = ContentOrigin::Inline;
            }
        }
        Ok(rendered)
    }

    // ── Synchronization ───────────────────────────────────────────

    /// Runs the synchronization protocol and announces the result on the event bus.
    pub fn sync(&mut self, notebook_id: &str, instances: &[ComponentInstance], direction: SyncDirection) -> SyncOutcome {
        let outcome = self.synchronizer.sync(&mut self.storage, notebook_id, instances, direction);
        self.announce(notebook_id, &outcome);
        outcome
    }

    fn announce(&self, notebook_id: &str, outcome: &SyncOutcome) {
        if outcome.notebook_updated {
            match self.storage.component_config(notebook_id) {
                Ok(config) => self.events.emit(&JournalEvent::NotebookConfigUpdated {
                    notebook_id: notebook_id.to_string(),
                    config,
                }),
                Err(e) => log::warn!("re-reading config of notebook {notebook_id} failed: {e}"),
            }
        }
        if outcome.notebook_updated || outcome.notes_updated > 0 {
            self.events.emit(&JournalEvent::Refresh { notebook_id: Some(notebook_id.to_string()) });
        }
    }
}

fn ensure_valid(instances: &[ComponentInstance]) -> Result<()> {
    let report = validate_component_config(instances);
    if report.valid {
        return Ok(());
    }
    let messages: Vec<String> = report.errors.into_iter().map(|e| e.message).collect();
    Err(DaylogError::ValidationFailed(messages.join("; ")))
}

/// Builds a template from an instance, picking up a `dataMapping` or
/// `contentTemplate` rule stored in its config.
fn template_for(instance: &ComponentInstance) -> ComponentTemplate {
    let template = ComponentTemplate::from_instance(instance);
    let Some(config) = instance.config.as_ref() else {
        return template;
    };
    if let Some(raw) = config.get(DATA_MAPPING_KEY) {
        match serde_json::from_value::<DataMapping>(raw.clone()) {
            Ok(mapping) => return template.with_data_mapping(&mapping.source, mapping.transform.as_deref()),
            Err(e) => log::debug!("ignoring malformed data mapping on component {}: {e}", instance.id),
        }
    }
    match config.get(CONTENT_TEMPLATE_KEY).and_then(serde_json::Value::as_str) {
        Some(text) => template.with_content_template(text),
        None => template,
    }
}
