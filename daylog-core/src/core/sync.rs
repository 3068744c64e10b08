//! Keeps a notebook's component template and its notes' component sets in step.
//!
//! Propagation is additive and keyed on component *type*: a sync only ever
//! appends instances of types the target lacks, so running it twice adds
//! nothing the second time and never removes or reorders what a note has.

use crate::core::component::{ComponentConfig, ComponentInstance};
use crate::core::note::Note;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Backend the synchronizer reads from and writes to.
pub trait ComponentStore {
    fn component_config(&self, notebook_id: &str) -> Result<ComponentConfig>;
    fn save_component_config(&mut self, notebook_id: &str, config: &ComponentConfig) -> Result<()>;
    fn list_notes(&self, notebook_id: &str) -> Result<Vec<Note>>;
    fn save_note_components(&mut self, note_id: &str, instances: &[ComponentInstance]) -> Result<()>;
}

/// Which side of the notebook/note relationship was edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    /// The notebook template changed; push new types down to every note.
    Notebook,
    /// One note's set changed; pull new types up into the template.
    Note,
}

/// A missing required field on one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub index: usize,
    pub id: String,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

/// Checks that every instance has a non-empty `id`, `type` and `title`, and
/// that no id is used twice.
pub fn validate_component_config(instances: &[ComponentInstance]) -> ValidationReport {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for (index, instance) in instances.iter().enumerate() {
        if !instance.id.trim().is_empty() && !seen.insert(instance.id.as_str()) {
            errors.push(FieldError {
                index,
                id: instance.id.clone(),
                field: "id".to_string(),
                message: format!("component #{} reuses id '{}'", index + 1, instance.id),
            });
        }
        let fields = [
            ("id", &instance.id),
            ("type", &instance.component_type),
            ("title", &instance.title),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                errors.push(FieldError {
                    index,
                    id: instance.id.clone(),
                    field: field.to_string(),
                    message: format!("component #{} is missing its {field}", index + 1),
                });
            }
        }
    }
    ValidationReport { valid: errors.is_empty(), errors }
}

/// A note whose update failed during fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFailure {
    pub note_id: String,
    pub message: String,
}

/// Result of a [`ConfigSynchronizer::sync`] call.
///
/// `success` reflects the primary write (the notebook config in the
/// notebook direction); per-note outcomes are reported separately in
/// `notes_updated` / `notes_failed` and summarised by `all_notes_synced`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub success: bool,
    pub message: String,
    pub notebook_updated: bool,
    pub notes_updated: usize,
    pub notes_failed: usize,
    pub all_notes_synced: bool,
    pub errors: Vec<FieldError>,
    pub failures: Vec<NoteFailure>,
}

impl SyncOutcome {
    fn failed(message: String) -> Self {
        Self { success: false, message, ..Self::default() }
    }
}

/// Fresh copies (new id, no content) of every template instance whose type
/// the note does not have yet, in template order.
pub fn missing_instances_for_note(
    template: &[ComponentInstance],
    note: &[ComponentInstance],
) -> Vec<ComponentInstance> {
    template
        .iter()
        .filter(|t| !note.iter().any(|n| n.component_type == t.component_type))
        .map(ComponentInstance::fresh_copy)
        .collect()
}

/// One representative per note type absent from the template, in note order.
///
/// The representative is the first note instance of that type, copied with a
/// new id and its content stripped.
pub fn merge_note_into_template(
    template: &[ComponentInstance],
    note: &[ComponentInstance],
) -> Vec<ComponentInstance> {
    let mut additions: Vec<ComponentInstance> = Vec::new();
    for instance in note {
        let known = template.iter().chain(additions.iter()).any(|t| t.component_type == instance.component_type);
        if !known {
            additions.push(instance.fresh_copy());
        }
    }
    additions
}

/// Runs the synchronization protocol against a [`ComponentStore`].
///
/// Expected failures are reported in the returned [`SyncOutcome`] rather than
/// as `Err`; a failed sync never undoes the caller's primary action.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigSynchronizer;

impl ConfigSynchronizer {
    pub fn new() -> Self {
        Self
    }

    pub fn sync<S: ComponentStore + ?Sized>(
        &self,
        store: &mut S,
        notebook_id: &str,
        instances: &[ComponentInstance],
        direction: SyncDirection,
    ) -> SyncOutcome {
        let report = validate_component_config(instances);
        if !report.valid {
            log::debug!("sync of notebook {notebook_id} rejected: {} invalid field(s)", report.errors.len());
            return SyncOutcome {
                errors: report.errors,
                ..SyncOutcome::failed("Component configuration is invalid".to_string())
            };
        }
        match direction {
            SyncDirection::Notebook => self.push_to_notes(store, notebook_id, instances),
            SyncDirection::Note => self.pull_into_notebook(store, notebook_id, instances),
        }
    }

    fn push_to_notes<S: ComponentStore + ?Sized>(
        &self,
        store: &mut S,
        notebook_id: &str,
        template: &[ComponentInstance],
    ) -> SyncOutcome {
        let config = ComponentConfig::new(template.to_vec());
        if let Err(e) = store.save_component_config(notebook_id, &config) {
            log::warn!("saving component config for notebook {notebook_id} failed: {e}");
            return SyncOutcome::failed(format!("Failed to save notebook configuration: {e}"));
        }
        self.propagate_to_notes(store, notebook_id, template)
    }

    /// Appends the template's missing types to every note of `notebook_id`.
    ///
    /// Expects `template` to be already saved as the notebook's config; the
    /// outcome reports `notebook_updated` on that basis.
    pub fn propagate_to_notes<S: ComponentStore + ?Sized>(
        &self,
        store: &mut S,
        notebook_id: &str,
        template: &[ComponentInstance],
    ) -> SyncOutcome {
        let mut outcome = SyncOutcome { success: true, notebook_updated: true, ..SyncOutcome::default() };

        let notes = match store.list_notes(notebook_id) {
            Ok(notes) => notes,
            Err(e) => {
                log::warn!("listing notes of notebook {notebook_id} failed: {e}");
                outcome.message = format!("Notebook configuration saved, but its notes could not be listed: {e}");
                return outcome;
            }
        };

        for note in notes {
            let missing = missing_instances_for_note(template, &note.component_instances);
            if missing.is_empty() {
                continue;
            }
            let mut updated = note.component_instances;
            updated.extend(missing);
            match store.save_note_components(&note.note_id, &updated) {
                Ok(()) => outcome.notes_updated += 1,
                Err(e) => {
                    log::warn!("syncing components into note {} failed: {e}", note.note_id);
                    outcome.notes_failed += 1;
                    outcome.failures.push(NoteFailure { note_id: note.note_id, message: e.to_string() });
                }
            }
        }

        outcome.all_notes_synced = outcome.notes_failed == 0;
        outcome.message = if outcome.all_notes_synced {
            format!("Notebook configuration saved; {} note(s) updated", outcome.notes_updated)
        } else {
            format!(
                "Notebook configuration saved; {} note(s) updated, {} failed",
                outcome.notes_updated, outcome.notes_failed
            )
        };
        log::info!("sync notebook {notebook_id}: {}", outcome.message);
        outcome
    }

    fn pull_into_notebook<S: ComponentStore + ?Sized>(
        &self,
        store: &mut S,
        notebook_id: &str,
        note_instances: &[ComponentInstance],
    ) -> SyncOutcome {
        let mut config = match store.component_config(notebook_id) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("loading component config for notebook {notebook_id} failed: {e}");
                return SyncOutcome::failed(format!("Failed to load notebook configuration: {e}"));
            }
        };

        let additions = merge_note_into_template(&config.component_instances, note_instances);
        if additions.is_empty() {
            return SyncOutcome {
                success: true,
                all_notes_synced: true,
                message: "Notebook configuration already up to date".to_string(),
                ..SyncOutcome::default()
            };
        }

        let added = additions.len();
        config.component_instances.extend(additions);
        if let Err(e) = store.save_component_config(notebook_id, &config) {
            log::warn!("saving component config for notebook {notebook_id} failed: {e}");
            return SyncOutcome::failed(format!("Failed to save notebook configuration: {e}"));
        }
        log::info!("sync note -> notebook {notebook_id}: {added} component type(s) added");
        SyncOutcome {
            success: true,
            notebook_updated: true,
            all_notes_synced: true,
            message: format!("Added {added} component type(s) to the notebook configuration"),
            ..SyncOutcome::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{CHART, DATE, TEXT_LONG, TEXT_SHORT};
    use crate::core::note::ComponentData;
    use crate::DaylogError;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStore {
        configs: HashMap<String, ComponentConfig>,
        notes: Vec<Note>,
        failing_notes: HashSet<String>,
        fail_config_write: bool,
        config_writes: usize,
    }

    impl ComponentStore for MemoryStore {
        fn component_config(&self, notebook_id: &str) -> Result<ComponentConfig> {
            self.configs
                .get(notebook_id)
                .cloned()
                .ok_or_else(|| DaylogError::NotebookNotFound(notebook_id.to_string()))
        }

        fn save_component_config(&mut self, notebook_id: &str, config: &ComponentConfig) -> Result<()> {
            if self.fail_config_write {
                return Err(DaylogError::NotebookNotFound(notebook_id.to_string()));
            }
            self.config_writes += 1;
            self.configs.insert(notebook_id.to_string(), config.clone());
            Ok(())
        }

        fn list_notes(&self, notebook_id: &str) -> Result<Vec<Note>> {
            Ok(self.notes.iter().filter(|n| n.notebook_id == notebook_id).cloned().collect())
        }

        fn save_note_components(&mut self, note_id: &str, instances: &[ComponentInstance]) -> Result<()> {
            if self.failing_notes.contains(note_id) {
                return Err(DaylogError::NoteNotFound(note_id.to_string()));
            }
            let note = self
                .notes
                .iter_mut()
                .find(|n| n.note_id == note_id)
                .ok_or_else(|| DaylogError::NoteNotFound(note_id.to_string()))?;
            note.component_instances = instances.to_vec();
            Ok(())
        }
    }

    fn inst(id: &str, component_type: &str, title: &str) -> ComponentInstance {
        ComponentInstance {
            id: id.to_string(),
            component_type: component_type.to_string(),
            title: title.to_string(),
            content: None,
            config: None,
        }
    }

    fn note(id: &str, instances: Vec<ComponentInstance>) -> Note {
        Note {
            note_id: id.to_string(),
            notebook_id: "N1".to_string(),
            title: id.to_string(),
            content_text: String::new(),
            images: Vec::new(),
            source: None,
            author: None,
            created_at: 0,
            modified_at: 0,
            upload_time: None,
            component_instances: instances,
            component_data: ComponentData::default(),
            analysis: None,
        }
    }

    fn store_with_template(template: Vec<ComponentInstance>) -> MemoryStore {
        let mut store = MemoryStore::default();
        store.configs.insert("N1".to_string(), ComponentConfig::new(template));
        store
    }

    fn note_in<'a>(store: &'a MemoryStore, id: &str) -> &'a Note {
        store.notes.iter().find(|n| n.note_id == id).unwrap()
    }

    fn count_of(instances: &[ComponentInstance], component_type: &str) -> usize {
        instances.iter().filter(|i| i.component_type == component_type).count()
    }

    #[test]
    fn test_validation_reports_every_missing_field() {
        let report = validate_component_config(&[inst("a", TEXT_SHORT, "ok"), inst("", "", " ")]);
        assert!(!report.valid);
        let fields: Vec<&str> = report.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["id", "type", "title"]);
        assert!(report.errors.iter().all(|e| e.index == 1));

        assert!(validate_component_config(&[]).valid);
        assert!(validate_component_config(&[inst("a", TEXT_SHORT, "ok")]).valid);
    }

    #[test]
    fn test_validation_rejects_repeated_ids() {
        let report = validate_component_config(&[
            inst("a", TEXT_SHORT, "标题"),
            inst("b", DATE, "日期"),
            inst("a", CHART, "图表"),
        ]);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].index, 2);
        assert_eq!(report.errors[0].field, "id");
        assert_eq!(report.errors[0].id, "a");
        assert!(validate_component_config(&[inst("a", TEXT_SHORT, "ok")]).valid);
    }

    #[test]
    fn test_invalid_config_blocks_all_writes() {
        let mut store = store_with_template(vec![inst("t1", TEXT_SHORT, "标题")]);
        store.notes.push(note("n1", Vec::new()));

        let outcome = ConfigSynchronizer::new().sync(
            &mut store,
            "N1",
            &[inst("y1", DATE, "")],
            SyncDirection::Notebook,
        );
        assert!(!outcome.success);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(store.config_writes, 0);
        assert!(note_in(&store, "n1").component_instances.is_empty());
    }

    #[test]
    fn test_unchanged_note_leaves_template_alone() {
        let template = vec![inst("t1", TEXT_SHORT, "标题")];
        let mut store = store_with_template(template.clone());
        let created: Vec<ComponentInstance> = template.iter().map(ComponentInstance::fresh_copy).collect();

        let outcome = ConfigSynchronizer::new().sync(&mut store, "N1", &created, SyncDirection::Note);
        assert!(outcome.success);
        assert!(!outcome.notebook_updated);
        assert_eq!(store.config_writes, 0);
        assert_eq!(store.configs["N1"].component_instances, template);
    }

    #[test]
    fn test_new_note_type_is_added_to_template_once() {
        let mut store = store_with_template(vec![inst("t1", TEXT_SHORT, "标题")]);
        let mut chart = inst("x1", CHART, "图表");
        chart.content = Some("{\"chartType\":\"bar\",\"points\":[]}".to_string());
        let note_instances = vec![inst("a", TEXT_SHORT, "标题"), chart];
        let sync = ConfigSynchronizer::new();

        let first = sync.sync(&mut store, "N1", &note_instances, SyncDirection::Note);
        assert!(first.success && first.notebook_updated);
        let template = &store.configs["N1"].component_instances;
        assert_eq!(count_of(template, CHART), 1);
        let added = template.iter().find(|i| i.component_type == CHART).unwrap();
        assert_eq!(added.title, "图表");
        assert!(added.content.is_none());

        let second = sync.sync(&mut store, "N1", &note_instances, SyncDirection::Note);
        assert!(second.success && !second.notebook_updated);
        assert_eq!(count_of(&store.configs["N1"].component_instances, CHART), 1);
    }

    #[test]
    fn test_note_direction_never_touches_other_notes() {
        let mut store = store_with_template(Vec::new());
        store.notes.push(note("other", vec![inst("o1", TEXT_SHORT, "标题")]));
        ConfigSynchronizer::new().sync(&mut store, "N1", &[inst("x1", DATE, "日期")], SyncDirection::Note);
        assert_eq!(note_in(&store, "other").component_instances.len(), 1);
    }

    #[test]
    fn test_template_type_fans_out_with_fresh_ids() {
        let mut store = store_with_template(vec![inst("t1", TEXT_SHORT, "标题")]);
        store.notes.push(note("lacks", vec![inst("a1", TEXT_SHORT, "标题")]));
        store.notes.push(note("has", vec![inst("a2", TEXT_SHORT, "标题"), inst("d0", DATE, "旧日期")]));

        let new_template = vec![inst("t1", TEXT_SHORT, "标题"), inst("y1", DATE, "日期")];
        let outcome = ConfigSynchronizer::new().sync(&mut store, "N1", &new_template, SyncDirection::Notebook);

        assert!(outcome.success && outcome.all_notes_synced);
        assert_eq!(outcome.notes_updated, 1);

        let lacks = &note_in(&store, "lacks").component_instances;
        assert_eq!(count_of(lacks, DATE), 1);
        let gained = lacks.iter().find(|i| i.component_type == DATE).unwrap();
        assert_ne!(gained.id, "y1");
        assert_eq!(gained.title, "日期");

        let has = &note_in(&store, "has").component_instances;
        assert_eq!(has.len(), 2);
        assert_eq!(has[1].id, "d0");
    }

    #[test]
    fn test_notebook_sync_is_idempotent_and_monotonic() {
        let mut store = store_with_template(Vec::new());
        store.notes.push(note(
            "n1",
            vec![inst("a", TEXT_LONG, "日记"), inst("b", TEXT_LONG, "备注")],
        ));
        store.notes.push(note("n2", Vec::new()));
        let template = vec![inst("t1", TEXT_LONG, "日记"), inst("t2", CHART, "图表")];
        let sync = ConfigSynchronizer::new();

        sync.sync(&mut store, "N1", &template, SyncDirection::Notebook);
        let after_first: Vec<Vec<ComponentInstance>> =
            store.notes.iter().map(|n| n.component_instances.clone()).collect();

        let second = sync.sync(&mut store, "N1", &template, SyncDirection::Notebook);
        assert_eq!(second.notes_updated, 0);
        let after_second: Vec<Vec<ComponentInstance>> =
            store.notes.iter().map(|n| n.component_instances.clone()).collect();
        assert_eq!(after_first, after_second);

        let n1 = &note_in(&store, "n1").component_instances;
        assert_eq!(count_of(n1, TEXT_LONG), 2);
        assert_eq!(count_of(n1, CHART), 1);
        let n2 = &note_in(&store, "n2").component_instances;
        assert_eq!(n2.len(), 2);
    }

    #[test]
    fn test_partial_fan_out_failure_is_reported() {
        let mut store = store_with_template(Vec::new());
        store.notes.push(note("ok", Vec::new()));
        store.notes.push(note("gone", Vec::new()));
        store.failing_notes.insert("gone".to_string());

        let outcome = ConfigSynchronizer::new().sync(
            &mut store,
            "N1",
            &[inst("y1", DATE, "日期")],
            SyncDirection::Notebook,
        );
        assert!(outcome.success);
        assert!(outcome.notebook_updated);
        assert!(!outcome.all_notes_synced);
        assert_eq!((outcome.notes_updated, outcome.notes_failed), (1, 1));
        assert_eq!(outcome.failures[0].note_id, "gone");
        assert!(outcome.message.contains("1 failed"));
        assert_eq!(count_of(&note_in(&store, "ok").component_instances, DATE), 1);
    }

    #[test]
    fn test_failed_notebook_write_skips_fan_out() {
        let mut store = store_with_template(Vec::new());
        store.notes.push(note("n1", Vec::new()));
        store.fail_config_write = true;

        let outcome = ConfigSynchronizer::new().sync(
            &mut store,
            "N1",
            &[inst("y1", DATE, "日期")],
            SyncDirection::Notebook,
        );
        assert!(!outcome.success);
        assert!(note_in(&store, "n1").component_instances.is_empty());
    }

    #[test]
    fn test_merge_picks_first_instance_per_type() {
        let additions = merge_note_into_template(
            &[inst("t1", TEXT_SHORT, "标题")],
            &[inst("c1", CHART, "第一"), inst("c2", CHART, "第二"), inst("s", TEXT_SHORT, "x")],
        );
        assert_eq!(additions.len(), 1);
        assert_eq!(additions[0].title, "第一");
    }

    #[test]
    fn test_direction_json() {
        assert_eq!(serde_json::to_string(&SyncDirection::Notebook).unwrap(), "\"notebook\"");
        assert_eq!(serde_json::from_str::<SyncDirection>("\"note\"").unwrap(), SyncDirection::Note);
    }
}
