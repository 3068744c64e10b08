use crate::core::component::{ComponentConfig, ComponentInstance};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A notebook and its default component template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    pub notebook_id: String,
    pub name: String,
    pub note_count: usize,
    pub component_config: ComponentConfig,
    pub created_at: i64,
    pub modified_at: i64,
}

/// A journal entry with its own copy of the notebook's component set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub note_id: String,
    pub notebook_id: String,
    pub title: String,
    pub content_text: String,
    pub images: Vec<String>,
    pub source: Option<String>,
    pub author: Option<String>,
    pub created_at: i64,
    pub modified_at: i64,
    pub upload_time: Option<i64>,
    pub component_instances: Vec<ComponentInstance>,
    pub component_data: ComponentData,
    pub analysis: Option<AnalysisRecord>,
}

impl Note {
    /// Projects this note into the structure templates resolve paths against.
    pub fn note_data(&self) -> NoteData {
        NoteData {
            title: Some(self.title.clone()),
            content_text: Some(self.content_text.clone()),
            images: self.images.clone(),
            source: self.source.clone(),
            author: self.author.clone(),
            created_at: unix_to_rfc3339(self.created_at),
            upload_time: self.upload_time.and_then(unix_to_rfc3339),
            analysis: self.analysis.clone(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Free-form fields supplied when creating a note.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewNote {
    pub title: String,
    #[serde(default)]
    pub content_text: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub upload_time: Option<i64>,
}

/// The structured note data that data mappings and `{{path}}` placeholders read from.
///
/// Every field is optional; unknown keys are kept in `extra` and stay addressable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_text: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisRecord>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NoteData {
    /// Converts to a JSON tree for path lookups. Never fails; an unserialisable
    /// value (impossible for these field types) degrades to `null`.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            log::debug!("note data could not be converted to JSON: {e}");
            serde_json::Value::Null
        })
    }
}

/// Structured fields returned by the AI extraction service for one day.
///
/// The core never validates these; they are only read through data-mapping
/// paths such as `analysis.mood.score`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<MoodAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness: Option<FitnessAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study: Option<StudyAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<WorkAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspiration: Option<InspirationAnalysis>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoodAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<String>,
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub exercise_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyAnalysis {
    /// Minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspirationAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

/// A user-entered value recorded for one component of a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDataEntry {
    pub value: serde_json::Value,
    #[serde(rename = "type")]
    pub component_type: String,
    pub title: String,
}

impl ComponentDataEntry {
    /// Returns the value when it is a non-empty string.
    pub fn non_empty_str(&self) -> Option<&str> {
        self.value.as_str().filter(|s| !s.is_empty())
    }
}

/// User overrides for a note's components, keyed by component id.
///
/// Insertion order is preserved so the `type`+`title` fallback match is
/// deterministic ("first match wins").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentData(pub IndexMap<String, ComponentDataEntry>);

impl ComponentData {
    pub fn insert(&mut self, component_id: &str, entry: ComponentDataEntry) {
        self.0.insert(component_id.to_string(), entry);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Finds the entry for a component.
    ///
    /// Looks up `component_id` first. On a miss, falls back to the first entry
    /// whose type and title both equal the component's. Records written before
    /// component ids were stable only match through the fallback; two components
    /// sharing a type and title both resolve to the same entry.
    pub fn lookup(&self, component_id: &str, component_type: &str, title: &str) -> Option<&ComponentDataEntry> {
        self.0.get(component_id).or_else(|| {
            self.0
                .values()
                .find(|e| e.component_type == component_type && e.title == title)
        })
    }
}

fn unix_to_rfc3339(ts: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|d| d.to_rfc3339())
}
