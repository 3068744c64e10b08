//! Core library for Daylog, a personal journal whose notes are built from
//! user-composed components.
//!
//! The primary entry point is [`Journal`], which represents an open Daylog
//! database file. Notebooks carry a component template; every note holds its
//! own copy, and the two are kept in step by the synchronization protocol in
//! [`ConfigSynchronizer`]. Component content is resolved from note data by
//! the functions in [`content`](crate::core::content) and displayed through a
//! [`RendererRegistry`].
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    catalog::{ChartTypeDescriptor, ComponentCatalog, ComponentFamily, ComponentTypeDescriptor},
    component::{
        ComponentConfig, ComponentInstance, ComponentSet, ComponentTemplate, ConfigMap, DataMapping, TransformName,
    },
    content::{
        apply_overrides, apply_transform, generate, render_template, resolve_note, resolve_path, ChartPlaceholder,
        ChartPoint, ContentOrigin, RenderedComponent,
    },
    debounce::{Debouncer, EditKind, SaveScheduler, SaveTarget},
    error::{DaylogError, Result},
    events::{ComponentChange, EventBus, EventName, JournalEvent, Subscription},
    journal::Journal,
    note::{AnalysisRecord, ComponentData, ComponentDataEntry, NewNote, Note, NoteData, Notebook},
    render::{render_fallback, ChangeSink, ComponentRenderer, RendererRegistry, ViewFragment},
    settings::{load_settings, save_settings, settings_file_path, DebounceSettings, Settings},
    storage::Storage,
    sync::{
        merge_note_into_template, missing_instances_for_note, validate_component_config, ComponentStore,
        ConfigSynchronizer, FieldError, NoteFailure, SyncDirection, SyncOutcome, ValidationReport,
    },
};
