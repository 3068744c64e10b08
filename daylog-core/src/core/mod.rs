//! Internal domain modules for the Daylog core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod catalog;
pub mod component;
pub mod content;
pub mod debounce;
pub mod error;
pub mod events;
pub mod journal;
pub mod note;
pub mod render;
pub mod settings;
pub mod storage;
pub mod sync;

#[doc(inline)]
pub use catalog::{ChartTypeDescriptor, ComponentCatalog, ComponentFamily, ComponentTypeDescriptor};
#[doc(inline)]
pub use component::{
    ComponentConfig, ComponentInstance, ComponentSet, ComponentTemplate, ConfigMap, DataMapping, TransformName,
};
#[doc(inline)]
pub use content::{ChartPlaceholder, ChartPoint, ContentOrigin, RenderedComponent};
#[doc(inline)]
pub use debounce::{Debouncer, EditKind, SaveScheduler, SaveTarget};
#[doc(inline)]
pub use error::{DaylogError, Result};
#[doc(inline)]
pub use events::{ComponentChange, EventBus, EventName, JournalEvent, Subscription};
#[doc(inline)]
pub use journal::Journal;
#[doc(inline)]
pub use note::{AnalysisRecord, ComponentData, ComponentDataEntry, NewNote, Note, NoteData, Notebook};
#[doc(inline)]
pub use render::{ChangeSink, ComponentRenderer, RendererRegistry, ViewFragment};
#[doc(inline)]
pub use settings::{DebounceSettings, Settings};
#[doc(inline)]
pub use storage::Storage;
#[doc(inline)]
pub use sync::{ComponentStore, ConfigSynchronizer, SyncDirection, SyncOutcome, ValidationReport};
