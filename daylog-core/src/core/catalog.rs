//! Static catalog of the component kinds a notebook or note can contain.
//!
//! The catalog is an immutable table. Consumers receive a [`ComponentCatalog`]
//! value instead of reaching for a process-wide registry, so tests and
//! alternative front-ends can construct their own.

use serde::Serialize;

/// Label returned by [`ComponentCatalog::title_for`] for an unrecognised type id.
pub const UNKNOWN_COMPONENT_LABEL: &str = "未知组件";

/// One entry in the component catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComponentTypeDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

/// A chart sub-type selectable through a chart component's `chartType` config key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChartTypeDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
}

/// The two disjoint families of component types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentFamily {
    /// User-entered primitives (text, date, number, media).
    Record,
    /// Derived or visual blocks (AI summaries, charts).
    Analysis,
}

pub const TEXT_SHORT: &str = "text-short";
pub const TEXT_LONG: &str = "text-long";
pub const DATE: &str = "date";
pub const NUMBER: &str = "number";
pub const IMAGE: &str = "image";
pub const VIDEO: &str = "video";
pub const AUDIO: &str = "audio";
pub const FILE: &str = "file";
pub const AI_CUSTOM: &str = "ai-custom";
pub const CHART: &str = "chart";

static RECORD_TYPES: &[ComponentTypeDescriptor] = &[
    ComponentTypeDescriptor { id: TEXT_SHORT, label: "短文本", icon: "📝", description: "单行文本输入" },
    ComponentTypeDescriptor { id: TEXT_LONG, label: "长文本", icon: "📄", description: "多行文本，支持 Markdown" },
    ComponentTypeDescriptor { id: DATE, label: "日期", icon: "📅", description: "日期与时间" },
    ComponentTypeDescriptor { id: NUMBER, label: "数字", icon: "🔢", description: "数值输入" },
    ComponentTypeDescriptor { id: IMAGE, label: "图片", icon: "🖼️", description: "上传一张或多张图片" },
    ComponentTypeDescriptor { id: VIDEO, label: "视频", icon: "🎬", description: "上传视频文件" },
    ComponentTypeDescriptor { id: AUDIO, label: "音频", icon: "🎵", description: "上传音频文件" },
    ComponentTypeDescriptor { id: FILE, label: "文件", icon: "📎", description: "上传任意附件" },
];

static ANALYSIS_TYPES: &[ComponentTypeDescriptor] = &[
    ComponentTypeDescriptor { id: AI_CUSTOM, label: "AI 自定义", icon: "🤖", description: "按提示词生成的 AI 分析" },
    ComponentTypeDescriptor { id: CHART, label: "图表", icon: "📊", description: "基于笔记数据的图表" },
];

static CHART_TYPES: &[ChartTypeDescriptor] = &[
    ChartTypeDescriptor { id: "bar", label: "柱状图", icon: "📊" },
    ChartTypeDescriptor { id: "bubble", label: "气泡图", icon: "🫧" },
    ChartTypeDescriptor { id: "gantt", label: "甘特图", icon: "📈" },
];

/// Read-only lookup over the built-in component and chart type tables.
///
/// Cheap to copy; every lookup is a linear scan over a handful of entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentCatalog {
    records: &'static [ComponentTypeDescriptor],
    analysis: &'static [ComponentTypeDescriptor],
    charts: &'static [ChartTypeDescriptor],
}

impl Default for ComponentCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ComponentCatalog {
    /// Returns the catalog of built-in component types.
    pub const fn builtin() -> Self {
        Self { records: RECORD_TYPES, analysis: ANALYSIS_TYPES, charts: CHART_TYPES }
    }

    /// Record components: user-entered primitives.
    pub fn list_record_types(&self) -> &'static [ComponentTypeDescriptor] {
        self.records
    }

    /// Analysis components: derived or visual blocks.
    pub fn list_analysis_types(&self) -> &'static [ComponentTypeDescriptor] {
        self.analysis
    }

    /// Every descriptor, record family first.
    pub fn all(&self) -> impl Iterator<Item = &'static ComponentTypeDescriptor> {
        self.records.iter().chain(self.analysis.iter())
    }

    /// Looks up the descriptor for `id`.
    pub fn resolve(&self, id: &str) -> Option<&'static ComponentTypeDescriptor> {
        self.all().find(|d| d.id == id)
    }

    /// Returns the family `id` belongs to, or `None` for an unknown id.
    pub fn family(&self, id: &str) -> Option<ComponentFamily> {
        if self.records.iter().any(|d| d.id == id) {
            Some(ComponentFamily::Record)
        } else if self.analysis.iter().any(|d| d.id == id) {
            Some(ComponentFamily::Analysis)
        } else {
            None
        }
    }

    /// Returns the display label for `id`, or [`UNKNOWN_COMPONENT_LABEL`].
    pub fn title_for(&self, id: &str) -> &'static str {
        self.resolve(id).map_or(UNKNOWN_COMPONENT_LABEL, |d| d.label)
    }

    /// Chart sub-types available to chart components.
    pub fn chart_types(&self) -> &'static [ChartTypeDescriptor] {
        self.charts
    }

    pub fn resolve_chart_type(&self, id: &str) -> Option<&'static ChartTypeDescriptor> {
        self.charts.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let catalog = ComponentCatalog::builtin();
        let ids: Vec<&str> = catalog.all().map(|d| d.id).collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn test_families_are_disjoint() {
        let catalog = ComponentCatalog::builtin();
        for record in catalog.list_record_types() {
            assert!(catalog.list_analysis_types().iter().all(|a| a.id != record.id));
            assert_eq!(catalog.family(record.id), Some(ComponentFamily::Record));
        }
        assert_eq!(catalog.family(CHART), Some(ComponentFamily::Analysis));
        assert_eq!(catalog.family(AI_CUSTOM), Some(ComponentFamily::Analysis));
        assert_eq!(catalog.family("hologram"), None);
    }

    #[test]
    fn test_title_for_unknown_returns_sentinel() {
        let catalog = ComponentCatalog::builtin();
        assert_eq!(catalog.title_for(TEXT_SHORT), "短文本");
        assert_eq!(catalog.title_for("hologram"), UNKNOWN_COMPONENT_LABEL);
        assert!(catalog.resolve("hologram").is_none());
    }

    #[test]
    fn test_chart_types() {
        let catalog = ComponentCatalog::builtin();
        let ids: Vec<&str> = catalog.chart_types().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["bar", "bubble", "gantt"]);
        assert_eq!(catalog.resolve_chart_type("gantt").map(|c| c.label), Some("甘特图"));
        assert!(catalog.resolve_chart_type("pie").is_none());
    }
}
