//! # factory-advisor
//!
//! Factory operations advisor: answers natural-language questions about
//! production data by pairing a deterministic metrics engine with a
//! tool-calling conversation loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     factory-advisor                           │
//! │  ┌───────────┐   ┌────────────────┐   ┌───────────────────┐  │
//! │  │  Toolkit  │──▶│ MetricsEngine  │──▶│  DatasetSource    │  │
//! │  │ (4 tools) │   │ (OEE, scrap,   │   │  (JSON snapshot)  │  │
//! │  └───────────┘   │  quality,      │   └───────────────────┘  │
//! │        ▲         │  downtime)     │                          │
//! │        │         └────────────────┘                          │
//! │   agent-core turn loop ◀──▶ ChatProvider (agent-runtime)     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The metrics engine is pure and reentrant; the dataset snapshot is
//! immutable and shared read-only across sessions, so no locking is needed.

pub mod model;
pub mod store;
pub mod metrics;
pub mod toolkit;

pub use metrics::{
    DowntimeReport, MetricsEngine, MetricsError, OeeReport, PerformanceModel, QualityReport,
    ScrapReport, FIXED_PERFORMANCE, MAJOR_EVENT_HOURS,
};
pub use model::{Dataset, DayRecord, DowntimeEvent, Machine, QualityIssue, Severity, Shift};
pub use store::{DatasetSource, EmptySource, JsonFileSource, StaticSource};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::toolkit::{
        register_all, DowntimeAnalysisTool, OeeTool, QualityIssuesTool, ScrapMetricsTool,
    };
}

/// Render the operator system prompt for a loaded snapshot
///
/// Gives the model the live date range and machine roster so it can resolve
/// relative date questions against what the data actually covers.
pub fn build_system_prompt(factory_name: &str, dataset: &Dataset, today: &str) -> String {
    let machine_list = dataset.machine_names().join(", ");
    let shift_list = dataset
        .shifts
        .iter()
        .map(|s| format!("{} ({}:00-{}:00)", s.name, s.start_hour, s.end_hour))
        .collect::<Vec<_>>()
        .join(" and ");

    format!(
        "You are a factory operations assistant for {factory_name}.\n\
         \n\
         You have access to production data from {start} to {end} covering:\n\
         - {machine_count} machines: {machine_list}\n\
         - {shift_count} shifts: {shift_list}\n\
         - Metrics: OEE, scrap, quality issues, downtime\n\
         \n\
         When answering:\n\
         1. Use tools to get accurate data\n\
         2. Provide specific numbers and percentages\n\
         3. Explain trends and patterns\n\
         4. Compare metrics when relevant\n\
         5. Be concise but thorough\n\
         \n\
         Today's date is {today}. When users ask about \"today\", \"this week\", \
         or relative dates, calculate the appropriate date range based on the \
         data available.",
        start = dataset.start_day(),
        end = dataset.end_day(),
        machine_count = dataset.machines.len(),
        shift_count = dataset.shifts.len(),
    )
}
