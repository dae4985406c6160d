//! Toolkit - Agent Tools
//!
//! Domain-specific tools that implement `agent_core::Tool` for the factory
//! advisor. One tool per metrics operation; tool names must match the
//! declarations offered to the provider exactly, since the model calls them
//! by name.
//!
//! Metrics failures never escape as errors: they are serialized into the
//! tool output so the turn loop can relay them to the model.

mod oee;
mod scrap;
mod quality;
mod downtime;

pub use oee::OeeTool;
pub use scrap::ScrapMetricsTool;
pub use quality::QualityIssuesTool;
pub use downtime::DowntimeAnalysisTool;

use std::sync::Arc;

use agent_core::tool::{ParameterSchema, ToolCall, ToolRegistry, ToolResult};
use serde::Serialize;

use crate::metrics::{MetricsEngine, MetricsResult};

/// Register all four metrics tools against a shared engine
pub fn register_all(registry: &mut ToolRegistry, engine: Arc<MetricsEngine>) {
    registry.register(OeeTool::new(Arc::clone(&engine)));
    registry.register(ScrapMetricsTool::new(Arc::clone(&engine)));
    registry.register(QualityIssuesTool::new(Arc::clone(&engine)));
    registry.register(DowntimeAnalysisTool::new(engine));
}

/// The date-range parameters shared by every metrics tool
pub(crate) fn range_params() -> Vec<ParameterSchema> {
    vec![
        ParameterSchema::required_string("start_date", "Start date (YYYY-MM-DD)"),
        ParameterSchema::required_string("end_date", "End date (YYYY-MM-DD)"),
        ParameterSchema::optional_string("machine_name", "Optional machine name filter"),
    ]
}

/// Pull the shared arguments out of a call
pub(crate) fn range_args(call: &ToolCall) -> (String, String, Option<String>) {
    let start = call.str_arg("start_date").unwrap_or_default().to_string();
    let end = call.str_arg("end_date").unwrap_or_default().to_string();
    let machine = call.str_arg("machine_name").map(str::to_string);
    (start, end, machine)
}

/// Turn a metrics result into tool output
pub(crate) fn into_tool_result<T: Serialize>(
    name: &str,
    result: MetricsResult<T>,
) -> agent_core::Result<ToolResult> {
    match result {
        Ok(report) => {
            let payload = serde_json::to_string(&report)?;
            Ok(ToolResult::success(name, payload))
        }
        Err(e) => Ok(ToolResult::failure(name, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::sample_dataset;
    use crate::store::{EmptySource, StaticSource};
    use agent_core::tool::ToolRegistry;
    use std::collections::HashMap;

    fn registry_with(engine: MetricsEngine) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        register_all(&mut registry, Arc::new(engine));
        registry
    }

    fn call(name: &str, pairs: &[(&str, &str)]) -> ToolCall {
        let mut args = HashMap::new();
        for (k, v) in pairs {
            args.insert((*k).to_string(), serde_json::json!(v));
        }
        ToolCall::new(name, args)
    }

    #[tokio::test]
    async fn test_all_four_tools_registered() {
        let registry = registry_with(MetricsEngine::new(Arc::new(StaticSource::new(
            sample_dataset(),
        ))));

        assert_eq!(registry.len(), 4);
        for name in [
            "calculate_oee",
            "get_scrap_metrics",
            "get_quality_issues",
            "get_downtime_analysis",
        ] {
            assert!(registry.get(name).is_some(), "missing tool {name}");
        }
    }

    #[tokio::test]
    async fn test_successful_dispatch_returns_json_report() {
        let registry = registry_with(MetricsEngine::new(Arc::new(StaticSource::new(
            sample_dataset(),
        ))));

        let result = registry
            .dispatch(&call(
                "calculate_oee",
                &[("start_date", "2025-06-01"), ("end_date", "2025-06-02")],
            ))
            .await;

        assert!(result.success);
        let parsed: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        assert!(parsed["oee"].is_number());
        assert_eq!(parsed["performance"], serde_json::json!(0.95));
    }

    #[tokio::test]
    async fn test_data_unavailable_flows_back_as_tool_output() {
        let registry = registry_with(MetricsEngine::new(Arc::new(EmptySource)));

        let result = registry
            .dispatch(&call(
                "get_scrap_metrics",
                &[("start_date", "2025-06-01"), ("end_date", "2025-06-02")],
            ))
            .await;

        assert!(!result.success);
        let parsed: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(parsed["error"], "No data available");
    }

    #[tokio::test]
    async fn test_empty_range_flows_back_as_tool_output() {
        let registry = registry_with(MetricsEngine::new(Arc::new(StaticSource::new(
            sample_dataset(),
        ))));

        let result = registry
            .dispatch(&call(
                "get_downtime_analysis",
                &[("start_date", "2024-01-01"), ("end_date", "2024-01-07")],
            ))
            .await;

        assert!(!result.success);
        assert!(result.output.contains("No data for specified date range"));
    }

    #[tokio::test]
    async fn test_missing_required_dates_rejected_before_execution() {
        let registry = registry_with(MetricsEngine::new(Arc::new(StaticSource::new(
            sample_dataset(),
        ))));

        let result = registry.dispatch(&call("calculate_oee", &[])).await;
        assert!(!result.success);
        assert!(result.output.contains("start_date"));
    }
}
