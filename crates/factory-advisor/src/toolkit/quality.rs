//! Quality Issues Tool

use std::sync::Arc;

use agent_core::{
    tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema},
    Result as CoreResult,
};
use async_trait::async_trait;

use super::{into_tool_result, range_args, range_params};
use crate::metrics::MetricsEngine;

/// Tool for quality defect events
pub struct QualityIssuesTool {
    engine: Arc<MetricsEngine>,
}

impl QualityIssuesTool {
    pub fn new(engine: Arc<MetricsEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for QualityIssuesTool {
    fn schema(&self) -> ToolSchema {
        let mut parameters = range_params();
        parameters.push(ParameterSchema {
            name: "severity".into(),
            param_type: "string".into(),
            description: "Optional severity filter: Low, Medium, or High".into(),
            required: false,
            enum_values: Some(vec![
                serde_json::json!("Low"),
                serde_json::json!("Medium"),
                serde_json::json!("High"),
            ]),
        });

        ToolSchema {
            name: "get_quality_issues".into(),
            description: "Get quality defect events with details about defect types, \
                          severity, and affected parts."
                .into(),
            parameters,
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let (start, end, machine) = range_args(call);
        let severity = call.str_arg("severity").map(str::to_string);
        let report = self.engine.quality_issues(
            &start,
            &end,
            severity.as_deref(),
            machine.as_deref(),
        );
        into_tool_result("get_quality_issues", report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::sample_dataset;
    use crate::store::StaticSource;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_severity_filter_passes_through() {
        let engine = Arc::new(MetricsEngine::new(Arc::new(StaticSource::new(
            sample_dataset(),
        ))));
        let tool = QualityIssuesTool::new(engine);

        let mut args = HashMap::new();
        args.insert("start_date".into(), serde_json::json!("2025-06-01"));
        args.insert("end_date".into(), serde_json::json!("2025-06-02"));
        args.insert("severity".into(), serde_json::json!("High"));

        let result = tool.execute(&ToolCall::new("get_quality_issues", args)).await.unwrap();
        assert!(result.success);

        let parsed: serde_json::Value = serde_json::from_str(&result.output).unwrap();
        assert_eq!(parsed["total_issues"], 2);
        assert_eq!(parsed["issues"][0]["machine"], "Assembly-001");
    }
}
