//! Scrap Metrics Tool

use std::sync::Arc;

use agent_core::{
    tool::{Tool, ToolCall, ToolResult, ToolSchema},
    Result as CoreResult,
};
use async_trait::async_trait;

use super::{into_tool_result, range_args, range_params};
use crate::metrics::MetricsEngine;

/// Tool for scrap totals and rates
pub struct ScrapMetricsTool {
    engine: Arc<MetricsEngine>,
}

impl ScrapMetricsTool {
    pub fn new(engine: Arc<MetricsEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for ScrapMetricsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_scrap_metrics".into(),
            description: "Get scrap production metrics including total scrap, scrap rate, \
                          and breakdown by machine."
                .into(),
            parameters: range_params(),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let (start, end, machine) = range_args(call);
        let report = self.engine.scrap_metrics(&start, &end, machine.as_deref());
        into_tool_result("get_scrap_metrics", report)
    }
}
