//! Downtime Analysis Tool

use std::sync::Arc;

use agent_core::{
    tool::{Tool, ToolCall, ToolResult, ToolSchema},
    Result as CoreResult,
};
use async_trait::async_trait;

use super::{into_tool_result, range_args, range_params};
use crate::metrics::MetricsEngine;

/// Tool for downtime aggregation and major-incident reporting
pub struct DowntimeAnalysisTool {
    engine: Arc<MetricsEngine>,
}

impl DowntimeAnalysisTool {
    pub fn new(engine: Arc<MetricsEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for DowntimeAnalysisTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_downtime_analysis".into(),
            description: "Analyze downtime events including reasons, duration, and major \
                          incidents (single events longer than 2 hours)."
                .into(),
            parameters: range_params(),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let (start, end, machine) = range_args(call);
        let report = self.engine.downtime_analysis(&start, &end, machine.as_deref());
        into_tool_result("get_downtime_analysis", report)
    }
}
