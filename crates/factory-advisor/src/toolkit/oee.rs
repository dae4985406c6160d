//! OEE Tool
//!
//! Exposes the OEE decomposition to the model.

use std::sync::Arc;

use agent_core::{
    tool::{Tool, ToolCall, ToolResult, ToolSchema},
    Result as CoreResult,
};
use async_trait::async_trait;

use super::{into_tool_result, range_args, range_params};
use crate::metrics::MetricsEngine;

/// Tool for Overall Equipment Effectiveness
pub struct OeeTool {
    engine: Arc<MetricsEngine>,
}

impl OeeTool {
    pub fn new(engine: Arc<MetricsEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for OeeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "calculate_oee".into(),
            description: "Calculate Overall Equipment Effectiveness (OEE) for a date range. \
                          Returns OEE and its availability/performance/quality breakdown."
                .into(),
            parameters: range_params(),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let (start, end, machine) = range_args(call);
        let report = self.engine.calculate_oee(&start, &end, machine.as_deref());
        into_tool_result("calculate_oee", report)
    }
}
