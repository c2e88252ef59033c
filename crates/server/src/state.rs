use std::sync::Arc;

use barrage_core::{AggregationContext, SanitizedConfig};

/// Shared application state
pub struct AppState {
    context: Arc<AggregationContext>,
}

impl AppState {
    pub fn new(context: Arc<AggregationContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<AggregationContext> {
        &self.context
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(self.context.config())
    }
}
