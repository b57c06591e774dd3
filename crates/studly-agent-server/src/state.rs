use std::sync::Arc;

use crate::config::Settings;
use crate::services::conversation::ConversationStore;
use crate::services::RequestOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub store: ConversationStore,
    pub orchestrator: Arc<RequestOrchestrator>,
}

impl AppState {
    pub fn new(settings: Settings, orchestrator: RequestOrchestrator) -> Self {
        Self {
            store: orchestrator.store().clone(),
            settings,
            orchestrator: Arc::new(orchestrator),
        }
    }
}
