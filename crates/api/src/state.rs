use std::sync::Arc;

use crate::services::pipeline::IngestionPipeline;
use crate::services::registration::RegistrationWorkflow;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub registration: Arc<RegistrationWorkflow>,
}

#[derive(Clone)]
pub struct RequestId(pub String);
