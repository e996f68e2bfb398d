use serde::{Deserialize, Serialize};

/// Query string accepted by `GET /results/`.
#[derive(Debug, Default, Deserialize)]
pub struct ResultsQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Body returned once an upload has been queued.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub task_id: String,
}
