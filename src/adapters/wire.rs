//! JSON bodies shared by the HTTP server and the HTTP client.

use serde::{Deserialize, Serialize};

/// Response header carrying the full size of a file on range reads.
pub const TOTAL_SIZE_HEADER: &str = "x-total-size";

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkAccepted {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileCompleted {
    pub file_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobStarted {
    pub job_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextBody {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RangeQuery {
    pub start: u64,
    pub length: u64,
}
