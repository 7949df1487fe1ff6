use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RegisterRequest {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UpdateUserRequest {
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct UserResponse {
    pub id: Uuid,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub username: String,
    pub active: bool,
}

/// Response to a classify upload. `predicted_label` is the class index,
/// `label` its human-readable name, `score` the rolling-window distraction
/// score in (0, 1).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ClassifyResponse {
    pub filename: String,
    pub predicted_label: usize,
    pub label: String,
    pub probabilities: Vec<f32>,
    pub score: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HistoryEntry {
    pub id: i64,
    pub link: String,
    pub predicted_label: i32,
    pub taken_at: DateTime<Utc>,
    pub distraction_score: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HistoryResponse {
    pub results: Vec<HistoryEntry>,
}
