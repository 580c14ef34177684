use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::UserProfile;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitCodeRequest {
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Success,
    Claimed,
    Failure,
    AllClaimed,
    Error,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitCodeResponse {
    pub status: AttemptStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prize: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prizes_left: Option<u64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompetitionOverview {
    pub prizes_left: u64,
    pub launch_datetime: Option<DateTime<Utc>>,
    pub launch_notes: Option<String>,
    pub referral_unlock_threshold: i32,
    pub profile: Option<UserProfile>,
}
