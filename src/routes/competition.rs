use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::{
    dto::competition::{CompetitionOverview, SubmitCodeRequest, SubmitCodeResponse},
    error::AppResult,
    middleware::auth::{AuthUser, ClientIp, MaybeUser},
    response::ApiResponse,
    services::competition_service::{self, Submitter},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(competition_page))
        .route("/submit", post(submit_code))
}

#[utoipa::path(
    get,
    path = "/api/competition",
    responses(
        (status = 200, description = "Prizes left, launch time and the caller's referral profile", body = ApiResponse<CompetitionOverview>)
    ),
    tag = "Competition"
)]
pub async fn competition_page(
    State(state): State<AppState>,
    user: MaybeUser,
) -> AppResult<Json<ApiResponse<CompetitionOverview>>> {
    Ok(Json(
        competition_service::overview(&state, user.0.as_ref()).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/competition/submit",
    request_body = SubmitCodeRequest,
    responses(
        (status = 200, description = "Outcome: success, claimed, failure, all_claimed or error", body = SubmitCodeResponse),
        (status = 401, description = "Sign in required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Competition"
)]
pub async fn submit_code(
    State(state): State<AppState>,
    user: AuthUser,
    session: Session,
    ClientIp(ip_address): ClientIp,
    Json(payload): Json<SubmitCodeRequest>,
) -> AppResult<Json<SubmitCodeResponse>> {
    // Anonymous sessions have no id until first saved.
    if session.id().is_none() {
        session.save().await?;
    }
    let submitter = Submitter {
        user_id: Some(user.user_id),
        session_key: session.id().map(|id| id.to_string()),
        ip_address,
    };
    Ok(Json(
        competition_service::submit_code(&state, submitter, &payload.code).await?,
    ))
}
