use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{
    dto::{
        cart::CartView,
        designs::{AddDesignToCartRequest, SubmitDesignRequest},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::CustomDesign,
    response::ApiResponse,
    services::design_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_design))
        .route("/{id}/cart", post(add_design_to_cart))
}

#[utoipa::path(
    post,
    path = "/api/designs",
    request_body = SubmitDesignRequest,
    responses(
        (status = 201, description = "Design stored and queued for Printify", body = ApiResponse<CustomDesign>),
        (status = 400, description = "Image is not a base64 PNG"),
        (status = 404, description = "Unknown base product"),
    ),
    security(("bearer_auth" = [])),
    tag = "Designs"
)]
pub async fn submit_design(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SubmitDesignRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CustomDesign>>)> {
    let resp = design_service::submit_design(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/designs/{id}/cart",
    params(("id" = Uuid, Path, description = "Custom design id")),
    request_body = AddDesignToCartRequest,
    responses(
        (status = 200, description = "Design added to the cart", body = ApiResponse<CartView>),
        (status = 403, description = "Not the design owner"),
        (status = 404, description = "Design not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Designs"
)]
pub async fn add_design_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddDesignToCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    Ok(Json(
        design_service::add_design_to_cart(&state, &session, &user, id, payload).await?,
    ))
}
