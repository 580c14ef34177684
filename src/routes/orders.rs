use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use tower_sessions::Session;

use crate::{
    dto::orders::{FailureQuery, OrderFailure, OrderList, OrderWithItems},
    error::AppResult,
    middleware::auth::{AuthUser, MaybeUser},
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/success/{reference}", get(order_success))
        .route("/failure", get(order_failure))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Caller's orders, newest first", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    Ok(Json(order_service::list_orders(&state, &user, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/orders/success/{reference}",
    params(("reference" = String, Path, description = "Payment reference")),
    responses(
        (status = 200, description = "Paid order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "No paid order for this reference"),
    ),
    tag = "Orders"
)]
pub async fn order_success(
    State(state): State<AppState>,
    user: MaybeUser,
    session: Session,
    Path(reference): Path<String>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(
        order_service::order_success(&state, &session, &user, &reference).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/orders/failure",
    params(FailureQuery),
    responses(
        (status = 200, description = "Payment failure message", body = ApiResponse<OrderFailure>)
    ),
    tag = "Orders"
)]
pub async fn order_failure(
    session: Session,
    Query(query): Query<FailureQuery>,
) -> AppResult<Json<ApiResponse<OrderFailure>>> {
    Ok(Json(
        order_service::order_failure(&session, query.message).await?,
    ))
}
