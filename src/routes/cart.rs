use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use tower_sessions::Session;

use crate::{
    dto::cart::{AddToCartRequest, CartView, UpdateCartRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(view_cart).post(add_to_cart))
        .route("/{key}", patch(update_cart_line).delete(remove_from_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart lines, total and pending notices", body = ApiResponse<CartView>)
    ),
    tag = "Cart"
)]
pub async fn view_cart(session: Session) -> AppResult<Json<ApiResponse<CartView>>> {
    Ok(Json(cart_service::view_cart(&session).await?))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Item added", body = ApiResponse<CartView>),
        (status = 400, description = "Invalid quantity or variant"),
        (status = 401, description = "Sign in required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    _user: AuthUser,
    session: Session,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    Ok(Json(
        cart_service::add_to_cart(&state, &session, payload).await?,
    ))
}

#[utoipa::path(
    patch,
    path = "/api/cart/{key}",
    params(("key" = String, Path, description = "Cart line key")),
    request_body = UpdateCartRequest,
    responses(
        (status = 200, description = "Quantity updated", body = ApiResponse<CartView>),
        (status = 404, description = "No such cart line"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_cart_line(
    _user: AuthUser,
    session: Session,
    Path(key): Path<String>,
    Json(payload): Json<UpdateCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    Ok(Json(
        cart_service::update_cart_line(&session, &key, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{key}",
    params(("key" = String, Path, description = "Cart line key")),
    responses(
        (status = 200, description = "Line removed", body = ApiResponse<CartView>),
        (status = 404, description = "No such cart line"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    _user: AuthUser,
    session: Session,
    Path(key): Path<String>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    Ok(Json(cart_service::remove_from_cart(&session, &key).await?))
}
