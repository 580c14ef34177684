use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    dto::products::{Catalog, CatalogQuery, SyncReport},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Product,
    response::ApiResponse,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/sync", post(sync_products))
        .route("/{printify_id}", get(get_product))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Published products grouped by category", body = ApiResponse<Catalog>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<ApiResponse<Catalog>>> {
    Ok(Json(product_service::list_products(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/products/{printify_id}",
    params(("printify_id" = String, Path, description = "Printify product id")),
    responses(
        (status = 200, description = "Product detail with options and variants", body = ApiResponse<Product>),
        (status = 404, description = "Not synced"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(printify_id): Path<String>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(product_service::get_product(&state, &printify_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/products/sync",
    responses(
        (status = 200, description = "Catalog synced from Printify", body = ApiResponse<SyncReport>),
        (status = 403, description = "Admin only"),
        (status = 502, description = "Printify request failed"),
        (status = 503, description = "Printify not configured"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn sync_products(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SyncReport>>> {
    Ok(Json(product_service::sync_products(&state, &user).await?))
}
