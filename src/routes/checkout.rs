use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use tower_sessions::Session;

use crate::{
    dto::checkout::{CheckoutRequest, CheckoutSummary},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::checkout_service::{self, CheckoutOutcome},
    state::AppState,
};

pub const CART_PATH: &str = "/api/cart";

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(checkout_page).post(checkout_submit))
}

#[utoipa::path(
    get,
    path = "/api/checkout",
    responses(
        (status = 200, description = "Cart summary and gateway public key", body = ApiResponse<CheckoutSummary>),
        (status = 303, description = "Cart is empty; redirected to the cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn checkout_page(
    State(state): State<AppState>,
    _user: AuthUser,
    session: Session,
) -> AppResult<Response> {
    Ok(match checkout_service::checkout_summary(&state, &session).await? {
        Some(summary) => Json(summary).into_response(),
        None => Redirect::to(CART_PATH).into_response(),
    })
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 303, description = "Redirect to the Paystack authorization URL, or to the cart when empty"),
        (status = 400, description = "Invalid total or unresolvable cart line"),
        (status = 502, description = "Paystack rejected or failed the initialization"),
        (status = 503, description = "Payment gateway not configured"),
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn checkout_submit(
    State(state): State<AppState>,
    user: AuthUser,
    session: Session,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Redirect> {
    let outcome = checkout_service::begin_checkout(&state, &session, &user, payload).await?;
    Ok(match outcome {
        CheckoutOutcome::EmptyCart => Redirect::to(CART_PATH),
        CheckoutOutcome::Redirect {
            authorization_url, ..
        } => Redirect::to(&authorization_url),
    })
}
