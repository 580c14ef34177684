use axum::{
    Router,
    extract::{Query, State},
    response::Redirect,
    routing::get,
};
use tower_sessions::Session;

use crate::{
    dto::checkout::CallbackQuery,
    error::AppResult,
    middleware::auth::MaybeUser,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/callback", get(paystack_callback))
}

#[utoipa::path(
    get,
    path = "/api/payments/callback",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Redirect to order success, order failure, or checkout"),
    ),
    tag = "Payments"
)]
pub async fn paystack_callback(
    State(state): State<AppState>,
    user: MaybeUser,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> AppResult<Redirect> {
    let outcome =
        payment_service::handle_callback(&state, &session, &user, query.reference()).await?;
    Ok(Redirect::to(&outcome.redirect_path()))
}
