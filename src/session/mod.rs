//! Session plumbing: the Postgres-backed session layer, the session keys the
//! store uses, and typed accessors for each stored value.

pub mod cart;
pub mod checkout;
pub mod flash;

use serde::{Deserialize, Serialize};
use tower_sessions::{Expiry, SessionManagerLayer, cookie::time::Duration};
use tower_sessions_sqlx_store::PostgresStore;
use uuid::Uuid;

use crate::{config::AppConfig, db::DbPool};

pub const SESSION_COOKIE_NAME: &str = "hoxobil_session";

pub mod keys {
    pub const CURRENT_USER: &str = "current_user";
    pub const CART: &str = "cart";
    pub const CHECKOUT: &str = "checkout";
    pub const FLASH: &str = "flash";
}

/// Identity of the logged-in user as kept in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

/// Creates the session store tables if they do not exist yet.
pub async fn migrate_store(pool: &DbPool) -> anyhow::Result<PostgresStore> {
    let store = PostgresStore::new(pool.clone());
    store.migrate().await?;
    Ok(store)
}

pub fn create_session_layer(
    store: PostgresStore,
    config: &AppConfig,
) -> SessionManagerLayer<PostgresStore> {
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(
            config.session_expiry_days,
        )))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
