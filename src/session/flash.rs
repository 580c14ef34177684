//! One-shot notices carried to the next response, e.g. after a redirect.

use tower_sessions::{Session, session};

use super::keys;

pub async fn push(session: &Session, notice: impl Into<String>) -> Result<(), session::Error> {
    let mut notices: Vec<String> = session.get(keys::FLASH).await?.unwrap_or_default();
    notices.push(notice.into());
    session.insert(keys::FLASH, notices).await
}

/// Returns and clears pending notices.
pub async fn take(session: &Session) -> Result<Vec<String>, session::Error> {
    Ok(session
        .remove::<Vec<String>>(keys::FLASH)
        .await?
        .unwrap_or_default())
}
