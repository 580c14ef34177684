//! Pre-launch gate: until the `SITE_LAUNCH` event, only the competition and
//! the plumbing around it are reachable.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};

use crate::{middleware::auth::MaybeUser, services::competition_service, state::AppState};

pub const COMPETITION_PATH: &str = "/api/competition";

const ALLOWED_PREFIXES: [&str; 5] = [COMPETITION_PATH, "/api/auth", "/health", "/docs", "/media"];

pub fn is_allowed(path: &str) -> bool {
    ALLOWED_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

pub fn is_before_launch(launch: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    launch.is_some_and(|at| now < at)
}

pub async fn prelaunch_gate(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    request: Request,
    next: Next,
) -> Response {
    if is_allowed(request.uri().path()) || user.as_ref().is_some_and(|u| u.is_admin()) {
        return next.run(request).await;
    }

    let launch = match competition_service::launch_event(&state).await {
        Ok(event) => event.map(|event| event.event_datetime.with_timezone(&Utc)),
        Err(err) => {
            tracing::warn!(error = %err, "launch event lookup failed; gate left open");
            None
        }
    };
    if is_before_launch(launch, Utc::now()) {
        tracing::debug!(path = %request.uri().path(), "pre-launch redirect");
        return Redirect::to(COMPETITION_PATH).into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn allow_list_matches_whole_segments() {
        assert!(is_allowed("/api/competition"));
        assert!(is_allowed("/api/competition/submit"));
        assert!(is_allowed("/api/auth/login"));
        assert!(is_allowed("/health"));
        assert!(is_allowed("/docs"));
        assert!(is_allowed("/media/custom_designs/2025/01/01/x.png"));

        assert!(!is_allowed("/api/products"));
        assert!(!is_allowed("/api/cart"));
        assert!(!is_allowed("/healthz"));
        assert!(!is_allowed("/"));
    }

    #[test]
    fn gate_closes_only_before_launch() {
        let now = Utc::now();
        assert!(is_before_launch(Some(now + Duration::hours(1)), now));
        assert!(!is_before_launch(Some(now - Duration::hours(1)), now));
        assert!(!is_before_launch(None, now));
    }
}
