mod common;

use common::{create_user, database_url, new_session, setup_state};
use hoxobil_store::{
    dto::{auth::RegisterRequest, competition::AttemptStatus},
    entity::{
        CompetitionAttempts, UserProfiles, WinningCodes,
        competition_attempts::Column as AttemptCol, user_profiles::Column as ProfileCol,
    },
    services::{
        auth_service,
        competition_service::{self, Submitter},
    },
    state::AppState,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Tests in this file that depend on the global count of unclaimed codes
/// take this lock first.
static CODE_POOL: Mutex<()> = Mutex::new(());

fn lock_code_pool() -> MutexGuard<'static, ()> {
    CODE_POOL.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn unclaimed_codes(state: &AppState) -> anyhow::Result<i64> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM winning_codes WHERE NOT is_claimed")
            .fetch_one(&state.pool)
            .await?,
    )
}

/// Inserts a fresh unclaimed code, retrying on the rare collision.
async fn insert_winning_code(state: &AppState, prize: &str) -> anyhow::Result<(Uuid, String)> {
    loop {
        let code = competition_service::random_codes(1).remove(0);
        let id = Uuid::new_v4();
        let inserted = sqlx::query(
            "INSERT INTO winning_codes (id, code, prize_description) VALUES ($1, $2, $3) ON CONFLICT (code) DO NOTHING",
        )
        .bind(id)
        .bind(&code)
        .bind(prize)
        .execute(&state.pool)
        .await?;
        if inserted.rows_affected() == 1 {
            return Ok((id, code));
        }
    }
}

fn submitter(user_id: Uuid, ip: &str) -> Submitter {
    Submitter {
        user_id: Some(user_id),
        session_key: Some(format!("session-{user_id}")),
        ip_address: Some(ip.to_string()),
    }
}

// First submission of a winning code claims it; the second sees it claimed.
// Both attempts are logged against the code.
#[tokio::test]
async fn winning_code_is_claimed_exactly_once() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _pool = lock_code_pool();
    let state = setup_state(&database_url, None, None).await?;
    let first = create_user(&state, "user").await?;
    let second = create_user(&state, "user").await?;
    let (code_id, code) = insert_winning_code(&state, "HOXOBIL hoodie").await?;
    let before = unclaimed_codes(&state).await?;

    let won = competition_service::submit_code(&state, submitter(first.user_id, "10.0.0.1"), &code).await?;
    assert_eq!(won.status, AttemptStatus::Success);
    assert_eq!(won.prize.as_deref(), Some("HOXOBIL hoodie"));
    assert_eq!(won.prizes_left, Some((before - 1) as u64));

    let late = competition_service::submit_code(&state, submitter(second.user_id, "10.0.0.2"), &code).await?;
    assert_eq!(late.status, AttemptStatus::Claimed);
    assert!(late.prize.is_none());

    let winning = WinningCodes::find_by_id(code_id)
        .one(&state.orm)
        .await?
        .expect("winning code");
    assert!(winning.is_claimed);
    assert_eq!(winning.claimed_by_user_id, Some(first.user_id));
    assert!(winning.claimed_at.is_some());

    let attempts = CompetitionAttempts::find()
        .filter(AttemptCol::WinningCodeId.eq(code_id))
        .all(&state.orm)
        .await?;
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts.iter().filter(|a| a.is_winner).count(), 1);
    let winner = attempts.iter().find(|a| a.is_winner).expect("winning attempt");
    assert_eq!(winner.user_id, Some(first.user_id));
    assert_eq!(winner.ip_address.as_deref(), Some("10.0.0.1"));
    Ok(())
}

#[tokio::test]
async fn malformed_codes_are_rejected_without_an_attempt() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, None, None).await?;
    let user = create_user(&state, "user").await?;

    let response = competition_service::submit_code(&state, submitter(user.user_id, "10.0.0.3"), "12ab").await?;
    assert_eq!(response.status, AttemptStatus::Error);

    let attempts = CompetitionAttempts::find()
        .filter(AttemptCol::UserId.eq(user.user_id))
        .all(&state.orm)
        .await?;
    assert!(attempts.is_empty());
    Ok(())
}

#[tokio::test]
async fn simultaneous_correct_guesses_produce_one_winner() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _pool = lock_code_pool();
    let state = setup_state(&database_url, None, None).await?;
    let mut players = Vec::new();
    for _ in 0..4 {
        players.push(create_user(&state, "user").await?);
    }
    let (code_id, code) = insert_winning_code(&state, "HOXOBIL jacket").await?;

    let (a, b, c, d) = tokio::join!(
        competition_service::submit_code(&state, submitter(players[0].user_id, "10.1.0.1"), &code),
        competition_service::submit_code(&state, submitter(players[1].user_id, "10.1.0.2"), &code),
        competition_service::submit_code(&state, submitter(players[2].user_id, "10.1.0.3"), &code),
        competition_service::submit_code(&state, submitter(players[3].user_id, "10.1.0.4"), &code),
    );
    let statuses = [a?.status, b?.status, c?.status, d?.status];
    assert_eq!(statuses.iter().filter(|s| **s == AttemptStatus::Success).count(), 1);
    assert_eq!(statuses.iter().filter(|s| **s == AttemptStatus::Claimed).count(), 3);

    let attempts = CompetitionAttempts::find()
        .filter(AttemptCol::WinningCodeId.eq(code_id))
        .all(&state.orm)
        .await?;
    assert_eq!(attempts.len(), 4);
    let winners: Vec<_> = attempts.iter().filter(|a| a.is_winner).collect();
    assert_eq!(winners.len(), 1);

    let winning = WinningCodes::find_by_id(code_id)
        .one(&state.orm)
        .await?
        .expect("winning code");
    assert!(winning.is_claimed);
    assert_eq!(winning.claimed_by_user_id, winners[0].user_id);
    Ok(())
}

// With every code claimed, submissions stop before any lookup but are still
// logged.
#[tokio::test]
async fn exhausted_prize_pool_reports_all_claimed() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _pool = lock_code_pool();
    let state = setup_state(&database_url, None, None).await?;
    let user = create_user(&state, "user").await?;
    let (_, code) = insert_winning_code(&state, "HOXOBIL tote").await?;

    let held: Vec<Uuid> = sqlx::query_scalar(
        "UPDATE winning_codes SET is_claimed = TRUE WHERE NOT is_claimed RETURNING id",
    )
    .fetch_all(&state.pool)
    .await?;
    assert!(!held.is_empty());

    let outcome =
        competition_service::submit_code(&state, submitter(user.user_id, "10.2.0.1"), &code).await;

    sqlx::query("UPDATE winning_codes SET is_claimed = FALSE WHERE id = ANY($1)")
        .bind(&held)
        .execute(&state.pool)
        .await?;

    let response = outcome?;
    assert_eq!(response.status, AttemptStatus::AllClaimed);
    assert_eq!(response.prizes_left, Some(0));
    assert!(response.prize.is_none());

    let attempts = CompetitionAttempts::find()
        .filter(AttemptCol::UserId.eq(user.user_id))
        .all(&state.orm)
        .await?;
    assert_eq!(attempts.len(), 1);
    assert!(!attempts[0].is_winner);
    assert!(attempts[0].winning_code_id.is_none());
    Ok(())
}

fn registration(email: String, referral_code: Option<String>) -> RegisterRequest {
    RegisterRequest {
        email,
        password: "correct horse battery".into(),
        first_name: "Chidi".into(),
        last_name: "Okafor".into(),
        referral_code,
    }
}

// Reaching the referral threshold reveals one digit, once.
#[tokio::test]
async fn referrals_unlock_a_digit_at_the_threshold() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let _pool = lock_code_pool();
    let state = setup_state(&database_url, None, None).await?;
    assert_eq!(state.config.referral_unlock_threshold, 2);
    insert_winning_code(&state, "HOXOBIL cap").await?;

    let tag = Uuid::new_v4().simple().to_string();
    let registered = auth_service::register_user(
        &state,
        &new_session(),
        registration(format!("referrer-{tag}@example.com"), None),
    )
    .await?;
    let referrer = registered.data.expect("registered user");
    let referral_code = referrer
        .profile
        .and_then(|p| p.referral_code)
        .expect("referral code");

    for n in 0..2 {
        auth_service::register_user(
            &state,
            &new_session(),
            registration(
                format!("friend{n}-{tag}@example.com"),
                Some(referral_code.to_lowercase()),
            ),
        )
        .await?;
    }

    let profile = UserProfiles::find()
        .filter(ProfileCol::UserId.eq(referrer.user.id))
        .one(&state.orm)
        .await?
        .expect("referrer profile");
    assert_eq!(profile.referral_count, 2);
    let digit = profile.unlocked_first_digit.clone().expect("unlocked digit");
    assert!(digit.chars().all(|c| c.is_ascii_digit()) && digit.len() == 1);
    let from_code = profile.unlocked_digit_from_code.expect("source code");

    auth_service::register_user(
        &state,
        &new_session(),
        registration(format!("friend2-{tag}@example.com"), Some(referral_code)),
    )
    .await?;
    let profile = UserProfiles::find_by_id(profile.id)
        .one(&state.orm)
        .await?
        .expect("referrer profile");
    assert_eq!(profile.referral_count, 3);
    assert_eq!(profile.unlocked_first_digit, Some(digit));
    assert_eq!(profile.unlocked_digit_from_code, Some(from_code));
    Ok(())
}

#[tokio::test]
async fn unknown_referral_code_still_registers() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let state = setup_state(&database_url, None, None).await?;
    let tag = Uuid::new_v4().simple().to_string();

    let response = auth_service::register_user(
        &state,
        &new_session(),
        registration(format!("lonely-{tag}@example.com"), Some("NOPE0000".into())),
    )
    .await?;
    assert!(
        response
            .notices
            .iter()
            .any(|n| n.contains("Invalid referral code"))
    );
    let me = response.data.expect("registered user");
    assert!(me.profile.and_then(|p| p.referred_by).is_none());
    Ok(())
}
