use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
    dto::competition::{AttemptStatus, CompetitionOverview, SubmitCodeResponse},
    entity::{
        SiteEvents, UserProfiles, WinningCodes,
        competition_attempts::ActiveModel as AttemptActive,
        site_events::{self, Column as EventCol},
        user_profiles::{ActiveModel as ProfileActive, Column as ProfileCol, Model as ProfileModel},
        winning_codes::{Column as CodeCol, Model as CodeModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::UserProfile,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const CODE_LENGTH: usize = 6;
const REFERRAL_CODE_LENGTH: usize = 8;
const REFERRAL_CODE_ATTEMPTS: usize = 10;

/// Who submitted a code and from where.
#[derive(Debug, Clone, Default)]
pub struct Submitter {
    pub user_id: Option<Uuid>,
    pub session_key: Option<String>,
    pub ip_address: Option<String>,
}

pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| b.is_ascii_digit())
}

/// 8 uppercase hex characters.
pub fn generate_referral_code() -> String {
    Uuid::new_v4().simple().to_string()[..REFERRAL_CODE_LENGTH].to_uppercase()
}

/// A referral code not yet held by any profile.
pub async fn unique_referral_code<C: ConnectionTrait>(db: &C) -> AppResult<String> {
    for _ in 0..REFERRAL_CODE_ATTEMPTS {
        let code = generate_referral_code();
        let taken = UserProfiles::find()
            .filter(ProfileCol::ReferralCode.eq(code.as_str()))
            .count(db)
            .await?;
        if taken == 0 {
            return Ok(code);
        }
    }
    Err(AppError::Internal(anyhow::anyhow!(
        "could not generate a unique referral code"
    )))
}

pub async fn create_profile<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    referred_by: Option<Uuid>,
) -> AppResult<ProfileModel> {
    let now = Utc::now();
    let profile = ProfileActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        referral_code: Set(Some(unique_referral_code(db).await?)),
        referred_by: Set(referred_by),
        referral_count: Set(0),
        unlocked_first_digit: Set(None),
        unlocked_digit_from_code: Set(None),
        digit_unlocked_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await?;
    Ok(profile)
}

/// The user's profile, created with a referral code when missing.
pub async fn ensure_profile(state: &AppState, user_id: Uuid) -> AppResult<ProfileModel> {
    let existing = UserProfiles::find()
        .filter(ProfileCol::UserId.eq(user_id))
        .one(&state.orm)
        .await?;
    match existing {
        Some(profile) if profile.referral_code.is_some() => Ok(profile),
        Some(profile) => {
            let mut active: ProfileActive = profile.into();
            active.referral_code = Set(Some(unique_referral_code(&state.orm).await?));
            active.updated_at = Set(Utc::now().into());
            Ok(active.update(&state.orm).await?)
        }
        None => {
            tracing::info!(%user_id, "creating missing user profile");
            create_profile(&state.orm, user_id, None).await
        }
    }
}

async fn prizes_left<C: ConnectionTrait>(db: &C) -> AppResult<u64> {
    Ok(WinningCodes::find()
        .filter(CodeCol::IsClaimed.eq(false))
        .count(db)
        .await?)
}

/// The active launch event, latest first.
pub async fn launch_event(state: &AppState) -> AppResult<Option<site_events::Model>> {
    Ok(SiteEvents::find()
        .filter(
            Condition::all()
                .add(EventCol::EventName.eq(site_events::SITE_LAUNCH))
                .add(EventCol::IsActive.eq(true)),
        )
        .order_by_desc(EventCol::EventDatetime)
        .one(&state.orm)
        .await?)
}

pub async fn overview(
    state: &AppState,
    user: Option<&AuthUser>,
) -> AppResult<ApiResponse<CompetitionOverview>> {
    let launch = launch_event(state).await?;
    let profile = match user {
        Some(user) => Some(UserProfile::from(ensure_profile(state, user.user_id).await?)),
        None => None,
    };

    Ok(ApiResponse::success(
        "Competition",
        CompetitionOverview {
            prizes_left: prizes_left(&state.orm).await?,
            launch_datetime: launch
                .as_ref()
                .map(|event| event.event_datetime.with_timezone(&Utc)),
            launch_notes: launch.and_then(|event| event.notes),
            referral_unlock_threshold: state.config.referral_unlock_threshold,
            profile,
        },
        Some(Meta::empty()),
    ))
}

/// Checks a guess against the winning-code pool. Every well-formed guess is
/// logged, whatever the outcome.
pub async fn submit_code(
    state: &AppState,
    submitter: Submitter,
    code: &str,
) -> AppResult<SubmitCodeResponse> {
    let code = code.trim();
    if !is_valid_code(code) {
        return Ok(SubmitCodeResponse {
            status: AttemptStatus::Error,
            message: "Invalid code format.".to_string(),
            prize: None,
            prizes_left: None,
        });
    }

    let now = Utc::now();
    let attempt = AttemptActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(submitter.user_id),
        session_key: Set(submitter.session_key),
        ip_address: Set(submitter.ip_address),
        submitted_code: Set(code.to_string()),
        is_winner: Set(false),
        winning_code_id: Set(None),
        attempted_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    let remaining = prizes_left(&state.orm).await?;
    if remaining == 0 {
        return Ok(SubmitCodeResponse {
            status: AttemptStatus::AllClaimed,
            message: "Sorry, all prizes have been claimed!".to_string(),
            prize: None,
            prizes_left: Some(0),
        });
    }

    let Some(winning) = WinningCodes::find()
        .filter(CodeCol::Code.eq(code))
        .one(&state.orm)
        .await?
    else {
        return Ok(SubmitCodeResponse {
            status: AttemptStatus::Failure,
            message: format!("Sorry, '{code}' is not a winning code. Keep trying!"),
            prize: None,
            prizes_left: Some(remaining),
        });
    };

    let claimed = claim(state, &winning, submitter.user_id).await?;

    let mut attempt: AttemptActive = attempt.into();
    attempt.winning_code_id = Set(Some(winning.id));
    attempt.is_winner = Set(claimed);
    attempt.update(&state.orm).await?;

    if !claimed {
        return Ok(SubmitCodeResponse {
            status: AttemptStatus::Claimed,
            message: format!("Oops! Code '{code}' has already been claimed."),
            prize: None,
            prizes_left: Some(remaining),
        });
    }

    tracing::info!(code_id = %winning.id, user_id = ?submitter.user_id, "winning code claimed");
    Ok(SubmitCodeResponse {
        status: AttemptStatus::Success,
        message: format!(
            "Congratulations! '{code}' is a winning code! You've won: {}",
            winning.prize_description
        ),
        prize: Some(winning.prize_description),
        prizes_left: Some(prizes_left(&state.orm).await?),
    })
}

/// Conditional update: only one caller can flip `is_claimed`.
async fn claim(state: &AppState, code: &CodeModel, user_id: Option<Uuid>) -> AppResult<bool> {
    let result = WinningCodes::update_many()
        .col_expr(CodeCol::IsClaimed, Expr::value(true))
        .col_expr(CodeCol::ClaimedByUserId, Expr::value(user_id))
        .col_expr(CodeCol::ClaimedAt, Expr::value(Utc::now()))
        .filter(
            Condition::all()
                .add(CodeCol::Id.eq(code.id))
                .add(CodeCol::IsClaimed.eq(false)),
        )
        .exec(&state.orm)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Credits the referrer with one signup and, on reaching the threshold,
/// reveals the first digit of the oldest unclaimed code exactly once.
pub async fn process_successful_referral(
    state: &AppState,
    referrer_user_id: Uuid,
) -> AppResult<Option<ProfileModel>> {
    let now = Utc::now();
    UserProfiles::update_many()
        .col_expr(
            ProfileCol::ReferralCount,
            Expr::col(ProfileCol::ReferralCount).add(1),
        )
        .col_expr(ProfileCol::UpdatedAt, Expr::value(now))
        .filter(ProfileCol::UserId.eq(referrer_user_id))
        .exec(&state.orm)
        .await?;

    let Some(profile) = UserProfiles::find()
        .filter(ProfileCol::UserId.eq(referrer_user_id))
        .one(&state.orm)
        .await?
    else {
        tracing::warn!(%referrer_user_id, "referrer has no profile");
        return Ok(None);
    };
    tracing::debug!(%referrer_user_id, count = profile.referral_count, "referral counted");

    if profile.referral_count < state.config.referral_unlock_threshold
        || profile.unlocked_first_digit.is_some()
    {
        return Ok(Some(profile));
    }

    let Some(reveal) = WinningCodes::find()
        .filter(CodeCol::IsClaimed.eq(false))
        .order_by_asc(CodeCol::CreatedAt)
        .one(&state.orm)
        .await?
    else {
        tracing::warn!(%referrer_user_id, "referral threshold reached but no unclaimed codes remain");
        return Ok(Some(profile));
    };
    let Some(digit) = first_digit(&reveal.code) else {
        return Ok(Some(profile));
    };

    let unlocked = UserProfiles::update_many()
        .col_expr(ProfileCol::UnlockedFirstDigit, Expr::value(digit.to_string()))
        .col_expr(ProfileCol::UnlockedDigitFromCode, Expr::value(reveal.id))
        .col_expr(ProfileCol::DigitUnlockedAt, Expr::value(now))
        .col_expr(ProfileCol::UpdatedAt, Expr::value(now))
        .filter(
            Condition::all()
                .add(ProfileCol::Id.eq(profile.id))
                .add(ProfileCol::UnlockedFirstDigit.is_null()),
        )
        .exec(&state.orm)
        .await?;
    if unlocked.rows_affected == 1 {
        tracing::info!(%referrer_user_id, code_id = %reveal.id, "first digit unlocked");
    }

    Ok(UserProfiles::find_by_id(profile.id).one(&state.orm).await?)
}

fn first_digit(code: &str) -> Option<char> {
    code.chars().next().filter(char::is_ascii_digit)
}

/// Distinct random six-digit codes for seeding the pool.
pub fn random_codes(count: usize) -> Vec<String> {
    let mut codes = std::collections::BTreeSet::new();
    while codes.len() < count {
        codes.insert(format!("{:06}", Uuid::new_v4().as_u128() % 1_000_000));
    }
    codes.into_iter().collect()
}
